use foundation::math::Vec2;
use scene::components::{OverlayLayer, OverlaySprite};
use scene::{NodeId, NodeKind, SceneGraph};

use crate::camera::{PerspectiveCamera, Viewport};
use crate::error::RenderError;

/// A sprite placed on screen for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayItem {
    pub node: NodeId,
    pub sprite: OverlaySprite,
    /// Anchor in CSS pixels from the container's top-left.
    pub screen: Vec2,
    /// NDC depth in `[0, 1]`; larger is farther.
    pub depth: f64,
    /// CSS scale factor. Labels stay at 1; sprites shrink with distance.
    pub scale: f64,
    /// False when the anchor is outside the view frustum.
    pub visible: bool,
}

/// Sprites of one overlay layer, farthest first so later elements stack on top.
pub fn collect_overlays(
    graph: &SceneGraph,
    camera: &PerspectiveCamera,
    viewport: Viewport,
    layer: OverlayLayer,
) -> Result<Vec<OverlayItem>, RenderError> {
    let mut items = Vec::new();
    for id in graph.descendants(graph.root()) {
        let Some(node) = graph.node(id) else { continue };
        let NodeKind::Sprite(sprite) = &node.kind else {
            continue;
        };
        if sprite.layer != layer {
            continue;
        }
        let Some(world) = graph.world_transform(id) else {
            continue;
        };

        let anchor = world.position;
        let projected = camera.project(anchor)?;
        let shown = graph.is_effectively_visible(id);
        let item = match projected {
            Some(ndc) => {
                let in_frustum = (-1.0..=1.0).contains(&ndc.x)
                    && (-1.0..=1.0).contains(&ndc.y)
                    && (0.0..=1.0).contains(&ndc.z);
                let scale = match layer {
                    OverlayLayer::Labels => 1.0,
                    OverlayLayer::Sprites => {
                        world.scale.x * camera.pixels_per_unit(viewport, camera.depth_of(anchor))
                    }
                };
                OverlayItem {
                    node: id,
                    sprite: sprite.clone(),
                    screen: viewport.from_ndc(ndc.xy()),
                    depth: ndc.z,
                    scale,
                    visible: shown && in_frustum,
                }
            }
            None => OverlayItem {
                node: id,
                sprite: sprite.clone(),
                screen: Vec2::ZERO,
                depth: 1.0,
                scale: 0.0,
                visible: false,
            },
        };
        items.push(item);
    }

    items.sort_by(|a, b| {
        b.depth
            .total_cmp(&a.depth)
            .then_with(|| a.node.index().cmp(&b.node.index()))
    });
    Ok(items)
}
