//! Builds the static part of the scene, in a fixed order: scene root, camera, renderers,
//! controls, light, ground.

use foundation::math::Vec3;
use gpu::{OrbitControls, PerspectiveCamera, RendererStack, Viewport};
use runtime::Tweens;
use scene::{Node, NodeKind, PointLight, ResourceStore, SceneGraph};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::interaction::HoverState;
use crate::state::{Renderers, SceneState, Surface};

pub fn bootstrap(
    config: &EngineConfig,
    surface: Surface,
    renderers: Renderers,
) -> Result<SceneState, EngineError> {
    let viewport = Viewport::new(surface.width, surface.height)?;

    let mut graph = SceneGraph::new();
    let mut resources = ResourceStore::new();
    let root = graph.root();

    let cam = &config.camera;
    let mut camera = PerspectiveCamera::new(cam.fov_deg, viewport.aspect(), cam.near, cam.far);
    camera.up = Vec3::from_array(cam.up);
    camera.position = Vec3::from_array(cam.position);
    camera.look_at(Vec3::from_array(cam.target));
    // Fails early on a camera sitting on its target or looking along `up`.
    camera.view()?;
    let camera_node = graph.add_child(
        root,
        Node::new(NodeKind::Camera)
            .named("camera")
            .at(camera.position),
    )?;

    let pixel_ratio = if surface.pixel_ratio.is_finite() && surface.pixel_ratio > 0.0 {
        surface.pixel_ratio
    } else {
        1.0
    };
    let renderers = RendererStack::new(
        renderers.scene,
        renderers.labels,
        renderers.sprites,
        viewport,
        pixel_ratio,
    );

    let controls = OrbitControls::new(&camera);

    let light = &config.light;
    let light = graph.add_child(
        root,
        Node::new(NodeKind::Light(PointLight {
            color: light.color,
            intensity: light.intensity,
            distance: light.distance,
        }))
        .named("point-light")
        .at(Vec3::from_array(light.position)),
    )?;

    let ground = layers::build_ground(&mut graph, &mut resources, root, &config.theme.ground)?;

    tracing::debug!(
        width = viewport.width,
        height = viewport.height,
        pixel_ratio,
        "scene bootstrapped"
    );

    Ok(SceneState {
        graph,
        resources,
        camera,
        camera_node,
        controls,
        renderers,
        light,
        ground,
        area_list: None,
        markers: None,
        hit_targets: Vec::new(),
        tweens: Tweens::new(),
        hover: HoverState::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::bootstrap;
    use crate::config::EngineConfig;
    use crate::error::EngineError;
    use crate::state::{Renderers, Surface};
    use gpu::{HeadlessRenderer, RenderError, RenderLayer};
    use scene::NodeKind;
    use scene::components::OverlayLayer;

    fn renderers() -> Renderers {
        Renderers {
            scene: Box::new(HeadlessRenderer::new(RenderLayer::Scene).0),
            labels: Box::new(HeadlessRenderer::new(RenderLayer::Overlay(OverlayLayer::Labels)).0),
            sprites: Box::new(HeadlessRenderer::new(RenderLayer::Overlay(OverlayLayer::Sprites)).0),
        }
    }

    #[test]
    fn builds_camera_light_and_ground_in_order() {
        let surface = Surface {
            width: 800.0,
            height: 400.0,
            pixel_ratio: 2.0,
        };
        let state = bootstrap(&EngineConfig::default(), surface, renderers()).expect("bootstrap");

        let root = state.graph.root();
        let kinds: Vec<_> = state
            .graph
            .children(root)
            .iter()
            .map(|id| state.graph.node(*id).expect("node").name.clone())
            .collect();
        assert_eq!(kinds, vec!["camera", "point-light", "ground"]);
        assert_eq!(state.camera.aspect, 2.0);
        assert_eq!(state.renderers.pixel_ratio(), 2.0);
        assert!(matches!(
            state.graph.node(state.light).expect("light").kind,
            NodeKind::Light(_)
        ));
        assert_eq!(state.resources.live_geometries(), 1);
    }

    #[test]
    fn zero_sized_container_is_rejected() {
        let surface = Surface {
            width: 0.0,
            height: 400.0,
            pixel_ratio: 1.0,
        };
        let err = bootstrap(&EngineConfig::default(), surface, renderers())
            .err()
            .expect("error");
        assert!(matches!(err, EngineError::Render(RenderError::InvalidViewport { .. })));
    }
}
