use runtime::{Easing, Tween};
use scene::components::GroupKind;
use scene::{NodeId, intersect_objects};

use crate::config::HoverConfig;
use crate::error::EngineError;
use crate::state::SceneState;

/// The region group currently raised under the pointer. At most one at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HoverState {
    elevated: Option<NodeId>,
}

impl HoverState {
    pub fn elevated(&self) -> Option<NodeId> {
        self.elevated
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HoverChange {
    Unchanged,
    Moved { from: Option<NodeId>, to: NodeId },
}

/// Handles a pointer move at `(x_px, y_px)` relative to the container's top-left.
///
/// The nearest hit-test target decides: if it belongs to a region block other than the
/// one already raised, the old block sinks back to `z = 0` and the new one rises to
/// `elevation`. Anything else leaves the hover state alone.
pub fn pointer_move(
    state: &mut SceneState,
    x_px: f64,
    y_px: f64,
    hover: &HoverConfig,
    elevation: f64,
) -> Result<HoverChange, EngineError> {
    let viewport = state.renderers.viewport();
    let ndc = viewport.to_ndc(x_px, y_px);
    let ray = state.camera.ray_from_ndc(ndc)?;

    let hits = intersect_objects(&state.graph, &state.resources, &state.hit_targets, ray);
    let Some(first) = hits.first() else {
        return Ok(HoverChange::Unchanged);
    };
    let Some(group) = state
        .graph
        .tagged_ancestor(first.node)
        .filter(|(_, tag)| tag.kind == GroupKind::RegionBlock)
        .map(|(id, _)| id)
    else {
        return Ok(HoverChange::Unchanged);
    };
    if state.hover.elevated == Some(group) {
        return Ok(HoverChange::Unchanged);
    }

    let duration_s = hover.duration_ms.max(0.0) / 1000.0;
    let previous = state.hover.elevated.filter(|prev| state.graph.contains(*prev));
    if let Some(prev) = previous {
        start_z_tween(state, prev, 0.0, duration_s);
    }
    start_z_tween(state, group, elevation, duration_s);
    state.hover.elevated = Some(group);

    tracing::debug!(?previous, next = ?group, "hover moved");
    Ok(HoverChange::Moved {
        from: previous,
        to: group,
    })
}

/// Replaces any running tween on `node` with one heading to `target_z`.
fn start_z_tween(state: &mut SceneState, node: NodeId, target_z: f64, duration_s: f64) {
    let Some(current) = state.graph.node(node).map(|n| n.transform.position.z) else {
        return;
    };
    state
        .tweens
        .start(node, Tween::new(current, target_z, duration_s, Easing::Linear));
}
