use gpu::{OrbitControls, PerspectiveCamera, RenderError, RenderView, Renderer, RendererStack};
use runtime::{Frame, FrameSteps, Tweens};
use scene::{NodeId, ResourceStore, SceneGraph};

use crate::interaction::HoverState;
use crate::markers::MarkerSet;

/// Container size and device pixel ratio reported by the host.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Surface {
    pub width: f64,
    pub height: f64,
    pub pixel_ratio: f64,
}

/// The 3D renderer and the two overlay renderers, in stacking order.
pub struct Renderers {
    pub scene: Box<dyn Renderer>,
    pub labels: Box<dyn Renderer>,
    pub sprites: Box<dyn Renderer>,
}

/// Everything the map owns once initialized.
pub struct SceneState {
    pub graph: SceneGraph,
    pub resources: ResourceStore,
    pub camera: PerspectiveCamera,
    pub camera_node: NodeId,
    pub controls: OrbitControls,
    pub renderers: RendererStack,
    pub light: NodeId,
    pub ground: NodeId,
    pub area_list: Option<NodeId>,
    pub markers: Option<MarkerSet>,
    /// Region body meshes tested on pointer move.
    pub hit_targets: Vec<NodeId>,
    /// Group z-position animations, keyed by group.
    pub tweens: Tweens<NodeId>,
    pub hover: HoverState,
}

impl FrameSteps for SceneState {
    type Error = RenderError;

    fn advance_tweens(&mut self, frame: Frame) {
        let graph = &self.graph;
        self.tweens.retain(|node| graph.contains(*node));
        for sample in self.tweens.advance(frame.dt_s) {
            if let Some(node) = self.graph.node_mut(sample.key) {
                node.transform.position.z = sample.value;
            }
        }
    }

    fn update_controls(&mut self, _frame: Frame) {
        if self.controls.update(&mut self.camera) {
            if let Some(node) = self.graph.node_mut(self.camera_node) {
                node.transform.position = self.camera.position;
            }
        }
    }

    fn render_scene(&mut self) -> Result<(), RenderError> {
        let view = RenderView {
            graph: &self.graph,
            resources: &self.resources,
            camera: &self.camera,
        };
        self.renderers.render_scene(&view)
    }

    fn render_overlays(&mut self) -> Result<(), RenderError> {
        let view = RenderView {
            graph: &self.graph,
            resources: &self.resources,
            camera: &self.camera,
        };
        self.renderers.render_overlays(&view)
    }
}
