use std::cell::RefCell;
use std::rc::Rc;

use scene::components::OverlayLayer;
use scene::{ResourceStore, SceneGraph};

use crate::camera::{PerspectiveCamera, Viewport};
use crate::draw_list::DrawList;
use crate::error::RenderError;
use crate::overlay::collect_overlays;

/// What a renderer needs to draw one frame.
pub struct RenderView<'a> {
    pub graph: &'a SceneGraph,
    pub resources: &'a ResourceStore,
    pub camera: &'a PerspectiveCamera,
}

/// Which output a renderer produces.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RenderLayer {
    Scene,
    Overlay(OverlayLayer),
}

impl RenderLayer {
    pub fn z_index(self) -> i32 {
        match self {
            RenderLayer::Scene => 0,
            RenderLayer::Overlay(layer) => layer.z_index(),
        }
    }
}

pub trait Renderer {
    fn layer(&self) -> RenderLayer;

    fn set_size(&mut self, viewport: Viewport);

    fn set_pixel_ratio(&mut self, _ratio: f64) {}

    fn render(&mut self, view: &RenderView<'_>) -> Result<(), RenderError>;
}

/// The 3D renderer plus the two overlay renderers stacked above it.
pub struct RendererStack {
    scene: Box<dyn Renderer>,
    labels: Box<dyn Renderer>,
    sprites: Box<dyn Renderer>,
    viewport: Viewport,
    pixel_ratio: f64,
}

impl RendererStack {
    pub fn new(
        scene: Box<dyn Renderer>,
        labels: Box<dyn Renderer>,
        sprites: Box<dyn Renderer>,
        viewport: Viewport,
        pixel_ratio: f64,
    ) -> Self {
        let mut stack = Self {
            scene,
            labels,
            sprites,
            viewport,
            pixel_ratio,
        };
        stack.scene.set_pixel_ratio(pixel_ratio);
        stack.set_size(viewport);
        stack
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    pub fn set_pixel_ratio(&mut self, ratio: f64) {
        self.pixel_ratio = ratio;
        self.scene.set_pixel_ratio(ratio);
    }

    /// Resizes all three renderers together.
    pub fn set_size(&mut self, viewport: Viewport) {
        tracing::debug!(width = viewport.width, height = viewport.height, "resizing renderers");
        self.viewport = viewport;
        self.scene.set_size(viewport);
        self.labels.set_size(viewport);
        self.sprites.set_size(viewport);
    }

    pub fn render_scene(&mut self, view: &RenderView<'_>) -> Result<(), RenderError> {
        self.scene.render(view)
    }

    /// Labels first, then sprites; both are attempted even if the first fails.
    pub fn render_overlays(&mut self, view: &RenderView<'_>) -> Result<(), RenderError> {
        let labels = self.labels.render(view);
        let sprites = self.sprites.render(view);
        labels.and(sprites)
    }
}

/// What a [`HeadlessRenderer`] has been asked to do so far.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HeadlessLog {
    pub size: Option<Viewport>,
    pub resizes: usize,
    pub pixel_ratio: Option<f64>,
    pub frames: usize,
    pub last_item_count: usize,
}

/// Renderer without an output surface: it extracts the same draw and overlay lists a
/// real backend would and records counts. Used for native hosts and tests.
pub struct HeadlessRenderer {
    layer: RenderLayer,
    viewport: Option<Viewport>,
    log: Rc<RefCell<HeadlessLog>>,
}

impl HeadlessRenderer {
    pub fn new(layer: RenderLayer) -> (Self, Rc<RefCell<HeadlessLog>>) {
        let log = Rc::new(RefCell::new(HeadlessLog::default()));
        (
            Self {
                layer,
                viewport: None,
                log: Rc::clone(&log),
            },
            log,
        )
    }
}

impl Renderer for HeadlessRenderer {
    fn layer(&self) -> RenderLayer {
        self.layer
    }

    fn set_size(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
        let mut log = self.log.borrow_mut();
        log.size = Some(viewport);
        log.resizes += 1;
    }

    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.log.borrow_mut().pixel_ratio = Some(ratio);
    }

    fn render(&mut self, view: &RenderView<'_>) -> Result<(), RenderError> {
        let viewport = self
            .viewport
            .ok_or_else(|| RenderError::Surface("renderer has no size".into()))?;
        let count = match self.layer {
            RenderLayer::Scene => DrawList::collect(view.graph, view.resources).len(),
            RenderLayer::Overlay(layer) => collect_overlays(view.graph, view.camera, viewport, layer)?
                .iter()
                .filter(|item| item.visible)
                .count(),
        };
        let mut log = self.log.borrow_mut();
        log.frames += 1;
        log.last_item_count = count;
        Ok(())
    }
}
