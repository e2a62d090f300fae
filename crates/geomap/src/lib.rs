//! Extruded GeoJSON region map.
//!
//! [`GeoMap`] owns the projected dataset and, once initialized, the [`SceneState`]. Hosts
//! feed it container sizes, pointer positions and frame timestamps; it never touches a
//! platform API itself.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod interaction;
pub mod markers;
pub mod regions;
pub mod state;

pub use config::*;
pub use error::*;
pub use interaction::{HoverChange, HoverState};
pub use markers::{MarkerReplacement, MarkerSet};
pub use regions::RegionReport;
pub use state::*;

use formats::{Feature, FeatureCollection, ProjectedCollection, Properties};
use foundation::time::Time;
use gpu::Viewport;
use runtime::{FrameScheduler, LoopHandle, RenderLoop, TickOutcome};
use scene::components::MarkerId;

use crate::markers::MarkerIds;

pub type ClickHandler = Box<dyn FnMut(&Properties)>;

pub struct GeoMapOptions {
    pub geojson: FeatureCollection,
    pub config: EngineConfig,
    /// Invoked synchronously with a marker's feature properties when it is clicked.
    pub on_click: ClickHandler,
}

enum Lifecycle {
    Created,
    Running {
        state: Box<SceneState>,
        render_loop: RenderLoop<Box<dyn FrameScheduler>>,
    },
    TornDown,
}

pub struct GeoMap {
    config: EngineConfig,
    projected: ProjectedCollection,
    on_click: ClickHandler,
    marker_ids: MarkerIds,
    lifecycle: Lifecycle,
}

impl GeoMap {
    /// Projects the dataset around its bbox center. The center is fixed from here on.
    ///
    /// Malformed features are kept; `init` applies the error policy to them.
    pub fn new(options: GeoMapOptions) -> Self {
        let invalid = options.geojson.invalid_count();
        if invalid > 0 {
            tracing::warn!(invalid, "dataset contains malformed features");
        }
        Self {
            config: options.config,
            projected: ProjectedCollection::build(&options.geojson),
            on_click: options.on_click,
            marker_ids: MarkerIds::default(),
            lifecycle: Lifecycle::Created,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn projected(&self) -> &ProjectedCollection {
        &self.projected
    }

    /// Bootstraps the scene, builds the region blocks and starts the render loop.
    pub fn init(
        &mut self,
        surface: Surface,
        renderers: Renderers,
        scheduler: Box<dyn FrameScheduler>,
    ) -> Result<RegionReport, EngineError> {
        match self.lifecycle {
            Lifecycle::Created => {}
            Lifecycle::Running { .. } => return Err(EngineError::AlreadyInitialized),
            Lifecycle::TornDown => return Err(EngineError::TornDown),
        }

        let mut state = bootstrap::bootstrap(&self.config, surface, renderers)?;
        let report = regions::build_regions(
            &mut state,
            &self.projected,
            &self.config.theme.area,
            self.config.error_policy,
        )?;

        let mut render_loop = RenderLoop::new(scheduler);
        render_loop.start()?;
        self.lifecycle = Lifecycle::Running {
            state: Box::new(state),
            render_loop,
        };
        tracing::info!(
            regions = report.built,
            center = ?self.projected.map_center(),
            "map initialized"
        );
        Ok(report)
    }

    /// Replaces the current markers with one per point feature.
    pub fn add_point_list(
        &mut self,
        icon_url: &str,
        points: &[Feature],
    ) -> Result<MarkerReplacement, EngineError> {
        let state = Self::running(&mut self.lifecycle)?;
        markers::replace_markers(
            state,
            &mut self.marker_ids,
            &self.projected.projection,
            &self.config.theme.point,
            self.config.error_policy,
            icon_url,
            points,
        )
    }

    pub fn on_pointer_move(&mut self, x_px: f64, y_px: f64) -> Result<HoverChange, EngineError> {
        let elevation = self.config.hover_elevation();
        let state = Self::running(&mut self.lifecycle)?;
        interaction::pointer_move(state, x_px, y_px, &self.config.hover, elevation)
    }

    /// Updates the camera aspect and resizes all three renderers.
    pub fn on_resize(&mut self, width: f64, height: f64) -> Result<(), EngineError> {
        let viewport = Viewport::new(width, height)?;
        let state = Self::running(&mut self.lifecycle)?;
        state.camera.aspect = viewport.aspect();
        state.camera.update_projection_matrix();
        state.renderers.set_size(viewport);
        Ok(())
    }

    pub fn rotate_camera(&mut self, delta_x_px: f64, delta_y_px: f64) -> Result<(), EngineError> {
        let state = Self::running(&mut self.lifecycle)?;
        let viewport = state.renderers.viewport();
        state.controls.rotate(delta_x_px, delta_y_px, viewport);
        Ok(())
    }

    pub fn pan_camera(&mut self, delta_x_px: f64, delta_y_px: f64) -> Result<(), EngineError> {
        let state = Self::running(&mut self.lifecycle)?;
        let viewport = state.renderers.viewport();
        state
            .controls
            .pan(delta_x_px, delta_y_px, &state.camera, viewport);
        Ok(())
    }

    pub fn zoom_camera(&mut self, wheel_delta_y: f64) -> Result<(), EngineError> {
        Self::running(&mut self.lifecycle)?.controls.zoom(wheel_delta_y);
        Ok(())
    }

    /// Forwards a marker click to the click handler, once, with the marker's properties.
    pub fn click_marker(&mut self, marker: MarkerId) -> Result<(), EngineError> {
        let state = Self::running(&mut self.lifecycle)?;
        let properties = state
            .markers
            .as_ref()
            .and_then(|set| set.properties(marker))
            .ok_or(EngineError::UnknownMarker(marker))?;
        (self.on_click)(properties);
        Ok(())
    }

    /// Runs one frame for the host timestamp `now`.
    pub fn frame(&mut self, now: Time) -> Result<TickOutcome, EngineError> {
        match &mut self.lifecycle {
            Lifecycle::Running { state, render_loop } => Ok(render_loop.tick(now, &mut **state)?),
            Lifecycle::Created => Err(EngineError::NotInitialized),
            Lifecycle::TornDown => Ok(TickOutcome::Stopped),
        }
    }

    /// Stop switch for the render loop; `None` before `init`.
    pub fn loop_handle(&self) -> Option<LoopHandle> {
        match &self.lifecycle {
            Lifecycle::Running { render_loop, .. } => Some(render_loop.handle()),
            _ => None,
        }
    }

    /// Stops the render loop. Later calls other than `frame` fail with `TornDown`.
    pub fn teardown(&mut self) {
        if let Lifecycle::Running { render_loop, .. } = &mut self.lifecycle {
            render_loop.stop();
        }
        self.lifecycle = Lifecycle::TornDown;
        tracing::debug!("map torn down");
    }

    pub fn state(&self) -> Option<&SceneState> {
        match &self.lifecycle {
            Lifecycle::Running { state, .. } => Some(&**state),
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool {
        match &self.lifecycle {
            Lifecycle::Running { render_loop, .. } => render_loop.is_running(),
            _ => false,
        }
    }

    fn running(lifecycle: &mut Lifecycle) -> Result<&mut SceneState, EngineError> {
        match lifecycle {
            Lifecycle::Running { state, .. } => Ok(&mut **state),
            Lifecycle::Created => Err(EngineError::NotInitialized),
            Lifecycle::TornDown => Err(EngineError::TornDown),
        }
    }
}
