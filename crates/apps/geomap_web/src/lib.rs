use std::cell::{Cell, RefCell};
use std::fmt::Display;
use std::rc::{Rc, Weak};

use foundation::time::Time;
use formats::{FeatureCollection, Properties, features_from_geojson_str};
use geomap::{ClickHandler, EngineConfig, GeoMap, GeoMapOptions, Renderers, Surface};
use scene::components::{MarkerId, OverlayLayer};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::{Document, EventTarget, HtmlCanvasElement, HtmlElement, Window};

mod dom_overlay;
mod logging;
mod scheduler;
mod wgpu;

use dom_overlay::{DomOverlayRenderer, MarkerClick};
use scheduler::RafScheduler;
use wgpu::{WgpuRenderer, init_wgpu};

fn js_err(e: impl Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

#[wasm_bindgen(start)]
pub fn start() {
    logging::init();
}

/// A DOM listener that unregisters itself when dropped.
struct Listener {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(web_sys::Event)>,
}

impl Listener {
    fn attach(
        target: &EventTarget,
        event: &'static str,
        handler: impl FnMut(web_sys::Event) + 'static,
    ) -> Result<Self, JsValue> {
        let callback = Closure::<dyn FnMut(web_sys::Event)>::new(handler);
        target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
        Ok(Self {
            target: target.clone(),
            event,
            callback,
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Err(e) = self
            .target
            .remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref())
        {
            tracing::warn!(event = self.event, error = ?e, "failed to remove listener");
        }
    }
}

#[derive(Debug, Copy, Clone)]
struct Drag {
    x: f64,
    y: f64,
    pan: bool,
}

struct ViewInner {
    window: Window,
    document: Document,
    container: HtmlElement,
    map: RefCell<GeoMap>,
    canvas: RefCell<Option<HtmlCanvasElement>>,
    listeners: RefCell<Vec<Listener>>,
    drag: Cell<Option<Drag>>,
}

impl ViewInner {
    fn container_size(&self) -> (f64, f64) {
        (
            f64::from(self.container.client_width()),
            f64::from(self.container.client_height()),
        )
    }

    fn local_position(&self, event: &web_sys::MouseEvent) -> (f64, f64) {
        let rect = self.container.get_bounding_client_rect();
        (
            f64::from(event.client_x()) - rect.left(),
            f64::from(event.client_y()) - rect.top(),
        )
    }

    /// Runs `f` against the map unless it is already borrowed further up the stack, which
    /// happens when a click callback calls back into the view.
    fn with_map<R>(&self, what: &str, f: impl FnOnce(&mut GeoMap) -> R) -> Option<R> {
        match self.map.try_borrow_mut() {
            Ok(mut map) => Some(f(&mut map)),
            Err(_) => {
                tracing::warn!("{what} ignored: map is busy");
                None
            }
        }
    }

    fn on_frame(&self, timestamp_ms: f64) {
        if let Some(Err(err)) = self.with_map("frame", |map| map.frame(Time::from_millis(timestamp_ms))) {
            tracing::warn!(error = %err, "frame failed");
        }
    }

    fn on_marker_click(&self, marker: MarkerId) {
        if let Some(Err(err)) = self.with_map("marker click", |map| map.click_marker(marker)) {
            tracing::warn!(error = %err, ?marker, "marker click dropped");
        }
    }

    fn on_event(&self, event: &web_sys::Event) {
        let kind = event.type_();
        let result = match kind.as_str() {
            "mousemove" => event.dyn_ref::<web_sys::MouseEvent>().and_then(|e| {
                let (x, y) = self.local_position(e);
                self.with_map("pointer move", |map| map.on_pointer_move(x, y).map(|_| ()))
            }),
            "resize" => {
                let (width, height) = self.container_size();
                self.with_map("resize", |map| map.on_resize(width, height))
            }
            "pointerdown" => {
                if let Some(e) = event.dyn_ref::<web_sys::MouseEvent>() {
                    self.drag.set(Some(Drag {
                        x: f64::from(e.client_x()),
                        y: f64::from(e.client_y()),
                        pan: e.button() == 2 || e.shift_key(),
                    }));
                }
                None
            }
            "pointermove" => {
                let (Some(e), Some(drag)) = (event.dyn_ref::<web_sys::MouseEvent>(), self.drag.get())
                else {
                    return;
                };
                let (x, y) = (f64::from(e.client_x()), f64::from(e.client_y()));
                self.drag.set(Some(Drag { x, y, ..drag }));
                let (dx, dy) = (x - drag.x, y - drag.y);
                self.with_map("drag", |map| {
                    if drag.pan {
                        map.pan_camera(dx, dy)
                    } else {
                        map.rotate_camera(dx, dy)
                    }
                })
            }
            "pointerup" | "pointerleave" => {
                self.drag.set(None);
                None
            }
            "wheel" => {
                event.prevent_default();
                event
                    .dyn_ref::<web_sys::WheelEvent>()
                    .and_then(|e| self.with_map("zoom", |map| map.zoom_camera(e.delta_y())))
            }
            "contextmenu" => {
                event.prevent_default();
                None
            }
            _ => None,
        };
        if let Some(Err(err)) = result {
            tracing::warn!(event = %kind, error = %err, "event handling failed");
        }
    }

    fn attach_listeners(self: &Rc<Self>) -> Result<(), JsValue> {
        let container: &EventTarget = self.container.as_ref();
        let window: &EventTarget = self.window.as_ref();
        let mut listeners = Vec::new();
        for (target, event) in [
            (container, "mousemove"),
            (container, "pointerdown"),
            (container, "pointermove"),
            (container, "pointerup"),
            (container, "pointerleave"),
            (container, "wheel"),
            (container, "contextmenu"),
            (window, "resize"),
        ] {
            let weak = Rc::downgrade(self);
            listeners.push(Listener::attach(target, event, move |e: web_sys::Event| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_event(&e);
                }
            })?);
        }
        *self.listeners.borrow_mut() = listeners;
        Ok(())
    }

    fn create_canvas(&self, width: f64, height: f64) -> Result<HtmlCanvasElement, JsValue> {
        let canvas = self
            .document
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()?;
        let css = canvas.style();
        css.set_property("position", "absolute")?;
        css.set_property("top", "0")?;
        css.set_property("left", "0")?;
        css.set_property("z-index", "0")?;
        canvas.set_width(width.max(1.0) as u32);
        canvas.set_height(height.max(1.0) as u32);
        self.container.append_child(&canvas)?;
        Ok(canvas)
    }

    async fn init(self: Rc<Self>) -> Result<u32, JsValue> {
        if self.container.style().get_property_value("position")?.is_empty() {
            self.container.style().set_property("position", "relative")?;
        }
        let (width, height) = self.container_size();
        let pixel_ratio = self.window.device_pixel_ratio();

        let canvas = self.create_canvas(width * pixel_ratio, height * pixel_ratio)?;
        *self.canvas.borrow_mut() = Some(canvas.clone());
        let scene = WgpuRenderer::new(init_wgpu(canvas).await?);

        let weak: Weak<Self> = Rc::downgrade(&self);
        let on_marker_click: MarkerClick = Rc::new(move |marker| {
            if let Some(inner) = weak.upgrade() {
                inner.on_marker_click(marker);
            }
        });
        let point_style = self.map.borrow().config().theme.point.clone();
        let labels = DomOverlayRenderer::new(
            self.document.clone(),
            &self.container,
            OverlayLayer::Labels,
            point_style.clone(),
            Rc::clone(&on_marker_click),
        )?;
        let sprites = DomOverlayRenderer::new(
            self.document.clone(),
            &self.container,
            OverlayLayer::Sprites,
            point_style,
            on_marker_click,
        )?;

        let weak = Rc::downgrade(&self);
        let scheduler = RafScheduler::new(self.window.clone(), move |timestamp_ms| {
            if let Some(inner) = weak.upgrade() {
                inner.on_frame(timestamp_ms);
            }
        });

        let report = self
            .map
            .borrow_mut()
            .init(
                Surface {
                    width,
                    height,
                    pixel_ratio,
                },
                Renderers {
                    scene: Box::new(scene),
                    labels: Box::new(labels),
                    sprites: Box::new(sprites),
                },
                Box::new(scheduler),
            )
            .map_err(js_err)?;

        self.attach_listeners()?;
        Ok(report.built as u32)
    }

    fn stop(&self) {
        self.listeners.borrow_mut().clear();
        self.drag.set(None);
        self.with_map("stop", GeoMap::teardown);
        if let Some(canvas) = self.canvas.borrow_mut().take() {
            canvas.remove();
        }
    }
}

/// Browser entry point: an extruded region map mounted into one container element.
#[wasm_bindgen]
pub struct GeoMapView {
    inner: Rc<ViewInner>,
}

#[wasm_bindgen]
impl GeoMapView {
    /// `on_click` receives a marker's feature properties as a plain object.
    /// `config_json` overrides [`EngineConfig`] fields; omitted fields keep their defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(
        container_id: &str,
        geojson: &str,
        on_click: js_sys::Function,
        config_json: Option<String>,
    ) -> Result<GeoMapView, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("window missing"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("document missing"))?;
        let container = document
            .get_element_by_id(container_id)
            .ok_or_else(|| JsValue::from_str(&format!("container #{container_id} missing")))?
            .dyn_into::<HtmlElement>()?;

        let config = match config_json.as_deref() {
            Some(json) => EngineConfig::from_json(json).map_err(js_err)?,
            None => EngineConfig::default(),
        };
        let on_click: ClickHandler = Box::new(move |properties: &Properties| {
            let payload = serde_json::to_string(properties)
                .ok()
                .and_then(|text| js_sys::JSON::parse(&text).ok())
                .unwrap_or(JsValue::NULL);
            if let Err(e) = on_click.call1(&JsValue::NULL, &payload) {
                tracing::warn!(error = ?e, "click callback threw");
            }
        });

        let map = GeoMap::new(GeoMapOptions {
            geojson: FeatureCollection::from_geojson_str(geojson).map_err(js_err)?,
            config,
            on_click,
        });

        Ok(Self {
            inner: Rc::new(ViewInner {
                window,
                document,
                container,
                map: RefCell::new(map),
                canvas: RefCell::new(None),
                listeners: RefCell::new(Vec::new()),
                drag: Cell::new(None),
            }),
        })
    }

    /// Creates the renderers, builds the regions and starts the render loop. Resolves
    /// with the number of regions built.
    pub fn init(&self) -> js_sys::Promise {
        let inner = Rc::clone(&self.inner);
        future_to_promise(async move { inner.init().await.map(JsValue::from) })
    }

    /// Replaces all point markers. `points_json` is a feature array or collection of
    /// `Point` features. Returns the number of markers placed.
    #[wasm_bindgen(js_name = addPointList)]
    pub fn add_point_list(&self, icon_url: &str, points_json: &str) -> Result<u32, JsValue> {
        let points = features_from_geojson_str(points_json).map_err(js_err)?;
        let report = self
            .inner
            .with_map("add point list", |map| map.add_point_list(icon_url, &points))
            .ok_or_else(|| JsValue::from_str("map is busy"))?
            .map_err(js_err)?;
        Ok(report.added as u32)
    }

    /// Stops the render loop and detaches everything the view added to the page.
    pub fn stop(&self) {
        self.inner.stop();
    }
}
