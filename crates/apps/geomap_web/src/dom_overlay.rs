use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use gpu::{OverlayItem, RenderError, RenderLayer, RenderView, Renderer, Viewport, collect_overlays};
use layers::PointStyle;
use scene::NodeId;
use scene::components::{MarkerId, OverlayContent, OverlayLayer, OverlaySprite};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlElement, HtmlImageElement};

pub type MarkerClick = Rc<dyn Fn(MarkerId)>;

struct Entry {
    element: HtmlElement,
    _on_click: Option<Closure<dyn FnMut(web_sys::Event)>>,
}

fn dom_err(e: JsValue) -> RenderError {
    RenderError::Surface(format!("dom: {e:?}"))
}

/// One absolutely positioned DOM layer above the canvas. Elements are created when a
/// sprite first shows up and removed once its node leaves the scene.
pub struct DomOverlayRenderer {
    layer: OverlayLayer,
    document: Document,
    root: HtmlElement,
    style: PointStyle,
    on_marker_click: MarkerClick,
    viewport: Option<Viewport>,
    entries: HashMap<NodeId, Entry>,
}

impl DomOverlayRenderer {
    pub fn new(
        document: Document,
        container: &Element,
        layer: OverlayLayer,
        style: PointStyle,
        on_marker_click: MarkerClick,
    ) -> Result<Self, JsValue> {
        let root = document.create_element("div")?.dyn_into::<HtmlElement>()?;
        let css = root.style();
        css.set_property("position", "absolute")?;
        css.set_property("top", "0")?;
        css.set_property("left", "0")?;
        css.set_property("overflow", "hidden")?;
        css.set_property("pointer-events", "none")?;
        css.set_property("z-index", &layer.z_index().to_string())?;
        container.append_child(&root)?;

        Ok(Self {
            layer,
            document,
            root,
            style,
            on_marker_click,
            viewport: None,
            entries: HashMap::new(),
        })
    }

    fn create(&self, sprite: &OverlaySprite) -> Result<Entry, JsValue> {
        let element = self.document.create_element("div")?.dyn_into::<HtmlElement>()?;
        element.set_class_name(&sprite.class_name);
        let css = element.style();
        css.set_property("position", "absolute")?;
        css.set_property("top", "0")?;
        css.set_property("left", "0")?;

        match &sprite.content {
            OverlayContent::Text { text } => {
                element.set_text_content(Some(text));
                Ok(Entry {
                    element,
                    _on_click: None,
                })
            }
            OverlayContent::Marker {
                marker,
                icon_url,
                label,
            } => {
                let container = self.document.create_element("div")?.dyn_into::<HtmlElement>()?;
                container.set_class_name(&self.style.container_class);
                if sprite.interactive {
                    container.style().set_property("pointer-events", "auto")?;
                }

                let image = self
                    .document
                    .create_element("img")?
                    .dyn_into::<HtmlImageElement>()?;
                image.set_class_name(&self.style.image_class);
                image.set_src(icon_url);

                let name = self.document.create_element("section")?;
                name.set_class_name(&self.style.name_class);
                name.set_text_content(Some(label));

                container.append_child(&image)?;
                container.append_child(&name)?;
                element.append_child(&container)?;

                let marker = *marker;
                let on_marker_click = Rc::clone(&self.on_marker_click);
                let on_click = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
                    event.stop_propagation();
                    on_marker_click(marker);
                });
                container
                    .add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())?;

                Ok(Entry {
                    element,
                    _on_click: Some(on_click),
                })
            }
        }
    }

    fn place(element: &HtmlElement, item: &OverlayItem, stack: usize) -> Result<(), JsValue> {
        let css = element.style();
        if !item.visible {
            return css.set_property("display", "none");
        }
        css.set_property("display", "block")?;
        css.set_property(
            "transform",
            &format!(
                "translate({:.2}px, {:.2}px) translate(-50%, -50%) scale({:.4})",
                item.screen.x, item.screen.y, item.scale
            ),
        )?;
        css.set_property("z-index", &stack.to_string())
    }
}

impl Renderer for DomOverlayRenderer {
    fn layer(&self) -> RenderLayer {
        RenderLayer::Overlay(self.layer)
    }

    fn set_size(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
        let css = self.root.style();
        let sized = css
            .set_property("width", &format!("{}px", viewport.width))
            .and_then(|()| css.set_property("height", &format!("{}px", viewport.height)));
        if let Err(e) = sized {
            tracing::warn!(layer = ?self.layer, error = ?e, "failed to size overlay root");
        }
    }

    fn render(&mut self, view: &RenderView<'_>) -> Result<(), RenderError> {
        let viewport = self
            .viewport
            .ok_or_else(|| RenderError::Surface("overlay has no size".into()))?;
        let items = collect_overlays(view.graph, view.camera, viewport, self.layer)?;

        let mut seen = HashSet::with_capacity(items.len());
        for (stack, item) in items.iter().enumerate() {
            seen.insert(item.node);
            if !self.entries.contains_key(&item.node) {
                let entry = self.create(&item.sprite).map_err(dom_err)?;
                self.root.append_child(&entry.element).map_err(dom_err)?;
                self.entries.insert(item.node, entry);
            }
            if let Some(entry) = self.entries.get(&item.node) {
                Self::place(&entry.element, item, stack).map_err(dom_err)?;
            }
        }

        self.entries.retain(|node, entry| {
            let keep = seen.contains(node);
            if !keep {
                entry.element.remove();
            }
            keep
        });
        Ok(())
    }
}

impl Drop for DomOverlayRenderer {
    fn drop(&mut self) {
        self.root.remove();
    }
}
