/// Identifies a clickable point marker across the engine/host boundary.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub u64);

/// DOM overlay layer a sprite is rendered into; z-index ascends with the layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OverlayLayer {
    /// Screen-aligned simple labels (z-index 1).
    Labels,
    /// HTML-backed sprites scaled with camera distance (z-index 2).
    Sprites,
}

impl OverlayLayer {
    pub fn z_index(self) -> i32 {
        match self {
            OverlayLayer::Labels => 1,
            OverlayLayer::Sprites => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayContent {
    Text {
        text: String,
    },
    Marker {
        marker: MarkerId,
        icon_url: String,
        label: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySprite {
    pub layer: OverlayLayer,
    pub class_name: String,
    /// Whether the element receives pointer events. Labels never do.
    pub interactive: bool,
    pub content: OverlayContent,
}

impl OverlaySprite {
    pub fn text(layer: OverlayLayer, class_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            layer,
            class_name: class_name.into(),
            interactive: false,
            content: OverlayContent::Text { text: text.into() },
        }
    }

    pub fn marker(
        layer: OverlayLayer,
        class_name: impl Into<String>,
        marker: MarkerId,
        icon_url: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            layer,
            class_name: class_name.into(),
            interactive: true,
            content: OverlayContent::Marker {
                marker,
                icon_url: icon_url.into(),
                label: label.into(),
            },
        }
    }

    pub fn marker_id(&self) -> Option<MarkerId> {
        match &self.content {
            OverlayContent::Marker { marker, .. } => Some(*marker),
            OverlayContent::Text { .. } => None,
        }
    }
}
