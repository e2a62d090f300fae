use serde::{Deserialize, Serialize};

/// Visual constants for the map. Every field has a default, so a host can override any
/// subset from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Theme {
    pub ground: GroundStyle,
    pub area: AreaStyle,
    pub point: PointStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureStyle {
    pub source: String,
    pub repeat: [f64; 2],
    pub offset: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundStyle {
    pub width: f64,
    pub height: f64,
    pub color: String,
    pub opacity: f32,
    pub transparent: bool,
    pub texture: TextureStyle,
}

impl Default for GroundStyle {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 1000.0,
            color: "#ffffff".to_string(),
            opacity: 1.0,
            transparent: true,
            texture: TextureStyle {
                source: "assets/ground.png".to_string(),
                repeat: [1.0, 1.0],
                offset: [0.0, 0.0],
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaStyle {
    /// Extrusion depth; also the hover elevation.
    pub height: f64,
    pub cap_color: String,
    /// Caps show only through their texture.
    pub cap_opacity: f32,
    pub side_color: String,
    pub side_opacity: f32,
    pub line_color: String,
    pub line_opacity: f32,
    pub texture: TextureStyle,
    /// Label height above the top cap.
    pub label_offset: f64,
    /// Labels shrink with camera distance; this is their size at one pixel per unit.
    pub label_scale: f64,
    pub label_class: String,
}

impl Default for AreaStyle {
    fn default() -> Self {
        Self {
            height: 0.1,
            cap_color: "#ffffff".to_string(),
            cap_opacity: 0.0,
            side_color: "#1354B0".to_string(),
            side_opacity: 0.8,
            line_color: "#ffffff".to_string(),
            line_opacity: 1.0,
            texture: TextureStyle {
                source: "assets/area.png".to_string(),
                repeat: [0.001, 0.001],
                offset: [0.5, 0.5],
            },
            label_offset: 0.2,
            label_scale: 1.0,
            label_class: "area-name".to_string(),
        }
    }
}

impl Default for TextureStyle {
    fn default() -> Self {
        Self {
            source: String::new(),
            repeat: [1.0, 1.0],
            offset: [0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointStyle {
    /// Height of the marker anchor above the ground plane.
    pub z_offset: f64,
    pub scale: f64,
    pub layout_class: String,
    pub container_class: String,
    pub image_class: String,
    pub name_class: String,
}

impl Default for PointStyle {
    fn default() -> Self {
        Self {
            z_offset: 0.4,
            scale: 1.0,
            layout_class: "point-layout".to_string(),
            container_class: "point-container".to_string(),
            image_class: "point-image".to_string(),
            name_class: "point-name".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Theme;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_the_stock_map() {
        let theme = Theme::default();
        assert_eq!(theme.area.height, 0.1);
        assert_eq!(theme.area.side_color, "#1354B0");
        assert_eq!(theme.area.texture.repeat, [0.001, 0.001]);
        assert_eq!(theme.ground.width, 1000.0);
        assert_eq!(theme.point.z_offset, 0.4);
    }

    #[test]
    fn partial_json_overrides_keep_other_defaults() {
        let theme: Theme =
            serde_json::from_str(r##"{"area":{"side_color":"#ff0000"},"point":{"scale":2.0}}"##)
                .expect("theme");
        assert_eq!(theme.area.side_color, "#ff0000");
        assert_eq!(theme.area.height, 0.1);
        assert_eq!(theme.point.scale, 2.0);
        assert_eq!(theme.point.layout_class, "point-layout");
        assert_eq!(theme.ground, Theme::default().ground);
    }
}
