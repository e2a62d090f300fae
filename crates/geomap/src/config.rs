use layers::Theme;
use serde::{Deserialize, Serialize};

/// How per-item failures (one bad feature, one bad marker) are handled.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Log with `tracing::warn!`, skip the item, keep building.
    #[default]
    LogAndContinue,
    /// Return the first failure to the caller.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_deg: f64,
    pub near: f64,
    pub far: f64,
    pub position: [f64; 3],
    pub up: [f64; 3],
    pub target: [f64; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_deg: 10.0,
            near: 1.0,
            far: 1e8,
            position: [100.0, 0.0, 100.0],
            up: [0.0, 0.0, 1.0],
            target: [0.0, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub color: u32,
    pub intensity: f64,
    pub distance: f64,
    pub position: [f64; 3],
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            color: 0xffffff,
            intensity: 1.0,
            distance: 0.0,
            position: [0.0, 0.0, 5.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoverConfig {
    pub duration_ms: f64,
    /// Elevation of the hovered region. `None` uses the extrusion height.
    pub elevation: Option<f64>,
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            duration_ms: 100.0,
            elevation: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub camera: CameraConfig,
    pub light: LightConfig,
    pub hover: HoverConfig,
    pub error_policy: ErrorPolicy,
    pub theme: Theme,
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn hover_elevation(&self) -> f64 {
        self.hover.elevation.unwrap_or(self.theme.area.height)
    }
}

#[cfg(test)]
mod tests {
    use super::{EngineConfig, ErrorPolicy};
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.error_policy, ErrorPolicy::LogAndContinue);
        assert_eq!(config.camera.fov_deg, 10.0);
        assert_eq!(config.hover.duration_ms, 100.0);
        assert_eq!(config.hover_elevation(), 0.1);
    }

    #[test]
    fn json_overrides() {
        let config = EngineConfig::from_json(
            r#"{"error_policy":"strict","hover":{"elevation":0.5},"camera":{"fov_deg":20}}"#,
        )
        .expect("config");
        assert_eq!(config.error_policy, ErrorPolicy::Strict);
        assert_eq!(config.hover_elevation(), 0.5);
        assert_eq!(config.camera.fov_deg, 20.0);
        assert_eq!(config.camera.near, 1.0);
        assert_eq!(EngineConfig::from_json("{}").expect("empty"), EngineConfig::default());
    }
}
