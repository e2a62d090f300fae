use super::Vec3;

/// Scale used for every region map: one projected unit is 1/1000 of a Mercator radian.
pub const MAP_SCALE: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProjectionError {
    #[error("non-finite coordinate [{lng}, {lat}]")]
    NonFiniteInput { lng: f64, lat: f64 },
    #[error("coordinate [{lng}, {lat}] projects outside the finite plane")]
    NonFiniteOutput { lng: f64, lat: f64 },
}

/// Mercator projection centered on a fixed longitude/latitude, with zero translation.
///
/// Output convention: the two planar axes are swapped, so the projected northing lands
/// on scene `x` and the easting on scene `y`; scene `z` is always 0.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MercatorProjection {
    center: [f64; 2],
    scale: f64,
    center_raw: [f64; 2],
}

impl MercatorProjection {
    pub fn new(center_lng_lat: [f64; 2]) -> Self {
        Self::with_scale(center_lng_lat, MAP_SCALE)
    }

    pub fn with_scale(center_lng_lat: [f64; 2], scale: f64) -> Self {
        let center_raw = mercator_raw(center_lng_lat[0], center_lng_lat[1]);
        Self {
            center: center_lng_lat,
            scale,
            center_raw,
        }
    }

    pub fn center(&self) -> [f64; 2] {
        self.center
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Projects `[lng, lat]` (degrees) into scene coordinates.
    pub fn project(&self, lng_lat: [f64; 2]) -> Result<Vec3, ProjectionError> {
        let [lng, lat] = lng_lat;
        if !lng.is_finite() || !lat.is_finite() {
            return Err(ProjectionError::NonFiniteInput { lng, lat });
        }

        let [rx, ry] = mercator_raw(lng, lat);
        let x = self.scale * (rx - self.center_raw[0]);
        let y = -self.scale * (ry - self.center_raw[1]);
        if !x.is_finite() || !y.is_finite() {
            return Err(ProjectionError::NonFiniteOutput { lng, lat });
        }

        Ok(Vec3::new(y, x, 0.0))
    }

    /// Like [`project`](Self::project), but degrades to the origin and logs a warning.
    ///
    /// Callers must tolerate the degenerate `[0, 0, 0]` result for malformed input.
    pub fn project_or_origin(&self, lng_lat: [f64; 2]) -> Vec3 {
        match self.project(lng_lat) {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(%err, "projection failed; using origin");
                Vec3::ZERO
            }
        }
    }
}

/// Raw spherical Mercator in radians, longitude wrapped into `[-PI, PI]`.
fn mercator_raw(lng_deg: f64, lat_deg: f64) -> [f64; 2] {
    let mut lambda = lng_deg.to_radians();
    if lambda > std::f64::consts::PI {
        lambda -= std::f64::consts::TAU;
    } else if lambda < -std::f64::consts::PI {
        lambda += std::f64::consts::TAU;
    }
    let phi = lat_deg.to_radians();
    let y = (std::f64::consts::FRAC_PI_4 + phi / 2.0).tan().ln();
    [lambda, y]
}
