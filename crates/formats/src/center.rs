use crate::geojson::{Feature, FeatureCollection, GeoPoint};

/// Center of the bounding box of every position in the collection.
///
/// Non-finite positions are ignored. Returns `None` when no usable position exists.
pub fn collection_center(collection: &FeatureCollection) -> Option<[f64; 2]> {
    let mut bbox = LngLatBox::default();
    for geometry in collection.features.iter().filter_map(|f| f.geometry.as_ref()) {
        geometry.for_each_point(|p| bbox.extend(p));
    }
    bbox.center()
}

/// Center of the bounding box of one feature's positions.
pub fn feature_center(feature: &Feature) -> Option<[f64; 2]> {
    let mut bbox = LngLatBox::default();
    feature.geometry.as_ref()?.for_each_point(|p| bbox.extend(p));
    bbox.center()
}

#[derive(Debug, Copy, Clone, Default)]
struct LngLatBox {
    bounds: Option<[f64; 4]>,
}

impl LngLatBox {
    fn extend(&mut self, p: GeoPoint) {
        if !p.lon_deg.is_finite() || !p.lat_deg.is_finite() {
            return;
        }
        self.bounds = Some(match self.bounds {
            None => [p.lon_deg, p.lat_deg, p.lon_deg, p.lat_deg],
            Some([w, s, e, n]) => [
                w.min(p.lon_deg),
                s.min(p.lat_deg),
                e.max(p.lon_deg),
                n.max(p.lat_deg),
            ],
        });
    }

    fn center(&self) -> Option<[f64; 2]> {
        let [w, s, e, n] = self.bounds?;
        Some([(w + e) / 2.0, (s + n) / 2.0])
    }
}
