use serde_json::{Map, Value};

/// Ordered GeoJSON property mapping (source order is preserved).
pub type Properties = Map<String, Value>;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoPoint {
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl GeoPoint {
    pub fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }

    pub fn lng_lat(self) -> [f64; 2] {
        [self.lon_deg, self.lat_deg]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(GeoPoint),
    MultiPoint(Vec<GeoPoint>),
    LineString(Vec<GeoPoint>),
    MultiLineString(Vec<Vec<GeoPoint>>),
    Polygon(Vec<Vec<GeoPoint>>),
    MultiPolygon(Vec<Vec<Vec<GeoPoint>>>),
}

impl Geometry {
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::LineString(_) => "LineString",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Visits every position in the geometry, in source order.
    pub fn for_each_point(&self, mut f: impl FnMut(GeoPoint)) {
        match self {
            Geometry::Point(p) => f(*p),
            Geometry::MultiPoint(ps) | Geometry::LineString(ps) => ps.iter().copied().for_each(f),
            Geometry::MultiLineString(rings) | Geometry::Polygon(rings) => {
                rings.iter().flatten().copied().for_each(f)
            }
            Geometry::MultiPolygon(polys) => polys.iter().flatten().flatten().copied().for_each(f),
        }
    }

    /// Polygon parts as `[outer, holes...]` ring lists; empty for non-areal geometry.
    pub fn polygons(&self) -> Vec<&[Vec<GeoPoint>]> {
        match self {
            Geometry::Polygon(rings) => vec![rings.as_slice()],
            Geometry::MultiPolygon(polys) => polys.iter().map(|p| p.as_slice()).collect(),
            _ => Vec::new(),
        }
    }

    /// Anchor position for point-like geometry: the point itself, or the first
    /// position of a MultiPoint.
    pub fn anchor_point(&self) -> Option<GeoPoint> {
        match self {
            Geometry::Point(p) => Some(*p),
            Geometry::MultiPoint(ps) => ps.first().copied(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<String>,
    pub properties: Properties,
    /// `None` for `"geometry": null` and for features that failed to parse.
    pub geometry: Option<Geometry>,
    /// Parse failure of this feature; the rest of the collection is unaffected.
    pub invalid: Option<String>,
}

impl Feature {
    fn malformed(properties: Properties, reason: String) -> Self {
        Self {
            id: None,
            properties,
            geometry: None,
            invalid: Some(reason),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.invalid.is_none()
    }

    /// Geometry type name, or `"null"` when there is none.
    pub fn geometry_type(&self) -> &'static str {
        self.geometry.as_ref().map_or("null", Geometry::type_name)
    }

    /// Display name from the `name` property; non-string names are rendered as JSON.
    pub fn name(&self) -> Option<String> {
        property_text(&self.properties, "name")
    }
}

pub fn property_text(properties: &Properties, key: &str) -> Option<String> {
    match properties.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeoJsonError {
    #[error("JSON parse error: {0}")]
    Json(String),
    #[error("expected GeoJSON FeatureCollection")]
    NotAFeatureCollection,
    #[error("expected an array of GeoJSON features")]
    NotAFeatureList,
}

impl FeatureCollection {
    pub fn from_geojson_str(payload: &str) -> Result<Self, GeoJsonError> {
        let value: Value =
            serde_json::from_str(payload).map_err(|e| GeoJsonError::Json(e.to_string()))?;
        Self::from_geojson_value(&value)
    }

    pub fn from_geojson_value(value: &Value) -> Result<Self, GeoJsonError> {
        let obj = value.as_object().ok_or(GeoJsonError::NotAFeatureCollection)?;
        // An untyped object with a `features` array is accepted as a collection.
        match obj.get("type") {
            None => {}
            Some(ty) if ty.as_str() == Some("FeatureCollection") => {}
            Some(_) => return Err(GeoJsonError::NotAFeatureCollection),
        }

        let features_val = obj
            .get("features")
            .and_then(|v| v.as_array())
            .ok_or(GeoJsonError::NotAFeatureCollection)?;

        Ok(Self {
            features: parse_features(features_val),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn invalid_count(&self) -> usize {
        self.features.iter().filter(|f| !f.is_valid()).count()
    }
}

/// Parses a bare JSON array of features (the marker list contract).
pub fn features_from_geojson_str(payload: &str) -> Result<Vec<Feature>, GeoJsonError> {
    let value: Value =
        serde_json::from_str(payload).map_err(|e| GeoJsonError::Json(e.to_string()))?;
    match &value {
        Value::Array(items) => Ok(parse_features(items)),
        Value::Object(_) => FeatureCollection::from_geojson_value(&value).map(|fc| fc.features),
        _ => Err(GeoJsonError::NotAFeatureList),
    }
}

/// Parses every feature independently. A malformed feature is kept, marked invalid, so
/// the caller decides whether it aborts anything.
fn parse_features(items: &[Value]) -> Vec<Feature> {
    items
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let feature = parse_feature(value);
            if let Some(reason) = &feature.invalid {
                tracing::debug!(index, %reason, "invalid feature");
            }
            feature
        })
        .collect()
}

fn parse_feature(value: &Value) -> Feature {
    let Some(feat_obj) = value.as_object() else {
        return Feature::malformed(Properties::new(), "feature must be an object".to_string());
    };

    let properties = feat_obj
        .get("properties")
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default();

    match feat_obj.get("type").and_then(|v| v.as_str()) {
        Some("Feature") => {}
        Some(other) => {
            return Feature::malformed(properties, format!("unexpected feature type: {other}"));
        }
        None => return Feature::malformed(properties, "feature missing type".to_string()),
    }

    let id = match feat_obj.get("id") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    let (geometry, invalid) = match feat_obj.get("geometry") {
        None => (None, Some("feature missing geometry".to_string())),
        Some(Value::Null) => (None, None),
        Some(value) => match parse_geometry(value) {
            Ok(geometry) => (Some(geometry), None),
            Err(reason) => (None, Some(reason)),
        },
    };

    Feature {
        id,
        properties,
        geometry,
        invalid,
    }
}

fn parse_geometry(value: &Value) -> Result<Geometry, String> {
    let obj = value
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("geometry missing type".to_string())?;

    if !matches!(
        ty,
        "Point" | "MultiPoint" | "LineString" | "MultiLineString" | "Polygon" | "MultiPolygon"
    ) {
        return Err(format!("unsupported geometry type: {ty}"));
    }
    let coords = obj
        .get("coordinates")
        .ok_or("geometry missing coordinates".to_string())?;

    match ty {
        "Point" => Ok(Geometry::Point(parse_point(coords)?)),
        "MultiPoint" => Ok(Geometry::MultiPoint(parse_points(coords)?)),
        "LineString" => Ok(Geometry::LineString(parse_points(coords)?)),
        "MultiLineString" => Ok(Geometry::MultiLineString(parse_rings(coords)?)),
        "Polygon" => Ok(Geometry::Polygon(parse_rings(coords)?)),
        "MultiPolygon" => Ok(Geometry::MultiPolygon(parse_multi_polygon(coords)?)),
        other => Err(format!("unsupported geometry type: {other}")),
    }
}

fn parse_point(coords: &Value) -> Result<GeoPoint, String> {
    let arr = coords
        .as_array()
        .ok_or("position must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("position must have [lon, lat]".to_string());
    }
    let lon = arr[0].as_f64().ok_or("lon must be a number".to_string())?;
    let lat = arr[1].as_f64().ok_or("lat must be a number".to_string())?;
    Ok(GeoPoint::new(lon, lat))
}

fn parse_points(coords: &Value) -> Result<Vec<GeoPoint>, String> {
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array".to_string())?;
    arr.iter().map(parse_point).collect()
}

fn parse_rings(coords: &Value) -> Result<Vec<Vec<GeoPoint>>, String> {
    let rings = coords
        .as_array()
        .ok_or("coordinates must be an array of rings".to_string())?;
    rings.iter().map(parse_points).collect()
}

fn parse_multi_polygon(coords: &Value) -> Result<Vec<Vec<Vec<GeoPoint>>>, String> {
    let polys = coords
        .as_array()
        .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
    polys.iter().map(parse_rings).collect()
}

#[cfg(test)]
mod tests {
    use super::{FeatureCollection, GeoJsonError, Geometry, features_from_geojson_str};
    use pretty_assertions::assert_eq;

    const TWO_REGIONS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "id": 11,
             "properties": {"name": "North", "adcode": 11, "level": "province"},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[2,0],[2,2],[0,2],[0,0]]]}},
            {"type": "Feature",
             "properties": {"name": "Islands"},
             "geometry": {"type": "MultiPolygon", "coordinates": [
                [[[3,0],[4,0],[4,1],[3,0]]],
                [[[5,0],[6,0],[6,1],[5,0]]]
             ]}}
        ]
    }"#;

    #[test]
    fn parses_polygons_and_multipolygons() {
        let fc = FeatureCollection::from_geojson_str(TWO_REGIONS).expect("parse");
        assert_eq!(fc.features.len(), 2);
        assert_eq!(fc.features[0].id.as_deref(), Some("11"));
        assert!(matches!(fc.features[0].geometry, Some(Geometry::Polygon(ref r)) if r.len() == 1));
        let islands = fc.features[1].geometry.as_ref().expect("geometry");
        assert_eq!(islands.polygons().len(), 2);
        assert_eq!(fc.features[1].name().as_deref(), Some("Islands"));
    }

    #[test]
    fn preserves_property_order() {
        let fc = FeatureCollection::from_geojson_str(TWO_REGIONS).expect("parse");
        let keys: Vec<&str> = fc.features[0].properties.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "adcode", "level"]);
    }

    #[test]
    fn rejects_non_collections() {
        let err = FeatureCollection::from_geojson_str(r#"{"type":"Feature"}"#).unwrap_err();
        assert_eq!(err, GeoJsonError::NotAFeatureCollection);
        let err = FeatureCollection::from_geojson_str(r#"{"type":"FeatureCollection"}"#).unwrap_err();
        assert_eq!(err, GeoJsonError::NotAFeatureCollection);
    }

    #[test]
    fn untyped_feature_list_is_a_collection() {
        let fc = FeatureCollection::from_geojson_str(r#"{"features":[]}"#).expect("parse");
        assert!(fc.is_empty());
    }

    #[test]
    fn malformed_features_are_kept_and_marked() {
        let payload = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"name":"Ok"},"geometry":{"type":"Point","coordinates":[1,2]}},
            {"type":"Feature","properties":{"name":"Short"},"geometry":{"type":"Point","coordinates":[1]}},
            {"type":"Feature","properties":{"name":"Text"},"geometry":{"type":"Polygon","coordinates":[[[0,0],[1,"x"],[1,1],[0,0]]]}},
            {"type":"Feature","properties":{},"geometry":{"type":"GeometryCollection","geometries":[]}},
            7
        ]}"#;
        let fc = FeatureCollection::from_geojson_str(payload).expect("parse");
        assert_eq!(fc.features.len(), 5);
        assert_eq!(fc.invalid_count(), 4);
        assert!(fc.features[0].is_valid());
        assert_eq!(fc.features[1].name().as_deref(), Some("Short"));
        assert_eq!(fc.features[1].geometry, None);
        assert_eq!(fc.features[2].invalid.as_deref(), Some("lat must be a number"));
        assert!(fc.features[3].invalid.as_deref().is_some_and(|r| r.contains("GeometryCollection")));
        assert_eq!(fc.features[4].invalid.as_deref(), Some("feature must be an object"));
    }

    #[test]
    fn null_geometry_is_valid_but_empty() {
        let payload = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"name":"Nowhere"},"geometry":null}
        ]}"#;
        let fc = FeatureCollection::from_geojson_str(payload).expect("parse");
        assert!(fc.features[0].is_valid());
        assert_eq!(fc.features[0].geometry, None);
        assert_eq!(fc.features[0].geometry_type(), "null");
    }

    #[test]
    fn broken_json_is_still_an_error() {
        let err = FeatureCollection::from_geojson_str(r#"{"type":"FeatureCollection","#).unwrap_err();
        assert!(matches!(err, GeoJsonError::Json(_)));
        assert_eq!(
            features_from_geojson_str("42").unwrap_err(),
            GeoJsonError::NotAFeatureList
        );
    }

    #[test]
    fn parses_marker_lists() {
        let payload = r#"[{"type":"Feature","properties":{"name":"Depot 1"},
            "geometry":{"type":"Point","coordinates":[120,30]}}]"#;
        let points = features_from_geojson_str(payload).expect("parse");
        assert_eq!(points.len(), 1);
        let anchor = points[0]
            .geometry
            .as_ref()
            .and_then(|g| g.anchor_point())
            .expect("anchor");
        assert_eq!(anchor.lng_lat(), [120.0, 30.0]);
    }
}
