use foundation::math::{MercatorProjection, ProjectionError, Vec3};

use crate::center::{collection_center, feature_center};
use crate::geojson::{Feature, FeatureCollection, GeoPoint, Geometry, Properties};

/// One polygon of a projected feature: outer ring first, then holes.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedPolygon {
    pub rings: Vec<Vec<Vec3>>,
}

impl ProjectedPolygon {
    pub fn outer(&self) -> Option<&[Vec3]> {
        self.rings.first().map(Vec::as_slice)
    }
}

/// A feature expressed in scene coordinates.
///
/// `properties` is an owned clone, so downstream mutation never reaches the source
/// dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedFeature {
    pub properties: Properties,
    pub center: Vec3,
    pub polygons: Vec<ProjectedPolygon>,
    /// Carried over from [`Feature::invalid`].
    pub invalid: Option<String>,
}

impl ProjectedFeature {
    pub fn name(&self) -> Option<String> {
        crate::geojson::property_text(&self.properties, "name")
    }

    /// Every ring of every polygon, in source order.
    pub fn rings(&self) -> impl Iterator<Item = &Vec<Vec3>> + '_ {
        self.polygons.iter().flat_map(|p| p.rings.iter())
    }
}

/// Map center used when a collection has no usable position at all.
pub const FALLBACK_CENTER: [f64; 2] = [0.0, 0.0];

/// A dataset projected around its own bbox center.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedCollection {
    pub projection: MercatorProjection,
    pub features: Vec<ProjectedFeature>,
}

impl ProjectedCollection {
    /// Computes the map center once and projects every feature around it.
    ///
    /// A collection without a single usable position is centered on
    /// [`FALLBACK_CENTER`].
    pub fn build(collection: &FeatureCollection) -> Self {
        let center = collection_center(collection).unwrap_or_else(|| {
            tracing::warn!(
                features = collection.features.len(),
                "dataset has no usable positions, centering on {FALLBACK_CENTER:?}"
            );
            FALLBACK_CENTER
        });
        let projection = MercatorProjection::new(center);
        let features = collection
            .features
            .iter()
            .map(|f| project_feature(&projection, f))
            .collect::<Vec<_>>();
        tracing::debug!(features = features.len(), ?center, "projected collection");
        Self {
            projection,
            features,
        }
    }

    pub fn map_center(&self) -> [f64; 2] {
        self.projection.center()
    }
}

/// Projects one feature. Malformed positions degrade to the origin with a warning.
pub fn project_feature(projection: &MercatorProjection, feature: &Feature) -> ProjectedFeature {
    let center_lng_lat = feature_center(feature).unwrap_or(projection.center());
    let polygons = feature
        .geometry
        .iter()
        .flat_map(Geometry::polygons)
        .map(|rings| ProjectedPolygon {
            rings: rings
                .iter()
                .map(|ring| project_ring(projection, ring))
                .collect(),
        })
        .collect();

    ProjectedFeature {
        properties: feature.properties.clone(),
        center: projection.project_or_origin(center_lng_lat),
        polygons,
        invalid: feature.invalid.clone(),
    }
}

/// Projects a point feature's anchor position.
pub fn project_anchor(
    projection: &MercatorProjection,
    feature: &Feature,
) -> Option<Result<Vec3, ProjectionError>> {
    let anchor = feature.geometry.as_ref()?.anchor_point()?;
    Some(projection.project(anchor.lng_lat()))
}

fn project_ring(projection: &MercatorProjection, ring: &[GeoPoint]) -> Vec<Vec3> {
    ring.iter()
        .map(|p| projection.project_or_origin(p.lng_lat()))
        .collect()
}
