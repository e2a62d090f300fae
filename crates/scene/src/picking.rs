use foundation::bounds::Aabb3;
use foundation::math::Vec3;
use foundation::math::precision::stable_total_cmp_f64;

use crate::entity::NodeId;
use crate::graph::{NodeKind, SceneGraph};
use crate::resources::ResourceStore;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PickError {
    #[error("ray direction must be finite and non-zero")]
    InvalidRay,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    /// Normalizes `dir`; fails on zero-length or non-finite input.
    pub fn new(origin: Vec3, dir: Vec3) -> Result<Self, PickError> {
        if !origin.is_finite() || !dir.is_finite() {
            return Err(PickError::InvalidRay);
        }
        let dir = dir.normalize().ok_or(PickError::InvalidRay)?;
        Ok(Self { origin, dir })
    }

    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.dir * t
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Intersection {
    /// The mesh node that was hit (not its tagged group).
    pub node: NodeId,
    pub distance: f64,
    pub point: Vec3,
}

/// Intersects `ray` with the meshes under each of `targets` (targets included).
///
/// Ordering contract:
/// - Closest hit first.
/// - Equal distances are broken by the lower `NodeId::index()`.
///
/// Notes:
/// - Only mesh nodes are hit-tested; lines and sprites are ignored.
/// - Triangles are tested double-sided.
/// - Stale targets and effectively invisible nodes are skipped.
pub fn intersect_objects(
    graph: &SceneGraph,
    resources: &ResourceStore,
    targets: &[NodeId],
    ray: Ray,
) -> Vec<Intersection> {
    let mut hits = Vec::new();
    for target in targets {
        if !graph.contains(*target) {
            tracing::debug!(node = ?target, "pick target no longer exists");
            continue;
        }
        for id in graph.descendants(*target) {
            if let Some(hit) = intersect_node(graph, resources, id, ray) {
                hits.push(hit);
            }
        }
    }

    hits.sort_by(|a, b| {
        stable_total_cmp_f64(a.distance, b.distance).then_with(|| a.node.index().cmp(&b.node.index()))
    });
    hits.dedup_by(|a, b| a.node == b.node);
    hits
}

fn intersect_node(
    graph: &SceneGraph,
    resources: &ResourceStore,
    id: NodeId,
    ray: Ray,
) -> Option<Intersection> {
    let node = graph.node(id)?;
    let NodeKind::Mesh(mesh) = &node.kind else {
        return None;
    };
    if !graph.is_effectively_visible(id) {
        return None;
    }
    let geometry = resources.geometry(mesh.geometry)?.as_mesh()?;
    let world = graph.world_transform(id)?;

    let bounds = Aabb3::from_points(geometry.positions.iter())?;
    // Scales may be negative, so re-derive min/max from the mapped corners.
    let corners = [
        world.apply(Vec3::from_array(bounds.min)),
        world.apply(Vec3::from_array(bounds.max)),
    ];
    let world_bounds = Aabb3::from_points(corners.iter())?;
    world_bounds.ray_hit_t(ray.origin, ray.dir, 0.0, f64::INFINITY)?;

    let mut best: Option<f64> = None;
    for [a, b, c] in geometry.triangles() {
        let Some(t) = ray_triangle_t(ray, world.apply(a), world.apply(b), world.apply(c)) else {
            continue;
        };
        if best.is_none_or(|bt| t < bt) {
            best = Some(t);
        }
    }

    let distance = best?;
    Some(Intersection {
        node: id,
        distance,
        point: ray.at(distance),
    })
}

/// Möller–Trumbore, double-sided. Returns the hit distance along the unit ray.
fn ray_triangle_t(ray: Ray, a: Vec3, b: Vec3, c: Vec3) -> Option<f64> {
    const EPS: f64 = 1e-12;
    let e1 = b - a;
    let e2 = c - a;
    let p = ray.dir.cross(e2);
    let det = e1.dot(p);
    if det.abs() < EPS {
        return None;
    }
    let inv = 1.0 / det;
    let s = ray.origin - a;
    let u = s.dot(p) * inv;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = ray.dir.dot(q) * inv;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(q) * inv;
    (t >= 0.0).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::{PickError, Ray, intersect_objects};
    use crate::graph::{MeshComponent, Node, NodeKind, SceneGraph};
    use crate::resources::{Color, Geometry, Material, MeshGeometry, ResourceStore};
    use foundation::math::Vec3;

    fn plane_node(resources: &mut ResourceStore, z: f64) -> Node {
        let geometry = resources.add_geometry(Geometry::Mesh(MeshGeometry::plane(2.0, 2.0)));
        let material = resources.add_material(Material::mesh_basic(Color::WHITE, 1.0));
        Node::new(NodeKind::Mesh(MeshComponent {
            geometry,
            materials: vec![material],
        }))
        .at(Vec3::new(0.0, 0.0, z))
    }

    fn down_ray() -> Ray {
        Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, -1.0)).expect("ray")
    }

    #[test]
    fn rejects_degenerate_rays() {
        assert_eq!(Ray::new(Vec3::ZERO, Vec3::ZERO), Err(PickError::InvalidRay));
        assert_eq!(
            Ray::new(Vec3::new(f64::NAN, 0.0, 0.0), Vec3::Z),
            Err(PickError::InvalidRay)
        );
    }

    #[test]
    fn closest_hit_first() {
        let mut graph = SceneGraph::new();
        let mut resources = ResourceStore::new();
        let root = graph.root();
        let low = graph.add_child(root, plane_node(&mut resources, 0.0)).expect("low");
        let high = graph.add_child(root, plane_node(&mut resources, 1.0)).expect("high");

        let hits = intersect_objects(&graph, &resources, &[low, high], down_ray());
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].node, high);
        assert!((hits[0].distance - 9.0).abs() < 1e-9);
        assert!((hits[1].point.z - 0.0).abs() < 1e-9);
    }

    #[test]
    fn misses_outside_and_skips_hidden_or_stale_targets() {
        let mut graph = SceneGraph::new();
        let mut resources = ResourceStore::new();
        let root = graph.root();
        let group = graph.add_child(root, Node::group()).expect("group");
        let mesh = graph.add_child(group, plane_node(&mut resources, 0.0)).expect("mesh");

        let off = Ray::new(Vec3::new(5.0, 5.0, 10.0), Vec3::new(0.0, 0.0, -1.0)).expect("ray");
        assert!(intersect_objects(&graph, &resources, &[group], off).is_empty());

        graph.node_mut(group).expect("group").visible = false;
        assert!(intersect_objects(&graph, &resources, &[group], down_ray()).is_empty());
        graph.node_mut(group).expect("group").visible = true;

        graph.remove_node(mesh).expect("remove");
        assert!(intersect_objects(&graph, &resources, &[group, mesh], down_ray()).is_empty());
    }

    #[test]
    fn hits_back_faces() {
        let mut graph = SceneGraph::new();
        let mut resources = ResourceStore::new();
        let root = graph.root();
        let plane = graph.add_child(root, plane_node(&mut resources, 0.0)).expect("plane");
        let up = Ray::new(Vec3::new(0.0, 0.0, -3.0), Vec3::Z).expect("ray");
        let hits = intersect_objects(&graph, &resources, &[plane], up);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].distance - 3.0).abs() < 1e-9);
    }
}
