//! Subtree disposal.
//!
//! Walks a subtree with an explicit stack in post-order: a node's resources are released,
//! then once all of its children have been visited they are detached and dropped from the
//! graph. The root of the walk stays in the graph; its caller decides whether to detach it.

use std::collections::HashSet;

use crate::entity::NodeId;
use crate::graph::{NodeKind, SceneGraph};
use crate::resources::{GeometryId, MaterialId, ResourceError, ResourceStore};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DisposeError {
    #[error("dispose root {0:?} does not exist")]
    UnknownNode(NodeId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedStep {
    pub node: NodeId,
    pub error: ResourceError,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DisposeReport {
    pub nodes_visited: usize,
    pub nodes_removed: usize,
    pub geometries_released: usize,
    pub materials_released: usize,
    pub skipped: Vec<SkippedStep>,
}

impl DisposeReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

#[derive(Default)]
struct Releaser {
    geometries: HashSet<GeometryId>,
    materials: HashSet<MaterialId>,
}

impl Releaser {
    fn geometry(
        &mut self,
        resources: &mut ResourceStore,
        node: NodeId,
        id: GeometryId,
        report: &mut DisposeReport,
    ) {
        // Shared between nodes of the same subtree: released once.
        if !self.geometries.insert(id) {
            return;
        }
        match resources.release_geometry(id) {
            Ok(_) => report.geometries_released += 1,
            Err(error) => {
                tracing::warn!(?node, %error, "skipping geometry release");
                report.skipped.push(SkippedStep { node, error });
            }
        }
    }

    fn material(
        &mut self,
        resources: &mut ResourceStore,
        node: NodeId,
        id: MaterialId,
        report: &mut DisposeReport,
    ) {
        if !self.materials.insert(id) {
            return;
        }
        match resources.release_material(id) {
            Ok(_) => report.materials_released += 1,
            Err(error) => {
                tracing::warn!(?node, %error, "skipping material release");
                report.skipped.push(SkippedStep { node, error });
            }
        }
    }
}

/// Releases every geometry and material under `root` and removes its descendants.
///
/// Failed release steps are recorded in the report and never retried.
pub fn dispose_subtree(
    graph: &mut SceneGraph,
    resources: &mut ResourceStore,
    root: NodeId,
) -> Result<DisposeReport, DisposeError> {
    if !graph.contains(root) {
        return Err(DisposeError::UnknownNode(root));
    }

    let mut report = DisposeReport::default();
    let mut releaser = Releaser::default();
    // (node, children_expanded)
    let mut stack = vec![(root, false)];

    while let Some((id, expanded)) = stack.pop() {
        if !expanded {
            stack.push((id, true));
            for child in graph.children(id).iter().rev() {
                stack.push((*child, false));
            }
            continue;
        }

        report.nodes_visited += 1;
        let kind = graph.node(id).map(|n| n.kind.clone());
        match kind {
            Some(NodeKind::Mesh(mesh)) => {
                releaser.geometry(resources, id, mesh.geometry, &mut report);
                for material in mesh.materials {
                    releaser.material(resources, id, material, &mut report);
                }
            }
            Some(NodeKind::Line(line)) => {
                releaser.geometry(resources, id, line.geometry, &mut report);
                releaser.material(resources, id, line.material, &mut report);
            }
            _ => {}
        }

        let children = graph.children(id).to_vec();
        for child in children {
            if graph.remove_node(child).is_ok() {
                report.nodes_removed += 1;
            }
        }
    }

    tracing::debug!(
        visited = report.nodes_visited,
        removed = report.nodes_removed,
        geometries = report.geometries_released,
        materials = report.materials_released,
        skipped = report.skipped.len(),
        "disposed subtree"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::{DisposeError, dispose_subtree};
    use crate::graph::{LineComponent, MeshComponent, Node, NodeKind, SceneGraph};
    use crate::resources::{
        Color, Geometry, LineGeometry, Material, MeshGeometry, ResourceError, ResourceStore,
    };
    use pretty_assertions::assert_eq;

    fn build_block(graph: &mut SceneGraph, resources: &mut ResourceStore) -> crate::NodeId {
        let root = graph.root();
        let list = graph.add_child(root, Node::group().named("list")).expect("list");
        let block = graph.add_child(list, Node::group()).expect("block");

        let body = resources.add_geometry(Geometry::Mesh(MeshGeometry::plane(1.0, 1.0)));
        let caps = resources.add_material(Material::mesh_basic(Color::WHITE, 0.0));
        let sides = resources.add_material(Material::mesh_basic(Color::WHITE, 0.8));
        graph
            .add_child(
                block,
                Node::new(NodeKind::Mesh(MeshComponent {
                    geometry: body,
                    materials: vec![caps, sides],
                })),
            )
            .expect("mesh");

        // Top and bottom outlines share one geometry and one material.
        let outline = resources.add_geometry(Geometry::Lines(LineGeometry::default()));
        let line_mat = resources.add_material(Material::line_basic(Color::WHITE, 1.0));
        for _ in 0..2 {
            graph
                .add_child(
                    block,
                    Node::new(NodeKind::Line(LineComponent {
                        geometry: outline,
                        material: line_mat,
                    })),
                )
                .expect("line");
        }
        list
    }

    #[test]
    fn releases_everything_once_and_empties_the_subtree() {
        let mut graph = SceneGraph::new();
        let mut resources = ResourceStore::new();
        let list = build_block(&mut graph, &mut resources);

        let report = dispose_subtree(&mut graph, &mut resources, list).expect("dispose");
        assert_eq!(report.nodes_visited, 5);
        assert_eq!(report.nodes_removed, 4);
        assert_eq!(report.geometries_released, 2);
        assert_eq!(report.materials_released, 3);
        assert!(report.is_clean());
        assert_eq!(resources.live_geometries(), 0);
        assert_eq!(resources.live_materials(), 0);
        assert!(graph.children(list).is_empty());
        assert!(graph.contains(list));
    }

    #[test]
    fn already_released_resources_are_skipped_not_fatal() {
        let mut graph = SceneGraph::new();
        let mut resources = ResourceStore::new();
        let list = build_block(&mut graph, &mut resources);

        let block = graph.children(list)[0];
        let mesh = graph.children(block)[0];
        let NodeKind::Mesh(component) = graph.node(mesh).expect("mesh").kind.clone() else {
            panic!("expected mesh");
        };
        resources.release_geometry(component.geometry).expect("pre-release");

        let report = dispose_subtree(&mut graph, &mut resources, list).expect("dispose");
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(
            report.skipped[0].error,
            ResourceError::GeometryReleased(component.geometry)
        );
        assert_eq!(report.materials_released, 3);
        assert_eq!(resources.live_geometries(), 0);
    }

    #[test]
    fn deep_chains_do_not_recurse() {
        let mut graph = SceneGraph::new();
        let mut resources = ResourceStore::new();
        let root = graph.root();
        let top = graph.add_child(root, Node::group()).expect("top");
        let mut cursor = top;
        for _ in 0..50_000 {
            cursor = graph.add_child(cursor, Node::group()).expect("child");
        }
        let report = dispose_subtree(&mut graph, &mut resources, top).expect("dispose");
        assert_eq!(report.nodes_removed, 50_000);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn stale_root_is_an_error() {
        let mut graph = SceneGraph::new();
        let mut resources = ResourceStore::new();
        let root = graph.root();
        let gone = graph.add_child(root, Node::group()).expect("gone");
        graph.remove_node(gone).expect("remove");
        assert_eq!(
            dispose_subtree(&mut graph, &mut resources, gone),
            Err(DisposeError::UnknownNode(gone))
        );
    }
}
