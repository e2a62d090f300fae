use scene::components::Transform;
use scene::{GeometryId, MaterialId, NodeId, NodeKind, ResourceStore, SceneGraph};

#[derive(Debug, Clone, PartialEq)]
pub enum DrawItem {
    /// One geometry group of a mesh, drawn with one material.
    Triangles {
        node: NodeId,
        transform: Transform,
        geometry: GeometryId,
        start: u32,
        count: u32,
        material: MaterialId,
    },
    Lines {
        node: NodeId,
        transform: Transform,
        geometry: GeometryId,
        material: MaterialId,
    },
}

impl DrawItem {
    pub fn material(&self) -> MaterialId {
        match self {
            DrawItem::Triangles { material, .. } | DrawItem::Lines { material, .. } => *material,
        }
    }

    pub fn node(&self) -> NodeId {
        match self {
            DrawItem::Triangles { node, .. } | DrawItem::Lines { node, .. } => *node,
        }
    }
}

/// Everything visible under the scene root, opaque items first, then transparent ones in
/// scene order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DrawList {
    pub items: Vec<DrawItem>,
}

impl DrawList {
    pub fn collect(graph: &SceneGraph, resources: &ResourceStore) -> Self {
        let mut opaque = Vec::new();
        let mut transparent = Vec::new();

        for id in graph.descendants(graph.root()) {
            let Some(node) = graph.node(id) else { continue };
            if !graph.is_effectively_visible(id) {
                continue;
            }
            let Some(transform) = graph.world_transform(id) else {
                continue;
            };

            let mut push = |item: DrawItem| {
                let is_transparent = resources
                    .material(item.material())
                    .is_some_and(|m| m.transparent || m.opacity < 1.0);
                if is_transparent {
                    transparent.push(item);
                } else {
                    opaque.push(item);
                }
            };

            match &node.kind {
                NodeKind::Mesh(mesh) => {
                    let Some(geometry) = resources.geometry(mesh.geometry).and_then(|g| g.as_mesh())
                    else {
                        continue;
                    };
                    for group in &geometry.groups {
                        let Some(material) = mesh.materials.get(group.material_index as usize) else {
                            continue;
                        };
                        push(DrawItem::Triangles {
                            node: id,
                            transform,
                            geometry: mesh.geometry,
                            start: group.start,
                            count: group.count,
                            material: *material,
                        });
                    }
                }
                NodeKind::Line(line) => push(DrawItem::Lines {
                    node: id,
                    transform,
                    geometry: line.geometry,
                    material: line.material,
                }),
                _ => {}
            }
        }

        opaque.extend(transparent);
        Self { items: opaque }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
