use scene::{
    Color, Geometry, Material, MeshComponent, MeshGeometry, Node, NodeId, NodeKind, ResourceStore,
    SceneGraph, Texture,
};

use crate::error::MeshError;
use crate::theme::GroundStyle;

/// Adds the textured ground plane at the origin of `parent`.
pub fn build_ground(
    graph: &mut SceneGraph,
    resources: &mut ResourceStore,
    parent: NodeId,
    style: &GroundStyle,
) -> Result<NodeId, MeshError> {
    let color = Color::parse_hex(&style.color)?;
    if !graph.contains(parent) {
        return Err(scene::GraphError::UnknownNode(parent).into());
    }

    let mut texture = Texture::new(style.texture.source.clone());
    texture.repeat = style.texture.repeat;
    texture.offset = style.texture.offset;
    texture.srgb = true;

    let geometry = resources.add_geometry(Geometry::Mesh(MeshGeometry::plane(style.width, style.height)));
    let material = resources.add_material(
        Material::mesh_basic(color, style.opacity)
            .transparent(style.transparent)
            .with_map(texture),
    );
    let ground = graph.add_child(
        parent,
        Node::new(NodeKind::Mesh(MeshComponent {
            geometry,
            materials: vec![material],
        }))
        .named("ground"),
    )?;
    Ok(ground)
}
