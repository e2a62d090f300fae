use formats::ProjectedFeature;
use foundation::math::Vec3;
use scene::components::{GroupKind, GroupTag, OverlayLayer, OverlaySprite};
use scene::{
    Color, Geometry, LineComponent, Material, MeshComponent, Node, NodeId, NodeKind, ResourceStore,
    SceneGraph, Texture, TextureFilter,
};

use crate::error::MeshError;
use crate::extrude::{ExtrudeError, extrude_polygons};
use crate::theme::AreaStyle;

/// Name of the container holding every region block.
pub const AREA_LIST_NAME: &str = "NAME_AREA_LIST";

/// Node ids of one built region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionBlock {
    pub group: NodeId,
    pub body: NodeId,
    pub bottom_outline: NodeId,
    pub top_outline: NodeId,
    pub label: NodeId,
    pub name: String,
}

/// Builds extruded region blocks from projected features.
pub struct RegionMeshFactory<'a> {
    style: &'a AreaStyle,
    cap: Color,
    side: Color,
    line: Color,
}

impl<'a> RegionMeshFactory<'a> {
    /// Fails if a style color does not parse.
    pub fn new(style: &'a AreaStyle) -> Result<Self, MeshError> {
        Ok(Self {
            style,
            cap: Color::parse_hex(&style.cap_color)?,
            side: Color::parse_hex(&style.side_color)?,
            line: Color::parse_hex(&style.line_color)?,
        })
    }

    pub fn area_texture(&self) -> Texture {
        let mut texture = Texture::new(self.style.texture.source.clone());
        texture.repeat = self.style.texture.repeat;
        texture.offset = self.style.texture.offset;
        texture.mag_filter = TextureFilter::Nearest;
        texture.min_filter = TextureFilter::LinearMipmapLinear;
        texture.srgb = true;
        texture
    }

    /// Builds one region block under `list` and registers its body in `hit_targets`.
    ///
    /// Geometry is computed before anything is inserted, so a failing feature leaves the
    /// graph and the resource store untouched.
    pub fn build(
        &self,
        graph: &mut SceneGraph,
        resources: &mut ResourceStore,
        list: NodeId,
        feature: &ProjectedFeature,
        hit_targets: &mut Vec<NodeId>,
    ) -> Result<RegionBlock, MeshError> {
        let name = feature.name().unwrap_or_default();
        if let Some(reason) = &feature.invalid {
            return Err(MeshError::Malformed {
                feature: name,
                reason: reason.clone(),
            });
        }
        if feature.polygons.is_empty() {
            return Err(MeshError::NoPolygons { feature: name });
        }

        let polygons: Vec<Vec<Vec<Vec3>>> =
            feature.polygons.iter().map(|p| p.rings.clone()).collect();
        let extrusion = extrude_polygons(&polygons, self.style.height).map_err(|err| match err {
            ExtrudeError::Degenerate { polygon, ring } => MeshError::DegenerateRing {
                feature: name.clone(),
                polygon,
                ring,
            },
            ExtrudeError::Triangulation(reason) => MeshError::Triangulation {
                feature: name.clone(),
                reason,
            },
            ExtrudeError::Empty => MeshError::NoPolygons {
                feature: name.clone(),
            },
        })?;

        if !graph.contains(list) {
            return Err(scene::GraphError::UnknownNode(list).into());
        }

        let group = graph.add_child(
            list,
            Node::group()
                .named(name.clone())
                .tagged(GroupTag::new(GroupKind::RegionBlock, name.clone())),
        )?;

        let body_geometry = resources.add_geometry(Geometry::Mesh(extrusion.body));
        let caps = resources.add_material(
            Material::mesh_basic(self.cap, self.style.cap_opacity)
                .transparent(true)
                .with_map(self.area_texture()),
        );
        let sides = resources.add_material(
            Material::mesh_basic(self.side, self.style.side_opacity).transparent(true),
        );
        let body = graph.add_child(
            group,
            Node::new(NodeKind::Mesh(MeshComponent {
                geometry: body_geometry,
                materials: vec![caps, sides],
            }))
            .named("body"),
        )?;

        // Top and bottom rims share geometry and material; only the transform differs.
        let outline_geometry = resources.add_geometry(Geometry::Lines(extrusion.outline));
        let outline_material =
            resources.add_material(Material::line_basic(self.line, self.style.line_opacity));
        let outline = LineComponent {
            geometry: outline_geometry,
            material: outline_material,
        };
        let bottom_outline = graph.add_child(
            group,
            Node::new(NodeKind::Line(outline.clone())).named("outline-bottom"),
        )?;
        let top_outline = graph.add_child(
            group,
            Node::new(NodeKind::Line(outline))
                .named("outline-top")
                .at(Vec3::new(0.0, 0.0, self.style.height)),
        )?;

        let mut label = Node::new(NodeKind::Sprite(OverlaySprite::text(
            OverlayLayer::Sprites,
            self.style.label_class.clone(),
            name.clone(),
        )))
        .named("label")
        .at(Vec3::new(
            feature.center.x,
            feature.center.y,
            self.style.height + self.style.label_offset,
        ));
        label.transform.scale = Vec3::ONE * self.style.label_scale;
        let label = graph.add_child(group, label)?;

        if !hit_targets.contains(&body) {
            hit_targets.push(body);
        }

        Ok(RegionBlock {
            group,
            body,
            bottom_outline,
            top_outline,
            label,
            name,
        })
    }
}
