//! GPU-side resources addressed by handle.
//!
//! Geometry and material buffers live here rather than inside scene nodes, so their
//! release is explicit and countable. A handle stays dead once released.

use foundation::arena::Arena;
use foundation::bounds::Aabb3;
use foundation::handles::Handle;
use foundation::math::{Vec2, Vec3};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct GeometryId(pub Handle);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MaterialId(pub Handle);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResourceError {
    #[error("geometry {0:?} was already released")]
    GeometryReleased(GeometryId),
    #[error("material {0:?} was already released")]
    MaterialReleased(MaterialId),
    #[error("invalid color {0:?}")]
    InvalidColor(String),
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    pub fn from_hex_u32(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
        }
    }

    /// Parses CSS hex colors: `#rgb` or `#rrggbb`.
    pub fn parse_hex(css: &str) -> Result<Self, ResourceError> {
        let invalid = || ResourceError::InvalidColor(css.to_string());
        let digits = css.strip_prefix('#').ok_or_else(invalid)?;
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return Err(invalid()),
        };
        let hex = u32::from_str_radix(&expanded, 16).map_err(|_| invalid())?;
        Ok(Self::from_hex_u32(hex))
    }

    pub fn with_alpha(self, a: f32) -> [f32; 4] {
        [self.r, self.g, self.b, a]
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    Linear,
    LinearMipmapLinear,
}

/// Texture binding. Image decoding is the host's concern; only the source
/// reference and sampling parameters live in the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub source: String,
    pub repeat: [f64; 2],
    pub offset: [f64; 2],
    pub mag_filter: TextureFilter,
    pub min_filter: TextureFilter,
    pub srgb: bool,
}

impl Texture {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            repeat: [1.0, 1.0],
            offset: [0.0, 0.0],
            mag_filter: TextureFilter::Linear,
            min_filter: TextureFilter::LinearMipmapLinear,
            srgb: true,
        }
    }

    /// Texture-space coordinate of a geometry UV after repeat/offset.
    pub fn transform_uv(&self, uv: Vec2) -> Vec2 {
        Vec2::new(
            uv.x * self.repeat[0] + self.offset[0],
            uv.y * self.repeat[1] + self.offset[1],
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MaterialKind {
    MeshBasic,
    LineBasic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub kind: MaterialKind,
    pub color: Color,
    pub opacity: f32,
    pub transparent: bool,
    pub map: Option<Texture>,
}

impl Material {
    pub fn mesh_basic(color: Color, opacity: f32) -> Self {
        Self {
            kind: MaterialKind::MeshBasic,
            color,
            opacity,
            transparent: false,
            map: None,
        }
    }

    pub fn line_basic(color: Color, opacity: f32) -> Self {
        Self {
            kind: MaterialKind::LineBasic,
            color,
            opacity,
            transparent: true,
            map: None,
        }
    }

    pub fn transparent(mut self, transparent: bool) -> Self {
        self.transparent = transparent;
        self
    }

    pub fn with_map(mut self, map: Texture) -> Self {
        self.map = Some(map);
        self
    }
}

/// Index range drawn with `materials[material_index]`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GeometryGroup {
    pub start: u32,
    pub count: u32,
    pub material_index: u32,
}

/// Indexed triangle list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshGeometry {
    pub positions: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
    pub groups: Vec<GeometryGroup>,
}

impl MeshGeometry {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(|tri| {
            Some([
                *self.positions.get(tri[0] as usize)?,
                *self.positions.get(tri[1] as usize)?,
                *self.positions.get(tri[2] as usize)?,
            ])
        })
    }

    /// Axis-aligned rectangle in the `z = 0` plane, centered on the origin.
    pub fn plane(width: f64, height: f64) -> Self {
        let hw = width / 2.0;
        let hh = height / 2.0;
        Self {
            positions: vec![
                Vec3::new(-hw, hh, 0.0),
                Vec3::new(hw, hh, 0.0),
                Vec3::new(-hw, -hh, 0.0),
                Vec3::new(hw, -hh, 0.0),
            ],
            uvs: vec![
                Vec2::new(0.0, 1.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
            ],
            indices: vec![0, 2, 1, 2, 3, 1],
            groups: vec![GeometryGroup {
                start: 0,
                count: 6,
                material_index: 0,
            }],
        }
    }
}

/// One or more polylines drawn with a single material.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineGeometry {
    pub strips: Vec<Vec<Vec3>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Mesh(MeshGeometry),
    Lines(LineGeometry),
}

impl Geometry {
    pub fn bounds(&self) -> Option<Aabb3> {
        match self {
            Geometry::Mesh(m) => Aabb3::from_points(m.positions.iter()),
            Geometry::Lines(l) => Aabb3::from_points(l.strips.iter().flatten()),
        }
    }

    pub fn as_mesh(&self) -> Option<&MeshGeometry> {
        match self {
            Geometry::Mesh(m) => Some(m),
            Geometry::Lines(_) => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct ResourceStore {
    geometries: Arena<Geometry>,
    materials: Arena<Material>,
    revision: u64,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        self.revision += 1;
        GeometryId(self.geometries.alloc(geometry))
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.revision += 1;
        MaterialId(self.materials.alloc(material))
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&Geometry> {
        self.geometries.get(id.0)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    pub fn release_geometry(&mut self, id: GeometryId) -> Result<Geometry, ResourceError> {
        let geometry = self
            .geometries
            .remove(id.0)
            .ok_or(ResourceError::GeometryReleased(id))?;
        self.revision += 1;
        Ok(geometry)
    }

    pub fn release_material(&mut self, id: MaterialId) -> Result<Material, ResourceError> {
        let material = self
            .materials
            .remove(id.0)
            .ok_or(ResourceError::MaterialReleased(id))?;
        self.revision += 1;
        Ok(material)
    }

    pub fn live_geometries(&self) -> usize {
        self.geometries.len()
    }

    pub fn live_materials(&self) -> usize {
        self.materials.len()
    }

    /// Bumped on every add/release; renderers compare it to decide when to re-upload.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::{Color, Geometry, Material, MeshGeometry, ResourceError, ResourceStore, Texture};
    use foundation::math::Vec2;

    #[test]
    fn parses_css_hex_colors() {
        let c = Color::parse_hex("#1354B0").expect("color");
        assert!((c.r - 0x13 as f32 / 255.0).abs() < 1e-6);
        assert!((c.b - 0xb0 as f32 / 255.0).abs() < 1e-6);
        assert_eq!(Color::parse_hex("#fff").expect("short"), Color::WHITE);
        assert!(matches!(Color::parse_hex("1354B0"), Err(ResourceError::InvalidColor(_))));
        assert!(Color::parse_hex("#12345").is_err());
    }

    #[test]
    fn release_is_counted_and_not_repeatable() {
        let mut store = ResourceStore::new();
        let g = store.add_geometry(Geometry::Mesh(MeshGeometry::plane(1.0, 1.0)));
        let m = store.add_material(Material::mesh_basic(Color::WHITE, 1.0));
        assert_eq!((store.live_geometries(), store.live_materials()), (1, 1));

        let rev = store.revision();
        store.release_geometry(g).expect("release geometry");
        store.release_material(m).expect("release material");
        assert!(store.revision() > rev);
        assert_eq!((store.live_geometries(), store.live_materials()), (0, 0));
        assert_eq!(store.release_geometry(g), Err(ResourceError::GeometryReleased(g)));
        assert!(store.geometry(g).is_none());
    }

    #[test]
    fn plane_is_two_triangles() {
        let plane = MeshGeometry::plane(1000.0, 1000.0);
        assert_eq!(plane.triangle_count(), 2);
        assert_eq!(plane.triangles().count(), 2);
    }

    #[test]
    fn texture_repeat_and_offset() {
        let mut t = Texture::new("area.png");
        t.repeat = [0.001, 0.001];
        t.offset = [0.5, 0.5];
        let uv = t.transform_uv(Vec2::new(-500.0, 500.0));
        assert!((uv.x - 0.0).abs() < 1e-12);
        assert!((uv.y - 1.0).abs() < 1e-12);
    }
}
