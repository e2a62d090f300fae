//! Prism extrusion of projected polygons.
//!
//! Produces one indexed mesh with two geometry groups (caps first, then side walls) and a
//! line geometry holding every ring as a closed strip at `z = 0`. All polygons of a
//! feature merge into the same mesh.

use earcutr::earcut;
use foundation::math::{Vec2, Vec3};
use scene::{GeometryGroup, LineGeometry, MeshGeometry};

const EPS: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct Extrusion {
    pub body: MeshGeometry,
    pub outline: LineGeometry,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtrudeError {
    Degenerate { polygon: usize, ring: usize },
    Triangulation(String),
    Empty,
}

/// Extrudes `polygons` (each `[outer, holes...]`) from `z = 0` to `z = depth`.
///
/// Degenerate holes are dropped; a degenerate outer ring fails the whole extrusion.
pub fn extrude_polygons(polygons: &[Vec<Vec<Vec3>>], depth: f64) -> Result<Extrusion, ExtrudeError> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut uvs: Vec<Vec2> = Vec::new();
    let mut caps: Vec<u32> = Vec::new();
    let mut sides: Vec<u32> = Vec::new();
    let mut strips: Vec<Vec<Vec3>> = Vec::new();

    for (poly_i, rings) in polygons.iter().enumerate() {
        let Some(outer_raw) = rings.first() else {
            continue;
        };
        let mut outer = clean_ring(outer_raw);
        if outer.len() < 3 || signed_area(&outer).abs() < EPS {
            return Err(ExtrudeError::Degenerate {
                polygon: poly_i,
                ring: 0,
            });
        }
        if signed_area(&outer) < 0.0 {
            outer.reverse();
        }

        let mut shape = vec![outer];
        for (ring_i, hole_raw) in rings.iter().enumerate().skip(1) {
            let mut hole = clean_ring(hole_raw);
            if hole.len() < 3 || signed_area(&hole).abs() < EPS {
                tracing::debug!(polygon = poly_i, ring = ring_i, "dropping degenerate hole");
                continue;
            }
            if signed_area(&hole) > 0.0 {
                hole.reverse();
            }
            shape.push(hole);
        }

        // Caps.
        let mut coords: Vec<f64> = Vec::new();
        let mut hole_indices: Vec<usize> = Vec::new();
        let mut flat: Vec<Vec2> = Vec::new();
        for (ring_i, ring) in shape.iter().enumerate() {
            if ring_i > 0 {
                hole_indices.push(flat.len());
            }
            for p in ring {
                coords.push(p.x);
                coords.push(p.y);
                flat.push(*p);
            }
        }
        let triangles = earcut(&coords, &hole_indices, 2)
            .map_err(|err| ExtrudeError::Triangulation(format!("{err:?}")))?;
        if triangles.is_empty() {
            return Err(ExtrudeError::Degenerate {
                polygon: poly_i,
                ring: 0,
            });
        }

        let bottom = positions.len() as u32;
        for p in &flat {
            positions.push(Vec3::new(p.x, p.y, 0.0));
            uvs.push(*p);
        }
        let top = positions.len() as u32;
        for p in &flat {
            positions.push(Vec3::new(p.x, p.y, depth));
            uvs.push(*p);
        }

        for tri in triangles.chunks_exact(3) {
            let (mut a, mut b, c) = (tri[0], tri[1], tri[2]);
            if Vec2::orient(flat[a], flat[b], flat[c]) < 0.0 {
                std::mem::swap(&mut a, &mut b);
            }
            let (a, b, c) = (a as u32, b as u32, c as u32);
            // Top faces +z, bottom faces -z.
            caps.extend([top + a, top + b, top + c]);
            caps.extend([bottom + a, bottom + c, bottom + b]);
        }

        // Side walls, one quad per edge.
        for ring in &shape {
            let n = ring.len();
            for i in 0..n {
                let p = ring[i];
                let q = ring[(i + 1) % n];
                let base = positions.len() as u32;
                positions.extend([
                    Vec3::new(p.x, p.y, 0.0),
                    Vec3::new(q.x, q.y, 0.0),
                    Vec3::new(q.x, q.y, depth),
                    Vec3::new(p.x, p.y, depth),
                ]);
                let along_x = (p.y - q.y).abs() < (p.x - q.x).abs();
                let (u0, u1) = if along_x { (p.x, q.x) } else { (p.y, q.y) };
                uvs.extend([
                    Vec2::new(u0, 1.0),
                    Vec2::new(u1, 1.0),
                    Vec2::new(u1, 1.0 - depth),
                    Vec2::new(u0, 1.0 - depth),
                ]);
                sides.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
            }

            let mut strip: Vec<Vec3> = ring.iter().map(|p| Vec3::new(p.x, p.y, 0.0)).collect();
            strip.push(Vec3::new(ring[0].x, ring[0].y, 0.0));
            strips.push(strip);
        }
    }

    if caps.is_empty() {
        return Err(ExtrudeError::Empty);
    }

    let cap_count = caps.len() as u32;
    let side_count = sides.len() as u32;
    let mut indices = caps;
    indices.extend(sides);

    Ok(Extrusion {
        body: MeshGeometry {
            positions,
            uvs,
            indices,
            groups: vec![
                GeometryGroup {
                    start: 0,
                    count: cap_count,
                    material_index: 0,
                },
                GeometryGroup {
                    start: cap_count,
                    count: side_count,
                    material_index: 1,
                },
            ],
        },
        outline: LineGeometry { strips },
    })
}

/// Planar ring without repeated consecutive points or a closing duplicate.
fn clean_ring(ring: &[Vec3]) -> Vec<Vec2> {
    let mut out: Vec<Vec2> = Vec::with_capacity(ring.len());
    for p in ring {
        let p = p.xy();
        if !p.is_finite() {
            continue;
        }
        if out.last().is_some_and(|last| same_point(*last, p)) {
            continue;
        }
        out.push(p);
    }
    while out.len() >= 2 && same_point(out[0], out[out.len() - 1]) {
        out.pop();
    }
    out
}

fn same_point(a: Vec2, b: Vec2) -> bool {
    (a.x - b.x).abs() < EPS && (a.y - b.y).abs() < EPS
}

/// Shoelace area; positive for counter-clockwise rings.
fn signed_area(ring: &[Vec2]) -> f64 {
    let n = ring.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum * 0.5
}
