//! CPU-side primitive builders. Winding is counter-clockwise seen from the
//! outside; uv `v` grows downwards (image rows), which is what wgpu samples.

use glam::{Vec2, Vec3};
use rand::Rng;
use std::f32::consts::{PI, SQRT_2, TAU};

use crate::model::earcut;
use crate::model::typeface::{self, Shape, Typeface};
use crate::utils::{Mesh, Vertex};

/// Plane in the XY plane facing +Z, centred on the origin.
pub fn plane(width: f32, height: f32, width_segments: u32, height_segments: u32) -> Mesh {
    let ws = width_segments.max(1);
    let hs = height_segments.max(1);
    let grid_x1 = ws + 1;
    let mut mesh = Mesh::empty();

    for iy in 0..=hs {
        let y = height / 2.0 - iy as f32 * height / hs as f32;
        for ix in 0..=ws {
            let x = ix as f32 * width / ws as f32 - width / 2.0;
            mesh.vertices.push(Vertex::new(
                [x, y, 0.0],
                [0.0, 0.0, 1.0],
                [ix as f32 / ws as f32, iy as f32 / hs as f32],
            ));
        }
    }

    for iy in 0..hs {
        for ix in 0..ws {
            let a = ix + grid_x1 * iy;
            let b = ix + grid_x1 * (iy + 1);
            let c = ix + 1 + grid_x1 * (iy + 1);
            let d = ix + 1 + grid_x1 * iy;
            mesh.indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }
    mesh
}

/// Axis-aligned box centred on the origin, one quad per face.
pub fn cuboid(width: f32, height: f32, depth: f32) -> Mesh {
    let half = Vec3::new(width, height, depth) / 2.0;
    // (normal, u axis, v axis) with u x v == normal
    let faces = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];

    let mut mesh = Mesh::empty();
    for (normal, u, v) in faces {
        let base = mesh.vertices.len() as u32;
        let center = normal * half;
        let hu = u * half;
        let hv = v * half;
        let corners = [
            (center - hu - hv, [0.0, 1.0]),
            (center + hu - hv, [1.0, 1.0]),
            (center + hu + hv, [1.0, 0.0]),
            (center - hu + hv, [0.0, 0.0]),
        ];
        for (p, uv) in corners {
            mesh.vertices.push(Vertex::new(p.to_array(), normal.to_array(), uv));
        }
        mesh.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh
}

/// Closed cone with the apex on +Y; flat-shaded sides.
pub fn cone(radius: f32, height: f32, radial_segments: u32) -> Mesh {
    let segments = radial_segments.max(3);
    let apex = Vec3::new(0.0, height / 2.0, 0.0);
    let base_center = Vec3::new(0.0, -height / 2.0, 0.0);
    let rim = |i: u32| {
        let theta = i as f32 / segments as f32 * TAU;
        Vec3::new(radius * theta.sin(), -height / 2.0, radius * theta.cos())
    };

    let mut mesh = Mesh::empty();
    for i in 0..segments {
        let p0 = rim(i);
        let p1 = rim(i + 1);
        let normal = (p0 - apex).cross(p1 - apex).normalize_or_zero().to_array();
        let base = mesh.vertices.len() as u32;
        let u0 = i as f32 / segments as f32;
        let u1 = (i + 1) as f32 / segments as f32;
        mesh.vertices.push(Vertex::new(apex.to_array(), normal, [(u0 + u1) / 2.0, 0.0]));
        mesh.vertices.push(Vertex::new(p0.to_array(), normal, [u0, 1.0]));
        mesh.vertices.push(Vertex::new(p1.to_array(), normal, [u1, 1.0]));
        mesh.indices.extend_from_slice(&[base, base + 1, base + 2]);
    }

    let center_idx = mesh.vertices.len() as u32;
    mesh.vertices.push(Vertex::new(base_center.to_array(), [0.0, -1.0, 0.0], [0.5, 0.5]));
    for i in 0..=segments {
        let p = rim(i);
        let theta = i as f32 / segments as f32 * TAU;
        mesh.vertices.push(Vertex::new(
            p.to_array(),
            [0.0, -1.0, 0.0],
            [0.5 + 0.5 * theta.sin(), 0.5 - 0.5 * theta.cos()],
        ));
    }
    for i in 0..segments {
        let a = center_idx + 1 + i;
        mesh.indices.extend_from_slice(&[center_idx, a + 1, a]);
    }
    mesh
}

pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Mesh {
    let ws = width_segments.max(3);
    let hs = height_segments.max(2);
    let mut mesh = Mesh::empty();

    for iy in 0..=hs {
        let v = iy as f32 / hs as f32;
        for ix in 0..=ws {
            let u = ix as f32 / ws as f32;
            let p = Vec3::new(
                -radius * (u * TAU).cos() * (v * PI).sin(),
                radius * (v * PI).cos(),
                radius * (u * TAU).sin() * (v * PI).sin(),
            );
            let n = p.normalize_or_zero();
            mesh.vertices.push(Vertex::new(p.to_array(), n.to_array(), [u, v]));
        }
    }

    let row = ws + 1;
    for iy in 0..hs {
        for ix in 0..ws {
            let a = iy * row + ix + 1;
            let b = iy * row + ix;
            let c = (iy + 1) * row + ix;
            let d = (iy + 1) * row + ix + 1;
            if iy != 0 {
                mesh.indices.extend_from_slice(&[a, b, d]);
            }
            if iy != hs - 1 {
                mesh.indices.extend_from_slice(&[b, c, d]);
            }
        }
    }
    mesh
}

/// Random triangle soup inside the unit cube, drawn as a wireframe bush.
pub fn triangle_soup<R: Rng>(triangles: usize, rng: &mut R) -> Mesh {
    let mut mesh = Mesh::empty();
    for t in 0..triangles {
        let p: [Vec3; 3] = std::array::from_fn(|_| Vec3::new(rng.gen(), rng.gen(), rng.gen()));
        let normal = (p[1] - p[0]).cross(p[2] - p[0]).normalize_or_zero().to_array();
        for corner in p {
            mesh.vertices.push(Vertex::new(corner.to_array(), normal, [0.0, 0.0]));
        }
        let base = (t * 3) as u32;
        mesh.indices.extend_from_slice(&[base, base + 1, base + 2]);
    }
    mesh
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextParams {
    /// World units per em.
    pub size: f32,
    pub depth: f32,
    pub curve_segments: u32,
    /// How far every edge is pushed out of the glyph.
    pub bevel_size: f32,
}

/// Right-hand normal of an edge, which points out of the filled side for
/// counter-clockwise outers and clockwise holes alike.
fn outward(edge: Vec2) -> Vec2 {
    Vec2::new(edge.y, -edge.x).normalize_or_zero()
}

/// Corner offset that moves both adjacent edges out by one unit, capped at
/// sqrt(2) so sharp spikes stay bounded.
fn bevel_vec(prev: Vec2, p: Vec2, next: Vec2) -> Vec2 {
    let n_in = outward(p - prev);
    let n_out = outward(next - p);
    let denom = 1.0 + n_in.dot(n_out);
    if denom < 1e-6 {
        return n_in;
    }
    let v = (n_in + n_out) / denom;
    if v.length_squared() > 2.0 {
        v.normalize() * SQRT_2
    } else {
        v
    }
}

fn expand(contour: &[Vec2], amount: f32) -> Vec<Vec2> {
    let n = contour.len();
    (0..n)
        .map(|i| contour[i] + bevel_vec(contour[(i + n - 1) % n], contour[i], contour[(i + 1) % n]) * amount)
        .collect()
}

fn extrude(mesh: &mut Mesh, shape: &Shape, params: &TextParams) {
    // triangulated before widening; the bevel keeps the topology
    let triangles = earcut::triangulate(&shape.outer, &shape.holes);
    let contours: Vec<Vec<Vec2>> = std::iter::once(&shape.outer)
        .chain(&shape.holes)
        .map(|c| expand(c, params.bevel_size))
        .collect();

    // back cap at z = 0 faces -Z, front cap at z = depth faces +Z
    for (z, facing) in [(0.0, -1.0), (params.depth, 1.0)] {
        let base = mesh.vertices.len() as u32;
        for p in contours.iter().flatten() {
            mesh.vertices.push(Vertex::new([p.x, p.y, z], [0.0, 0.0, facing], [p.x, p.y]));
        }
        for t in &triangles {
            let [a, b, c] = t.map(|i| base + i);
            if facing < 0.0 {
                mesh.indices.extend_from_slice(&[a, c, b]);
            } else {
                mesh.indices.extend_from_slice(&[a, b, c]);
            }
        }
    }

    // flat-shaded walls, one quad per edge
    for contour in &contours {
        let n = contour.len();
        for i in 0..n {
            let (a, b) = (contour[i], contour[(i + 1) % n]);
            let normal = outward(b - a);
            let base = mesh.vertices.len() as u32;
            for (p, z, u) in [(a, 0.0, 0.0), (b, 0.0, 1.0), (b, params.depth, 1.0), (a, params.depth, 0.0)] {
                mesh.vertices.push(Vertex::new([p.x, p.y, z], [normal.x, normal.y, 0.0], [u, z]));
            }
            mesh.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
    }
}

/// Solid text extruded from z = 0 to `depth`, baseline on y = 0 starting
/// at x = 0.
pub fn text(font: &Typeface, content: &str, params: &TextParams) -> Mesh {
    let mut mesh = Mesh::empty();
    for contours in font.layout(content, params.size, params.curve_segments) {
        for shape in typeface::to_shapes(contours) {
            extrude(&mut mesh, &shape, params);
        }
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn face_normal(mesh: &Mesh, tri: usize) -> Vec3 {
        let i = &mesh.indices[tri * 3..tri * 3 + 3];
        let p = |k: usize| Vec3::from(mesh.vertices[i[k] as usize].pos);
        (p(1) - p(0)).cross(p(2) - p(0))
    }

    #[test]
    fn plane_faces_positive_z() {
        let mesh = plane(25.0, 25.0, 1, 1);
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices.len(), 6);
        assert!(face_normal(&mesh, 0).z > 0.0);
        assert!(face_normal(&mesh, 1).z > 0.0);
    }

    #[test]
    fn cuboid_winding_points_outwards() {
        let mesh = cuboid(5.0, 3.0, 5.0);
        assert_eq!(mesh.indices.len(), 36);
        for tri in 0..12 {
            let i = mesh.indices[tri * 3] as usize;
            let n = Vec3::from(mesh.vertices[i].normal);
            assert!(face_normal(&mesh, tri).dot(n) > 0.0, "triangle {tri} is inverted");
        }
    }

    #[test]
    fn cone_with_four_segments_is_a_pyramid() {
        let mesh = cone(4.0, 2.0, 4);
        assert_eq!(mesh.indices.len(), 4 * 3 + 4 * 3);
        let top = mesh.vertices.iter().map(|v| v.pos[1]).fold(f32::MIN, f32::max);
        assert_eq!(top, 1.0);
        for tri in 0..4 {
            assert!(face_normal(&mesh, tri).y > 0.0);
        }
        for tri in 4..8 {
            assert!(face_normal(&mesh, tri).y < 0.0);
        }
    }

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let mesh = sphere(1.0, 32, 16);
        for v in &mesh.vertices {
            assert!((Vec3::from(v.pos).length() - 1.0).abs() < 1e-5);
        }
        assert_eq!(mesh.indices.len() % 3, 0);
    }

    #[test]
    fn text_is_a_closed_extrusion() {
        let font = crate::model::typeface::tests::test_font();
        let params = TextParams { size: 2.0, depth: 0.5, curve_segments: 5, bevel_size: 0.02 };
        let mesh = text(&font, "O", &params);

        // two caps over 4 + 4 corners, one quad per edge
        assert_eq!(mesh.vertices.len(), 2 * 8 + 8 * 4);
        assert_eq!(mesh.indices.len(), 2 * 8 * 3 + 8 * 6);
        for tri in 0..mesh.indices.len() / 3 {
            let n = Vec3::from(mesh.vertices[mesh.indices[tri * 3] as usize].normal);
            assert!(face_normal(&mesh, tri).dot(n) > 0.0, "triangle {tri} faces inwards");
        }

        let (min, max) = mesh.vertices.iter().fold((Vec3::MAX, Vec3::MIN), |(lo, hi), v| {
            let p = Vec3::from(v.pos);
            (lo.min(p), hi.max(p))
        });
        assert!(min.abs_diff_eq(Vec3::new(-0.02, -0.02, 0.0), 1e-5), "min = {min}");
        assert!(max.abs_diff_eq(Vec3::new(1.42, 1.42, 0.5), 1e-5), "max = {max}");

        // the counter shrinks by the same amount
        let inner = mesh
            .vertices
            .iter()
            .filter(|v| v.pos[0] > 0.1 && v.pos[0] < 1.3)
            .map(|v| v.pos[0])
            .fold(f32::MAX, f32::min);
        assert!((inner - 0.42).abs() < 1e-5, "inner = {inner}");
    }

    #[test]
    fn unknown_characters_are_skipped() {
        let font = crate::model::typeface::tests::test_font();
        let params = TextParams { size: 1.0, depth: 0.2, curve_segments: 3, bevel_size: 0.0 };
        assert!(text(&font, "ZZ", &params).is_empty());
        assert_eq!(text(&font, "OZ", &params).vertices.len(), text(&font, "O", &params).vertices.len());
    }

    #[test]
    fn triangle_soup_stays_in_unit_cube() {
        let mut rng = StdRng::seed_from_u64(7);
        let mesh = triangle_soup(100, &mut rng);
        assert_eq!(mesh.vertices.len(), 300);
        assert!(mesh.vertices.iter().all(|v| v.pos.iter().all(|c| (0.0..1.0).contains(c))));
    }
}
