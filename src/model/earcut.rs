//! Ear-clipping triangulation of a polygon with holes, for flat caps.
//!
//! Holes are joined to the outline through a zero-width bridge from their
//! rightmost vertex to the nearest outline vertex it can see, which turns
//! the shape into one weakly simple ring that is then clipped ear by ear.

use glam::Vec2;

const EPS: f32 = 1e-9;

fn cross(o: Vec2, a: Vec2, b: Vec2) -> f32 {
    (a - o).perp_dot(b - o)
}

fn same(a: Vec2, b: Vec2) -> bool {
    a.distance_squared(b) <= EPS
}

/// Segments `ab` and `cd` cross at a single interior point.
fn crosses(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> bool {
    if same(a, c) || same(a, d) || same(b, c) || same(b, d) {
        return false;
    }
    let d1 = cross(a, b, c);
    let d2 = cross(a, b, d);
    let d3 = cross(c, d, a);
    let d4 = cross(c, d, b);
    d1 * d2 < 0.0 && d3 * d4 < 0.0
}

fn in_triangle(a: Vec2, b: Vec2, c: Vec2, p: Vec2) -> bool {
    cross(a, b, p) >= 0.0 && cross(b, c, p) >= 0.0 && cross(c, a, p) >= 0.0
}

fn ring_edges<'a>(points: &'a [Vec2], ring: &'a [usize]) -> impl Iterator<Item = (Vec2, Vec2)> + 'a {
    let n = ring.len();
    (0..n).map(move |i| (points[ring[i]], points[ring[(i + 1) % n]]))
}

/// Splice each hole into `ring`, rightmost hole first.
fn bridge_holes(points: &[Vec2], mut ring: Vec<usize>, mut holes: Vec<Vec<usize>>) -> Vec<usize> {
    let max_x = |hole: &Vec<usize>| hole.iter().map(|&i| points[i].x).fold(f32::MIN, f32::max);
    holes.sort_by(|a, b| max_x(b).total_cmp(&max_x(a)));

    for k in 0..holes.len() {
        let hole = &holes[k];
        let Some(start) = (0..hole.len()).max_by(|&a, &b| points[hole[a]].x.total_cmp(&points[hole[b]].x)) else {
            continue;
        };
        let m = points[hole[start]];

        let mut candidates: Vec<usize> = (0..ring.len()).collect();
        candidates.sort_by(|&a, &b| {
            points[ring[a]].distance_squared(m).total_cmp(&points[ring[b]].distance_squared(m))
        });
        let visible = |pos: usize| {
            let p = points[ring[pos]];
            !ring_edges(points, &ring).any(|(c, d)| crosses(m, p, c, d))
                && !holes[k..].iter().flat_map(|h| ring_edges(points, h)).any(|(c, d)| crosses(m, p, c, d))
        };
        let Some(pos) = candidates.into_iter().find(|&pos| visible(pos)) else {
            tracing::warn!(vertices = hole.len(), "hole cannot be bridged, left filled");
            continue;
        };

        let mut merged = Vec::with_capacity(ring.len() + hole.len() + 2);
        merged.extend_from_slice(&ring[..=pos]);
        merged.extend(hole[start..].iter().chain(&hole[..start]));
        merged.push(hole[start]);
        merged.push(ring[pos]);
        merged.extend_from_slice(&ring[pos + 1..]);
        ring = merged;
    }
    ring
}

fn is_ear(points: &[Vec2], ring: &[usize], i: usize) -> bool {
    let n = ring.len();
    let (a, b, c) = (points[ring[(i + n - 1) % n]], points[ring[i]], points[ring[(i + 1) % n]]);
    if cross(a, b, c) <= EPS {
        return false;
    }
    ring.iter().map(|&j| points[j]).all(|p| same(p, a) || same(p, b) || same(p, c) || !in_triangle(a, b, c, p))
}

/// Triangles over `outer` (counter-clockwise) minus `holes` (clockwise).
/// Indices address `outer` followed by every hole in order; triangles come
/// back counter-clockwise.
pub fn triangulate(outer: &[Vec2], holes: &[Vec<Vec2>]) -> Vec<[u32; 3]> {
    let mut points: Vec<Vec2> = outer.to_vec();
    let ring: Vec<usize> = (0..outer.len()).collect();
    let mut hole_rings = Vec::with_capacity(holes.len());
    for hole in holes.iter().filter(|h| h.len() >= 3) {
        hole_rings.push((points.len()..points.len() + hole.len()).collect::<Vec<_>>());
        points.extend_from_slice(hole);
    }
    let mut ring = bridge_holes(&points, ring, hole_rings);

    let mut triangles = Vec::with_capacity(ring.len().saturating_sub(2));
    let mut i = 0;
    let mut misses = 0;
    while ring.len() > 3 {
        let n = ring.len();
        i %= n;
        let corner = |j: usize| (points[ring[(j + n - 1) % n]], points[ring[j]], points[ring[(j + 1) % n]]);
        let (a, b, c) = corner(i);

        // collinear or doubled-back vertices add no area
        if cross(a, b, c).abs() <= EPS {
            ring.remove(i);
            i = i.saturating_sub(1);
            misses = 0;
            continue;
        }

        let clip = if is_ear(&points, &ring, i) {
            Some(i)
        } else if misses > n {
            // no clean ear left: take any convex corner so the loop ends
            (0..n).find(|&j| {
                let (a, b, c) = corner(j);
                cross(a, b, c) > EPS
            })
        } else {
            i += 1;
            misses += 1;
            continue;
        };
        let Some(j) = clip else {
            tracing::debug!(remaining = n, "triangulation stopped early");
            break;
        };
        triangles.push([ring[(j + n - 1) % n] as u32, ring[j] as u32, ring[(j + 1) % n] as u32]);
        ring.remove(j);
        i = j.saturating_sub(1);
        misses = 0;
    }
    if let [a, b, c] = ring[..] {
        if cross(points[a], points[b], points[c]) > EPS {
            triangles.push([a as u32, b as u32, c as u32]);
        }
    }
    triangles
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn area(points: &[Vec2], triangles: &[[u32; 3]]) -> f32 {
        triangles
            .iter()
            .map(|t| {
                let a = cross(points[t[0] as usize], points[t[1] as usize], points[t[2] as usize]) / 2.0;
                assert!(a > 0.0, "triangle {t:?} is clockwise");
                a
            })
            .sum()
    }

    fn square(x: f32, y: f32, size: f32) -> Vec<Vec2> {
        vec![
            Vec2::new(x, y),
            Vec2::new(x + size, y),
            Vec2::new(x + size, y + size),
            Vec2::new(x, y + size),
        ]
    }

    #[test]
    fn concave_outline_keeps_its_notches() {
        // an E: spine on the left, three arms to the right
        let e: Vec<Vec2> = [
            (0.0, 0.0), (3.0, 0.0), (3.0, 1.0), (1.0, 1.0), (1.0, 2.0), (2.0, 2.0), (2.0, 3.0),
            (1.0, 3.0), (1.0, 4.0), (3.0, 4.0), (3.0, 5.0), (0.0, 5.0),
        ]
        .into_iter()
        .map(|(x, y)| Vec2::new(x, y))
        .collect();
        let triangles = triangulate(&e, &[]);
        assert!(triangles.len() <= e.len() - 2);
        assert_relative_eq!(area(&e, &triangles), 5.0 + 2.0 + 1.0 + 2.0, epsilon = 1e-5);
    }

    #[test]
    fn holes_are_left_open() {
        let outer = square(0.0, 0.0, 0.7);
        let mut hole = square(0.2, 0.2, 0.3);
        hole.reverse();
        let triangles = triangulate(&outer, &[hole.clone()]);

        let points: Vec<Vec2> = outer.iter().chain(&hole).copied().collect();
        // the bridge adds two vertices to the ring
        assert_eq!(triangles.len(), outer.len() + hole.len());
        assert_relative_eq!(area(&points, &triangles), 0.49 - 0.09, epsilon = 1e-5);
        let centre = Vec2::new(0.35, 0.35);
        for t in &triangles {
            let [a, b, c] = t.map(|i| points[i as usize]);
            assert!(!in_triangle(a, b, c, centre), "triangle {t:?} covers the hole");
        }
    }

    #[test]
    fn two_holes_side_by_side() {
        let outer = vec![Vec2::new(0.0, 0.0), Vec2::new(5.0, 0.0), Vec2::new(5.0, 2.0), Vec2::new(0.0, 2.0)];
        let mut left = square(0.5, 0.5, 1.0);
        let mut right = square(3.5, 0.5, 1.0);
        left.reverse();
        right.reverse();
        let triangles = triangulate(&outer, &[left.clone(), right.clone()]);
        let points: Vec<Vec2> = outer.iter().chain(&left).chain(&right).copied().collect();
        assert_relative_eq!(area(&points, &triangles), 10.0 - 2.0, epsilon = 1e-5);
    }

    #[test]
    fn degenerate_input_gives_nothing() {
        assert!(triangulate(&[Vec2::ZERO, Vec2::X], &[]).is_empty());
        let line = [Vec2::ZERO, Vec2::X, Vec2::new(2.0, 0.0)];
        assert!(triangulate(&line, &[]).is_empty());
    }
}
