//! Sutherland–Hodgman clipping with feature bookkeeping.
//!
//! Every clip vertex records which edges produced it. The packed
//! [`FeaturePair`] key is the identity a contact point keeps from one step
//! to the next, so warm starting can find its accumulated impulse again.
//!
//! Slot convention: the reference shape uses the `_a` slots and the
//! incident shape uses the `_b` slots.

use glam::Vec3;

use super::hull::Hull;
use super::shapes::Capsule;
use crate::geometry::Plane;
use crate::math::Transform;

/// Feature slot not touched by a contact point.
pub const NULL_EDGE: u8 = 0xFF;

/// Points this close above a plane count as on it, so clipping a polygon
/// that was already clipped by the same plane leaves it unchanged.
const CLIP_TOLERANCE: f32 = 1.0e-5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeaturePair {
    pub in_edge_a: u8,
    pub in_edge_b: u8,
    pub out_edge_a: u8,
    pub out_edge_b: u8,
}

impl Default for FeaturePair {
    fn default() -> Self {
        make_pair(
            NULL_EDGE as usize,
            NULL_EDGE as usize,
            NULL_EDGE as usize,
            NULL_EDGE as usize,
        )
    }
}

impl FeaturePair {
    /// Unpack a key produced by [`make_key`].
    pub fn from_key(key: u32) -> Self {
        let [in_edge_a, in_edge_b, out_edge_a, out_edge_b] = key.to_le_bytes();
        Self {
            in_edge_a,
            in_edge_b,
            out_edge_a,
            out_edge_b,
        }
    }

    /// The same pair with the roles of A and B exchanged.
    pub fn swapped(self) -> Self {
        Self {
            in_edge_a: self.in_edge_b,
            in_edge_b: self.in_edge_a,
            out_edge_a: self.out_edge_b,
            out_edge_b: self.out_edge_a,
        }
    }
}

/// Build a feature pair. Indices are truncated to a byte.
#[inline]
pub fn make_pair(
    in_edge_a: usize,
    in_edge_b: usize,
    out_edge_a: usize,
    out_edge_b: usize,
) -> FeaturePair {
    FeaturePair {
        in_edge_a: in_edge_a as u8,
        in_edge_b: in_edge_b as u8,
        out_edge_a: out_edge_a as u8,
        out_edge_b: out_edge_b as u8,
    }
}

/// Pack a feature pair into a 32-bit key.
#[inline]
pub fn make_key(pair: FeaturePair) -> u32 {
    u32::from_le_bytes([pair.in_edge_a, pair.in_edge_b, pair.out_edge_a, pair.out_edge_b])
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClipVertex {
    pub position: Vec3,
    pub pair: FeaturePair,
}

pub type ClipPolygon = Vec<ClipVertex>;

/// A clipping plane tagged with the feature it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipPlane {
    pub plane: Plane,
    pub id: u8,
}

/// The capsule's core segment in world space.
pub fn build_edge(xf: &Transform, capsule: &Capsule) -> [ClipVertex; 2] {
    [0, 1].map(|i| ClipVertex {
        position: xf.transform_point(capsule.vertices[i]),
        pair: make_pair(i, NULL_EDGE as usize, i, NULL_EDGE as usize),
    })
}

/// The boundary loop of `face` in world space. Each vertex is tagged with
/// the half-edges entering and leaving it.
pub fn build_polygon(polygon: &mut ClipPolygon, xf: &Transform, face: usize, hull: &Hull) {
    polygon.clear();

    let Some(mut prev) = hull.face_edges(face).last() else {
        return;
    };
    for e in hull.face_edges(face) {
        let origin = hull.edges[e].origin as usize;
        polygon.push(ClipVertex {
            position: xf.transform_point(hull.vertices[origin]),
            pair: make_pair(NULL_EDGE as usize, prev, NULL_EDGE as usize, e),
        });
        prev = e;
    }
}

/// Clip a segment against a plane, keeping the part behind it.
///
/// Returns the number of output vertices (0 or 2). An endpoint replaced by
/// the crossing point inherits the plane id on the incident slots.
pub fn clip_edge_to_plane(
    out: &mut [ClipVertex; 2],
    edge: &[ClipVertex; 2],
    plane: &ClipPlane,
) -> usize {
    let d1 = plane.plane.distance(edge[0].position);
    let d2 = plane.plane.distance(edge[1].position);
    let inside1 = d1 <= CLIP_TOLERANCE;
    let inside2 = d2 <= CLIP_TOLERANCE;

    let crossing = |culled: &ClipVertex| {
        let t = d1 / (d1 - d2);
        ClipVertex {
            position: edge[0].position + t * (edge[1].position - edge[0].position),
            pair: make_pair(
                culled.pair.in_edge_a as usize,
                plane.id as usize,
                culled.pair.out_edge_a as usize,
                plane.id as usize,
            ),
        }
    };

    match (inside1, inside2) {
        (true, true) => {
            *out = *edge;
            2
        }
        (true, false) => {
            out[0] = edge[0];
            out[1] = crossing(&edge[1]);
            2
        }
        (false, true) => {
            out[0] = crossing(&edge[0]);
            out[1] = edge[1];
            2
        }
        (false, false) => 0,
    }
}

/// Clip a polygon against a plane, keeping the part behind it.
pub fn clip_polygon_to_plane(out: &mut ClipPolygon, polygon: &[ClipVertex], plane: &ClipPlane) {
    out.clear();
    let Some(&last) = polygon.last() else {
        return;
    };
    if polygon.len() < 2 {
        if plane.plane.distance(last.position) <= CLIP_TOLERANCE {
            out.push(last);
        }
        return;
    }

    let mut v1 = last;
    let mut d1 = plane.plane.distance(v1.position);

    for &v2 in polygon {
        let d2 = plane.plane.distance(v2.position);

        if d1 <= CLIP_TOLERANCE && d2 <= CLIP_TOLERANCE {
            out.push(v2);
        } else if d1 <= CLIP_TOLERANCE {
            // Leaving the kept half space.
            let t = d1 / (d1 - d2);
            out.push(ClipVertex {
                position: v1.position + t * (v2.position - v1.position),
                pair: make_pair(
                    NULL_EDGE as usize,
                    v1.pair.out_edge_b as usize,
                    plane.id as usize,
                    NULL_EDGE as usize,
                ),
            });
        } else if d2 <= CLIP_TOLERANCE {
            // Entering it.
            let t = d1 / (d1 - d2);
            out.push(ClipVertex {
                position: v1.position + t * (v2.position - v1.position),
                pair: make_pair(
                    plane.id as usize,
                    NULL_EDGE as usize,
                    NULL_EDGE as usize,
                    v1.pair.out_edge_b as usize,
                ),
            });
            out.push(v2);
        }

        v1 = v2;
        d1 = d2;
    }
}

/// Side planes of a hull face in world space, one per boundary half-edge.
pub fn face_side_planes<'a>(
    xf: &'a Transform,
    face: usize,
    hull: &'a Hull,
) -> impl Iterator<Item = ClipPlane> + 'a {
    let normal = xf.transform_vector(hull.planes[face].normal);
    hull.face_edges(face).map(move |e| {
        let edge = &hull.edges[e];
        let next = &hull.edges[edge.next as usize];
        let v1 = xf.transform_point(hull.vertices[edge.origin as usize]);
        let v2 = xf.transform_point(hull.vertices[next.origin as usize]);
        let side = (v2 - v1).cross(normal).normalize_or_zero();
        ClipPlane {
            plane: Plane::from_point(side, v1),
            id: e as u8,
        }
    })
}

/// Planes capping the capsule segment at each end, normals pointing out
/// along the axis.
pub fn capsule_side_planes(xf: &Transform, capsule: &Capsule) -> [ClipPlane; 2] {
    let a = xf.transform_point(capsule.vertices[0]);
    let b = xf.transform_point(capsule.vertices[1]);
    let axis = (b - a).normalize_or_zero();
    [
        ClipPlane {
            plane: Plane::from_point(-axis, a),
            id: 0,
        },
        ClipPlane {
            plane: Plane::from_point(axis, b),
            id: 1,
        },
    ]
}

/// Clip a segment to the lateral extent of a capsule.
pub fn clip_edge_to_capsule(
    out: &mut [ClipVertex; 2],
    edge: &[ClipVertex; 2],
    xf: &Transform,
    capsule: &Capsule,
) -> usize {
    let mut current = *edge;
    for plane in capsule_side_planes(xf, capsule) {
        if clip_edge_to_plane(out, &current, &plane) == 0 {
            return 0;
        }
        current = *out;
    }
    2
}

/// Clip a segment to the lateral extent of a hull face.
pub fn clip_edge_to_face(
    out: &mut [ClipVertex; 2],
    edge: &[ClipVertex; 2],
    xf: &Transform,
    face: usize,
    hull: &Hull,
) -> usize {
    let mut current = *edge;
    for plane in face_side_planes(xf, face, hull) {
        if clip_edge_to_plane(out, &current, &plane) == 0 {
            return 0;
        }
        current = *out;
    }
    *out = current;
    2
}

/// Clip a polygon to the lateral extent of a hull face.
pub fn clip_polygon_to_face(
    out: &mut ClipPolygon,
    polygon: &[ClipVertex],
    xf: &Transform,
    face: usize,
    hull: &Hull,
) {
    out.clear();
    out.extend_from_slice(polygon);
    let mut scratch = ClipPolygon::with_capacity(polygon.len() + hull.face_edges(face).count());

    for plane in face_side_planes(xf, face, hull) {
        clip_polygon_to_plane(&mut scratch, out, &plane);
        std::mem::swap(out, &mut scratch);
        if out.is_empty() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(half: f32) -> ClipPolygon {
        let corners = [
            Vec3::new(-half, -half, 0.0),
            Vec3::new(half, -half, 0.0),
            Vec3::new(half, half, 0.0),
            Vec3::new(-half, half, 0.0),
        ];
        corners
            .iter()
            .enumerate()
            .map(|(i, &position)| ClipVertex {
                position,
                pair: make_pair(NULL_EDGE as usize, (i + 3) % 4, NULL_EDGE as usize, i),
            })
            .collect()
    }

    #[test]
    fn test_key_round_trip() {
        for a in 0..=255usize {
            let (b, c, d) = (255 - a, a ^ 0x5A, (a * 7) & 0xFF);
            let pair = make_pair(a, b, c, d);
            let back = FeaturePair::from_key(make_key(pair));
            assert_eq!(back, pair);
            assert_eq!(
                (back.in_edge_a, back.in_edge_b, back.out_edge_a, back.out_edge_b),
                (a as u8, b as u8, c as u8, d as u8)
            );
        }
    }

    #[test]
    fn test_make_pair_truncates() {
        let pair = make_pair(0x1FF, 256, 3, 0xFF);
        assert_eq!(pair.in_edge_a, 0xFF);
        assert_eq!(pair.in_edge_b, 0);
        assert_eq!(pair.out_edge_a, 3);
    }

    #[test]
    fn test_swapped_twice_is_identity() {
        let pair = make_pair(1, 2, 3, 4);
        assert_eq!(pair.swapped(), make_pair(2, 1, 4, 3));
        assert_eq!(pair.swapped().swapped(), pair);
    }

    #[test]
    fn test_clip_polygon_to_plane() {
        let polygon = square(1.0);
        let plane = ClipPlane {
            plane: Plane::new(Vec3::X, 0.5),
            id: 7,
        };
        let mut out = ClipPolygon::new();
        clip_polygon_to_plane(&mut out, &polygon, &plane);

        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|v| v.position.x <= 0.5 + 1e-6));

        // The two synthesized vertices carry the plane id.
        let tagged = out
            .iter()
            .filter(|v| v.pair.in_edge_a == 7 || v.pair.out_edge_a == 7)
            .count();
        assert_eq!(tagged, 2);
    }

    #[test]
    fn test_clip_polygon_to_plane_is_idempotent() {
        let polygon = square(1.0);
        let plane = ClipPlane {
            plane: Plane::new(Vec3::new(0.0, 1.0, 0.0), 0.25),
            id: 2,
        };
        let mut once = ClipPolygon::new();
        clip_polygon_to_plane(&mut once, &polygon, &plane);
        let mut twice = ClipPolygon::new();
        clip_polygon_to_plane(&mut twice, &once, &plane);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_clip_polygon_fully_culled() {
        let polygon = square(1.0);
        let plane = ClipPlane {
            plane: Plane::new(Vec3::X, -2.0),
            id: 0,
        };
        let mut out = ClipPolygon::new();
        clip_polygon_to_plane(&mut out, &polygon, &plane);
        assert!(out.is_empty());
    }

    #[test]
    fn test_clip_edge_to_plane() {
        let edge = [
            ClipVertex {
                position: Vec3::new(-1.0, 0.0, 0.0),
                pair: make_pair(0, NULL_EDGE as usize, 0, NULL_EDGE as usize),
            },
            ClipVertex {
                position: Vec3::new(1.0, 0.0, 0.0),
                pair: make_pair(1, NULL_EDGE as usize, 1, NULL_EDGE as usize),
            },
        ];
        let plane = ClipPlane {
            plane: Plane::new(Vec3::X, 0.5),
            id: 9,
        };
        let mut out = [ClipVertex::default(); 2];
        assert_eq!(clip_edge_to_plane(&mut out, &edge, &plane), 2);
        assert_eq!(out[0], edge[0]);
        assert!((out[1].position.x - 0.5).abs() < 1e-6);
        assert_eq!(out[1].pair, make_pair(1, 9, 1, 9));

        let far = ClipPlane {
            plane: Plane::new(Vec3::X, -5.0),
            id: 0,
        };
        assert_eq!(clip_edge_to_plane(&mut out, &edge, &far), 0);
    }

    #[test]
    fn test_clip_polygon_to_face() {
        let hull = Hull::cuboid(Vec3::splat(0.5));
        let top = hull.support_face(Vec3::Y);
        let xf = Transform::IDENTITY;

        // A larger square lying on the top face.
        let polygon: ClipPolygon = square(1.0)
            .into_iter()
            .map(|mut v| {
                v.position = Vec3::new(v.position.x, 0.5, v.position.y);
                v
            })
            .collect();

        let mut out = ClipPolygon::new();
        clip_polygon_to_face(&mut out, &polygon, &xf, top, &hull);
        assert!(!out.is_empty());
        for v in &out {
            assert!(v.position.x.abs() <= 0.5 + 1e-5);
            assert!(v.position.z.abs() <= 0.5 + 1e-5);
        }
    }

    #[test]
    fn test_build_polygon_tags_half_edges() {
        let hull = Hull::cuboid(Vec3::ONE);
        let mut polygon = ClipPolygon::new();
        build_polygon(&mut polygon, &Transform::IDENTITY, 0, &hull);
        assert_eq!(polygon.len(), 4);
        for (i, v) in polygon.iter().enumerate() {
            let prev = &polygon[(i + 3) % 4];
            // The edge leaving the previous vertex enters this one.
            assert_eq!(v.pair.in_edge_b, prev.pair.out_edge_b);
            assert_eq!(v.pair.in_edge_a, NULL_EDGE);
        }
    }

    #[test]
    fn test_clip_edge_to_capsule() {
        let capsule = Capsule::new_y(1.0, 0.2);
        let edge = [
            ClipVertex {
                position: Vec3::new(0.1, -3.0, 0.0),
                pair: make_pair(0, NULL_EDGE as usize, 0, NULL_EDGE as usize),
            },
            ClipVertex {
                position: Vec3::new(0.1, 0.5, 0.0),
                pair: make_pair(1, NULL_EDGE as usize, 1, NULL_EDGE as usize),
            },
        ];
        let mut out = [ClipVertex::default(); 2];
        let n = clip_edge_to_capsule(&mut out, &edge, &Transform::IDENTITY, &capsule);
        assert_eq!(n, 2);
        assert!((out[0].position.y + 1.0).abs() < 1e-6);
        assert!((out[1].position.y - 0.5).abs() < 1e-6);
    }
}
