//! Contact manifold generation for every shape pair.
//!
//! Rounded shapes (spheres, capsules) go through GJK on their cores. Hull
//! pairs use the separating axis test: face normals of both hulls, then edge
//! pairs that form a face of the Minkowski difference. The winning face is
//! clipped against the most anti-parallel face of the other hull.
//!
//! Every manifold normal points from A to B. Contacts are reported while the
//! separation is within [`SPECULATIVE_DISTANCE`].

use glam::Vec3;

use super::clip::{
    build_edge, build_polygon, clip_edge_to_capsule, clip_edge_to_face, clip_polygon_to_face,
    make_key, make_pair, ClipPolygon, ClipVertex, FeaturePair, NULL_EDGE,
};
use super::distance::{closest_point_on_segment, closest_points_on_segments};
use super::gjk::{gjk_cached, SimplexCache};
use super::hull::Hull;
use super::manifold::Manifold;
use super::shapes::{Capsule, Shape, Sphere};
use crate::math::Transform;
use crate::settings::{LINEAR_SLOP, MAX_MANIFOLD_POINTS, SPECULATIVE_DISTANCE};

/// An edge contact must beat the best face by this factor.
const REL_EDGE_TOLERANCE: f32 = 0.90;
/// B's face must beat A's face by this factor to become the reference.
const REL_FACE_TOLERANCE: f32 = 0.98;
const ABS_TOLERANCE: f32 = 0.5 * LINEAR_SLOP;

/// Edges whose cross product is shorter than this fraction of their
/// lengths are treated as parallel.
const PARALLEL_TOLERANCE: f32 = 0.005;

/// Cores closer than this are treated as overlapping.
const CORE_OVERLAP_TOLERANCE: f32 = 0.1 * LINEAR_SLOP;

/// Compute the contact manifold between two shapes. `cache` belongs to the
/// pair and is read and rewritten by the GJK-based paths.
pub fn collide(
    xf_a: &Transform,
    shape_a: &Shape,
    xf_b: &Transform,
    shape_b: &Shape,
    cache: &mut SimplexCache,
) -> Manifold {
    match (shape_a, shape_b) {
        (Shape::Sphere(a), Shape::Sphere(b)) => collide_spheres(xf_a, a, xf_b, b),
        (Shape::Capsule(a), Shape::Sphere(b)) => collide_capsule_and_sphere(xf_a, a, xf_b, b),
        (Shape::Sphere(a), Shape::Capsule(b)) => {
            collide_capsule_and_sphere(xf_b, b, xf_a, a).flipped(xf_a)
        }
        (Shape::Capsule(a), Shape::Capsule(b)) => collide_capsules(xf_a, a, xf_b, b),
        (Shape::Hull(a), Shape::Sphere(b)) => collide_hull_and_sphere(xf_a, a, xf_b, b, cache),
        (Shape::Sphere(a), Shape::Hull(b)) => {
            collide_hull_and_sphere(xf_b, b, xf_a, a, cache).flipped(xf_a)
        }
        (Shape::Hull(a), Shape::Capsule(b)) => collide_hull_and_capsule(xf_a, a, xf_b, b, cache),
        (Shape::Capsule(a), Shape::Hull(b)) => {
            collide_hull_and_capsule(xf_b, b, xf_a, a, cache).flipped(xf_a)
        }
        (Shape::Hull(a), Shape::Hull(b)) => collide_hulls(xf_a, a, xf_b, b, cache),
    }
}

/// One contact between two core points inflated by radii.
fn point_contact(
    xf_a: &Transform,
    center_a: Vec3,
    radius_a: f32,
    xf_b: &Transform,
    center_b: Vec3,
    radius_b: f32,
    fallback_normal: Vec3,
    key: u32,
) -> Manifold {
    let d = center_b - center_a;
    let distance = d.length();
    if distance - radius_a - radius_b > SPECULATIVE_DISTANCE {
        return Manifold::default();
    }

    let normal = if distance > f32::EPSILON {
        d / distance
    } else {
        fallback_normal
    };
    let mut manifold = Manifold::new(xf_a, normal);
    manifold.add_point(
        xf_a,
        xf_b,
        center_a + radius_a * normal,
        center_b - radius_b * normal,
        key,
    );
    manifold
}

pub fn collide_spheres(xf_a: &Transform, a: &Sphere, xf_b: &Transform, b: &Sphere) -> Manifold {
    let center_a = xf_a.transform_point(a.center);
    let center_b = xf_b.transform_point(b.center);
    point_contact(xf_a, center_a, a.radius, xf_b, center_b, b.radius, Vec3::Y, 0)
}

pub fn collide_capsule_and_sphere(
    xf_a: &Transform,
    a: &Capsule,
    xf_b: &Transform,
    b: &Sphere,
) -> Manifold {
    let p = xf_a.transform_point(a.vertices[0]);
    let q = xf_a.transform_point(a.vertices[1]);
    let center_b = xf_b.transform_point(b.center);
    let center_a = closest_point_on_segment(center_b, p, q);
    let fallback = (q - p).try_normalize().map_or(Vec3::Y, |axis| axis.any_orthonormal_vector());
    point_contact(xf_a, center_a, a.radius, xf_b, center_b, b.radius, fallback, 0)
}

pub fn collide_capsules(xf_a: &Transform, a: &Capsule, xf_b: &Transform, b: &Capsule) -> Manifold {
    let pa = xf_a.transform_point(a.vertices[0]);
    let qa = xf_a.transform_point(a.vertices[1]);
    let pb = xf_b.transform_point(b.vertices[0]);
    let qb = xf_b.transform_point(b.vertices[1]);
    let ea = qa - pa;
    let eb = qb - pb;
    let la = ea.length();
    let lb = eb.length();

    // Parallel segments rest on each other along a span: two points.
    if la > LINEAR_SLOP
        && lb > LINEAR_SLOP
        && ea.cross(eb).length() < PARALLEL_TOLERANCE * la * lb
    {
        if let Some(manifold) = collide_parallel_capsules(xf_a, a, pa, qa, xf_b, b) {
            return manifold;
        }
    }

    let (center_a, center_b) = closest_points_on_segments(pa, qa, pb, qb);
    let fallback = ea
        .cross(eb)
        .try_normalize()
        .or_else(|| ea.try_normalize().map(|axis| axis.any_orthonormal_vector()))
        .unwrap_or(Vec3::Y);
    point_contact(xf_a, center_a, a.radius, xf_b, center_b, b.radius, fallback, 0)
}

fn collide_parallel_capsules(
    xf_a: &Transform,
    a: &Capsule,
    pa: Vec3,
    qa: Vec3,
    xf_b: &Transform,
    b: &Capsule,
) -> Option<Manifold> {
    let edge_b = build_edge(xf_b, b);
    let mut clipped = [ClipVertex::default(); 2];
    if clip_edge_to_capsule(&mut clipped, &edge_b, xf_a, a) < 2 {
        return None;
    }

    let on_a = closest_point_on_segment(clipped[0].position, pa, qa);
    let normal = (clipped[0].position - on_a).try_normalize()?;
    let radius = a.radius + b.radius;

    let mut manifold = Manifold::new(xf_a, normal);
    for v in &clipped {
        let on_a = closest_point_on_segment(v.position, pa, qa);
        let separation = (v.position - on_a).dot(normal) - radius;
        if separation <= SPECULATIVE_DISTANCE {
            manifold.add_point(
                xf_a,
                xf_b,
                on_a + a.radius * normal,
                v.position - b.radius * normal,
                make_key(v.pair.swapped()),
            );
        }
    }
    (!manifold.is_empty()).then_some(manifold)
}

pub fn collide_hull_and_sphere(
    xf_a: &Transform,
    a: &Hull,
    xf_b: &Transform,
    b: &Sphere,
    cache: &mut SimplexCache,
) -> Manifold {
    let out = gjk_cached(xf_a, a, xf_b, b, cache);
    let center_b = xf_b.transform_point(b.center);

    if out.distance > CORE_OVERLAP_TOLERANCE {
        if out.distance - b.radius > SPECULATIVE_DISTANCE {
            return Manifold::default();
        }
        let normal = (out.point_b - out.point_a) / out.distance;
        let mut manifold = Manifold::new(xf_a, normal);
        manifold.add_point(xf_a, xf_b, out.point_a, center_b - b.radius * normal, 0);
        return manifold;
    }

    // The center is inside the hull: push out through the nearest face.
    let local = xf_a.inverse_transform_point(center_b);
    let (face, separation) = a
        .planes
        .iter()
        .enumerate()
        .map(|(i, plane)| (i, plane.distance(local)))
        .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

    let normal = xf_a.transform_vector(a.planes[face].normal);
    let mut manifold = Manifold::new(xf_a, normal);
    manifold.add_point(
        xf_a,
        xf_b,
        center_b - separation * normal,
        center_b - b.radius * normal,
        make_key(make_pair(face, NULL_EDGE as usize, face, NULL_EDGE as usize)),
    );
    manifold
}

pub fn collide_hull_and_capsule(
    xf_a: &Transform,
    a: &Hull,
    xf_b: &Transform,
    b: &Capsule,
    cache: &mut SimplexCache,
) -> Manifold {
    let out = gjk_cached(xf_a, a, xf_b, b, cache);
    if out.distance > b.radius + SPECULATIVE_DISTANCE {
        return Manifold::default();
    }

    let pb = xf_b.transform_point(b.vertices[0]);
    let qb = xf_b.transform_point(b.vertices[1]);

    if out.distance > CORE_OVERLAP_TOLERANCE {
        let normal = (out.point_b - out.point_a) / out.distance;

        // A segment lying flat on the supporting face touches along a span.
        let face = a.support_face(xf_a.inverse_transform_vector(normal));
        let face_normal = xf_a.transform_vector(a.planes[face].normal);
        let axis = (qb - pb).normalize_or_zero();
        if face_normal.dot(normal) > 0.99
            && axis.dot(face_normal).abs() < PARALLEL_TOLERANCE * 10.0
        {
            let manifold = capsule_face_contact(xf_a, a, face, xf_b, b);
            if !manifold.is_empty() {
                return manifold;
            }
        }

        let mut manifold = Manifold::new(xf_a, normal);
        manifold.add_point(xf_a, xf_b, out.point_a, out.point_b - b.radius * normal, 0);
        return manifold;
    }

    // The core segment penetrates the hull.
    let xf = xf_a.inverse_mul(xf_b);
    let p = xf.transform_point(b.vertices[0]);
    let q = xf.transform_point(b.vertices[1]);

    let (face, face_separation) = a
        .planes
        .iter()
        .enumerate()
        .map(|(i, plane)| (i, plane.distance(p).min(plane.distance(q))))
        .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

    let segment = q - p;
    let mut edge_query: Option<(usize, f32, Vec3)> = None;
    for e in (0..a.edges.len()).step_by(2) {
        let v1 = a.vertex(a.edges[e].origin as usize);
        let v2 = a.vertex(a.edges[e + 1].origin as usize);
        let edge = v2 - v1;
        let cross = edge.cross(segment);
        let length = cross.length();
        if length < PARALLEL_TOLERANCE * edge.length() * segment.length() {
            continue;
        }
        let mut axis = cross / length;
        if axis.dot(v1 - a.centroid) < 0.0 {
            axis = -axis;
        }
        let hull_max = a.vertex(a.support_vertex(axis)).dot(axis);
        let separation = axis.dot(p).min(axis.dot(q)) - hull_max;
        if edge_query.map_or(true, |(_, best, _)| separation > best) {
            edge_query = Some((e, separation, axis));
        }
    }

    if let Some((e, separation, axis)) = edge_query {
        if separation > REL_EDGE_TOLERANCE * face_separation + ABS_TOLERANCE {
            let v1 = xf_a.transform_point(a.vertex(a.edges[e].origin as usize));
            let v2 = xf_a.transform_point(a.vertex(a.edges[e + 1].origin as usize));
            let (on_a, on_b) = closest_points_on_segments(v1, v2, pb, qb);
            let normal = xf_a.transform_vector(axis);
            let mut manifold = Manifold::new(xf_a, normal);
            manifold.add_point(
                xf_a,
                xf_b,
                on_a,
                on_b - b.radius * normal,
                make_key(make_pair(e, NULL_EDGE as usize, e, NULL_EDGE as usize)),
            );
            return manifold;
        }
    }

    let manifold = capsule_face_contact(xf_a, a, face, xf_b, b);
    if !manifold.is_empty() {
        return manifold;
    }

    // Clipping culled the segment: use its deepest end.
    let plane = a.planes[face].transformed(xf_a);
    let deepest = if plane.distance(pb) < plane.distance(qb) { pb } else { qb };
    let mut manifold = Manifold::new(xf_a, plane.normal);
    manifold.add_point(
        xf_a,
        xf_b,
        plane.project(deepest),
        deepest - b.radius * plane.normal,
        make_key(make_pair(face, NULL_EDGE as usize, face, NULL_EDGE as usize)),
    );
    manifold
}

/// Clip the capsule segment to a hull face and keep the close points.
fn capsule_face_contact(
    xf_a: &Transform,
    a: &Hull,
    face: usize,
    xf_b: &Transform,
    b: &Capsule,
) -> Manifold {
    let plane = a.planes[face].transformed(xf_a);
    let edge = build_edge(xf_b, b);
    let mut clipped = [ClipVertex::default(); 2];
    let mut manifold = Manifold::new(xf_a, plane.normal);
    if clip_edge_to_face(&mut clipped, &edge, xf_a, face, a) < 2 {
        return manifold;
    }

    for v in &clipped {
        let distance = plane.distance(v.position);
        if distance - b.radius <= SPECULATIVE_DISTANCE {
            manifold.add_point(
                xf_a,
                xf_b,
                v.position - distance * plane.normal,
                v.position - b.radius * plane.normal,
                make_key(v.pair.swapped()),
            );
        }
    }
    manifold
}

#[derive(Debug, Clone, Copy)]
struct FaceQuery {
    index: usize,
    separation: f32,
}

#[derive(Debug, Clone, Copy)]
struct EdgeQuery {
    index1: usize,
    index2: usize,
    separation: f32,
    /// Separating axis in hull 1's frame, pointing from hull 1 to hull 2.
    axis: Vec3,
}

/// Deepest face of `hull1` against `hull2`. `xf` maps hull 2 into hull 1.
fn query_face_directions(hull1: &Hull, xf: &Transform, hull2: &Hull) -> FaceQuery {
    let mut best = FaceQuery {
        index: 0,
        separation: f32::MIN,
    };
    for (i, plane) in hull1.planes.iter().enumerate() {
        let support = hull2.support_vertex(xf.inverse_transform_vector(-plane.normal));
        let separation = plane.distance(xf.transform_point(hull2.vertex(support)));
        if separation > best.separation {
            best = FaceQuery {
                index: i,
                separation,
            };
        }
    }
    best
}

/// Whether arcs `ab` and `cd` on the Gauss map intersect, i.e. the edge
/// pair builds a face of the Minkowski difference.
fn is_minkowski_face(a: Vec3, b: Vec3, c: Vec3, d: Vec3) -> bool {
    let bxa = b.cross(a);
    let dxc = d.cross(c);

    let cba = c.dot(bxa);
    let dba = d.dot(bxa);
    let adc = a.dot(dxc);
    let bdc = b.dot(dxc);

    cba * dba < 0.0 && adc * bdc < 0.0 && cba * bdc > 0.0
}

/// Separation of two edges along their common normal, oriented away from
/// `centroid1`. Parallel edges return `None`.
fn project_edges(p1: Vec3, e1: Vec3, p2: Vec3, e2: Vec3, centroid1: Vec3) -> Option<(f32, Vec3)> {
    let e1_x_e2 = e1.cross(e2);
    let length = e1_x_e2.length();
    if length < PARALLEL_TOLERANCE * (e1.length_squared() * e2.length_squared()).sqrt() {
        return None;
    }

    let mut n = e1_x_e2 / length;
    if n.dot(p1 - centroid1) < 0.0 {
        n = -n;
    }
    Some((n.dot(p2 - p1), n))
}

/// Best edge pair. `xf` maps hull 2 into hull 1.
fn query_edge_directions(hull1: &Hull, xf: &Transform, hull2: &Hull) -> Option<EdgeQuery> {
    let mut best: Option<EdgeQuery> = None;

    for i in (0..hull1.edges.len()).step_by(2) {
        let edge1 = hull1.edge(i);
        let twin1 = hull1.edge(i + 1);
        let p1 = hull1.vertex(edge1.origin as usize);
        let q1 = hull1.vertex(twin1.origin as usize);
        let u1 = hull1.plane(edge1.face as usize).normal;
        let v1 = hull1.plane(twin1.face as usize).normal;

        for j in (0..hull2.edges.len()).step_by(2) {
            let edge2 = hull2.edge(j);
            let twin2 = hull2.edge(j + 1);
            let p2 = xf.transform_point(hull2.vertex(edge2.origin as usize));
            let q2 = xf.transform_point(hull2.vertex(twin2.origin as usize));
            let u2 = xf.transform_vector(hull2.plane(edge2.face as usize).normal);
            let v2 = xf.transform_vector(hull2.plane(twin2.face as usize).normal);

            if !is_minkowski_face(u1, v1, -u2, -v2) {
                continue;
            }

            let Some((separation, axis)) = project_edges(p1, q1 - p1, p2, q2 - p2, hull1.centroid)
            else {
                continue;
            };

            if best.map_or(true, |b| separation > b.separation) {
                best = Some(EdgeQuery {
                    index1: i,
                    index2: j,
                    separation,
                    axis,
                });
            }
        }
    }

    best
}

pub fn collide_hulls(
    xf_a: &Transform,
    a: &Hull,
    xf_b: &Transform,
    b: &Hull,
    cache: &mut SimplexCache,
) -> Manifold {
    let out = gjk_cached(xf_a, a, xf_b, b, cache);
    if out.distance > SPECULATIVE_DISTANCE {
        return Manifold::default();
    }

    let xf = xf_a.inverse_mul(xf_b);
    let face_a = query_face_directions(a, &xf, b);
    if face_a.separation > SPECULATIVE_DISTANCE {
        return Manifold::default();
    }

    let xf_inv = xf.inverse();
    let face_b = query_face_directions(b, &xf_inv, a);
    if face_b.separation > SPECULATIVE_DISTANCE {
        return Manifold::default();
    }

    let edge = query_edge_directions(a, &xf, b);
    if let Some(edge) = edge {
        if edge.separation > SPECULATIVE_DISTANCE {
            return Manifold::default();
        }
        let face_separation = face_a.separation.max(face_b.separation);
        if edge.separation > REL_EDGE_TOLERANCE * face_separation + ABS_TOLERANCE {
            return edge_contact(xf_a, a, xf_b, b, &edge);
        }
    }

    if face_b.separation > REL_FACE_TOLERANCE * face_a.separation + ABS_TOLERANCE {
        face_contact(xf_b, b, face_b.index, xf_a, a, true)
    } else {
        face_contact(xf_a, a, face_a.index, xf_b, b, false)
    }
}

fn edge_contact(
    xf_a: &Transform,
    a: &Hull,
    xf_b: &Transform,
    b: &Hull,
    query: &EdgeQuery,
) -> Manifold {
    let p1 = xf_a.transform_point(a.vertex(a.edge(query.index1).origin as usize));
    let q1 = xf_a.transform_point(a.vertex(a.edge(query.index1 + 1).origin as usize));
    let p2 = xf_b.transform_point(b.vertex(b.edge(query.index2).origin as usize));
    let q2 = xf_b.transform_point(b.vertex(b.edge(query.index2 + 1).origin as usize));

    let (on_a, on_b) = closest_points_on_segments(p1, q1, p2, q2);
    let normal = xf_a.transform_vector(query.axis);

    let mut manifold = Manifold::new(xf_a, normal);
    let pair = make_pair(query.index1, query.index2, query.index1 + 1, query.index2 + 1);
    manifold.add_point(xf_a, xf_b, on_a, on_b, make_key(pair));
    manifold
}

struct Candidate {
    position: Vec3,
    separation: f32,
    pair: FeaturePair,
}

/// Clip the incident face of `incident` against `face` of `reference`.
/// `flip` is set when the reference hull is B.
fn face_contact(
    xf_ref: &Transform,
    reference: &Hull,
    face: usize,
    xf_inc: &Transform,
    incident: &Hull,
    flip: bool,
) -> Manifold {
    let plane = reference.planes[face].transformed(xf_ref);
    let n = plane.normal;
    let incident_face = incident.support_face(xf_inc.inverse_transform_vector(-n));

    let mut polygon = ClipPolygon::new();
    build_polygon(&mut polygon, xf_inc, incident_face, incident);
    let mut clipped = ClipPolygon::new();
    clip_polygon_to_face(&mut clipped, &polygon, xf_ref, face, reference);

    let candidates: Vec<Candidate> = clipped
        .iter()
        .filter_map(|v| {
            let separation = plane.distance(v.position);
            (separation <= SPECULATIVE_DISTANCE).then_some(Candidate {
                position: v.position,
                separation,
                pair: v.pair,
            })
        })
        .collect();

    let (xf_a, xf_b) = if flip { (xf_inc, xf_ref) } else { (xf_ref, xf_inc) };
    let mut manifold = Manifold::new(xf_a, if flip { -n } else { n });

    for &i in reduce_points(&candidates, n).iter() {
        let c = &candidates[i];
        let on_reference = c.position - c.separation * n;
        if flip {
            manifold.add_point(xf_a, xf_b, c.position, on_reference, make_key(c.pair.swapped()));
        } else {
            manifold.add_point(xf_a, xf_b, on_reference, c.position, make_key(c.pair));
        }
    }
    manifold
}

/// Pick at most four points that keep the deepest contact and span the
/// largest area.
fn reduce_points(candidates: &[Candidate], normal: Vec3) -> Vec<usize> {
    if candidates.len() <= MAX_MANIFOLD_POINTS {
        return (0..candidates.len()).collect();
    }

    let deepest = candidates
        .iter()
        .enumerate()
        .fold(0, |best, (i, c)| if c.separation < candidates[best].separation { i } else { best });
    let p1 = candidates[deepest].position;

    let farthest = candidates
        .iter()
        .enumerate()
        .max_by(|(_, x), (_, y)| {
            x.position
                .distance_squared(p1)
                .total_cmp(&y.position.distance_squared(p1))
        })
        .map_or(deepest, |(i, _)| i);
    let p2 = candidates[farthest].position;

    let area = |p: Vec3| (p1 - p).cross(p2 - p).dot(normal);
    let (mut third, mut max_area) = (None, 0.0);
    let (mut fourth, mut min_area) = (None, 0.0);
    for (i, c) in candidates.iter().enumerate() {
        let s = area(c.position);
        if s > max_area {
            max_area = s;
            third = Some(i);
        }
        if s < min_area {
            min_area = s;
            fourth = Some(i);
        }
    }

    let mut selected = vec![deepest];
    for index in [Some(farthest), third, fourth].into_iter().flatten() {
        if !selected.contains(&index) {
            selected.push(index);
        }
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;
    use std::f32::consts::FRAC_PI_4;
    use std::sync::Arc;

    fn cube(half: f32) -> Shape {
        Shape::Hull(Arc::new(Hull::cuboid(Vec3::splat(half))))
    }

    #[test]
    fn test_spheres_touching() {
        let a = Shape::sphere(0.5);
        let b = Shape::sphere(0.5);
        let xf_b = Transform::from_position(Vec3::new(0.0, 0.95, 0.0));
        let m = collide(&Transform::IDENTITY, &a, &xf_b, &b, &mut SimplexCache::default());
        assert_eq!(m.point_count, 1);
        assert!((m.normal - Vec3::Y).length() < 1e-6);
        assert!((m.points[0].separation + 0.05).abs() < 1e-5);
    }

    #[test]
    fn test_spheres_far_apart() {
        let a = Shape::sphere(0.5);
        let xf_b = Transform::from_position(Vec3::new(0.0, 3.0, 0.0));
        let m = collide(&Transform::IDENTITY, &a, &xf_b, &a, &mut SimplexCache::default());
        assert!(m.is_empty());
    }

    #[test]
    fn test_box_resting_on_box() {
        let ground = Shape::cuboid(Vec3::new(5.0, 0.5, 5.0));
        let block = cube(0.5);
        let xf_ground = Transform::from_position(Vec3::new(0.0, -0.5, 0.0));
        let xf_block = Transform::from_position(Vec3::new(0.0, 0.49, 0.0));
        let mut cache = SimplexCache::default();

        let m = collide(&xf_ground, &ground, &xf_block, &block, &mut cache);
        assert_eq!(m.point_count, 4);
        assert!((m.normal - Vec3::Y).length() < 1e-5);
        for p in m.points() {
            assert!((p.separation + 0.01).abs() < 1e-4, "separation = {}", p.separation);
        }

        // Same configuration next step: identical keys.
        let again = collide(&xf_ground, &ground, &xf_block, &block, &mut cache);
        let keys: Vec<u32> = m.points().iter().map(|p| p.key).collect();
        let keys_again: Vec<u32> = again.points().iter().map(|p| p.key).collect();
        assert_eq!(keys, keys_again);

        let mut unique = keys.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn test_reversed_pair_flips_normal() {
        let ground = Shape::cuboid(Vec3::new(5.0, 0.5, 5.0));
        let block = cube(0.5);
        let xf_ground = Transform::from_position(Vec3::new(0.0, -0.5, 0.0));
        let xf_block = Transform::from_position(Vec3::new(0.0, 0.49, 0.0));

        let m = collide(&xf_block, &block, &xf_ground, &ground, &mut SimplexCache::default());
        assert_eq!(m.point_count, 4);
        assert!((m.normal - Vec3::NEG_Y).length() < 1e-5);
        for p in m.points() {
            assert!((p.separation + 0.01).abs() < 1e-4);
        }
    }

    #[test]
    fn test_crossed_edges() {
        let a = cube(0.5);
        let b = cube(0.5);
        let xf_a = Transform::new(Vec3::ZERO, Quat::from_axis_angle(Vec3::Z, FRAC_PI_4));
        let h = 0.5 * 2.0_f32.sqrt();
        let xf_b = Transform::new(
            Vec3::new(0.0, 2.0 * h - 0.005, 0.0),
            Quat::from_axis_angle(Vec3::X, FRAC_PI_4),
        );

        let m = collide(&xf_a, &a, &xf_b, &b, &mut SimplexCache::default());
        assert_eq!(m.point_count, 1);
        assert!((m.normal - Vec3::Y).length() < 1e-3, "normal = {:?}", m.normal);
        assert!((m.points[0].separation + 0.005).abs() < 1e-3);
    }

    #[test]
    fn test_sphere_inside_hull() {
        let hull = cube(1.0);
        let sphere = Shape::sphere(0.25);
        let xf_s = Transform::from_position(Vec3::new(0.0, 0.8, 0.0));
        let m = collide(&Transform::IDENTITY, &hull, &xf_s, &sphere, &mut SimplexCache::default());
        assert_eq!(m.point_count, 1);
        assert!((m.normal - Vec3::Y).length() < 1e-5);
        assert!((m.points[0].separation + 0.45).abs() < 1e-5);
    }

    #[test]
    fn test_sphere_on_hull() {
        let hull = cube(1.0);
        let sphere = Shape::sphere(0.25);
        let xf_s = Transform::from_position(Vec3::new(0.3, 1.24, 0.0));
        let m = collide(&xf_s, &sphere, &Transform::IDENTITY, &hull, &mut SimplexCache::default());
        assert_eq!(m.point_count, 1);
        assert!((m.normal - Vec3::NEG_Y).length() < 1e-4);
        assert!((m.points[0].separation + 0.01).abs() < 1e-4);
    }

    #[test]
    fn test_parallel_capsules_two_points() {
        let a = Shape::capsule(1.0, 0.25);
        let b = Shape::capsule(1.0, 0.25);
        let xf_b = Transform::from_position(Vec3::new(0.49, 0.5, 0.0));
        let m = collide(&Transform::IDENTITY, &a, &xf_b, &b, &mut SimplexCache::default());
        assert_eq!(m.point_count, 2);
        assert!((m.normal - Vec3::X).length() < 1e-5);
        for p in m.points() {
            assert!((p.separation + 0.01).abs() < 1e-5);
        }
        assert_ne!(m.points[0].key, m.points[1].key);
    }

    #[test]
    fn test_crossed_capsules_one_point() {
        let a = Shape::capsule(1.0, 0.25);
        let b = Shape::capsule(1.0, 0.25);
        let xf_b = Transform::new(
            Vec3::new(0.0, 0.0, 0.5),
            Quat::from_axis_angle(Vec3::Z, std::f32::consts::FRAC_PI_2),
        );
        let m = collide(&Transform::IDENTITY, &a, &xf_b, &b, &mut SimplexCache::default());
        assert_eq!(m.point_count, 1);
        assert!((m.normal - Vec3::Z).length() < 1e-5);
        assert!(m.points[0].separation.abs() < 1e-5);
    }

    #[test]
    fn test_capsule_lying_on_box() {
        let ground = Shape::cuboid(Vec3::new(5.0, 0.5, 5.0));
        let capsule = Shape::capsule(1.0, 0.25);
        let xf_ground = Transform::from_position(Vec3::new(0.0, -0.5, 0.0));
        let xf_capsule = Transform::new(
            Vec3::new(0.0, 0.24, 0.0),
            Quat::from_axis_angle(Vec3::Z, std::f32::consts::FRAC_PI_2),
        );
        let m = collide(&xf_ground, &ground, &xf_capsule, &capsule, &mut SimplexCache::default());
        assert_eq!(m.point_count, 2);
        assert!((m.normal - Vec3::Y).length() < 1e-4);
        for p in m.points() {
            assert!((p.separation + 0.01).abs() < 1e-4);
        }
    }

    #[test]
    fn test_capsule_penetrating_box() {
        let ground = Shape::cuboid(Vec3::new(5.0, 0.5, 5.0));
        let capsule = Shape::capsule(0.5, 0.1);
        let xf_ground = Transform::from_position(Vec3::new(0.0, -0.5, 0.0));
        // Upright capsule whose lower end sits 0.05 below the surface.
        let xf_capsule = Transform::from_position(Vec3::new(0.0, 0.45, 0.0));
        let m = collide(&xf_ground, &ground, &xf_capsule, &capsule, &mut SimplexCache::default());
        assert_eq!(m.point_count, 1);
        assert!((m.normal - Vec3::Y).length() < 1e-4);
        assert!((m.points[0].separation + 0.15).abs() < 1e-4);
    }

    #[test]
    fn test_reduce_points_keeps_four() {
        let candidates: Vec<Candidate> = (0..8)
            .map(|i| {
                let angle = i as f32 * std::f32::consts::TAU / 8.0;
                Candidate {
                    position: Vec3::new(angle.cos(), 0.0, angle.sin()),
                    separation: if i == 3 { -0.2 } else { -0.1 },
                    pair: FeaturePair::default(),
                }
            })
            .collect();
        let selected = reduce_points(&candidates, Vec3::Y);
        assert_eq!(selected.len(), 4);
        assert_eq!(selected[0], 3);
    }
}
