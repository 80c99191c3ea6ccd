//! GJK closest-point and distance queries between convex proxies.
//!
//! The simplex lives in the Minkowski difference `B − A`. Each iteration
//! reduces the simplex to the smallest subset supporting the point nearest
//! the origin, then grows it along the search direction. A [`SimplexCache`]
//! carries the final support indices across steps so a pair that barely
//! moved converges in one or two iterations.

use glam::Vec3;
use tracing::trace;

use super::hull::Hull;
use super::shapes::{Capsule, Sphere};
use crate::geometry::{barycentric_segment, barycentric_tetrahedron, barycentric_triangle};
use crate::math::Transform;
use crate::settings::{GJK_MAX_ITERATIONS, GJK_TOLERANCE};

/// A convex shape seen by GJK: a vertex set plus a rounding radius.
///
/// Vertices and directions are in the proxy's local frame.
pub trait GjkProxy {
    fn vertex_count(&self) -> usize;

    fn vertex(&self, index: usize) -> Vec3;

    /// Index of the vertex farthest along `direction`.
    fn support_index(&self, direction: Vec3) -> usize {
        let mut best = 0;
        let mut best_dot = f32::NEG_INFINITY;
        for i in 0..self.vertex_count() {
            let d = self.vertex(i).dot(direction);
            if d > best_dot {
                best = i;
                best_dot = d;
            }
        }
        best
    }

    fn radius(&self) -> f32;
}

impl GjkProxy for Sphere {
    fn vertex_count(&self) -> usize {
        1
    }

    fn vertex(&self, _index: usize) -> Vec3 {
        self.center
    }

    fn support_index(&self, _direction: Vec3) -> usize {
        0
    }

    fn radius(&self) -> f32 {
        self.radius
    }
}

impl GjkProxy for Capsule {
    fn vertex_count(&self) -> usize {
        2
    }

    fn vertex(&self, index: usize) -> Vec3 {
        self.vertices[index]
    }

    fn support_index(&self, direction: Vec3) -> usize {
        if self.vertices[1].dot(direction) > self.vertices[0].dot(direction) {
            1
        } else {
            0
        }
    }

    fn radius(&self) -> f32 {
        self.radius
    }
}

impl GjkProxy for Hull {
    fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    fn vertex(&self, index: usize) -> Vec3 {
        self.vertices[index]
    }

    fn support_index(&self, direction: Vec3) -> usize {
        self.support_vertex(direction)
    }

    fn radius(&self) -> f32 {
        0.0
    }
}

/// A bare point cloud with no rounding.
impl GjkProxy for [Vec3] {
    fn vertex_count(&self) -> usize {
        self.len()
    }

    fn vertex(&self, index: usize) -> Vec3 {
        self[index]
    }

    fn radius(&self) -> f32 {
        0.0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SimplexVertex {
    /// Support point on A, world space.
    pub point_a: Vec3,
    /// Support point on B, world space.
    pub point_b: Vec3,
    /// `point_b - point_a`.
    pub point: Vec3,
    /// Barycentric weight of `point` in the closest point.
    pub weight: f32,
    pub index_a: usize,
    pub index_b: usize,
}

/// Support indices persisted between GJK calls for one proxy pair.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimplexCache {
    /// Length, area or volume of the cached simplex.
    pub metric: f32,
    pub count: u8,
    pub index_a: [u8; 4],
    pub index_b: [u8; 4],
}

impl SimplexCache {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Simplex {
    pub vertices: [SimplexVertex; 4],
    pub count: usize,
}

impl Simplex {
    /// Seed the simplex from `cache`, or from the first vertex of each proxy
    /// when the cache is empty or no longer describes the pair.
    pub fn read_cache<A, B>(
        cache: &SimplexCache,
        xf_a: &Transform,
        proxy_a: &A,
        xf_b: &Transform,
        proxy_b: &B,
    ) -> Self
    where
        A: GjkProxy + ?Sized,
        B: GjkProxy + ?Sized,
    {
        let mut simplex = Simplex::default();

        let count = (cache.count as usize).min(4);
        for i in 0..count {
            let index_a = cache.index_a[i] as usize;
            let index_b = cache.index_b[i] as usize;
            if index_a >= proxy_a.vertex_count() || index_b >= proxy_b.vertex_count() {
                simplex.count = 0;
                break;
            }
            simplex.vertices[i] = make_vertex(xf_a, proxy_a, index_a, xf_b, proxy_b, index_b);
            simplex.count = i + 1;
        }

        // Flush when the simplex shape changed too much.
        if simplex.count > 1 {
            let metric1 = cache.metric;
            let metric2 = simplex.metric();
            if metric2 < 0.5 * metric1 || 2.0 * metric1 < metric2 || metric2 < f32::EPSILON {
                simplex.count = 0;
            }
        }

        if simplex.count == 0 {
            simplex.vertices[0] = make_vertex(xf_a, proxy_a, 0, xf_b, proxy_b, 0);
            simplex.count = 1;
        }

        for v in &mut simplex.vertices[..simplex.count] {
            v.weight = 1.0;
        }
        simplex
    }

    /// Store support indices in `cache`. Proxies with indices past `u8`
    /// leave the cache empty so the next call starts cold.
    pub fn write_cache(&self, cache: &mut SimplexCache) {
        cache.metric = self.metric();
        cache.count = self.count as u8;
        for (i, v) in self.vertices[..self.count].iter().enumerate() {
            match (u8::try_from(v.index_a), u8::try_from(v.index_b)) {
                (Ok(a), Ok(b)) => {
                    cache.index_a[i] = a;
                    cache.index_b[i] = b;
                }
                _ => {
                    cache.reset();
                    return;
                }
            }
        }
    }

    /// Size of the simplex, used to validate cache reuse.
    pub fn metric(&self) -> f32 {
        let v = &self.vertices;
        match self.count {
            2 => v[0].point.distance(v[1].point),
            3 => (v[1].point - v[0].point)
                .cross(v[2].point - v[0].point)
                .length(),
            4 => {
                let ab = v[1].point - v[0].point;
                let ac = v[2].point - v[0].point;
                let ad = v[3].point - v[0].point;
                ab.dot(ac.cross(ad)).abs()
            }
            _ => 0.0,
        }
    }

    /// Direction from the simplex toward the origin.
    pub fn search_direction(&self) -> Vec3 {
        let v = &self.vertices;
        match self.count {
            1 => -v[0].point,
            2 => {
                let ab = v[1].point - v[0].point;
                let ao = -v[0].point;
                ab.cross(ao).cross(ab)
            }
            3 => {
                let n = (v[1].point - v[0].point).cross(v[2].point - v[0].point);
                if n.dot(-v[0].point) > 0.0 {
                    n
                } else {
                    -n
                }
            }
            _ => Vec3::ZERO,
        }
    }

    /// Point of the simplex closest to the origin.
    pub fn closest_point(&self) -> Vec3 {
        match self.count {
            1..=3 => self.vertices[..self.count]
                .iter()
                .map(|v| v.weight * v.point)
                .sum(),
            _ => Vec3::ZERO,
        }
    }

    /// Witness points on A and B.
    pub fn closest_points(&self) -> (Vec3, Vec3) {
        let live = &self.vertices[..self.count.clamp(1, 4)];
        let point_a: Vec3 = live.iter().map(|v| v.weight * v.point_a).sum();
        if self.count == 4 {
            return (point_a, point_a);
        }
        let point_b: Vec3 = live.iter().map(|v| v.weight * v.point_b).sum();
        (point_a, point_b)
    }

    /// Reduce to the point, or edge, nearest the origin.
    pub fn solve2(&mut self) {
        let a = self.vertices[0].point;
        let b = self.vertices[1].point;
        let w = barycentric_segment(a, b, Vec3::ZERO);

        if w[1] <= 0.0 {
            self.keep1(0);
            return;
        }
        if w[0] <= 0.0 {
            self.keep1(1);
            return;
        }

        let inv = 1.0 / w[2];
        self.vertices[0].weight = w[0] * inv;
        self.vertices[1].weight = w[1] * inv;
        self.count = 2;
    }

    /// Reduce to the vertex, edge or face nearest the origin.
    pub fn solve3(&mut self) {
        let a = self.vertices[0].point;
        let b = self.vertices[1].point;
        let c = self.vertices[2].point;
        let q = Vec3::ZERO;

        let w_ab = barycentric_segment(a, b, q);
        let w_bc = barycentric_segment(b, c, q);
        let w_ca = barycentric_segment(c, a, q);

        // Vertex regions
        if w_ab[1] <= 0.0 && w_ca[0] <= 0.0 {
            self.keep1(0);
            return;
        }
        if w_ab[0] <= 0.0 && w_bc[1] <= 0.0 {
            self.keep1(1);
            return;
        }
        if w_bc[0] <= 0.0 && w_ca[1] <= 0.0 {
            self.keep1(2);
            return;
        }

        let w_abc = barycentric_triangle(a, b, c, q);

        // Edge regions
        if w_ab[0] > 0.0 && w_ab[1] > 0.0 && w_abc[2] <= 0.0 {
            self.keep2(0, 1, w_ab);
            return;
        }
        if w_bc[0] > 0.0 && w_bc[1] > 0.0 && w_abc[0] <= 0.0 {
            self.keep2(1, 2, w_bc);
            return;
        }
        if w_ca[0] > 0.0 && w_ca[1] > 0.0 && w_abc[1] <= 0.0 {
            self.keep2(2, 0, w_ca);
            return;
        }

        if w_abc[3] <= 0.0 {
            // Collinear: fall back to the first edge.
            self.count = 2;
            self.solve2();
            return;
        }

        let inv = 1.0 / w_abc[3];
        for i in 0..3 {
            self.vertices[i].weight = w_abc[i] * inv;
        }
        self.count = 3;
    }

    /// Reduce to the vertex, edge, face or tetrahedron nearest the origin.
    pub fn solve4(&mut self) {
        let a = self.vertices[0].point;
        let b = self.vertices[1].point;
        let c = self.vertices[2].point;
        let d = self.vertices[3].point;
        let q = Vec3::ZERO;

        let w_ab = barycentric_segment(a, b, q);
        let w_ac = barycentric_segment(a, c, q);
        let w_ad = barycentric_segment(a, d, q);
        let w_bc = barycentric_segment(b, c, q);
        let w_cd = barycentric_segment(c, d, q);
        let w_db = barycentric_segment(d, b, q);

        // Vertex regions
        if w_ab[1] <= 0.0 && w_ac[1] <= 0.0 && w_ad[1] <= 0.0 {
            self.keep1(0);
            return;
        }
        if w_ab[0] <= 0.0 && w_db[0] <= 0.0 && w_bc[1] <= 0.0 {
            self.keep1(1);
            return;
        }
        if w_ac[0] <= 0.0 && w_bc[0] <= 0.0 && w_cd[1] <= 0.0 {
            self.keep1(2);
            return;
        }
        if w_ad[0] <= 0.0 && w_cd[0] <= 0.0 && w_db[1] <= 0.0 {
            self.keep1(3);
            return;
        }

        let w_acb = barycentric_triangle(a, c, b, q);
        let w_abd = barycentric_triangle(a, b, d, q);
        let w_adc = barycentric_triangle(a, d, c, q);
        let w_bcd = barycentric_triangle(b, c, d, q);

        // Edge regions
        if w_abd[2] <= 0.0 && w_acb[1] <= 0.0 && w_ab[0] > 0.0 && w_ab[1] > 0.0 {
            self.keep2(0, 1, w_ab);
            return;
        }
        if w_acb[2] <= 0.0 && w_adc[1] <= 0.0 && w_ac[0] > 0.0 && w_ac[1] > 0.0 {
            self.keep2(0, 2, w_ac);
            return;
        }
        if w_adc[2] <= 0.0 && w_abd[1] <= 0.0 && w_ad[0] > 0.0 && w_ad[1] > 0.0 {
            self.keep2(0, 3, w_ad);
            return;
        }
        if w_acb[0] <= 0.0 && w_bcd[2] <= 0.0 && w_bc[0] > 0.0 && w_bc[1] > 0.0 {
            self.keep2(1, 2, w_bc);
            return;
        }
        if w_adc[0] <= 0.0 && w_bcd[0] <= 0.0 && w_cd[0] > 0.0 && w_cd[1] > 0.0 {
            self.keep2(2, 3, w_cd);
            return;
        }
        if w_abd[0] <= 0.0 && w_bcd[1] <= 0.0 && w_db[0] > 0.0 && w_db[1] > 0.0 {
            self.keep2(3, 1, w_db);
            return;
        }

        let w_abcd = barycentric_tetrahedron(a, b, c, d, q);

        // Face regions
        if w_abcd[3] <= 0.0 && w_acb.iter().take(3).all(|&w| w > 0.0) {
            self.keep3([0, 2, 1], w_acb);
            return;
        }
        if w_abcd[2] <= 0.0 && w_abd.iter().take(3).all(|&w| w > 0.0) {
            self.keep3([0, 1, 3], w_abd);
            return;
        }
        if w_abcd[1] <= 0.0 && w_adc.iter().take(3).all(|&w| w > 0.0) {
            self.keep3([0, 3, 2], w_adc);
            return;
        }
        if w_abcd[0] <= 0.0 && w_bcd.iter().take(3).all(|&w| w > 0.0) {
            self.keep3([1, 2, 3], w_bcd);
            return;
        }

        if w_abcd[4] <= 0.0 {
            // Flat tetrahedron: fall back to its first face.
            self.count = 3;
            self.solve3();
            return;
        }

        // The origin is enclosed.
        let inv = 1.0 / w_abcd[4];
        for i in 0..4 {
            self.vertices[i].weight = w_abcd[i] * inv;
        }
        self.count = 4;
    }

    fn keep1(&mut self, i: usize) {
        self.vertices[0] = self.vertices[i];
        self.vertices[0].weight = 1.0;
        self.count = 1;
    }

    fn keep2(&mut self, i: usize, j: usize, w: [f32; 3]) {
        let (vi, vj) = (self.vertices[i], self.vertices[j]);
        let inv = 1.0 / w[2];
        self.vertices[0] = vi;
        self.vertices[1] = vj;
        self.vertices[0].weight = w[0] * inv;
        self.vertices[1].weight = w[1] * inv;
        self.count = 2;
    }

    fn keep3(&mut self, order: [usize; 3], w: [f32; 4]) {
        let picked = order.map(|i| self.vertices[i]);
        let inv = 1.0 / w[3];
        for (slot, (v, weight)) in picked.into_iter().zip(w).enumerate() {
            self.vertices[slot] = v;
            self.vertices[slot].weight = weight * inv;
        }
        self.count = 3;
    }
}

fn make_vertex<A, B>(
    xf_a: &Transform,
    proxy_a: &A,
    index_a: usize,
    xf_b: &Transform,
    proxy_b: &B,
    index_b: usize,
) -> SimplexVertex
where
    A: GjkProxy + ?Sized,
    B: GjkProxy + ?Sized,
{
    let point_a = xf_a.transform_point(proxy_a.vertex(index_a));
    let point_b = xf_b.transform_point(proxy_b.vertex(index_b));
    SimplexVertex {
        point_a,
        point_b,
        point: point_b - point_a,
        weight: 1.0,
        index_a,
        index_b,
    }
}

/// Result of a GJK query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GjkOutput {
    /// Closest point on A, world space.
    pub point_a: Vec3,
    /// Closest point on B, world space.
    pub point_b: Vec3,
    /// Distance between the cores. Zero means the cores overlap.
    pub distance: f32,
    pub iterations: u32,
}

impl GjkOutput {
    /// Account for rounding radii: move the witness points onto the rounded
    /// surfaces. When the rounded shapes overlap both points collapse to the
    /// midpoint and the distance becomes zero.
    pub fn apply_radii(&mut self, radius_a: f32, radius_b: f32) {
        let total = radius_a + radius_b;
        if self.distance > total && self.distance > f32::EPSILON {
            let n = (self.point_b - self.point_a) / self.distance;
            self.point_a += radius_a * n;
            self.point_b -= radius_b * n;
            self.distance -= total;
        } else {
            let p = 0.5 * (self.point_a + self.point_b);
            self.point_a = p;
            self.point_b = p;
            self.distance = 0.0;
        }
    }
}

/// Closest points between two proxies, starting from an empty cache.
pub fn gjk<A, B>(xf_a: &Transform, proxy_a: &A, xf_b: &Transform, proxy_b: &B) -> GjkOutput
where
    A: GjkProxy + ?Sized,
    B: GjkProxy + ?Sized,
{
    let mut cache = SimplexCache::default();
    gjk_cached(xf_a, proxy_a, xf_b, proxy_b, &mut cache)
}

/// Closest points between two proxies. The simplex is seeded from `cache`
/// and the final simplex is written back to it.
pub fn gjk_cached<A, B>(
    xf_a: &Transform,
    proxy_a: &A,
    xf_b: &Transform,
    proxy_b: &B,
    cache: &mut SimplexCache,
) -> GjkOutput
where
    A: GjkProxy + ?Sized,
    B: GjkProxy + ?Sized,
{
    let mut simplex = Simplex::read_cache(cache, xf_a, proxy_a, xf_b, proxy_b);

    let mut save_a = [0usize; 4];
    let mut save_b = [0usize; 4];
    let mut dist_sq1 = f32::MAX;
    let mut iterations = 0;

    while iterations < GJK_MAX_ITERATIONS {
        let save_count = simplex.count;
        for i in 0..save_count {
            save_a[i] = simplex.vertices[i].index_a;
            save_b[i] = simplex.vertices[i].index_b;
        }

        match simplex.count {
            2 => simplex.solve2(),
            3 => simplex.solve3(),
            4 => simplex.solve4(),
            _ => {}
        }

        if simplex.count == 4 {
            break;
        }

        let p = simplex.closest_point();
        let dist_sq2 = p.length_squared();
        if dist_sq2 >= dist_sq1 || dist_sq2 <= f32::EPSILON * f32::EPSILON {
            break;
        }
        dist_sq1 = dist_sq2;

        let mut d = simplex.search_direction();
        if d.length_squared() <= f32::EPSILON * f32::EPSILON {
            d = -p;
        }

        let index_a = proxy_a.support_index(xf_a.inverse_transform_vector(-d));
        let index_b = proxy_b.support_index(xf_b.inverse_transform_vector(d));
        let vertex = make_vertex(xf_a, proxy_a, index_a, xf_b, proxy_b, index_b);

        iterations += 1;

        // A repeated support pair means the simplex cannot grow.
        let repeated = (0..save_count).any(|i| save_a[i] == index_a && save_b[i] == index_b);
        if repeated {
            break;
        }

        // No progress toward the origin along `d`.
        let d_len = d.length();
        if d.dot(vertex.point - p) <= GJK_TOLERANCE * d_len {
            break;
        }

        simplex.vertices[simplex.count] = vertex;
        simplex.count += 1;
    }

    if iterations == GJK_MAX_ITERATIONS {
        trace!(iterations, "gjk reached the iteration cap");
    }

    let (point_a, point_b) = simplex.closest_points();
    simplex.write_cache(cache);

    GjkOutput {
        point_a,
        point_b,
        distance: point_a.distance(point_b),
        iterations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn unit_cube() -> Hull {
        Hull::cuboid(Vec3::splat(0.5))
    }

    #[test]
    fn test_separated_cubes_distance() {
        let cube = unit_cube();
        let xf_a = Transform::IDENTITY;
        let xf_b = Transform::from_position(Vec3::new(2.0, 0.0, 0.0));

        let out = gjk(&xf_a, &cube, &xf_b, &cube);
        assert!((out.distance - 1.0).abs() < 1e-5, "distance = {}", out.distance);
        assert!((out.point_a.x - 0.5).abs() < 1e-5);
        assert!((out.point_b.x - 1.5).abs() < 1e-5);
        assert!(out.iterations <= GJK_MAX_ITERATIONS);
    }

    #[test]
    fn test_same_center_cubes_overlap() {
        let cube = unit_cube();
        let out = gjk(&Transform::IDENTITY, &cube, &Transform::IDENTITY, &cube);
        assert!(out.distance.abs() < 1e-6);
        assert!(out.iterations <= GJK_MAX_ITERATIONS);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let cube = unit_cube();
        let slab = Hull::cuboid(Vec3::new(2.0, 0.25, 1.0));
        let xf_a = Transform::new(
            Vec3::new(0.3, -0.2, 0.1),
            Quat::from_axis_angle(Vec3::new(1.0, 1.0, 0.0).normalize(), 0.4),
        );
        let xf_b = Transform::new(
            Vec3::new(1.1, 4.0, -0.7),
            Quat::from_axis_angle(Vec3::Z, 1.2),
        );

        let ab = gjk(&xf_a, &cube, &xf_b, &slab);
        let ba = gjk(&xf_b, &slab, &xf_a, &cube);
        assert!(ab.distance > 0.0);
        assert!((ab.distance - ba.distance).abs() < 1e-4);
    }

    #[test]
    fn test_distance_matches_sampled_points() {
        // Point clouds: the distance between two tetrahedra is bounded by
        // every vertex pair and attained on their faces.
        let a: [Vec3; 4] = [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z];
        let b: [Vec3; 4] = [
            Vec3::new(2.0, 2.0, 2.0),
            Vec3::new(3.0, 2.0, 2.0),
            Vec3::new(2.0, 3.0, 2.0),
            Vec3::new(2.0, 2.0, 3.0),
        ];
        let out = gjk(&Transform::IDENTITY, &a[..], &Transform::IDENTITY, &b[..]);

        // Closest features: face x+y+z=1 of A and vertex (2,2,2) of B.
        let expected = (6.0 - 1.0) / 3.0_f32.sqrt();
        assert!((out.distance - expected).abs() < 1e-4, "distance = {}", out.distance);
        assert!((out.point_b - Vec3::splat(2.0)).length() < 1e-4);
        assert!((out.point_a - Vec3::splat(1.0 / 3.0)).length() < 1e-4);
    }

    #[test]
    fn test_spheres_with_radii() {
        let a = Sphere {
            center: Vec3::ZERO,
            radius: 0.5,
        };
        let b = Sphere {
            center: Vec3::ZERO,
            radius: 1.0,
        };
        let xf_b = Transform::from_position(Vec3::new(0.0, 4.0, 0.0));
        let mut out = gjk(&Transform::IDENTITY, &a, &xf_b, &b);
        assert!((out.distance - 4.0).abs() < 1e-6);

        out.apply_radii(a.radius, b.radius);
        assert!((out.distance - 2.5).abs() < 1e-6);
        assert!((out.point_a - Vec3::new(0.0, 0.5, 0.0)).length() < 1e-6);
        assert!((out.point_b - Vec3::new(0.0, 3.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_capsule_segment_distance() {
        let a = Capsule::new_y(1.0, 0.1);
        let b = Capsule {
            vertices: [Vec3::new(-1.0, 0.0, 2.0), Vec3::new(1.0, 0.0, 2.0)],
            radius: 0.1,
        };
        let out = gjk(&Transform::IDENTITY, &a, &Transform::IDENTITY, &b);
        assert!((out.distance - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_cache_warm_start() {
        let cube = unit_cube();
        let xf_a = Transform::IDENTITY;
        let xf_b = Transform::new(
            Vec3::new(1.5, 1.2, 0.3),
            Quat::from_axis_angle(Vec3::Y, 0.3),
        );

        let mut cache = SimplexCache::default();
        let cold = gjk_cached(&xf_a, &cube, &xf_b, &cube, &mut cache);
        assert!(cache.count > 0);

        let warm = gjk_cached(&xf_a, &cube, &xf_b, &cube, &mut cache);
        assert!(warm.iterations <= cold.iterations);
        assert!((warm.distance - cold.distance).abs() < 1e-5);
    }

    #[test]
    fn test_cache_with_stale_indices_is_flushed() {
        let cube = unit_cube();
        let mut cache = SimplexCache {
            metric: 1.0,
            count: 2,
            index_a: [200, 3, 0, 0],
            index_b: [1, 2, 0, 0],
        };
        let xf_b = Transform::from_position(Vec3::new(3.0, 0.0, 0.0));
        let out = gjk_cached(&Transform::IDENTITY, &cube, &xf_b, &cube, &mut cache);
        assert!((out.distance - 2.0).abs() < 1e-5);
        assert!(cache.index_a.iter().take(cache.count as usize).all(|&i| i < 8));
    }

    #[test]
    fn test_large_point_cloud_skips_cache() {
        let cloud: Vec<Vec3> = (0..300).map(|i| Vec3::new(i as f32 * 0.01, 0.0, 0.0)).collect();
        let target = [Vec3::new(10.0, 0.0, 0.0)];

        let mut cache = SimplexCache::default();
        let out = gjk_cached(
            &Transform::IDENTITY,
            cloud.as_slice(),
            &Transform::IDENTITY,
            &target[..],
            &mut cache,
        );
        assert!((out.distance - 7.01).abs() < 1e-4, "distance = {}", out.distance);
        assert_eq!(cache, SimplexCache::default());

        // A second call still finds the far vertex.
        let again = gjk_cached(
            &Transform::IDENTITY,
            cloud.as_slice(),
            &Transform::IDENTITY,
            &target[..],
            &mut cache,
        );
        assert!((again.distance - out.distance).abs() < 1e-5);
    }

    #[test]
    fn test_solve3_vertex_b_region() {
        let mut simplex = Simplex::default();
        let points = [
            Vec3::new(3.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(1.0, 3.0, 0.0),
        ];
        for (i, p) in points.into_iter().enumerate() {
            simplex.vertices[i].point = p;
            simplex.vertices[i].index_a = i;
        }
        simplex.count = 3;
        simplex.solve3();
        assert_eq!(simplex.count, 1);
        assert_eq!(simplex.vertices[0].index_a, 1);
        assert!((simplex.closest_point() - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-6);
    }
}
