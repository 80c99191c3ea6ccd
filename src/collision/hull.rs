//! Convex hulls stored as a half-edge mesh.
//!
//! Half-edges come in twin pairs at indices `2k` and `2k + 1`, so the twin of
//! edge `e` is always `e ^ 1`. All feature indices fit in a `u8`; the value
//! `0xFF` is reserved as the null feature in contact keys.

use std::collections::HashMap;

use glam::{Mat3, Vec3};
use tracing::{debug, warn};

use crate::error::{PhysicsError, Result};
use crate::geometry::Plane;
use crate::settings::MAX_HULL_FEATURES;

/// Smallest half extent a cuboid hull is built with.
pub const MIN_HALF_EXTENT: f32 = 1.0e-3;

/// A directed edge of a face loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalfEdge {
    /// Vertex this edge starts at.
    pub origin: u8,
    /// Oppositely directed edge of the neighboring face.
    pub twin: u8,
    /// Face to the left of this edge.
    pub face: u8,
    /// Next edge around `face`, counter-clockwise seen from outside.
    pub next: u8,
}

/// A hull face, represented by any one of its boundary edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HullFace {
    pub edge: u8,
}

#[derive(Debug, Clone)]
pub struct Hull {
    pub centroid: Vec3,
    pub vertices: Vec<Vec3>,
    pub edges: Vec<HalfEdge>,
    pub faces: Vec<HullFace>,
    pub planes: Vec<Plane>,
}

impl Hull {
    /// Build a hull from vertices and face loops.
    ///
    /// Each loop lists vertex indices counter-clockwise as seen from outside
    /// the hull. Every undirected edge must be shared by exactly two faces.
    pub fn from_faces(vertices: Vec<Vec3>, loops: &[&[usize]]) -> Result<Self> {
        check_count("vertices", vertices.len())?;
        check_count("faces", loops.len())?;
        if loops.len() < 4 {
            return Err(PhysicsError::DegenerateHull {
                details: format!("{} faces cannot enclose a volume", loops.len()),
            });
        }

        let mut edges: Vec<Option<HalfEdge>> = Vec::new();
        let mut pair_slots: HashMap<(usize, usize), usize> = HashMap::new();
        let mut faces = Vec::with_capacity(loops.len());
        let mut planes = Vec::with_capacity(loops.len());

        for (face_index, face_loop) in loops.iter().enumerate() {
            if face_loop.len() < 3 {
                return Err(PhysicsError::DegenerateHull {
                    details: format!("face {face_index} has {} vertices", face_loop.len()),
                });
            }

            let mut loop_edges = Vec::with_capacity(face_loop.len());
            for (i, &from) in face_loop.iter().enumerate() {
                let to = face_loop[(i + 1) % face_loop.len()];
                if from >= vertices.len() || to >= vertices.len() {
                    return Err(PhysicsError::DegenerateHull {
                        details: format!("face {face_index} references a missing vertex"),
                    });
                }
                if from == to {
                    return Err(PhysicsError::DegenerateHull {
                        details: format!("face {face_index} repeats vertex {from}"),
                    });
                }

                let key = (from.min(to), from.max(to));
                let index = match pair_slots.get(&key) {
                    Some(&first) => {
                        // The pair was opened by the (to, from) direction.
                        let twin = first ^ 1;
                        match (edges[first], edges[twin]) {
                            (Some(e), None) if e.origin as usize == to => twin,
                            _ => return Err(PhysicsError::NonManifoldEdge { from, to }),
                        }
                    }
                    None => {
                        let first = edges.len();
                        check_count("half-edges", first + 2)?;
                        edges.push(None);
                        edges.push(None);
                        pair_slots.insert(key, first);
                        first
                    }
                };

                edges[index] = Some(HalfEdge {
                    origin: from as u8,
                    twin: (index ^ 1) as u8,
                    face: face_index as u8,
                    next: 0,
                });
                loop_edges.push(index);
            }

            for (i, &e) in loop_edges.iter().enumerate() {
                let next = loop_edges[(i + 1) % loop_edges.len()];
                if let Some(edge) = edges[e].as_mut() {
                    edge.next = next as u8;
                }
            }

            faces.push(HullFace {
                edge: loop_edges[0] as u8,
            });
            planes.push(face_plane(&vertices, face_loop, face_index)?);
        }

        let mut resolved = Vec::with_capacity(edges.len());
        for (index, edge) in edges.iter().enumerate() {
            match edge {
                Some(e) => resolved.push(*e),
                None => {
                    let lone = edges[index ^ 1];
                    let from = lone.map(|e| e.origin as usize).unwrap_or(0);
                    let to = lone
                        .and_then(|e| edges[e.next as usize])
                        .map(|e| e.origin as usize)
                        .unwrap_or(0);
                    return Err(PhysicsError::OpenHull { from, to });
                }
            }
        }

        let centroid = vertices.iter().copied().sum::<Vec3>() / vertices.len() as f32;
        let hull = Hull {
            centroid,
            vertices,
            edges: resolved,
            faces,
            planes,
        };
        hull.validate()?;

        debug!(
            vertices = hull.vertices.len(),
            edges = hull.edges.len(),
            faces = hull.faces.len(),
            "built hull"
        );
        Ok(hull)
    }

    /// An axis-aligned box centered at the origin. Extents below
    /// [`MIN_HALF_EXTENT`] are clamped up to it.
    pub fn cuboid(half_extents: Vec3) -> Self {
        let h = half_extents.abs().max(Vec3::splat(MIN_HALF_EXTENT));
        if h != half_extents.abs() {
            warn!(?half_extents, "degenerate cuboid extents clamped");
        }
        let vertices = (0..8)
            .map(|i| {
                Vec3::new(
                    if i & 1 != 0 { h.x } else { -h.x },
                    if i & 2 != 0 { h.y } else { -h.y },
                    if i & 4 != 0 { h.z } else { -h.z },
                )
            })
            .collect();
        let loops: [&[usize]; 6] = [
            &[1, 3, 7, 5],
            &[0, 4, 6, 2],
            &[2, 6, 7, 3],
            &[0, 1, 5, 4],
            &[4, 5, 7, 6],
            &[0, 2, 3, 1],
        ];
        match Self::from_faces(vertices, &loops) {
            Ok(hull) => hull,
            Err(err) => {
                warn!(%err, ?half_extents, "cuboid build failed, using minimal box");
                Self::cuboid(Vec3::splat(MIN_HALF_EXTENT))
            }
        }
    }

    #[inline]
    pub fn vertex(&self, index: usize) -> Vec3 {
        self.vertices[index]
    }

    #[inline]
    pub fn edge(&self, index: usize) -> &HalfEdge {
        &self.edges[index]
    }

    #[inline]
    pub fn plane(&self, index: usize) -> &Plane {
        &self.planes[index]
    }

    /// Index of the vertex farthest along `direction`.
    pub fn support_vertex(&self, direction: Vec3) -> usize {
        let mut best = 0;
        let mut best_dot = f32::NEG_INFINITY;
        for (i, v) in self.vertices.iter().enumerate() {
            let d = v.dot(direction);
            if d > best_dot {
                best = i;
                best_dot = d;
            }
        }
        best
    }

    /// Index of the face whose normal is most aligned with `direction`.
    pub fn support_face(&self, direction: Vec3) -> usize {
        let mut best = 0;
        let mut best_dot = f32::NEG_INFINITY;
        for (i, p) in self.planes.iter().enumerate() {
            let d = p.normal.dot(direction);
            if d > best_dot {
                best = i;
                best_dot = d;
            }
        }
        best
    }

    /// Iterate the half-edge indices around `face`.
    pub fn face_edges(&self, face: usize) -> FaceEdges<'_> {
        let start = self.faces[face].edge;
        FaceEdges {
            hull: self,
            start,
            current: Some(start),
            remaining: self.edges.len(),
        }
    }

    /// Check the half-edge invariants.
    pub fn validate(&self) -> Result<()> {
        let edge_count = self.edges.len();
        for (e, edge) in self.edges.iter().enumerate() {
            let invalid = |reason| PhysicsError::InvalidHalfEdge { edge: e, reason };

            if edge.origin as usize >= self.vertices.len() {
                return Err(invalid("origin out of range"));
            }
            if edge.face as usize >= self.faces.len() {
                return Err(invalid("face out of range"));
            }
            if edge.next as usize >= edge_count || edge.twin as usize >= edge_count {
                return Err(invalid("link out of range"));
            }
            if edge.twin as usize != e ^ 1 {
                return Err(invalid("twin is not the adjacent index"));
            }

            let twin = &self.edges[edge.twin as usize];
            if twin.twin as usize != e {
                return Err(invalid("twin is not reciprocal"));
            }

            let next = &self.edges[edge.next as usize];
            if next.face != edge.face {
                return Err(invalid("next edge belongs to another face"));
            }
            if next.origin != twin.origin {
                return Err(invalid("next edge does not start at this edge's end"));
            }

            // The face loop must come back to this edge.
            let mut cursor = edge.next as usize;
            let mut steps = 0;
            while cursor != e {
                cursor = self.edges[cursor].next as usize;
                steps += 1;
                if steps > edge_count {
                    return Err(invalid("face loop does not close"));
                }
            }

            // So must the ring of edges leaving this edge's origin.
            let mut cursor = e;
            let mut steps = 0;
            loop {
                cursor = self.edges[self.edges[cursor].twin as usize].next as usize;
                if self.edges[cursor].origin != edge.origin {
                    return Err(invalid("vertex ring leaves its vertex"));
                }
                steps += 1;
                if cursor == e {
                    break;
                }
                if steps > edge_count {
                    return Err(invalid("vertex ring does not close"));
                }
            }
        }

        for (f, face) in self.faces.iter().enumerate() {
            if face.edge as usize >= edge_count || self.edges[face.edge as usize].face as usize != f
            {
                return Err(PhysicsError::InvalidHalfEdge {
                    edge: face.edge as usize,
                    reason: "face edge belongs to another face",
                });
            }
        }

        Ok(())
    }

    /// Volume and inertia about the local origin for the given density.
    ///
    /// Faces are fanned into tetrahedra with the origin and the covariance of
    /// each tetrahedron is accumulated.
    pub fn mass_properties(&self, density: f32) -> (f32, Mat3) {
        let mut volume = 0.0;
        let mut covariance = Mat3::ZERO;

        for face in 0..self.faces.len() {
            let mut edges = self.face_edges(face);
            let Some(first) = edges.next() else { continue };
            let a = self.vertices[self.edges[first].origin as usize];
            let rest: Vec<Vec3> = edges
                .map(|e| self.vertices[self.edges[e].origin as usize])
                .collect();
            for pair in rest.windows(2) {
                let (b, c) = (pair[0], pair[1]);
                let det = a.dot(b.cross(c));
                volume += det / 6.0;
                let s = a + b + c;
                covariance +=
                    (outer(s, s) + outer(a, a) + outer(b, b) + outer(c, c)) * (det / 120.0);
            }
        }

        let mass = density * volume;
        let covariance = covariance * density;
        let trace = covariance.x_axis.x + covariance.y_axis.y + covariance.z_axis.z;
        let inertia = Mat3::from_diagonal(Vec3::splat(trace)) - covariance;
        (mass, inertia)
    }
}

/// Iterator over the half-edges of one face loop.
pub struct FaceEdges<'a> {
    hull: &'a Hull,
    start: u8,
    current: Option<u8>,
    remaining: usize,
}

impl Iterator for FaceEdges<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.current?;
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let next = self.hull.edges[current as usize].next;
        self.current = if next == self.start { None } else { Some(next) };
        Some(current as usize)
    }
}

fn outer(a: Vec3, b: Vec3) -> Mat3 {
    Mat3::from_cols(a * b.x, a * b.y, a * b.z)
}

fn check_count(feature: &'static str, count: usize) -> Result<()> {
    if count > MAX_HULL_FEATURES {
        return Err(PhysicsError::HullTooComplex {
            feature,
            count,
            max: MAX_HULL_FEATURES,
        });
    }
    Ok(())
}

/// Newell normal of a face loop, offset through the loop's centroid.
fn face_plane(vertices: &[Vec3], face_loop: &[usize], face_index: usize) -> Result<Plane> {
    let mut normal = Vec3::ZERO;
    let mut center = Vec3::ZERO;
    for (i, &a) in face_loop.iter().enumerate() {
        let v1 = vertices[a];
        let v2 = vertices[face_loop[(i + 1) % face_loop.len()]];
        normal.x += (v1.y - v2.y) * (v1.z + v2.z);
        normal.y += (v1.z - v2.z) * (v1.x + v2.x);
        normal.z += (v1.x - v2.x) * (v1.y + v2.y);
        center += v1;
    }
    center /= face_loop.len() as f32;

    let normal = normal.try_normalize().ok_or_else(|| PhysicsError::DegenerateHull {
        details: format!("face {face_index} has no area"),
    })?;
    Ok(Plane::from_point(normal, center))
}
