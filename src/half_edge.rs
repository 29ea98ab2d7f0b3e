//! Loop-based half-edge topology for split normal computation.
//!
//! `HalfEdgeMesh` is built once from an `EditMesh` and is read-only while
//! normals are computed. Each half-edge is a face corner ("loop"): it starts
//! at a vertex, belongs to one face and runs along one edge. Edges keep their
//! full radial list of loops so non-manifold edges stay representable.
//!
//! Uses index-based arena storage (not pointers) so the mesh can be shared
//! across worker threads without synchronization.

use bevy::prelude::*;
use std::collections::HashMap;
use std::ops::Range;

use crate::edit_mesh::{Edge, EditMesh};

/// Index into the loop array. Stable for the lifetime of the mesh and used
/// as the index of the split normal output buffer.
pub type LoopId = u32;
/// Index into the vertex array.
pub type VertexId = u32;
/// Index into the face array.
pub type FaceId = u32;
/// Index into the edge array.
pub type EdgeId = u32;

/// A face corner.
#[derive(Debug, Clone, Copy)]
pub struct Loop {
    /// Vertex this loop originates from.
    pub vertex: VertexId,
    /// Face this loop belongs to.
    pub face: FaceId,
    /// Edge running from `vertex` to the vertex of `next`.
    pub edge: EdgeId,
    /// Next loop around the face (counter-clockwise).
    pub next: LoopId,
    /// Previous loop around the face.
    pub prev: LoopId,
}

/// A geometric edge with every loop that runs along it.
#[derive(Debug, Clone)]
pub struct MeshEdge {
    pub vertices: Edge,
    /// Radial loop list. Two entries for a manifold edge.
    pub loops: Vec<LoopId>,
    /// Edge-level smooth flag (false for edges marked sharp).
    pub smooth: bool,
}

/// A polygon face.
#[derive(Debug, Clone, Copy)]
pub struct HFace {
    /// First loop; the face owns `first_loop..first_loop + len`.
    pub first_loop: LoopId,
    pub len: u32,
    /// Unit face normal (zero for degenerate faces).
    pub normal: Vec3,
    pub smooth: bool,
}

/// Arena topology with vertex -> loop lookup.
#[derive(Debug, Clone)]
pub struct HalfEdgeMesh {
    pub positions: Vec<Vec3>,
    pub loops: Vec<Loop>,
    pub edges: Vec<MeshEdge>,
    pub faces: Vec<HFace>,
    /// CSR offsets into `vertex_loops`, one past the last entry per vertex.
    vertex_loop_offsets: Vec<u32>,
    /// Loops grouped by vertex, ascending within each vertex.
    vertex_loops: Vec<LoopId>,
}

impl HalfEdgeMesh {
    /// Build a `HalfEdgeMesh` from an `EditMesh`.
    ///
    /// Loops are numbered in face order, then corner order. Edges are shared
    /// by every face that uses the same vertex pair, whatever the winding.
    pub fn from_edit_mesh(mesh: &EditMesh) -> Self {
        let loop_count = mesh.loop_count();
        let mut loops: Vec<Loop> = Vec::with_capacity(loop_count);
        let mut faces: Vec<HFace> = Vec::with_capacity(mesh.faces.len());
        let mut edges: Vec<MeshEdge> = Vec::new();
        let mut edge_lookup: HashMap<Edge, EdgeId> = HashMap::new();

        for (fi, verts) in mesh.faces.iter().enumerate() {
            let base = loops.len() as LoopId;
            let n = verts.len() as u32;

            for i in 0..n {
                let from = verts[i as usize];
                let to = verts[((i + 1) % n) as usize];
                let key = Edge::new(from, to);
                let edge = *edge_lookup.entry(key).or_insert_with(|| {
                    edges.push(MeshEdge {
                        vertices: key,
                        loops: Vec::new(),
                        smooth: !mesh.sharp_edges.contains(&key),
                    });
                    (edges.len() - 1) as EdgeId
                });
                edges[edge as usize].loops.push(base + i);

                loops.push(Loop {
                    vertex: from,
                    face: fi as FaceId,
                    edge,
                    next: base + (i + 1) % n,
                    prev: base + (i + n - 1) % n,
                });
            }

            faces.push(HFace {
                first_loop: base,
                len: n,
                normal: mesh.face_normal(fi),
                smooth: mesh.is_face_smooth(fi),
            });
        }

        // Counting sort of loops by vertex. Loops are visited in ascending
        // order, so each vertex's slice ends up sorted.
        let vertex_count = mesh.positions.len();
        let mut vertex_loop_offsets = vec![0u32; vertex_count + 1];
        for l in &loops {
            vertex_loop_offsets[l.vertex as usize + 1] += 1;
        }
        for v in 0..vertex_count {
            vertex_loop_offsets[v + 1] += vertex_loop_offsets[v];
        }
        let mut cursor = vertex_loop_offsets[..vertex_count].to_vec();
        let mut vertex_loops = vec![0; loops.len()];
        for (li, l) in loops.iter().enumerate() {
            let slot = &mut cursor[l.vertex as usize];
            vertex_loops[*slot as usize] = li as LoopId;
            *slot += 1;
        }

        HalfEdgeMesh {
            positions: mesh.positions.clone(),
            loops,
            edges,
            faces,
            vertex_loop_offsets,
            vertex_loops,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn loop_count(&self) -> usize {
        self.loops.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn position(&self, vertex: VertexId) -> Vec3 {
        self.positions[vertex as usize]
    }

    pub fn get_loop(&self, l: LoopId) -> &Loop {
        &self.loops[l as usize]
    }

    /// Loops starting at `vertex`, in ascending id order.
    pub fn vertex_loops(&self, vertex: VertexId) -> &[LoopId] {
        let start = self.vertex_loop_offsets[vertex as usize] as usize;
        let end = self.vertex_loop_offsets[vertex as usize + 1] as usize;
        &self.vertex_loops[start..end]
    }

    /// CSR offsets: loops of vertex `v` occupy
    /// `offsets[v]..offsets[v + 1]` of [`vertex_loop_order`](Self::vertex_loop_order).
    pub fn vertex_loop_offsets(&self) -> &[u32] {
        &self.vertex_loop_offsets
    }

    /// Every loop id, grouped by vertex.
    pub fn vertex_loop_order(&self) -> &[LoopId] {
        &self.vertex_loops
    }

    /// Loop ids of a face, in corner order.
    pub fn face_loops(&self, face: FaceId) -> Range<LoopId> {
        let f = &self.faces[face as usize];
        f.first_loop..f.first_loop + f.len
    }

    pub fn face_normal(&self, face: FaceId) -> Vec3 {
        self.faces[face as usize].normal
    }

    /// Polygon area via the Newell vector, relative to the first corner.
    pub fn face_area(&self, face: FaceId) -> f32 {
        let corners: Vec<Vec3> = self
            .face_loops(face)
            .map(|l| self.position(self.get_loop(l).vertex))
            .collect();
        if corners.len() < 3 {
            return 0.0;
        }
        let p0 = corners[0];
        let twice_area: Vec3 = corners[1..]
            .windows(2)
            .map(|pair| (pair[0] - p0).cross(pair[1] - p0))
            .sum();
        twice_area.length() * 0.5
    }

    /// An edge is manifold when exactly two loops (faces) run along it.
    pub fn is_manifold(&self, edge: EdgeId) -> bool {
        self.edges[edge as usize].loops.len() == 2
    }

    /// Smooth for shading: the edge flag is set and every adjacent face is
    /// smooth shaded.
    pub fn is_edge_smooth(&self, edge: EdgeId) -> bool {
        let e = &self.edges[edge as usize];
        e.smooth
            && e.loops
                .iter()
                .all(|&l| self.faces[self.get_loop(l).face as usize].smooth)
    }

    /// Angle between the normals of the two faces of a manifold edge.
    /// `None` for boundary and non-manifold edges.
    pub fn edge_face_angle(&self, edge: EdgeId) -> Option<f32> {
        let e = &self.edges[edge as usize];
        let [a, b] = e.loops[..] else {
            return None;
        };
        Some(self.face_angle(self.get_loop(a).face, self.get_loop(b).face))
    }

    /// Angle between two face normals, in radians.
    pub fn face_angle(&self, a: FaceId, b: FaceId) -> f32 {
        let dot = self.face_normal(a).dot(self.face_normal(b));
        dot.clamp(-1.0, 1.0).acos()
    }

    /// Contiguous: manifold, and the two faces wind in opposite directions
    /// along the edge.
    pub fn is_contiguous(&self, edge: EdgeId) -> bool {
        let e = &self.edges[edge as usize];
        match e.loops[..] {
            [a, b] => self.get_loop(a).vertex != self.get_loop(b).vertex,
            _ => false,
        }
    }

    /// The other loop running along this loop's edge, if the edge is manifold.
    pub fn radial_partner(&self, l: LoopId) -> Option<LoopId> {
        let e = &self.edges[self.get_loop(l).edge as usize];
        match e.loops[..] {
            [a, b] if a == l => Some(b),
            [a, b] if b == l => Some(a),
            _ => None,
        }
    }

    /// Interior angle of the face at this corner, in radians.
    pub fn corner_angle(&self, l: LoopId) -> f32 {
        let lp = self.get_loop(l);
        let v = self.position(lp.vertex);
        let to_prev = self.position(self.get_loop(lp.prev).vertex) - v;
        let to_next = self.position(self.get_loop(lp.next).vertex) - v;
        let denom = (to_prev.length_squared() * to_next.length_squared()).sqrt();
        if denom <= f32::EPSILON {
            return 0.0;
        }
        (to_prev.dot(to_next) / denom).clamp(-1.0, 1.0).acos()
    }

    /// Geometric normal of a loop (the normal of its face).
    pub fn loop_normal(&self, l: LoopId) -> Vec3 {
        self.face_normal(self.get_loop(l).face)
    }

    /// Unit tangent at a corner: lies in the face plane, bisects the corner
    /// and points into the face.
    ///
    /// Straight corners use the inward perpendicular of the next edge, and
    /// collapsed corners any vector orthogonal to the normal. Zero for loops
    /// of degenerate faces.
    pub fn loop_tangent(&self, l: LoopId) -> Vec3 {
        let n = self.loop_normal(l);
        if n == Vec3::ZERO {
            return Vec3::ZERO;
        }

        let lp = self.get_loop(l);
        let v = self.position(lp.vertex);
        let to_prev = (self.position(self.get_loop(lp.prev).vertex) - v).normalize_or_zero();
        let to_next = (self.position(self.get_loop(lp.next).vertex) - v).normalize_or_zero();

        let mut bisector = to_prev + to_next;
        // Reflex corner: the bisector points out of the face
        if to_next.cross(to_prev).dot(n) < 0.0 {
            bisector = -bisector;
        }

        let tangent = bisector - n * n.dot(bisector);
        if tangent.length_squared() > 1e-12 {
            return tangent.normalize();
        }

        let inward = n.cross(to_next);
        if inward.length_squared() > 1e-12 {
            inward.normalize()
        } else {
            n.any_orthonormal_vector()
        }
    }
}
