//! Indexed polygon mesh supplied by the host editor.
//!
//! `EditMesh` is the input side of the engine: positions, polygon faces and
//! the shading flags (flat faces, sharp edges) that stop normal smoothing.
//! It converts from a triangle-list Bevy `Mesh` and back, where the written
//! mesh carries one vertex per distinct (vertex, split normal) pair.

use bevy::mesh::{Indices, PrimitiveTopology, VertexAttributeValues};
use bevy::prelude::*;
use std::collections::{HashMap, HashSet};

/// Index of a polygon face in the mesh.
pub type FaceIndex = usize;

/// Canonical edge representation (lower vertex index first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge(pub u32, pub u32);

impl Edge {
    /// Create a canonical edge with the lower index first.
    pub fn new(a: u32, b: u32) -> Self {
        if a <= b { Edge(a, b) } else { Edge(b, a) }
    }
}

/// Indexed polygon mesh with shading flags.
///
/// Faces list their vertex indices counter-clockwise when seen from the
/// side the face normal points to. Corner `i` of face `f` becomes a loop of
/// the [`HalfEdgeMesh`](crate::HalfEdgeMesh); loops are numbered in face
/// order, then corner order.
#[derive(Debug, Clone, Default)]
pub struct EditMesh {
    pub positions: Vec<Vec3>,
    /// Per-vertex UVs. Either empty or one per position.
    pub uvs: Vec<Vec2>,
    pub faces: Vec<Vec<u32>>,
    /// Faces shaded flat. Every edge of a flat face is treated as sharp.
    pub flat_faces: HashSet<FaceIndex>,
    /// Edges explicitly marked sharp (hard).
    pub sharp_edges: HashSet<Edge>,
}

impl EditMesh {
    /// Create a smooth-shaded mesh from positions and polygon faces.
    pub fn new(positions: Vec<Vec3>, faces: Vec<Vec<u32>>) -> Self {
        Self {
            positions,
            uvs: Vec::new(),
            faces,
            flat_faces: HashSet::new(),
            sharp_edges: HashSet::new(),
        }
    }

    /// Build an `EditMesh` from a Bevy `Mesh`.
    ///
    /// Returns `None` if the mesh lacks positions, uses a non-triangle
    /// topology or has an index past the last position. Vertices are taken as-is, so meshes that duplicate vertices
    /// along UV or shading seams produce disconnected vertex fans.
    pub fn from_bevy_mesh(mesh: &Mesh) -> Option<Self> {
        if mesh.primitive_topology() != PrimitiveTopology::TriangleList {
            return None;
        }

        let positions: Vec<Vec3> = match mesh.attribute(Mesh::ATTRIBUTE_POSITION)? {
            VertexAttributeValues::Float32x3(v) => v.iter().map(|p| Vec3::from(*p)).collect(),
            _ => return None,
        };

        let uvs: Vec<Vec2> = match mesh.attribute(Mesh::ATTRIBUTE_UV_0) {
            Some(VertexAttributeValues::Float32x2(v)) => {
                v.iter().map(|u| Vec2::from(*u)).collect()
            }
            _ => Vec::new(),
        };

        let faces: Vec<Vec<u32>> = match mesh.indices() {
            Some(Indices::U32(indices)) => indices
                .chunks_exact(3)
                .map(|c| vec![c[0], c[1], c[2]])
                .collect(),
            Some(Indices::U16(indices)) => indices
                .chunks_exact(3)
                .map(|c| vec![c[0] as u32, c[1] as u32, c[2] as u32])
                .collect(),
            None => (0..positions.len() as u32)
                .collect::<Vec<_>>()
                .chunks_exact(3)
                .map(|c| c.to_vec())
                .collect(),
        };

        let vertex_count = positions.len();
        if faces.iter().flatten().any(|&i| i as usize >= vertex_count) {
            warn!("Mesh index out of range ({} positions); skipping", vertex_count);
            return None;
        }

        Some(EditMesh {
            positions,
            uvs,
            faces,
            flat_faces: HashSet::new(),
            sharp_edges: HashSet::new(),
        })
    }

    /// Convert to a Bevy `Mesh` shaded with the given loop-indexed normals.
    ///
    /// Loops sharing both a vertex and a normal are welded into one output
    /// vertex; polygons are fan-triangulated. Missing or zero-length normals
    /// fall back to the flat face normal so the result always renders.
    pub fn to_bevy_mesh(&self, loop_normals: &[Vec3]) -> Mesh {
        let mut positions: Vec<[f32; 3]> = Vec::new();
        let mut normals: Vec<[f32; 3]> = Vec::new();
        let mut uvs: Vec<[f32; 2]> = Vec::new();
        let mut indices: Vec<u32> = Vec::new();
        let has_uvs = self.uvs.len() == self.positions.len();

        // Map: (vertex, normal bits) -> output vertex index
        let mut vertex_map: HashMap<(u32, [u32; 3]), u32> = HashMap::new();
        let mut loop_index = 0usize;

        for (fi, face) in self.faces.iter().enumerate() {
            let face_normal = self.face_normal(fi);
            let mut corners = Vec::with_capacity(face.len());

            for &vi in face {
                let normal = loop_normals
                    .get(loop_index)
                    .copied()
                    .filter(|n| n.length_squared() > 0.0)
                    .unwrap_or(face_normal);
                loop_index += 1;

                let key = (vi, normal.to_array().map(f32::to_bits));
                let out = *vertex_map.entry(key).or_insert_with(|| {
                    let idx = positions.len() as u32;
                    positions.push(self.positions[vi as usize].to_array());
                    normals.push(normal.to_array());
                    if has_uvs {
                        uvs.push(self.uvs[vi as usize].to_array());
                    }
                    idx
                });
                corners.push(out);
            }

            for i in 1..corners.len().saturating_sub(1) {
                indices.extend_from_slice(&[corners[0], corners[i], corners[i + 1]]);
            }
        }

        let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, default());
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
        if has_uvs {
            mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
        }
        mesh.insert_indices(Indices::U32(indices));
        mesh
    }

    /// Newell vector of a polygon: twice its area along its normal.
    fn newell_vector(&self, face: FaceIndex) -> Vec3 {
        let verts = &self.faces[face];
        if verts.len() < 3 {
            return Vec3::ZERO;
        }
        let p0 = self.positions[verts[0] as usize];
        let mut n = Vec3::ZERO;
        for pair in verts[1..].windows(2) {
            let a = self.positions[pair[0] as usize] - p0;
            let b = self.positions[pair[1] as usize] - p0;
            n += a.cross(b);
        }
        n
    }

    /// Compute the unit normal of a face.
    pub fn face_normal(&self, face: FaceIndex) -> Vec3 {
        self.newell_vector(face).normalize_or_zero()
    }

    /// Compute the area of a face.
    pub fn face_area(&self, face: FaceIndex) -> f32 {
        self.newell_vector(face).length() * 0.5
    }

    /// Whether a face participates in smooth shading.
    pub fn is_face_smooth(&self, face: FaceIndex) -> bool {
        !self.flat_faces.contains(&face)
    }

    /// Mark a face smooth or flat.
    pub fn set_face_smooth(&mut self, face: FaceIndex, smooth: bool) {
        if smooth {
            self.flat_faces.remove(&face);
        } else {
            self.flat_faces.insert(face);
        }
    }

    /// Toggle an edge as sharp/smooth. Returns true if the edge is now sharp.
    pub fn toggle_sharp_edge(&mut self, a: u32, b: u32) -> bool {
        let edge = Edge::new(a, b);
        if self.sharp_edges.remove(&edge) {
            false
        } else {
            self.sharp_edges.insert(edge);
            true
        }
    }

    /// Number of polygon faces.
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Number of face corners (loops).
    pub fn loop_count(&self) -> usize {
        self.faces.iter().map(Vec::len).sum()
    }
}
