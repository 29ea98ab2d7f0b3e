//! Memoized face areas for area-weighted averaging.
//!
//! The linked variant treats a patch of contiguous, nearly coplanar faces as
//! one surface: every face of the patch reports the area of the whole patch.
//! A patch is discovered once and cached for all of its faces together.

use std::collections::HashMap;

use crate::half_edge::{FaceId, HalfEdgeMesh};

/// Source of face areas for the averaging engine.
pub trait AreaCache {
    fn area(&mut self, mesh: &HalfEdgeMesh, face: FaceId) -> f32;
}

/// Memoizes the area of each face on first use.
#[derive(Debug, Default, Clone)]
pub struct FaceAreaCache {
    areas: HashMap<FaceId, f32>,
}

impl FaceAreaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached_faces(&self) -> usize {
        self.areas.len()
    }
}

impl AreaCache for FaceAreaCache {
    fn area(&mut self, mesh: &HalfEdgeMesh, face: FaceId) -> f32 {
        *self
            .areas
            .entry(face)
            .or_insert_with(|| mesh.face_area(face))
    }
}

/// Faces reachable from `face` across contiguous edges whose face normals
/// differ by at most `angle` radians. Sorted, includes `face`.
pub fn linked_faces(mesh: &HalfEdgeMesh, face: FaceId, angle: f32) -> Vec<FaceId> {
    let mut visited = vec![false; mesh.face_count()];
    let mut stack = vec![face];
    let mut linked = Vec::new();
    visited[face as usize] = true;

    while let Some(f) = stack.pop() {
        linked.push(f);
        for l in mesh.face_loops(f) {
            let edge = mesh.get_loop(l).edge;
            if !mesh.is_contiguous(edge) {
                continue;
            }
            let Some(partner) = mesh.radial_partner(l) else {
                continue;
            };
            let other = mesh.get_loop(partner).face;
            if !visited[other as usize] && mesh.face_angle(f, other) <= angle {
                visited[other as usize] = true;
                stack.push(other);
            }
        }
    }

    linked.sort_unstable();
    linked
}

/// Reports the summed area of a face's linked patch.
#[derive(Debug, Clone)]
pub struct LinkedFaceAreaCache {
    angle: f32,
    areas: HashMap<FaceId, f32>,
}

impl LinkedFaceAreaCache {
    pub fn new(angle: f32) -> Self {
        Self {
            angle,
            areas: HashMap::new(),
        }
    }

    pub fn cached_faces(&self) -> usize {
        self.areas.len()
    }
}

impl AreaCache for LinkedFaceAreaCache {
    fn area(&mut self, mesh: &HalfEdgeMesh, face: FaceId) -> f32 {
        if let Some(&area) = self.areas.get(&face) {
            return area;
        }

        let patch = linked_faces(mesh, face, self.angle);
        // Summed in id order so every worker gets the same bits
        let total: f32 = patch.iter().map(|&f| mesh.face_area(f)).sum();
        for f in patch {
            self.areas.insert(f, total);
        }
        total
    }
}

/// The area cache selected by the current settings.
#[derive(Debug, Clone)]
pub enum AreaCaches {
    Plain(FaceAreaCache),
    Linked(LinkedFaceAreaCache),
}

impl AreaCaches {
    /// Plain cache when `linked_angle` is `None`.
    pub fn new(linked_angle: Option<f32>) -> Self {
        match linked_angle {
            Some(angle) => AreaCaches::Linked(LinkedFaceAreaCache::new(angle)),
            None => AreaCaches::Plain(FaceAreaCache::new()),
        }
    }
}

impl AreaCache for AreaCaches {
    fn area(&mut self, mesh: &HalfEdgeMesh, face: FaceId) -> f32 {
        match self {
            AreaCaches::Plain(cache) => cache.area(mesh, face),
            AreaCaches::Linked(cache) => cache.area(mesh, face),
        }
    }
}
