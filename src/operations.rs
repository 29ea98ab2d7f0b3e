//! Editing operations on the normal attribute layers.
//!
//! These back the editor commands: selecting by weight mode or influence,
//! assigning them, and copying a normal vector between elements. Assigning
//! attributes does not recompute normals; callers run
//! [`compute_split_normals`](crate::compute_split_normals) afterwards.

use bevy::prelude::*;

use crate::attributes::{FaceInfluence, NormalAttributes, WeightMode};
use crate::error::{NormalError, NormalResult};
use crate::half_edge::{FaceId, HalfEdgeMesh, VertexId};
use crate::loop_space::to_loop_space;
use crate::normals::SplitNormals;

/// Lock every loop of `vertex` to one object-space normal.
pub fn lock_vertex_normal(
    mesh: &HalfEdgeMesh,
    attrs: &mut NormalAttributes,
    vertex: VertexId,
    object_normal: Vec3,
) {
    attrs.set_weight_mode(vertex, WeightMode::Unweighted);
    for &l in mesh.vertex_loops(vertex) {
        attrs.set_locked_normal(l, to_loop_space(mesh, l, object_normal));
    }
}

/// Vertices whose weight mode equals `mode`, ascending.
pub fn vertices_with_weight(
    mesh: &HalfEdgeMesh,
    attrs: &NormalAttributes,
    mode: WeightMode,
) -> Vec<VertexId> {
    (0..mesh.vertex_count() as VertexId)
        .filter(|&v| attrs.weight_mode(v) == mode)
        .collect()
}

/// Assign a weight mode to vertices.
///
/// Switching to [`WeightMode::Unweighted`] locks each loop's current split
/// normal, so the shading is unchanged until the locked data is edited.
/// `current` must then hold one normal per loop of `mesh`; stale or missing
/// normals are rejected before any attribute changes.
pub fn set_vertex_weight(
    mesh: &HalfEdgeMesh,
    attrs: &mut NormalAttributes,
    vertices: &[VertexId],
    mode: WeightMode,
    current: &SplitNormals,
) -> NormalResult<()> {
    if mode == WeightMode::Unweighted && current.len() != mesh.loop_count() {
        return Err(NormalError::LayerMismatch {
            layer: "split normals",
            expected: mesh.loop_count(),
            found: current.len(),
        });
    }
    for &v in vertices {
        if v as usize >= mesh.vertex_count() {
            continue;
        }
        attrs.set_weight_mode(v, mode);
        if mode == WeightMode::Unweighted {
            for &l in mesh.vertex_loops(v) {
                attrs.set_locked_normal(l, to_loop_space(mesh, l, current.get(l)));
            }
        }
    }
    Ok(())
}

/// Faces whose influence equals `influence`, ascending.
pub fn faces_with_influence(
    mesh: &HalfEdgeMesh,
    attrs: &NormalAttributes,
    influence: FaceInfluence,
) -> Vec<FaceId> {
    (0..mesh.face_count() as FaceId)
        .filter(|&f| attrs.influence(f) == influence)
        .collect()
}

pub fn set_face_influence(
    mesh: &HalfEdgeMesh,
    attrs: &mut NormalAttributes,
    faces: &[FaceId],
    influence: FaceInfluence,
) {
    for &f in faces.iter().filter(|&&f| (f as usize) < mesh.face_count()) {
        attrs.set_influence(f, influence);
    }
}

/// World-space normal of a face.
pub fn face_normal_world(mesh: &HalfEdgeMesh, face: FaceId, world_from_object: Mat3) -> Vec3 {
    (world_from_object * mesh.face_normal(face)).normalize_or_zero()
}

/// The distinct world-space split normals of a vertex, in loop order.
pub fn vertex_normals_world(
    mesh: &HalfEdgeMesh,
    normals: &SplitNormals,
    vertex: VertexId,
    world_from_object: Mat3,
) -> Vec<Vec3> {
    normals
        .distinct_vertex_normals(mesh, vertex)
        .into_iter()
        .map(|n| (world_from_object * n).normalize_or_zero())
        .collect()
}

/// Lock the given vertices to a world-space normal.
///
/// The normal is brought into object space with the inverse of the object's
/// linear transform. Returns the object-space normal that was stored.
pub fn set_normal_vector(
    mesh: &HalfEdgeMesh,
    attrs: &mut NormalAttributes,
    vertices: &[VertexId],
    world_normal: Vec3,
    world_from_object: Mat3,
) -> Vec3 {
    let object_normal = if world_from_object.determinant() == 0.0 {
        warn!("Object transform is singular; storing the normal untransformed");
        world_normal.normalize_or_zero()
    } else {
        (world_from_object.inverse() * world_normal).normalize_or_zero()
    };

    for &v in vertices {
        if (v as usize) < mesh.vertex_count() {
            lock_vertex_normal(mesh, attrs, v, object_normal);
        }
    }
    object_normal
}
