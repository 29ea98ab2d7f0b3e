//! Conversion between object space and per-loop tangent frames.
//!
//! Locked normals are stored relative to the loop's frame so they follow the
//! surface when the mesh is deformed. The frame rows are the face normal, the
//! corner tangent and their cross product.

use bevy::prelude::*;

use crate::half_edge::{HalfEdgeMesh, LoopId};

/// Object-space basis of a loop, as columns (normal, tangent, normal x tangent).
pub fn loop_basis(mesh: &HalfEdgeMesh, l: LoopId) -> Mat3 {
    let n = mesh.loop_normal(l);
    let t = mesh.loop_tangent(l);
    Mat3::from_cols(n, t, n.cross(t))
}

/// Express an object-space vector in the loop's frame. No normalization.
pub fn to_loop_space(mesh: &HalfEdgeMesh, l: LoopId, v: Vec3) -> Vec3 {
    loop_basis(mesh, l).transpose() * v
}

/// Express a loop-space vector in object space. No normalization.
pub fn to_object_space(mesh: &HalfEdgeMesh, l: LoopId, v: Vec3) -> Vec3 {
    loop_basis(mesh, l) * v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_meshes;

    #[test]
    fn face_normal_maps_to_first_axis() {
        let he = HalfEdgeMesh::from_edit_mesh(&test_meshes::cube());
        for l in 0..he.loop_count() as LoopId {
            let local = to_loop_space(&he, l, he.loop_normal(l));
            assert!(local.distance(Vec3::X) < 1e-6, "loop {}: {:?}", l, local);
        }
    }

    #[test]
    fn round_trip_preserves_vectors() {
        let he = HalfEdgeMesh::from_edit_mesh(&test_meshes::pyramid(5));
        let v = Vec3::new(0.3, -1.2, 2.5);
        for l in 0..he.loop_count() as LoopId {
            let back = to_object_space(&he, l, to_loop_space(&he, l, v));
            assert!(back.distance(v) < 1e-5, "loop {}: {:?}", l, back);
        }
    }

    #[test]
    fn length_is_not_normalized() {
        let he = HalfEdgeMesh::from_edit_mesh(&test_meshes::cube());
        let local = to_loop_space(&he, 0, Vec3::Z * 3.0);
        assert!((local.length() - 3.0).abs() < 1e-5);
    }
}
