//! Fixture meshes shared by the unit tests.

use bevy::prelude::*;
use std::f32::consts::TAU;

use crate::edit_mesh::EditMesh;

/// Unit cube centered at the origin, six outward-facing quads.
///
/// Face 0 is +Z, then -Z, +X, -X, +Y, -Y.
pub fn cube() -> EditMesh {
    let positions = vec![
        Vec3::new(-0.5, -0.5, -0.5),
        Vec3::new(0.5, -0.5, -0.5),
        Vec3::new(0.5, 0.5, -0.5),
        Vec3::new(-0.5, 0.5, -0.5),
        Vec3::new(-0.5, -0.5, 0.5),
        Vec3::new(0.5, -0.5, 0.5),
        Vec3::new(0.5, 0.5, 0.5),
        Vec3::new(-0.5, 0.5, 0.5),
    ];
    let faces = vec![
        vec![4, 5, 6, 7],
        vec![0, 3, 2, 1],
        vec![1, 2, 6, 5],
        vec![0, 4, 7, 3],
        vec![3, 7, 6, 2],
        vec![0, 1, 5, 4],
    ];
    EditMesh::new(positions, faces)
}

/// Flat disk in the XY plane: center vertex 0 and `k` rim vertices, one
/// triangle per rim edge.
pub fn fan(k: u32) -> EditMesh {
    let mut positions = vec![Vec3::ZERO];
    for i in 0..k {
        let a = TAU * i as f32 / k as f32;
        positions.push(Vec3::new(a.cos(), a.sin(), 0.0));
    }
    let faces = (0..k).map(|i| vec![0, 1 + i, 1 + (i + 1) % k]).collect();
    EditMesh::new(positions, faces)
}

/// Closed pyramid: apex vertex 0 over a `k`-gon base.
pub fn pyramid(k: u32) -> EditMesh {
    let mut mesh = fan(k);
    mesh.positions[0] = Vec3::new(0.0, 0.0, 1.0);
    mesh.faces.push((1..=k).rev().collect());
    mesh
}

/// `n` x `n` quads over the unit square in the XY plane. With a random
/// source the vertex heights are jittered.
pub fn grid(n: u32, mut rng: Option<&mut fastrand::Rng>) -> EditMesh {
    let row = n + 1;
    let mut positions = Vec::with_capacity((row * row) as usize);
    for y in 0..row {
        for x in 0..row {
            let z = rng.as_mut().map_or(0.0, |r| r.f32() * 0.2 - 0.1);
            positions.push(Vec3::new(x as f32 / n as f32, y as f32 / n as f32, z));
        }
    }

    let mut faces = Vec::with_capacity((n * n) as usize);
    for y in 0..n {
        for x in 0..n {
            let i = y * row + x;
            faces.push(vec![i, i + 1, i + row + 1, i + row]);
        }
    }
    EditMesh::new(positions, faces)
}

/// Two quads meeting at a right angle along edge (0, 1).
///
/// Face 0 is a 1 x 1 square facing +Z, face 1 a 1 x 3 rectangle facing -Y.
pub fn l_shape() -> EditMesh {
    EditMesh::new(
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, -3.0),
            Vec3::new(1.0, 0.0, -3.0),
        ],
        vec![vec![0, 1, 2, 3], vec![1, 0, 4, 5]],
    )
}

/// Triangles for linked area tests.
///
/// Faces 0..4 tile a flat 2 x 1 strip, face 4 folds up from its right
/// edge, and face 5 is coplanar with the strip but shares no edge with it.
pub fn linked_patch() -> EditMesh {
    EditMesh::new(
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(2.0, 1.0, 0.0),
            Vec3::new(2.5, 0.5, 0.8),
            Vec3::new(3.0, 0.0, 0.0),
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::new(3.0, 1.0, 0.0),
        ],
        vec![
            vec![0, 1, 4],
            vec![0, 4, 3],
            vec![1, 2, 5],
            vec![1, 5, 4],
            vec![5, 2, 6],
            vec![7, 8, 9],
        ],
    )
}

/// Three separate triangles. Vertex 3 sits 0.00005 from vertex 0; vertex 6
/// is 1.0 above it.
///
/// Triangle 0 (vertices 0..3) faces +Z, triangle 1 (3..6) faces +X and
/// triangle 2 (6..9) faces +Z.
pub fn merge_triangles() -> EditMesh {
    EditMesh::new(
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.00005, 0.0, 0.0),
            Vec3::new(0.00005, 1.0, 0.0),
            Vec3::new(0.00005, 0.0, 1.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        ],
        vec![vec![0, 1, 2], vec![3, 4, 5], vec![6, 7, 8]],
    )
}
