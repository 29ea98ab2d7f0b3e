//! # Bevy Split Normals
//!
//! Weighted per-loop ("split") vertex normals for editable polygon meshes.
//!
//! Every face corner (loop) gets its own normal. The loops around a vertex are
//! split into shading groups at sharp edges, flat faces and creases steeper
//! than the smoothing angle; each group averages its face normals using the
//! vertex's weight mode, with stronger faces overriding weaker ones.
//!
//! ## Quick Start
//!
//! ```ignore
//! use bevy::prelude::*;
//! use bevy_split_normals::{SplitNormalMesh, SplitNormalsPlugin, RecomputeSplitNormals};
//!
//! fn setup(mut commands: Commands, mut meshes: ResMut<Assets<Mesh>>) {
//!     let mesh = Mesh::from(Cuboid::default());
//!     let target = SplitNormalMesh::from_bevy_mesh(&mesh).unwrap();
//!     let entity = commands.spawn((target, Mesh3d(meshes.add(mesh)))).id();
//!     commands.write_message(RecomputeSplitNormals { entity });
//! }
//! ```
//!
//! ## Without Bevy's ECS
//!
//! ```ignore
//! let topology = HalfEdgeMesh::from_edit_mesh(&edit_mesh);
//! let mut attributes = NormalAttributes::new();
//! let normals = compute_split_normals(&topology, &mut attributes, &NormalSettings::default())?;
//! ```

pub mod area_cache;
pub mod attributes;
pub mod edit_mesh;
pub mod error;
pub mod half_edge;
pub mod loop_space;
pub mod merge;
pub mod normals;
pub mod operations;
pub mod plugin;
pub mod scheduler;
pub mod settings;
pub mod shading_groups;

#[cfg(test)]
mod test_meshes;

pub use area_cache::{AreaCache, AreaCaches, FaceAreaCache, LinkedFaceAreaCache};
pub use attributes::{FaceInfluence, NormalAttributes, WeightMode};
pub use edit_mesh::{Edge, EditMesh};
pub use error::{NormalError, NormalResult};
pub use half_edge::{EdgeId, FaceId, HalfEdgeMesh, LoopId, VertexId};
pub use merge::{MergeOptions, MergeReport, merge_normals};
pub use normals::{
    SplitNormals, compute_split_normals, compute_split_normals_cancellable,
    compute_split_normals_with_plan,
};
pub use plugin::{MergeVertexNormals, RecomputeSplitNormals, SplitNormalMesh, SplitNormalsPlugin};
pub use scheduler::{CancellationToken, ScheduleConfig, SchedulePlan};
pub use settings::NormalSettings;
