//! Bevy integration: a component holding the editable mesh and messages that
//! drive recomputation and merging.

use bevy::prelude::*;

use crate::attributes::NormalAttributes;
use crate::edit_mesh::EditMesh;
use crate::half_edge::{HalfEdgeMesh, VertexId};
use crate::merge::{MergeOptions, merge_normals};
use crate::normals::{SplitNormals, compute_split_normals};
use crate::settings::NormalSettings;

/// Plugin that registers split normal messages and their handlers.
pub struct SplitNormalsPlugin;

impl Plugin for SplitNormalsPlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<NormalSettings>() {
            app.insert_resource(NormalSettings::load());
        }
        app.add_message::<RecomputeSplitNormals>()
            .add_message::<MergeVertexNormals>()
            .add_systems(
                Update,
                (handle_merge_requests, handle_recompute_requests).chain(),
            );
    }
}

/// Editable mesh with its normal attributes and the last computed normals.
#[derive(Component, Debug, Clone)]
pub struct SplitNormalMesh {
    pub edit_mesh: EditMesh,
    topology: HalfEdgeMesh,
    pub attributes: NormalAttributes,
    pub normals: Option<SplitNormals>,
}

impl SplitNormalMesh {
    pub fn new(edit_mesh: EditMesh) -> Self {
        let topology = HalfEdgeMesh::from_edit_mesh(&edit_mesh);
        Self {
            edit_mesh,
            topology,
            attributes: NormalAttributes::new(),
            normals: None,
        }
    }

    /// Wrap a triangle-list Bevy mesh. `None` for other topologies.
    pub fn from_bevy_mesh(mesh: &Mesh) -> Option<Self> {
        EditMesh::from_bevy_mesh(mesh).map(Self::new)
    }

    pub fn topology(&self) -> &HalfEdgeMesh {
        &self.topology
    }

    /// Rebuild topology after `edit_mesh` changed. Drops stale normals.
    pub fn rebuild_topology(&mut self) {
        self.topology = HalfEdgeMesh::from_edit_mesh(&self.edit_mesh);
        self.normals = None;
    }

    /// Render mesh shaded with the last computed normals.
    pub fn to_bevy_mesh(&self) -> Mesh {
        let normals = self.normals.as_ref().map_or(&[][..], SplitNormals::as_slice);
        self.edit_mesh.to_bevy_mesh(normals)
    }
}

/// Request a full split normal recompute of an entity's [`SplitNormalMesh`].
#[derive(Message)]
pub struct RecomputeSplitNormals {
    pub entity: Entity,
}

/// Request merging vertex normals of an entity's [`SplitNormalMesh`].
#[derive(Message)]
pub struct MergeVertexNormals {
    pub entity: Entity,
    pub selected: Vec<VertexId>,
    /// Falls back to the merge values of [`NormalSettings`].
    pub options: Option<MergeOptions>,
}

/// Replace the entity's render mesh with one shaded by the new normals.
fn write_back(
    commands: &mut Commands,
    meshes: &mut Option<ResMut<Assets<Mesh>>>,
    entity: Entity,
    target: &SplitNormalMesh,
    has_mesh: bool,
) {
    let Some(meshes) = meshes.as_mut() else {
        return;
    };
    if has_mesh {
        let handle = meshes.add(target.to_bevy_mesh());
        commands.entity(entity).insert(Mesh3d(handle));
    }
}

fn handle_recompute_requests(
    mut requests: MessageReader<RecomputeSplitNormals>,
    settings: Res<NormalSettings>,
    mut targets: Query<(&mut SplitNormalMesh, Has<Mesh3d>)>,
    mut meshes: Option<ResMut<Assets<Mesh>>>,
    mut commands: Commands,
) {
    for request in requests.read() {
        let Ok((target, has_mesh)) = targets.get_mut(request.entity) else {
            warn!("No split normal mesh on {:?}", request.entity);
            continue;
        };
        let target = target.into_inner();

        match compute_split_normals(&target.topology, &mut target.attributes, &settings) {
            Ok(normals) => {
                target.normals = Some(normals);
                write_back(&mut commands, &mut meshes, request.entity, target, has_mesh);
            }
            Err(e) => error!("Failed to compute split normals for {:?}: {}", request.entity, e),
        }
    }
}

fn handle_merge_requests(
    mut requests: MessageReader<MergeVertexNormals>,
    settings: Res<NormalSettings>,
    mut targets: Query<(&mut SplitNormalMesh, Has<Mesh3d>)>,
    mut meshes: Option<ResMut<Assets<Mesh>>>,
    mut commands: Commands,
) {
    for request in requests.read() {
        let Ok((target, has_mesh)) = targets.get_mut(request.entity) else {
            warn!("No split normal mesh on {:?}", request.entity);
            continue;
        };
        let target = target.into_inner();
        let options = request
            .options
            .clone()
            .unwrap_or_else(|| MergeOptions::from_settings(&settings));

        match merge_normals(
            &target.topology,
            &mut target.attributes,
            &request.selected,
            &options,
            &settings,
        ) {
            Ok(report) => {
                info!(
                    "Merged {} vertex normal cluster(s) on {:?}",
                    report.clusters.len(),
                    request.entity
                );
                target.normals = Some(report.normals);
                write_back(&mut commands, &mut meshes, request.entity, target, has_mesh);
            }
            Err(e) => error!("Failed to merge vertex normals on {:?}: {}", request.entity, e),
        }
    }
}
