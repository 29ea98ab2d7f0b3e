//! Merging of vertex normals that lie within a distance of each other.
//!
//! Candidate vertices are binned into a uniform grid with cells as wide as
//! the merge distance, so every neighbor within range sits in the 27 cells
//! around a vertex. Each cluster gets one locked normal: the normalized sum
//! of its members' averaged split normals.

use bevy::math::I64Vec3;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::attributes::NormalAttributes;
use crate::error::{NormalError, NormalResult};
use crate::half_edge::{HalfEdgeMesh, VertexId};
use crate::normals::{SplitNormals, compute_split_normals};
use crate::operations::lock_vertex_normal;
use crate::settings::NormalSettings;

/// Parameters of a merge pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeOptions {
    /// Maximum distance between merged vertices. Must be greater than zero.
    pub distance: f32,
    /// Unselected vertices near a selected one join its cluster.
    pub include_unselected: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            distance: 0.0001,
            include_unselected: false,
        }
    }
}

impl MergeOptions {
    pub fn from_settings(settings: &NormalSettings) -> Self {
        Self {
            distance: settings.merge_distance,
            include_unselected: settings.merge_unselected,
        }
    }
}

/// Outcome of [`merge_normals`].
#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    /// Vertices that received a shared normal, one list per cluster.
    pub clusters: Vec<Vec<VertexId>>,
    /// Split normals recomputed after the merge.
    pub normals: SplitNormals,
}

impl MergeReport {
    pub fn merged_vertex_count(&self) -> usize {
        self.clusters.iter().map(Vec::len).sum()
    }
}

/// Uniform grid over vertex positions.
#[derive(Debug, Clone)]
pub struct CellIndex {
    distance: f32,
    cells: HashMap<I64Vec3, Vec<VertexId>>,
}

impl CellIndex {
    pub fn new(distance: f32) -> Self {
        Self {
            distance,
            cells: HashMap::new(),
        }
    }

    /// Cell holding a position. Keys are 64-bit so small distances far from
    /// the origin still get distinct cells; the cast saturates at the extremes.
    pub fn cell(&self, position: Vec3) -> I64Vec3 {
        (position / self.distance).floor().as_i64vec3()
    }

    pub fn insert(&mut self, vertex: VertexId, position: Vec3) {
        let cell = self.cell(position);
        self.cells.entry(cell).or_default().push(vertex);
    }

    /// Every indexed vertex in the 3 x 3 x 3 block of cells around `position`.
    pub fn nearby(&self, position: Vec3) -> Vec<VertexId> {
        let center = self.cell(position);
        let mut found = Vec::new();
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let cell = center.wrapping_add(I64Vec3::new(dx, dy, dz));
                    if let Some(verts) = self.cells.get(&cell) {
                        found.extend_from_slice(verts);
                    }
                }
            }
        }
        found
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

/// Merge the normals of selected vertices that lie within `options.distance`
/// of each other, then recompute split normals.
///
/// Merged vertices switch to [`WeightMode::Unweighted`](crate::WeightMode)
/// with the cluster normal locked on every loop. A selected vertex with no
/// neighbor in range is only touched if its loops carry more than one
/// distinct normal.
pub fn merge_normals(
    mesh: &HalfEdgeMesh,
    attrs: &mut NormalAttributes,
    selected: &[VertexId],
    options: &MergeOptions,
    settings: &NormalSettings,
) -> NormalResult<MergeReport> {
    if options.distance.is_nan() || options.distance <= 0.0 {
        return Err(NormalError::InvalidMergeDistance(options.distance));
    }
    attrs.ensure_for(mesh)?;

    let mut working: BTreeSet<VertexId> = selected
        .iter()
        .copied()
        .filter(|&v| (v as usize) < mesh.vertex_count())
        .collect();

    let mut index = CellIndex::new(options.distance);
    if options.include_unselected {
        for v in 0..mesh.vertex_count() as VertexId {
            index.insert(v, mesh.position(v));
        }
    } else {
        for &v in &working {
            index.insert(v, mesh.position(v));
        }
    }

    // Every cluster reads the normals from before the merge
    let snapshot = compute_split_normals(mesh, attrs, settings)?;
    let distance_squared = options.distance * options.distance;
    let mut clusters = Vec::new();

    while let Some(seed) = working.pop_first() {
        let origin = mesh.position(seed);
        let mut mergeable: Vec<VertexId> = index
            .nearby(origin)
            .into_iter()
            .filter(|&v| mesh.position(v).distance_squared(origin) <= distance_squared)
            .collect();
        mergeable.sort_unstable();
        mergeable.dedup();

        let merged = mergeable
            .iter()
            .map(|&v| snapshot.vertex_normal(mesh, v))
            .sum::<Vec3>()
            .normalize_or_zero();

        let split = snapshot.distinct_vertex_normals(mesh, seed).len() > 1;
        if split || mergeable.len() > 1 {
            if merged == Vec3::ZERO {
                warn!("Merged normal around vertex {} cancels out; locking zero", seed);
            }
            for &v in &mergeable {
                lock_vertex_normal(mesh, attrs, v, merged);
            }
            clusters.push(mergeable.clone());
        }

        for v in &mergeable {
            working.remove(v);
        }
    }

    let merged_count: usize = clusters.iter().map(Vec::len).sum();
    info!(
        "Merged normals of {} vertices into {} cluster(s) (distance {}, {} grid cells)",
        merged_count,
        clusters.len(),
        options.distance,
        index.cell_count()
    );

    let normals = compute_split_normals(mesh, attrs, settings)?;
    Ok(MergeReport { clusters, normals })
}
