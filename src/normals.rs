//! Weighted split normal averaging.
//!
//! For every vertex the loops are split into shading groups; each group gets
//! one normal. Only the faces at the highest influence tier present in a
//! group contribute, weighted by the vertex's [`WeightMode`]. The mesh pass
//! runs through the chunk scheduler and writes one normal per loop.

use bevy::prelude::*;

use crate::area_cache::{AreaCache, AreaCaches};
use crate::attributes::{NormalAttributes, WeightMode};
use crate::error::NormalResult;
use crate::half_edge::{HalfEdgeMesh, LoopId, VertexId};
use crate::loop_space::to_object_space;
use crate::scheduler::{CancellationToken, SchedulePlan, run_chunked};
use crate::settings::NormalSettings;
use crate::shading_groups::split_loops;

/// Result of a split normal pass: one normal per loop, indexed by loop id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitNormals {
    normals: Vec<Vec3>,
    degenerate_groups: usize,
}

impl SplitNormals {
    pub fn new(normals: Vec<Vec3>, degenerate_groups: usize) -> Self {
        Self {
            normals,
            degenerate_groups,
        }
    }

    pub fn get(&self, l: LoopId) -> Vec3 {
        self.normals[l as usize]
    }

    pub fn as_slice(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn len(&self) -> usize {
        self.normals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.normals.is_empty()
    }

    /// Shading groups whose contributions summed to zero. Their loops hold
    /// `Vec3::ZERO`.
    pub fn degenerate_groups(&self) -> usize {
        self.degenerate_groups
    }

    /// Average of the vertex's split normals, normalized. One normal per
    /// vertex regardless of how many groups it has.
    pub fn vertex_normal(&self, mesh: &HalfEdgeMesh, vertex: VertexId) -> Vec3 {
        mesh.vertex_loops(vertex)
            .iter()
            .map(|&l| self.get(l))
            .sum::<Vec3>()
            .normalize_or_zero()
    }

    /// Distinct split normals of a vertex, in loop order. Normals are compared
    /// bit for bit.
    pub fn distinct_vertex_normals(&self, mesh: &HalfEdgeMesh, vertex: VertexId) -> Vec<Vec3> {
        let mut distinct: Vec<Vec3> = Vec::new();
        for &l in mesh.vertex_loops(vertex) {
            let n = self.get(l);
            let bits = n.to_array().map(f32::to_bits);
            if !distinct.iter().any(|d| d.to_array().map(f32::to_bits) == bits) {
                distinct.push(n);
            }
        }
        distinct
    }
}

/// Normal of one shading group, or zero if the contributions cancel out.
pub fn group_normal<C: AreaCache>(
    mesh: &HalfEdgeMesh,
    attrs: &NormalAttributes,
    mode: WeightMode,
    group: &[LoopId],
    cache: &mut C,
) -> Vec3 {
    let face_of = |l: LoopId| mesh.get_loop(l).face;
    let Some(strongest) = group.iter().map(|&l| attrs.influence(face_of(l))).max() else {
        return Vec3::ZERO;
    };

    let mut sum = Vec3::ZERO;
    for &l in group {
        let face = face_of(l);
        if attrs.influence(face) != strongest {
            continue;
        }
        let n = mesh.face_normal(face);
        sum += match mode {
            WeightMode::Uniform => n,
            WeightMode::Angle => mesh.corner_angle(l) * n,
            WeightMode::Area => cache.area(mesh, face) * n,
            WeightMode::Combined => mesh.corner_angle(l) * cache.area(mesh, face) * n,
            WeightMode::Unweighted => to_object_space(mesh, l, attrs.locked_normal(l)),
        };
    }
    sum.normalize_or_zero()
}

/// Compute the split normals of one vertex.
///
/// `out` is aligned with [`HalfEdgeMesh::vertex_loops`] for `vertex`.
/// Returns the number of degenerate groups.
pub fn vertex_split_normals<C: AreaCache>(
    mesh: &HalfEdgeMesh,
    attrs: &NormalAttributes,
    vertex: VertexId,
    smoothing_angle: f32,
    cache: &mut C,
    out: &mut [Vec3],
) -> usize {
    let loops = mesh.vertex_loops(vertex);
    let mode = attrs.weight_mode(vertex);
    let mut degenerate = 0;

    for group in split_loops(mesh, vertex, smoothing_angle) {
        let n = group_normal(mesh, attrs, mode, &group, cache);
        if n == Vec3::ZERO {
            degenerate += 1;
        }
        for l in group {
            if let Ok(slot) = loops.binary_search(&l) {
                out[slot] = n;
            }
        }
    }
    degenerate
}

/// Compute split normals for every loop of `mesh`.
///
/// Missing attribute layers are created with defaults. Runs in parallel for
/// large meshes according to `settings.schedule`.
pub fn compute_split_normals(
    mesh: &HalfEdgeMesh,
    attrs: &mut NormalAttributes,
    settings: &NormalSettings,
) -> NormalResult<SplitNormals> {
    compute_split_normals_cancellable(mesh, attrs, settings, &CancellationToken::new())
}

/// [`compute_split_normals`] that stops early once `cancel` is triggered.
pub fn compute_split_normals_cancellable(
    mesh: &HalfEdgeMesh,
    attrs: &mut NormalAttributes,
    settings: &NormalSettings,
    cancel: &CancellationToken,
) -> NormalResult<SplitNormals> {
    attrs.ensure_for(mesh)?;
    let plan = SchedulePlan::for_vertices(mesh.vertex_count(), &settings.schedule);
    compute_split_normals_with_plan(mesh, attrs, settings, &plan, cancel)
}

/// Compute split normals with an explicit worker plan.
///
/// Results are identical for every plan over the same inputs.
pub fn compute_split_normals_with_plan(
    mesh: &HalfEdgeMesh,
    attrs: &NormalAttributes,
    settings: &NormalSettings,
    plan: &SchedulePlan,
    cancel: &CancellationToken,
) -> NormalResult<SplitNormals> {
    attrs.validate_for(mesh)?;

    let smoothing_angle = settings.smoothing_angle;
    let linked_area_angle = settings.linked_area_angle;
    let mut staging = vec![Vec3::ZERO; mesh.loop_count()];

    let degenerate = run_chunked(
        plan,
        mesh.vertex_loop_offsets(),
        &mut staging,
        cancel,
        || AreaCaches::new(linked_area_angle),
        |cache, v, out| {
            vertex_split_normals(mesh, attrs, v as VertexId, smoothing_angle, cache, out)
        },
    )?;

    // Scatter from vertex order into loop order
    let mut normals = vec![Vec3::ZERO; mesh.loop_count()];
    for (&l, n) in mesh.vertex_loop_order().iter().zip(staging) {
        normals[l as usize] = n;
    }

    if degenerate > 0 {
        warn!(
            "{} shading group(s) have no usable normal; their loops are left zero",
            degenerate
        );
    }
    debug!(
        "Computed {} split normals over {} vertices on {} worker(s)",
        normals.len(),
        mesh.vertex_count(),
        plan.worker_count()
    );

    Ok(SplitNormals::new(normals, degenerate))
}
