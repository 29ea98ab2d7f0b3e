//! Partition of a vertex's loops into shading groups.
//!
//! Two loops of the same vertex are connected when their faces share an edge
//! through that vertex which is manifold, smooth and bends by no more than the
//! smoothing angle. A group is the closure of that relation, so the result
//! depends only on topology, not on the order loops are visited.

use std::collections::BTreeSet;

use crate::half_edge::{EdgeId, HalfEdgeMesh, LoopId, VertexId};

/// Whether shading continues across `edge` at the given smoothing angle.
pub fn edge_connects(mesh: &HalfEdgeMesh, edge: EdgeId, smoothing_angle: f32) -> bool {
    mesh.is_manifold(edge)
        && mesh.is_edge_smooth(edge)
        && mesh
            .edge_face_angle(edge)
            .is_some_and(|angle| angle <= smoothing_angle)
}

/// The loop of `loop_on_edge`'s face that starts at `vertex`, when the loop's
/// edge touches it. Handles both windings of the radial partner.
fn corner_at(mesh: &HalfEdgeMesh, loop_on_edge: LoopId, vertex: VertexId) -> Option<LoopId> {
    let l = mesh.get_loop(loop_on_edge);
    if l.vertex == vertex {
        Some(loop_on_edge)
    } else if mesh.get_loop(l.next).vertex == vertex {
        Some(l.next)
    } else {
        None
    }
}

/// Loops of `vertex` adjacent to `l` across either of its two corner edges.
fn neighbors(
    mesh: &HalfEdgeMesh,
    vertex: VertexId,
    l: LoopId,
    smoothing_angle: f32,
) -> impl Iterator<Item = LoopId> + '_ {
    let lp = mesh.get_loop(l);
    // The outgoing edge belongs to `l`, the incoming edge to its previous loop
    [l, lp.prev].into_iter().filter_map(move |side| {
        let edge = mesh.get_loop(side).edge;
        if !edge_connects(mesh, edge, smoothing_angle) {
            return None;
        }
        let partner = mesh.radial_partner(side)?;
        corner_at(mesh, partner, vertex)
    })
}

/// Split the loops of `vertex` into disjoint shading groups.
///
/// Every loop of the vertex appears in exactly one group. Groups are sorted
/// internally and ordered by their smallest loop id.
pub fn split_loops(
    mesh: &HalfEdgeMesh,
    vertex: VertexId,
    smoothing_angle: f32,
) -> Vec<Vec<LoopId>> {
    let mut unvisited: BTreeSet<LoopId> = mesh.vertex_loops(vertex).iter().copied().collect();
    let mut groups = Vec::new();
    let mut stack = Vec::new();

    while let Some(seed) = unvisited.pop_first() {
        let mut group = vec![seed];
        stack.push(seed);

        while let Some(l) = stack.pop() {
            for neighbor in neighbors(mesh, vertex, l, smoothing_angle) {
                if unvisited.remove(&neighbor) {
                    group.push(neighbor);
                    stack.push(neighbor);
                }
            }
        }

        group.sort_unstable();
        groups.push(group);
    }

    groups
}
