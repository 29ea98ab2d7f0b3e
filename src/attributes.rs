//! Per-vertex, per-face and per-loop attribute layers that steer averaging.
//!
//! Layers are created lazily: a mesh that was never edited has no layers and
//! every element reads as the default. Layers are stored as plain vectors
//! indexed by element id and serialize with serde, so they can be persisted
//! alongside the mesh.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{NormalError, NormalResult};
use crate::half_edge::{FaceId, HalfEdgeMesh, LoopId, VertexId};

/// How a vertex weights face contributions inside a shading group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WeightMode {
    /// Every face normal contributes equally.
    Uniform,
    /// Weighted by the interior corner angle.
    #[default]
    Angle,
    /// Weighted by face area (or linked area).
    Area,
    /// Weighted by corner angle times face area.
    Combined,
    /// Use the stored locked normal as-is.
    Unweighted,
}

impl WeightMode {
    pub const ALL: [WeightMode; 5] = [
        WeightMode::Uniform,
        WeightMode::Angle,
        WeightMode::Area,
        WeightMode::Combined,
        WeightMode::Unweighted,
    ];

    /// Integer code used by persisted layers.
    pub fn code(self) -> i32 {
        match self {
            WeightMode::Uniform => -1,
            WeightMode::Angle => 0,
            WeightMode::Area => 1,
            WeightMode::Combined => 2,
            WeightMode::Unweighted => 3,
        }
    }

    /// Decode a persisted code. Unknown codes read as the default mode.
    pub fn from_code(code: i32) -> Self {
        match code {
            -1 => WeightMode::Uniform,
            0 => WeightMode::Angle,
            1 => WeightMode::Area,
            2 => WeightMode::Combined,
            3 => WeightMode::Unweighted,
            _ => WeightMode::default(),
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            WeightMode::Uniform => "Uniform",
            WeightMode::Angle => "Corner Angle",
            WeightMode::Area => "Face Area",
            WeightMode::Combined => "Combined",
            WeightMode::Unweighted => "Unweighted",
        }
    }
}

/// Priority tier of a face. Within a shading group only faces at the highest
/// tier present contribute.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum FaceInfluence {
    Weak,
    #[default]
    Medium,
    Strong,
}

impl FaceInfluence {
    pub const ALL: [FaceInfluence; 3] =
        [FaceInfluence::Weak, FaceInfluence::Medium, FaceInfluence::Strong];

    pub fn code(self) -> i32 {
        match self {
            FaceInfluence::Weak => -1,
            FaceInfluence::Medium => 0,
            FaceInfluence::Strong => 1,
        }
    }

    /// Decode a persisted code. Unknown codes read as the default tier.
    pub fn from_code(code: i32) -> Self {
        match code {
            -1 => FaceInfluence::Weak,
            0 => FaceInfluence::Medium,
            1 => FaceInfluence::Strong,
            _ => FaceInfluence::default(),
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            FaceInfluence::Weak => "Weak",
            FaceInfluence::Medium => "Medium",
            FaceInfluence::Strong => "Strong",
        }
    }
}

/// Attribute layers of one mesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalAttributes {
    /// Per-vertex weighting mode.
    #[serde(default)]
    pub weight_modes: Option<Vec<WeightMode>>,
    /// Per-face influence tier.
    #[serde(default)]
    pub influences: Option<Vec<FaceInfluence>>,
    /// Per-loop locked normal, in loop space.
    #[serde(default)]
    pub locked_normals: Option<Vec<[f32; 3]>>,
}

/// Create a layer if absent and pad it with defaults up to `len`.
fn ensure_layer<T: Clone>(
    layer: &mut Option<Vec<T>>,
    name: &'static str,
    len: usize,
    fill: T,
) -> NormalResult<()> {
    let values = layer.get_or_insert_with(Vec::new);
    if values.len() > len {
        return Err(NormalError::LayerMismatch {
            layer: name,
            expected: len,
            found: values.len(),
        });
    }
    values.resize(len, fill);
    Ok(())
}

/// Check that an existing layer is not longer than the mesh.
fn check_layer<T>(layer: &Option<Vec<T>>, name: &'static str, len: usize) -> NormalResult<()> {
    match layer {
        Some(values) if values.len() > len => Err(NormalError::LayerMismatch {
            layer: name,
            expected: len,
            found: values.len(),
        }),
        _ => Ok(()),
    }
}

impl NormalAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create every missing layer and size all layers to the given counts.
    pub fn ensure_layers(
        &mut self,
        vertex_count: usize,
        face_count: usize,
        loop_count: usize,
    ) -> NormalResult<()> {
        ensure_layer(
            &mut self.weight_modes,
            "weight_modes",
            vertex_count,
            WeightMode::default(),
        )?;
        ensure_layer(
            &mut self.influences,
            "influences",
            face_count,
            FaceInfluence::default(),
        )?;
        ensure_layer(&mut self.locked_normals, "locked_normals", loop_count, [0.0; 3])
    }

    /// [`ensure_layers`](Self::ensure_layers) sized for `mesh`.
    pub fn ensure_for(&mut self, mesh: &HalfEdgeMesh) -> NormalResult<()> {
        self.ensure_layers(mesh.vertex_count(), mesh.face_count(), mesh.loop_count())
    }

    /// Verify no layer outgrew `mesh`, without creating anything.
    pub fn validate_for(&self, mesh: &HalfEdgeMesh) -> NormalResult<()> {
        check_layer(&self.weight_modes, "weight_modes", mesh.vertex_count())?;
        check_layer(&self.influences, "influences", mesh.face_count())?;
        check_layer(&self.locked_normals, "locked_normals", mesh.loop_count())
    }

    pub fn weight_mode(&self, vertex: VertexId) -> WeightMode {
        self.weight_modes
            .as_ref()
            .and_then(|layer| layer.get(vertex as usize).copied())
            .unwrap_or_default()
    }

    pub fn set_weight_mode(&mut self, vertex: VertexId, mode: WeightMode) {
        let layer = self.weight_modes.get_or_insert_with(Vec::new);
        let idx = vertex as usize;
        if layer.len() <= idx {
            layer.resize(idx + 1, WeightMode::default());
        }
        layer[idx] = mode;
    }

    pub fn influence(&self, face: FaceId) -> FaceInfluence {
        self.influences
            .as_ref()
            .and_then(|layer| layer.get(face as usize).copied())
            .unwrap_or_default()
    }

    pub fn set_influence(&mut self, face: FaceId, influence: FaceInfluence) {
        let layer = self.influences.get_or_insert_with(Vec::new);
        let idx = face as usize;
        if layer.len() <= idx {
            layer.resize(idx + 1, FaceInfluence::default());
        }
        layer[idx] = influence;
    }

    /// Locked normal of a loop, in loop space. Zero if never locked.
    pub fn locked_normal(&self, l: LoopId) -> Vec3 {
        self.locked_normals
            .as_ref()
            .and_then(|layer| layer.get(l as usize))
            .map(|v| Vec3::from(*v))
            .unwrap_or(Vec3::ZERO)
    }

    pub fn set_locked_normal(&mut self, l: LoopId, normal: Vec3) {
        let layer = self.locked_normals.get_or_insert_with(Vec::new);
        let idx = l as usize;
        if layer.len() <= idx {
            layer.resize(idx + 1, [0.0; 3]);
        }
        layer[idx] = normal.to_array();
    }

    /// Weight modes as integer codes, for persistence formats without enums.
    pub fn weight_codes(&self) -> Option<Vec<i32>> {
        self.weight_modes
            .as_ref()
            .map(|layer| layer.iter().map(|m| m.code()).collect())
    }

    pub fn set_weight_codes(&mut self, codes: &[i32]) {
        self.weight_modes = Some(codes.iter().map(|&c| WeightMode::from_code(c)).collect());
    }

    /// Influence tiers as integer codes.
    pub fn influence_codes(&self) -> Option<Vec<i32>> {
        self.influences
            .as_ref()
            .map(|layer| layer.iter().map(|i| i.code()).collect())
    }

    pub fn set_influence_codes(&mut self, codes: &[i32]) {
        self.influences = Some(codes.iter().map(|&c| FaceInfluence::from_code(c)).collect());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_meshes;

    #[test]
    fn codes_round_trip() {
        for mode in WeightMode::ALL {
            assert_eq!(WeightMode::from_code(mode.code()), mode);
        }
        for tier in FaceInfluence::ALL {
            assert_eq!(FaceInfluence::from_code(tier.code()), tier);
        }
    }

    #[test]
    fn unknown_codes_read_as_default() {
        assert_eq!(WeightMode::from_code(42), WeightMode::Angle);
        assert_eq!(WeightMode::from_code(-7), WeightMode::Angle);
        assert_eq!(FaceInfluence::from_code(9), FaceInfluence::Medium);
    }

    #[test]
    fn influence_tiers_are_ordered() {
        assert!(FaceInfluence::Weak < FaceInfluence::Medium);
        assert!(FaceInfluence::Medium < FaceInfluence::Strong);
    }

    #[test]
    fn absent_layers_read_as_defaults() {
        let attrs = NormalAttributes::new();
        assert_eq!(attrs.weight_mode(3), WeightMode::Angle);
        assert_eq!(attrs.influence(1), FaceInfluence::Medium);
        assert_eq!(attrs.locked_normal(5), Vec3::ZERO);
    }

    #[test]
    fn setters_create_layers_lazily() {
        let mut attrs = NormalAttributes::new();
        attrs.set_weight_mode(2, WeightMode::Area);
        assert_eq!(attrs.weight_modes.as_ref().map(Vec::len), Some(3));
        assert_eq!(attrs.weight_mode(0), WeightMode::Angle);
        assert_eq!(attrs.weight_mode(2), WeightMode::Area);
        assert!(attrs.influences.is_none());
    }

    #[test]
    fn ensure_layers_extends_and_preserves() {
        let he = crate::HalfEdgeMesh::from_edit_mesh(&test_meshes::cube());
        let mut attrs = NormalAttributes::new();
        attrs.set_influence(1, FaceInfluence::Strong);

        attrs.ensure_for(&he).expect("layers fit the mesh");
        assert_eq!(attrs.weight_modes.as_ref().map(Vec::len), Some(8));
        assert_eq!(attrs.influences.as_ref().map(Vec::len), Some(6));
        assert_eq!(attrs.locked_normals.as_ref().map(Vec::len), Some(24));
        assert_eq!(attrs.influence(1), FaceInfluence::Strong);

        // Idempotent
        let before = attrs.clone();
        attrs.ensure_for(&he).expect("layers fit the mesh");
        assert_eq!(attrs, before);
    }

    #[test]
    fn oversized_layer_is_rejected() {
        let he = crate::HalfEdgeMesh::from_edit_mesh(&test_meshes::cube());
        let mut attrs = NormalAttributes::new();
        attrs.set_weight_mode(20, WeightMode::Uniform);

        let err = attrs.ensure_for(&he).unwrap_err();
        assert!(matches!(
            err,
            NormalError::LayerMismatch {
                layer: "weight_modes",
                expected: 8,
                found: 21
            }
        ));
        assert!(attrs.validate_for(&he).is_err());
    }

    #[test]
    fn integer_codes_round_trip() {
        let mut attrs = NormalAttributes::new();
        attrs.set_weight_codes(&[-1, 0, 1, 2, 3, 99]);
        assert_eq!(attrs.weight_codes(), Some(vec![-1, 0, 1, 2, 3, 0]));

        attrs.set_influence_codes(&[1, -1]);
        assert_eq!(attrs.influence(0), FaceInfluence::Strong);
        assert_eq!(attrs.influence(1), FaceInfluence::Weak);
        assert_eq!(attrs.influence_codes(), Some(vec![1, -1]));
    }

    #[test]
    fn layers_serialize_with_ron() {
        let mut attrs = NormalAttributes::new();
        attrs.set_weight_mode(0, WeightMode::Unweighted);
        attrs.set_locked_normal(1, Vec3::new(0.0, 1.0, 0.0));

        let text = ron::to_string(&attrs).expect("serialize");
        let back: NormalAttributes = ron::from_str(&text).expect("deserialize");
        assert_eq!(back, attrs);
    }
}
