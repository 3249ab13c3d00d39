use nalgebra::{Vector2, Vector3, Vector4};
use serde::{Deserialize, Serialize};

use crate::container::BoundingSphere;

// ─── Semantic names ───────────────────────────────────────────────────────────

pub const POSITION: &str = "Position0";
pub const NORMAL: &str = "Normal0";
pub const TANGENT: &str = "Tangent0";
/// Primary UV channel; also drives tangent-basis synthesis.
pub const MAP1: &str = "map1";
pub const UV_SET: &str = "uvSet";
pub const UV_SET1: &str = "uvSet1";
/// Bake/lightmap UV channel.
pub const BAKE1: &str = "bake1";
pub const COLOR_SET1: &str = "colorSet1";
pub const COLOR_SET5: &str = "colorSet5";

/// Streams whose absence is a data-integrity warning rather than a normal state.
pub(super) const REQUIRED_ATTRIBUTES: [&str; 3] = [POSITION, NORMAL, TANGENT];

// ─── Format constants ─────────────────────────────────────────────────────────

/// Only mesh containers of this version are read.
pub const SUPPORTED_VERSION: (u16, u16) = (1, 10);

/// Influence slots per vertex.
pub const MAX_INFLUENCES: usize = 4;

/// Colour streams hold `[0, 128]` stored as float; this maps them to `[0, 1]`.
pub const COLOR_SET_DIVISOR: f32 = 128.0;

/// Value written to every colour stream on export.
pub const EXPORT_COLOR_PLACEHOLDER: [f32; 4] = [128.0, 128.0, 128.0, 128.0];

/// The model header stores twice the bounding sphere radius.
pub(super) const MODEL_SPHERE_RADIUS_SCALE: f32 = 0.5;

// ─── Defaulting policy ────────────────────────────────────────────────────────

/// What a vertex reads when its stream is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeDefault {
    Zero,
    /// Read the same vertex from another stream, following its policy in turn.
    Alias(&'static str),
    /// Opaque white.
    White,
}

/// Every stream the reconstruction reads, with its fallback.
pub const ATTRIBUTE_DEFAULTS: [(&str, AttributeDefault); 9] = [
    (POSITION, AttributeDefault::Zero),
    (NORMAL, AttributeDefault::Zero),
    (TANGENT, AttributeDefault::Zero),
    (MAP1, AttributeDefault::Zero),
    (UV_SET, AttributeDefault::Alias(MAP1)),
    (UV_SET1, AttributeDefault::Zero),
    (BAKE1, AttributeDefault::Zero),
    (COLOR_SET1, AttributeDefault::White),
    (COLOR_SET5, AttributeDefault::White),
];

pub fn attribute_default(semantic: &str) -> AttributeDefault {
    ATTRIBUTE_DEFAULTS
        .iter()
        .find(|(name, _)| *name == semantic)
        .map(|(_, policy)| *policy)
        .unwrap_or(AttributeDefault::Zero)
}

// ─── Vertex and mesh types ────────────────────────────────────────────────────

/// Four (bone index, weight) pairs. Unused slots hold `(0, 0.0)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SkinSlots {
    pub bone_indices: [u32; MAX_INFLUENCES],
    pub weights: [f32; MAX_INFLUENCES],
}

impl SkinSlots {
    /// One full-weight influence on `bone_index`.
    pub fn single(bone_index: u32) -> Self {
        Self {
            bone_indices: [bone_index, 0, 0, 0],
            weights: [1.0, 0.0, 0.0, 0.0],
        }
    }

    pub fn populated(&self) -> usize {
        self.weights.iter().filter(|weight| **weight > 0.0).count()
    }
}

/// Renderer-ready vertex, one per original vertex index.
#[derive(Debug, Clone, PartialEq)]
pub struct InterleavedVertex {
    pub position: Vector3<f32>,
    pub normal: Vector3<f32>,
    pub tangent: Vector3<f32>,
    pub bitangent: Vector3<f32>,
    pub map1: Vector2<f32>,
    pub uv_set: Vector2<f32>,
    pub uv_set1: Vector2<f32>,
    pub bake1: Vector2<f32>,
    pub skin: SkinSlots,
    pub color_set1: Vector4<f32>,
    pub color_set5: Vector4<f32>,
}

/// How a mesh's skin slots came to be.
///
/// A single-bind mesh is baked into its parent bone's space at import and
/// flattening never reverses that, so it does not round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshBinding {
    /// Slots come from the container's influence table.
    Rigged,
    /// Vertices were moved into the parent bone's world space and every
    /// vertex is fully weighted to it.
    SingleBindCorrected {
        parent_bone: String,
        bone_index: u32,
    },
}

impl MeshBinding {
    pub fn label(&self) -> &'static str {
        match self {
            MeshBinding::Rigged => "rigged",
            MeshBinding::SingleBindCorrected { .. } => "single_bind_corrected",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub sub_index: u32,
    /// Empty when there is no single-bind parent.
    pub parent_bone_name: String,
    pub bounding_sphere: BoundingSphere,
    /// Triangle list into `vertices`.
    pub indices: Vec<u32>,
    pub vertices: Vec<InterleavedVertex>,
    pub binding: MeshBinding,
    /// Attribute names the container object carried, in container order.
    pub source_attributes: Vec<String>,
}

impl Mesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn has_source_attribute(&self, semantic: &str) -> bool {
        self.source_attributes.iter().any(|name| name == semantic)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub name: String,
    pub bounding_sphere: BoundingSphere,
    pub volume_center: Vector3<f32>,
    pub volume_size: Vector3<f32>,
    pub meshes: Vec<Mesh>,
}

// ─── Reporting ────────────────────────────────────────────────────────────────

/// Severity level used by validation issues.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A single validation issue produced during import/export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub(super) fn new(severity: Severity, code: &str, message: String) -> Self {
        Self {
            severity,
            code: code.to_string(),
            message,
        }
    }
}

/// Result of importing one container.
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub model: Model,
    pub issues: Vec<ValidationIssue>,
    /// Names of meshes that failed and were left out of `model`.
    pub skipped_meshes: Vec<String>,
    /// Influence drop counts, parallel to `model.meshes`.
    pub dropped_influences: Vec<DroppedInfluences>,
}

/// Influences the rigging resolver discarded for one mesh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DroppedInfluences {
    /// Records naming a bone the skeleton does not have.
    pub unknown_bone: usize,
    /// Records arriving after a vertex's slots were full.
    pub over_budget: usize,
}
