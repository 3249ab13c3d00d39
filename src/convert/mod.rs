pub mod accessor;
mod diagnostic;
mod flatten;
mod geometry;
mod skinning;
pub mod types;
mod validation;

use nalgebra::{Matrix4, Vector2, Vector3, Vector4};
use rayon::prelude::*;

use crate::container::{ContainerView, MeshSource};
use crate::error::ConvertError;
use crate::logging::ResultExt;
use crate::project::ConvertSettings;
use crate::skeleton::Skeleton;
use crate::{log_debug, log_info, log_warn};

// Re-export public types for callers of this module.
pub use accessor::{AttributeAccessor, AttributeStream, StreamSet};
pub use diagnostic::{diagnostic_log_path_for_output, write_import_diagnostic_log};
pub use flatten::{ExportReport, flatten_mesh, flatten_model};
pub use skinning::ResolvedSkin;
pub use types::{
    DroppedInfluences, ImportReport, InterleavedVertex, Mesh, MeshBinding, Model, Severity,
    SkinSlots, ValidationIssue,
};

use geometry::{
    accumulate_bitangents, finalize_bitangent, model_bounding_sphere, transform_normal,
    transform_position, volume_from_bounds,
};
use skinning::resolve_rigging;
use types::{
    ATTRIBUTE_DEFAULTS, BAKE1, COLOR_SET_DIVISOR, COLOR_SET1, COLOR_SET5, MAP1, NORMAL, POSITION,
    REQUIRED_ATTRIBUTES, TANGENT, UV_SET, UV_SET1,
};
use validation::{validate_index_buffer, validate_version};

/// One reconstructed mesh plus what was noticed while building it.
#[derive(Debug, Clone)]
pub struct MeshImport {
    pub mesh: Mesh,
    pub issues: Vec<ValidationIssue>,
    pub dropped: DroppedInfluences,
}

// ─── Public API ───────────────────────────────────────────────────────────────

/// Reconstruct every mesh of a container into an interleaved model.
///
/// An unsupported container version fails the whole call. A mesh that fails
/// is left out, recorded in `skipped_meshes` with an error issue, and its
/// siblings are still reconstructed. Mesh order follows the container.
pub fn reconstruct_model(
    container: &dyn ContainerView,
    skeleton: Option<&dyn Skeleton>,
    settings: &ConvertSettings,
) -> Result<ImportReport, ConvertError> {
    validate_version(container).log_error(Some("import"))?;

    let mut issues = Vec::<ValidationIssue>::new();
    if container.has_unknown_section() {
        log_warn!(
            "model {}: container carries an unknown section",
            container.model_name()
        );
        issues.push(ValidationIssue::new(
            Severity::Warning,
            "UNKNOWN_SECTION",
            format!(
                "Unknown mesh format section detected in model {}",
                container.model_name()
            ),
        ));
    }

    let objects = container.mesh_objects();
    let results: Vec<Result<MeshImport, ConvertError>> = if settings.parallel_meshes {
        objects
            .par_iter()
            .map(|object| reconstruct_mesh(*object, skeleton, settings))
            .collect()
    } else {
        objects
            .iter()
            .map(|object| reconstruct_mesh(*object, skeleton, settings))
            .collect()
    };

    let mut meshes = Vec::with_capacity(objects.len());
    let mut dropped_influences = Vec::with_capacity(objects.len());
    let mut skipped_meshes = Vec::new();
    for (object, result) in objects.iter().zip(results) {
        match result.log_error(Some("skipping mesh")) {
            Ok(import) => {
                issues.extend(import.issues);
                dropped_influences.push(import.dropped);
                meshes.push(import.mesh);
            }
            Err(error) => {
                issues.push(ValidationIssue::new(
                    Severity::Error,
                    error.code(),
                    error.to_string(),
                ));
                skipped_meshes.push(object.name().to_string());
            }
        }
    }

    let (bounds_min, bounds_max) = container.bounding_box();
    let (volume_center, volume_size) = volume_from_bounds(bounds_min, bounds_max);

    log_info!(
        "model {}: reconstructed {} meshes, skipped {}",
        container.model_name(),
        meshes.len(),
        skipped_meshes.len()
    );

    Ok(ImportReport {
        model: Model {
            name: container.model_name().to_string(),
            bounding_sphere: model_bounding_sphere(container.bounding_sphere()),
            volume_center,
            volume_size,
            meshes,
        },
        issues,
        skipped_meshes,
        dropped_influences,
    })
}

/// Reconstruct one mesh object into interleaved vertices.
///
/// Vertex `i` of the result is built from record `i` of every stream, so the
/// index buffer is carried over unchanged.
pub fn reconstruct_mesh(
    source: &dyn MeshSource,
    skeleton: Option<&dyn Skeleton>,
    settings: &ConvertSettings,
) -> Result<MeshImport, ConvertError> {
    let name = source.name();
    let vertex_count = source.vertex_count();
    let indices = source.vertex_indices();

    validate_index_buffer(name, indices, vertex_count)?;
    let streams = StreamSet::fetch(&AttributeAccessor::new(source), name, vertex_count)?;
    let mut issues = report_missing_attributes(name, &streams);

    let positions: Vec<Vector3<f32>> = (0..vertex_count)
        .map(|i| xyz(streams.record(POSITION, i)))
        .collect();
    let normals: Vec<Vector3<f32>> = (0..vertex_count)
        .map(|i| xyz(streams.record(NORMAL, i)))
        .collect();
    let map1: Vec<Vector2<f32>> = (0..vertex_count)
        .map(|i| xy(streams.record(MAP1, i)))
        .collect();

    let bitangent_sums = accumulate_bitangents(indices, &positions, &map1);

    let skin = resolve_rigging(name, vertex_count, source.influences(), |bone| {
        skeleton.and_then(|s| s.bone_index_of(bone))
    })?;
    if skin.dropped.unknown_bone > 0 || skin.dropped.over_budget > 0 {
        log_debug!(
            "mesh {}: dropped {} influences on unknown bones, {} over the slot budget",
            name,
            skin.dropped.unknown_bone,
            skin.dropped.over_budget
        );
    }

    let single_bind = resolve_single_bind(source, skeleton, settings, &mut issues);

    let vertices = (0..vertex_count)
        .map(|i| {
            let mut vertex = InterleavedVertex {
                position: positions[i],
                normal: normals[i],
                tangent: xyz(streams.record(TANGENT, i)),
                bitangent: finalize_bitangent(bitangent_sums[i], normals[i]),
                map1: map1[i],
                uv_set: xy(streams.record(UV_SET, i)),
                uv_set1: xy(streams.record(UV_SET1, i)),
                bake1: xy(streams.record(BAKE1, i)),
                skin: skin.slots[i],
                color_set1: decode_color(&streams, COLOR_SET1, i),
                color_set5: decode_color(&streams, COLOR_SET5, i),
            };

            if let Some((bone_index, transform)) = &single_bind {
                vertex.position = transform_position(transform, vertex.position);
                vertex.normal = transform_normal(transform, vertex.normal);
                vertex.skin = SkinSlots::single(*bone_index);
            }

            vertex
        })
        .collect();

    let binding = match single_bind {
        Some((bone_index, _)) => MeshBinding::SingleBindCorrected {
            parent_bone: source.parent_bone_name().to_string(),
            bone_index,
        },
        None => MeshBinding::Rigged,
    };

    Ok(MeshImport {
        mesh: Mesh {
            name: name.to_string(),
            sub_index: source.sub_index(),
            parent_bone_name: source.parent_bone_name().to_string(),
            bounding_sphere: source.bounding_sphere(),
            indices: indices.to_vec(),
            vertices,
            binding,
            source_attributes: source
                .attribute_names()
                .into_iter()
                .map(ToOwned::to_owned)
                .collect(),
        },
        issues,
        dropped: skin.dropped,
    })
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn report_missing_attributes(mesh_name: &str, streams: &StreamSet) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for semantic in REQUIRED_ATTRIBUTES {
        if !streams.is_present(semantic) {
            log_warn!("mesh {}: {} is missing, reading zeros", mesh_name, semantic);
            issues.push(ValidationIssue::new(
                Severity::Warning,
                "MISSING_REQUIRED_ATTRIBUTE",
                format!("Mesh {} has no {} stream", mesh_name, semantic),
            ));
        }
    }

    for (semantic, policy) in ATTRIBUTE_DEFAULTS {
        if !REQUIRED_ATTRIBUTES.contains(&semantic) && !streams.is_present(semantic) {
            log_debug!("mesh {}: {} absent, using {:?}", mesh_name, semantic, policy);
        }
    }

    issues
}

/// Parent bone index and world transform when the mesh is single-bound to a
/// bone the skeleton knows.
fn resolve_single_bind(
    source: &dyn MeshSource,
    skeleton: Option<&dyn Skeleton>,
    settings: &ConvertSettings,
    issues: &mut Vec<ValidationIssue>,
) -> Option<(u32, Matrix4<f32>)> {
    let parent = source.parent_bone_name();
    if parent.is_empty() || !settings.single_bind_correction {
        return None;
    }

    let skeleton = skeleton?;
    let resolved = skeleton
        .bone_index_of(parent)
        .zip(skeleton.world_transform_of(parent));

    if resolved.is_none() {
        log_warn!(
            "mesh {}: parent bone {} is not in the skeleton, keeping rigged weights",
            source.name(),
            parent
        );
        issues.push(ValidationIssue::new(
            Severity::Warning,
            "UNRESOLVED_PARENT_BONE",
            format!(
                "Mesh {} is bound to missing bone {}",
                source.name(),
                parent
            ),
        ));
    }

    resolved.map(|(index, transform)| (index as u32, transform))
}

fn decode_color(streams: &StreamSet, semantic: &str, index: usize) -> Vector4<f32> {
    let value = Vector4::from(streams.record(semantic, index));
    if streams.is_present(semantic) {
        value / COLOR_SET_DIVISOR
    } else {
        value
    }
}

fn xyz(record: [f32; 4]) -> Vector3<f32> {
    Vector3::new(record[0], record[1], record[2])
}

fn xy(record: [f32; 4]) -> Vector2<f32> {
    Vector2::new(record[0], record[1])
}
