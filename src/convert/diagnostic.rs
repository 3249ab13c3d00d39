use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Serialize;

use super::types::{DroppedInfluences, ImportReport, ValidationIssue};

// ─── Diagnostic structs ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub(super) struct MeshDiagnostic {
    name: String,
    sub_index: u32,
    binding: &'static str,
    parent_bone_name: Option<String>,
    vertex_count: usize,
    triangle_count: usize,
    attributes: Vec<String>,
    dropped_influences: DroppedInfluences,
}

#[derive(Debug, Clone, Serialize)]
pub(super) struct ImportDiagnosticLog {
    container_path: String,
    model_name: String,
    mesh_count: usize,
    skipped_meshes: Vec<String>,
    meshes: Vec<MeshDiagnostic>,
    issues: Vec<ValidationIssue>,
}

// ─── Path helper ──────────────────────────────────────────────────────────────

pub fn diagnostic_log_path_for_output(output_path: &Path) -> PathBuf {
    output_path.with_extension("diagnostic.json")
}

// ─── Diagnostic writer ────────────────────────────────────────────────────────

fn build_import_diagnostic_log(report: &ImportReport, container_path: &Path) -> ImportDiagnosticLog {
    let meshes = report
        .model
        .meshes
        .iter()
        .enumerate()
        .map(|(index, mesh)| MeshDiagnostic {
            name: mesh.name.clone(),
            sub_index: mesh.sub_index,
            binding: mesh.binding.label(),
            parent_bone_name: Some(mesh.parent_bone_name.clone()).filter(|name| !name.is_empty()),
            vertex_count: mesh.vertices.len(),
            triangle_count: mesh.triangle_count(),
            attributes: mesh.source_attributes.clone(),
            dropped_influences: report
                .dropped_influences
                .get(index)
                .copied()
                .unwrap_or_default(),
        })
        .collect::<Vec<_>>();

    ImportDiagnosticLog {
        container_path: container_path.display().to_string(),
        model_name: report.model.name.clone(),
        mesh_count: meshes.len(),
        skipped_meshes: report.skipped_meshes.clone(),
        meshes,
        issues: report.issues.clone(),
    }
}

/// Write a JSON summary of one import to `diagnostic_path`.
pub fn write_import_diagnostic_log(
    report: &ImportReport,
    container_path: &Path,
    diagnostic_path: &Path,
) -> Result<()> {
    let log = build_import_diagnostic_log(report, container_path);
    let content =
        serde_json::to_vec_pretty(&log).context("failed to serialize diagnostic log")?;
    fs::write(diagnostic_path, content).with_context(|| {
        format!(
            "failed to write diagnostic log: {}",
            diagnostic_path.display()
        )
    })?;
    Ok(())
}
