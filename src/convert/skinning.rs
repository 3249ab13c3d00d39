use crate::container::InfluenceRecord;
use crate::error::ConvertError;
use crate::skeleton::Skeleton;

use super::types::{DroppedInfluences, InterleavedVertex, MAX_INFLUENCES, SkinSlots};

/// Fixed-width skin data for every vertex of one mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSkin {
    pub slots: Vec<SkinSlots>,
    pub dropped: DroppedInfluences,
}

// ─── Influence list → slots ───────────────────────────────────────────────────

/// Pack an unordered influence list into four slots per vertex.
///
/// Influences are taken in list order and each goes into the first slot of
/// its vertex whose weight is still zero. Influences on bones `bone_index_of`
/// cannot resolve are skipped, and once a vertex has four occupied slots
/// further influences are dropped. The kept influences are the first four
/// encountered, not the heaviest four, and weights are never renormalized.
/// Existing exported assets depend on exactly this packing.
pub(super) fn resolve_rigging<F>(
    mesh_name: &str,
    vertex_count: usize,
    influences: &[InfluenceRecord],
    bone_index_of: F,
) -> Result<ResolvedSkin, ConvertError>
where
    F: Fn(&str) -> Option<usize>,
{
    let mut slots = vec![SkinSlots::default(); vertex_count];
    let mut dropped = DroppedInfluences::default();

    for influence in influences {
        let Some(bone_index) = bone_index_of(&influence.bone_name) else {
            dropped.unknown_bone += 1;
            continue;
        };

        let vertex = slots.get_mut(influence.vertex_index as usize).ok_or_else(|| {
            ConvertError::IndexOutOfRange {
                mesh: mesh_name.to_string(),
                referenced_by: "influence",
                index: influence.vertex_index,
                vertex_count,
            }
        })?;

        match vertex.weights.iter().position(|weight| *weight == 0.0) {
            Some(lane) => {
                vertex.bone_indices[lane] = bone_index as u32;
                vertex.weights[lane] = influence.weight;
            }
            None => dropped.over_budget += 1,
        }
    }

    Ok(ResolvedSkin { slots, dropped })
}

// ─── Vertex slots → influence list ────────────────────────────────────────────

/// Emit one influence per populated slot, vertex by vertex, lane by lane.
///
/// Every weighted bone index must name a bone in `skeleton`.
pub(super) fn collect_influences(
    mesh_name: &str,
    vertices: &[InterleavedVertex],
    skeleton: &dyn Skeleton,
) -> Result<Vec<InfluenceRecord>, ConvertError> {
    let mut influences = Vec::new();

    for (vertex_index, vertex) in vertices.iter().enumerate() {
        for lane in 0..MAX_INFLUENCES {
            let weight = vertex.skin.weights[lane];
            if weight <= 0.0 {
                continue;
            }

            let bone_index = vertex.skin.bone_indices[lane];
            let bone_name = skeleton.bone_name_of(bone_index as usize).ok_or_else(|| {
                ConvertError::UnresolvedBoneIndex {
                    mesh: mesh_name.to_string(),
                    vertex: vertex_index,
                    bone_index,
                }
            })?;

            influences.push(InfluenceRecord {
                vertex_index: vertex_index as u32,
                bone_name: bone_name.to_string(),
                weight,
            });
        }
    }

    Ok(influences)
}
