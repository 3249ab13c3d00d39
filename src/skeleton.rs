//! Read-only skeleton lookup used by reconstruction and flattening.

use std::{collections::HashMap, fs, path::Path};

use anyhow::{Context, Result};
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

/// Bone lookups the pipeline needs from a skeleton it does not own.
pub trait Skeleton: Sync {
    fn bone_index_of(&self, name: &str) -> Option<usize>;
    /// World transform for column vectors, translation in the last column.
    fn world_transform_of(&self, name: &str) -> Option<Matrix4<f32>>;
    fn bone_name_of(&self, index: usize) -> Option<&str>;
    fn bone_count(&self) -> usize;
}

/// A bone as stored in skeleton JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoneEntry {
    pub name: String,
    /// Row-major world matrix.
    pub world_transform: [[f32; 4]; 4],
}

/// Skeleton backed by an ordered bone list; bone index is list position.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<BoneEntry>", into = "Vec<BoneEntry>")]
pub struct BoneTable {
    bones: Vec<BoneEntry>,
    index_by_name: HashMap<String, usize>,
}

impl BoneTable {
    pub fn new(bones: Vec<BoneEntry>) -> Self {
        let mut index_by_name = HashMap::with_capacity(bones.len());
        for (index, bone) in bones.iter().enumerate() {
            // First bone wins on duplicate names.
            index_by_name.entry(bone.name.clone()).or_insert(index);
        }

        Self {
            bones,
            index_by_name,
        }
    }

    pub fn bones(&self) -> &[BoneEntry] {
        &self.bones
    }
}

impl From<Vec<BoneEntry>> for BoneTable {
    fn from(bones: Vec<BoneEntry>) -> Self {
        Self::new(bones)
    }
}

impl From<BoneTable> for Vec<BoneEntry> {
    fn from(table: BoneTable) -> Self {
        table.bones
    }
}

impl Skeleton for BoneTable {
    fn bone_index_of(&self, name: &str) -> Option<usize> {
        self.index_by_name.get(name).copied()
    }

    fn world_transform_of(&self, name: &str) -> Option<Matrix4<f32>> {
        let bone = self.bones.get(self.bone_index_of(name)?)?;
        let rows: Vec<f32> = bone.world_transform.iter().flatten().copied().collect();
        Some(Matrix4::from_row_slice(&rows))
    }

    fn bone_name_of(&self, index: usize) -> Option<&str> {
        self.bones.get(index).map(|bone| bone.name.as_str())
    }

    fn bone_count(&self) -> usize {
        self.bones.len()
    }
}

/// Load a bone table from a JSON array of bones.
pub fn load_skeleton(path: &Path) -> Result<BoneTable> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read skeleton: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse skeleton JSON: {}", path.display()))
}
