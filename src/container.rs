//! Parsed container view.
//!
//! The byte-level container framing lives outside this crate. What the
//! pipeline sees is a set of named attribute streams and an influence list
//! per mesh object, exposed through [`ContainerView`] and [`MeshSource`].
//! [`ParsedContainer`] is the in-memory (and JSON) form of that view, and is
//! also what flattening produces.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::convert::accessor::AttributeStream;

/// Sphere stored in container headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingSphere {
    pub center: [f32; 3],
    pub radius: f32,
}

/// One (vertex, bone, weight) skinning contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluenceRecord {
    pub vertex_index: u32,
    pub bone_name: String,
    pub weight: f32,
}

/// Read access to one mesh object of a parsed container.
pub trait MeshSource: Sync {
    fn name(&self) -> &str;
    /// Occurrence number among objects sharing the same name.
    fn sub_index(&self) -> u32;
    /// Empty when the mesh is not bound to a single parent bone.
    fn parent_bone_name(&self) -> &str;
    fn bounding_sphere(&self) -> BoundingSphere;
    /// Vertex count declared by the object header.
    fn vertex_count(&self) -> usize;
    fn vertex_indices(&self) -> &[u32];
    /// Records of the stream with this semantic name, `None` when absent.
    fn attribute(&self, semantic: &str) -> Option<&[[f32; 4]]>;
    fn attribute_names(&self) -> Vec<&str>;
    fn influences(&self) -> &[InfluenceRecord];
}

/// Read access to a whole parsed container.
pub trait ContainerView {
    fn version(&self) -> (u16, u16);
    fn model_name(&self) -> &str;
    fn bounding_sphere(&self) -> BoundingSphere;
    /// Axis aligned bounds as `(min, max)`.
    fn bounding_box(&self) -> ([f32; 3], [f32; 3]);
    fn has_unknown_section(&self) -> bool;
    fn mesh_objects(&self) -> Vec<&dyn MeshSource>;
}

/// In-memory mesh object: attribute streams plus rigging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedMesh {
    pub name: String,
    #[serde(default)]
    pub sub_index: u32,
    #[serde(default)]
    pub parent_bone_name: String,
    #[serde(default)]
    pub bounding_sphere: BoundingSphere,
    pub vertex_count: usize,
    pub vertex_indices: Vec<u32>,
    #[serde(default)]
    pub attributes: Vec<AttributeStream>,
    #[serde(default)]
    pub influences: Vec<InfluenceRecord>,
}

impl MeshSource for ParsedMesh {
    fn name(&self) -> &str {
        &self.name
    }

    fn sub_index(&self) -> u32 {
        self.sub_index
    }

    fn parent_bone_name(&self) -> &str {
        &self.parent_bone_name
    }

    fn bounding_sphere(&self) -> BoundingSphere {
        self.bounding_sphere
    }

    fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    fn vertex_indices(&self) -> &[u32] {
        &self.vertex_indices
    }

    fn attribute(&self, semantic: &str) -> Option<&[[f32; 4]]> {
        self.attributes
            .iter()
            .find(|stream| stream.semantic == semantic)
            .map(|stream| stream.records.as_slice())
    }

    fn attribute_names(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .map(|stream| stream.semantic.as_str())
            .collect()
    }

    fn influences(&self) -> &[InfluenceRecord] {
        &self.influences
    }
}

/// In-memory container: header fields plus mesh objects in file order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedContainer {
    pub major_version: u16,
    pub minor_version: u16,
    pub model_name: String,
    #[serde(default)]
    pub bounding_sphere: BoundingSphere,
    #[serde(default)]
    pub bounding_box_min: [f32; 3],
    #[serde(default)]
    pub bounding_box_max: [f32; 3],
    /// Size of a header section this crate does not interpret.
    #[serde(default)]
    pub unknown_section_size: u32,
    pub objects: Vec<ParsedMesh>,
}

impl ContainerView for ParsedContainer {
    fn version(&self) -> (u16, u16) {
        (self.major_version, self.minor_version)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn bounding_sphere(&self) -> BoundingSphere {
        self.bounding_sphere
    }

    fn bounding_box(&self) -> ([f32; 3], [f32; 3]) {
        (self.bounding_box_min, self.bounding_box_max)
    }

    fn has_unknown_section(&self) -> bool {
        self.unknown_section_size != 0
    }

    fn mesh_objects(&self) -> Vec<&dyn MeshSource> {
        self.objects
            .iter()
            .map(|object| object as &dyn MeshSource)
            .collect()
    }
}

/// Load a parsed container from a JSON file.
pub fn load_container(path: &Path) -> Result<ParsedContainer> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read container: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse container JSON: {}", path.display()))
}

/// Save a parsed container as a JSON file.
pub fn save_container(path: &Path, container: &ParsedContainer) -> Result<()> {
    let content =
        serde_json::to_vec_pretty(container).context("failed to serialize container JSON")?;
    fs::write(path, content)
        .with_context(|| format!("failed to write container: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mesh() -> ParsedMesh {
        ParsedMesh {
            name: "body".to_string(),
            vertex_count: 1,
            vertex_indices: Vec::new(),
            attributes: vec![AttributeStream::new("Position0", vec![[1.0, 2.0, 3.0, 0.0]])],
            ..ParsedMesh::default()
        }
    }

    #[test]
    fn given_parsed_mesh_when_looking_up_attributes_then_only_present_streams_resolve() {
        let mesh = sample_mesh();

        assert_eq!(mesh.attribute("Position0").map(<[_]>::len), Some(1));
        assert!(mesh.attribute("Normal0").is_none());
        assert_eq!(mesh.attribute_names(), vec!["Position0"]);
    }

    #[test]
    fn given_minimal_json_when_parsing_container_then_optional_fields_default() {
        let json = r#"{
            "major_version": 1,
            "minor_version": 10,
            "model_name": "model",
            "objects": [
                { "name": "body", "vertex_count": 0, "vertex_indices": [] }
            ]
        }"#;

        let container: ParsedContainer = serde_json::from_str(json).expect("parse container");

        assert_eq!(container.version(), (1, 10));
        assert!(!container.has_unknown_section());
        let objects = container.mesh_objects();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].parent_bone_name(), "");
        assert!(objects[0].influences().is_empty());
    }

    #[test]
    fn given_container_file_when_saved_and_loaded_then_streams_survive() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("model.json");
        let container = ParsedContainer {
            major_version: 1,
            minor_version: 10,
            model_name: "model".to_string(),
            bounding_sphere: BoundingSphere::default(),
            bounding_box_min: [0.0; 3],
            bounding_box_max: [1.0; 3],
            unknown_section_size: 0,
            objects: vec![sample_mesh()],
        };

        save_container(&path, &container).expect("save container");
        let loaded = load_container(&path).expect("load container");

        assert_eq!(
            loaded.objects[0].attribute("Position0"),
            Some(&[[1.0, 2.0, 3.0, 0.0]][..])
        );
    }
}
