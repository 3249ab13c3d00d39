use thiserror::Error;

/// How far a failure reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// The whole container is rejected and nothing is imported.
    File,
    /// Only the named mesh is skipped; its siblings are still processed.
    Mesh,
}

/// Error values returned by reconstruction and flattening entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error("model {model}: mesh version {major}.{minor} is not supported")]
    UnsupportedVersion {
        model: String,
        major: u16,
        minor: u16,
    },

    #[error("mesh {mesh}: {attribute} has {actual} entries, expected {expected}")]
    InconsistentCounts {
        mesh: String,
        attribute: String,
        expected: usize,
        actual: usize,
    },

    #[error("mesh {mesh}: {referenced_by} references vertex {index} but the mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        mesh: String,
        referenced_by: &'static str,
        index: u32,
        vertex_count: usize,
    },

    #[error("mesh {mesh}: {index_count} vertex indices do not form whole triangles")]
    IncompleteTriangle { mesh: String, index_count: usize },

    #[error("mesh {mesh}: vertex {vertex} is weighted to bone index {bone_index} which is not in the skeleton")]
    UnresolvedBoneIndex {
        mesh: String,
        vertex: usize,
        bone_index: u32,
    },
}

impl ConvertError {
    pub fn scope(&self) -> ErrorScope {
        match self {
            ConvertError::UnsupportedVersion { .. } => ErrorScope::File,
            ConvertError::InconsistentCounts { .. }
            | ConvertError::IndexOutOfRange { .. }
            | ConvertError::IncompleteTriangle { .. }
            | ConvertError::UnresolvedBoneIndex { .. } => ErrorScope::Mesh,
        }
    }

    /// Stable code used when the error is recorded as a validation issue.
    pub fn code(&self) -> &'static str {
        match self {
            ConvertError::UnsupportedVersion { .. } => "UNSUPPORTED_VERSION",
            ConvertError::InconsistentCounts { .. } => "INCONSISTENT_COUNTS",
            ConvertError::IndexOutOfRange { .. } => "INDEX_OUT_OF_RANGE",
            ConvertError::IncompleteTriangle { .. } => "INCOMPLETE_TRIANGLE",
            ConvertError::UnresolvedBoneIndex { .. } => "UNRESOLVED_BONE_INDEX",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_unsupported_version_when_classified_then_scope_is_file() {
        let error = ConvertError::UnsupportedVersion {
            model: "body".to_string(),
            major: 1,
            minor: 8,
        };

        assert_eq!(error.scope(), ErrorScope::File);
        assert!(error.to_string().contains("1.8"));
    }

    #[test]
    fn given_count_mismatch_when_formatted_then_mesh_and_attribute_are_included() {
        let error = ConvertError::InconsistentCounts {
            mesh: "hair".to_string(),
            attribute: "Normal0".to_string(),
            expected: 10,
            actual: 7,
        };

        let message = error.to_string();
        assert_eq!(error.scope(), ErrorScope::Mesh);
        assert!(message.contains("hair"));
        assert!(message.contains("Normal0"));
        assert!(message.contains("10"));
        assert!(message.contains("7"));
    }

    #[test]
    fn given_unresolved_bone_when_formatted_then_bone_index_is_included() {
        let error = ConvertError::UnresolvedBoneIndex {
            mesh: "body".to_string(),
            vertex: 3,
            bone_index: 42,
        };

        assert_eq!(error.scope(), ErrorScope::Mesh);
        assert_eq!(error.code(), "UNRESOLVED_BONE_INDEX");
        assert!(error.to_string().contains("42"));
    }
}
