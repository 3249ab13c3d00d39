use crate::container::ContainerView;
use crate::error::ConvertError;

use super::types::SUPPORTED_VERSION;

/// Reject containers whose version this crate cannot read.
pub(super) fn validate_version(container: &dyn ContainerView) -> Result<(), ConvertError> {
    let (major, minor) = container.version();
    if (major, minor) != SUPPORTED_VERSION {
        return Err(ConvertError::UnsupportedVersion {
            model: container.model_name().to_string(),
            major,
            minor,
        });
    }

    Ok(())
}

/// Index buffer must be a whole triangle list inside the vertex range.
pub(super) fn validate_index_buffer(
    mesh_name: &str,
    indices: &[u32],
    vertex_count: usize,
) -> Result<(), ConvertError> {
    if indices.len() % 3 != 0 {
        return Err(ConvertError::IncompleteTriangle {
            mesh: mesh_name.to_string(),
            index_count: indices.len(),
        });
    }

    if let Some(index) = indices
        .iter()
        .copied()
        .find(|index| *index as usize >= vertex_count)
    {
        return Err(ConvertError::IndexOutOfRange {
            mesh: mesh_name.to_string(),
            referenced_by: "index buffer",
            index,
            vertex_count,
        });
    }

    Ok(())
}
