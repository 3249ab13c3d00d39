use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::container::MeshSource;
use crate::error::ConvertError;

use super::types::{ATTRIBUTE_DEFAULTS, AttributeDefault, attribute_default};

/// Records of one semantic. An empty stream means the attribute is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeStream {
    pub semantic: String,
    pub records: Vec<[f32; 4]>,
}

impl AttributeStream {
    pub fn new(semantic: &str, records: Vec<[f32; 4]>) -> Self {
        Self {
            semantic: semantic.to_string(),
            records,
        }
    }

    pub fn empty(semantic: &str) -> Self {
        Self::new(semantic, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<[f32; 4]> {
        self.records.get(index).copied()
    }
}

/// Attribute access bound to one mesh object.
pub struct AttributeAccessor<'a> {
    source: &'a dyn MeshSource,
}

impl<'a> AttributeAccessor<'a> {
    pub fn new(source: &'a dyn MeshSource) -> Self {
        Self { source }
    }

    /// Returns the stream for `semantic`, or an empty stream when the object
    /// has none. Records are copied as stored; `vertex_count` only sizes the
    /// allocation, length checks are the caller's.
    pub fn get_stream(&self, semantic: &str, vertex_count: usize) -> AttributeStream {
        match self.source.attribute(semantic) {
            Some(records) => {
                let mut out = Vec::with_capacity(vertex_count.max(records.len()));
                out.extend_from_slice(records);
                AttributeStream::new(semantic, out)
            }
            None => AttributeStream::empty(semantic),
        }
    }

    /// Names of every stream the object carries, in container order.
    pub fn semantics(&self) -> Vec<&'a str> {
        self.source.attribute_names()
    }
}

/// The streams one reconstruction reads, length-checked, with the
/// defaulting policy applied on every read.
#[derive(Debug)]
pub struct StreamSet {
    streams: HashMap<&'static str, AttributeStream>,
}

impl StreamSet {
    /// Fetch every stream in the policy table. Any present stream whose
    /// length differs from `vertex_count` fails the mesh, including streams
    /// the reconstruction never reads.
    pub fn fetch(
        accessor: &AttributeAccessor<'_>,
        mesh_name: &str,
        vertex_count: usize,
    ) -> Result<Self, ConvertError> {
        let mut streams = HashMap::with_capacity(ATTRIBUTE_DEFAULTS.len());
        for (semantic, _) in ATTRIBUTE_DEFAULTS {
            let stream = accessor.get_stream(semantic, vertex_count);
            check_length(mesh_name, &stream, vertex_count)?;
            streams.insert(semantic, stream);
        }

        for semantic in accessor.semantics() {
            if !streams.contains_key(semantic) {
                check_length(mesh_name, &accessor.get_stream(semantic, 0), vertex_count)?;
            }
        }

        Ok(Self { streams })
    }

    pub fn is_present(&self, semantic: &str) -> bool {
        self.streams
            .get(semantic)
            .is_some_and(|stream| !stream.is_empty())
    }

    /// Record `index` of `semantic`, falling back per the policy table.
    pub fn record(&self, semantic: &str, index: usize) -> [f32; 4] {
        if let Some(value) = self.streams.get(semantic).and_then(|s| s.get(index)) {
            return value;
        }

        match attribute_default(semantic) {
            AttributeDefault::Zero => [0.0; 4],
            AttributeDefault::White => [1.0; 4],
            AttributeDefault::Alias(other) if other != semantic => self.record(other, index),
            AttributeDefault::Alias(_) => [0.0; 4],
        }
    }
}

fn check_length(
    mesh_name: &str,
    stream: &AttributeStream,
    vertex_count: usize,
) -> Result<(), ConvertError> {
    if !stream.is_empty() && stream.len() != vertex_count {
        return Err(ConvertError::InconsistentCounts {
            mesh: mesh_name.to_string(),
            attribute: stream.semantic.clone(),
            expected: vertex_count,
            actual: stream.len(),
        });
    }

    Ok(())
}
