//! On-disk snapshot representation.

use crate::Tensor;

/// Identifying metadata stored alongside snapshot tensors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotMetadata {
    /// Label-tree node the snapshot was trained for.
    pub name: String,
    /// Architecture selector the weights belong to.
    pub architecture: String,
    /// Crate version that wrote the file.
    pub version: String,
}

impl SnapshotMetadata {
    pub fn new(name: impl Into<String>, architecture: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            architecture: architecture.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// A saved set of named parameters.
///
/// Loaded tensors never track gradients; restoring into a live model
/// copies the data into that model's own parameters.
#[derive(Debug)]
pub struct Snapshot {
    pub metadata: SnapshotMetadata,
    pub tensors: Vec<(String, Tensor)>,
}

impl Snapshot {
    pub fn new(metadata: SnapshotMetadata, tensors: Vec<(String, Tensor)>) -> Self {
        Self { metadata, tensors }
    }

    /// Look up a tensor by parameter name.
    pub fn tensor(&self, name: &str) -> Option<&Tensor> {
        self.tensors
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}
