//! Snapshot saving.

use super::model::SnapshotMetadata;
use crate::{Error, Result, Tensor};
use safetensors::tensor::{Dtype, TensorView};
use std::collections::HashMap;
use std::path::Path;

/// Write named parameters to a safetensors file.
///
/// Tensors are stored flat as F32 with the snapshot metadata embedded in
/// the file header, so a snapshot can be inspected without this crate.
pub fn save_snapshot(
    path: impl AsRef<Path>,
    metadata: &SnapshotMetadata,
    tensors: &[(&str, &Tensor)],
) -> Result<()> {
    let path = path.as_ref();

    // Owned byte buffers first; TensorView borrows from them.
    let tensor_data: Vec<(&str, Vec<u8>, Vec<usize>)> = tensors
        .iter()
        .map(|(name, tensor)| {
            let values = tensor.data().to_vec();
            let bytes: Vec<u8> = bytemuck::cast_slice(&values).to_vec();
            (*name, bytes, vec![tensor.len()])
        })
        .collect();

    let views: Vec<(&str, TensorView<'_>)> = tensor_data
        .iter()
        .map(|(name, bytes, shape)| {
            let view = TensorView::new(Dtype::F32, shape.clone(), bytes)
                .map_err(|e| Error::Serialization(format!("tensor view for '{name}': {e}")))?;
            Ok((*name, view))
        })
        .collect::<Result<_>>()?;

    let mut header = HashMap::new();
    header.insert("name".to_string(), metadata.name.clone());
    header.insert("architecture".to_string(), metadata.architecture.clone());
    header.insert("version".to_string(), metadata.version.clone());

    let bytes = safetensors::serialize(views, &Some(header))
        .map_err(|e| Error::Serialization(format!("safetensors serialization failed: {e}")))?;

    std::fs::write(path, bytes)?;
    Ok(())
}
