//! Snapshot loading.

use super::model::{Snapshot, SnapshotMetadata};
use crate::{Error, Result, Tensor};
use std::path::Path;

/// Read a safetensors snapshot from disk.
///
/// Header metadata written by [`super::save_snapshot`] is restored when
/// present; files written by other tools fall back to `"unknown"` fields.
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Snapshot> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;

    let (_, header) = safetensors::SafeTensors::read_metadata(&data)
        .map_err(|e| Error::Serialization(format!("safetensors header parsing failed: {e}")))?;

    let custom = header.metadata();
    let name = custom
        .as_ref()
        .and_then(|m| m.get("name").cloned())
        .unwrap_or_else(|| "unknown".to_string());
    let architecture = custom
        .as_ref()
        .and_then(|m| m.get("architecture").cloned())
        .unwrap_or_else(|| "unknown".to_string());
    let version = custom
        .as_ref()
        .and_then(|m| m.get("version").cloned())
        .unwrap_or_else(|| "unknown".to_string());

    let parsed = safetensors::SafeTensors::deserialize(&data)
        .map_err(|e| Error::Serialization(format!("safetensors parsing failed: {e}")))?;

    let mut tensors = Vec::new();
    for tensor_name in parsed.names() {
        let view = parsed
            .tensor(tensor_name)
            .map_err(|e| Error::Serialization(format!("tensor '{tensor_name}': {e}")))?;
        if view.dtype() != safetensors::Dtype::F32 {
            return Err(Error::Serialization(format!(
                "tensor '{tensor_name}' has dtype {:?}, expected F32",
                view.dtype()
            )));
        }
        let values: &[f32] = bytemuck::cast_slice(view.data());
        tensors.push((tensor_name.to_string(), Tensor::from_vec(values.to_vec(), false)));
    }
    // Deterministic order regardless of header layout
    tensors.sort_by(|(a, _), (b, _)| a.cmp(b));

    let metadata = SnapshotMetadata {
        name,
        architecture,
        version,
    };
    Ok(Snapshot::new(metadata, tensors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::save_snapshot;
    use tempfile::tempdir;

    #[test]
    fn round_trips_tensors_and_metadata() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model_2.safetensors");

        let weight = Tensor::from_vec(vec![1.5, -2.5, 3.5], true);
        let meta = SnapshotMetadata::new("2", "xml-cnn");
        save_snapshot(&path, &meta, &[("output.weight", &weight)]).unwrap();

        let snapshot = load_snapshot(&path).unwrap();
        assert_eq!(snapshot.metadata.name, "2");
        assert_eq!(snapshot.metadata.architecture, "xml-cnn");
        assert_eq!(snapshot.metadata.version, env!("CARGO_PKG_VERSION"));

        let restored = snapshot.tensor("output.weight").unwrap();
        assert_eq!(restored.data().to_vec(), vec![1.5, -2.5, 3.5]);
        assert!(!restored.requires_grad());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_snapshot("does/not/exist.safetensors").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn garbage_bytes_fail_cleanly() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("junk.safetensors");
        std::fs::write(&path, b"not a safetensors file").unwrap();

        let err = load_snapshot(&path).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
