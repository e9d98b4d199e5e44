//! Load datasets, embedding matrices, and category lists from disk.
//!
//! Splits live in one safetensors file under fixed names: `x_train`,
//! `y_train`, `x_val`, `y_val`, `x_test`, and optionally `y_test`. Token
//! matrices are u32, label matrices f32, both two-dimensional. The
//! embedding matrix is a separate safetensors file with a single
//! `embeddings` tensor; categories are a JSON array of strings.

use crate::data::{Dataset, LabelMatrix, TokenMatrix};
use crate::error::{Error, Result};
use ndarray::Array2;
use safetensors::{Dtype, SafeTensors};
use std::fs;
use std::path::Path;

pub fn load_dataset(path: impl AsRef<Path>) -> Result<Dataset> {
    let buffer = fs::read(path.as_ref())?;
    let tensors = SafeTensors::deserialize(&buffer)
        .map_err(|e| Error::Serialization(format!("invalid dataset file: {e}")))?;

    let x_train = token_split(&tensors, "x_train")?;
    let y_train = label_split(&tensors, "y_train")?;
    let x_val = token_split(&tensors, "x_val")?;
    let y_val = label_split(&tensors, "y_val")?;
    let x_test = token_split(&tensors, "x_test")?;
    let y_test = if tensors.names().iter().any(|n| *n == "y_test") {
        Some(label_split(&tensors, "y_test")?)
    } else {
        None
    };

    check_alignment(&x_train, &y_train, "train")?;
    check_alignment(&x_val, &y_val, "val")?;
    if let Some(y) = &y_test {
        check_alignment(&x_test, y, "test")?;
        check_class_count(y_train.n_classes(), y.n_classes(), "test")?;
    }
    check_class_count(y_train.n_classes(), y_val.n_classes(), "val")?;

    Ok(Dataset {
        x_train,
        y_train,
        x_val,
        y_val,
        x_test,
        y_test,
    })
}

/// Pretrained embedding matrix, `vocab x dim`. Row 0 is the padding vector.
pub fn load_embeddings(path: impl AsRef<Path>) -> Result<Array2<f32>> {
    let buffer = fs::read(path.as_ref())?;
    let tensors = SafeTensors::deserialize(&buffer)
        .map_err(|e| Error::Serialization(format!("invalid embedding file: {e}")))?;
    let view = tensors
        .tensor("embeddings")
        .map_err(|e| Error::Data(format!("embedding tensor missing: {e}")))?;
    if view.dtype() != Dtype::F32 {
        return Err(Error::Data(format!(
            "embeddings must be f32, found {:?}",
            view.dtype()
        )));
    }
    let shape = matrix_shape(view.shape(), "embeddings")?;
    let values: Vec<f32> = bytemuck::cast_slice(view.data()).to_vec();
    Array2::from_shape_vec(shape, values)
        .map_err(|e| Error::Data(format!("embedding shape mismatch: {e}")))
}

/// Ordered category names, one per output column.
pub fn load_categories(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let text = fs::read_to_string(path.as_ref())?;
    serde_json::from_str(&text)
        .map_err(|e| Error::Serialization(format!("invalid category file: {e}")))
}

/// Every token id in every split must index into the embedding vocabulary.
pub fn validate_tokens(dataset: &Dataset, vocab: usize) -> Result<()> {
    for (split, x) in [
        ("train", &dataset.x_train),
        ("val", &dataset.x_val),
        ("test", &dataset.x_test),
    ] {
        if let Some(&id) = x.tokens().iter().find(|&&id| id as usize >= vocab) {
            return Err(Error::Data(format!(
                "{split} split has token id {id} outside vocabulary of {vocab}"
            )));
        }
    }
    Ok(())
}

fn token_split(tensors: &SafeTensors, name: &str) -> Result<TokenMatrix> {
    let view = tensors
        .tensor(name)
        .map_err(|e| Error::Data(format!("dataset split {name} missing: {e}")))?;
    if view.dtype() != Dtype::U32 {
        return Err(Error::Data(format!(
            "{name} must hold u32 token ids, found {:?}",
            view.dtype()
        )));
    }
    let (rows, seq_len) = matrix_shape(view.shape(), name)?;
    let tokens: Vec<u32> = bytemuck::cast_slice(view.data()).to_vec();
    Ok(TokenMatrix::new(rows, seq_len, tokens))
}

fn label_split(tensors: &SafeTensors, name: &str) -> Result<LabelMatrix> {
    let view = tensors
        .tensor(name)
        .map_err(|e| Error::Data(format!("dataset split {name} missing: {e}")))?;
    if view.dtype() != Dtype::F32 {
        return Err(Error::Data(format!(
            "{name} must hold f32 labels, found {:?}",
            view.dtype()
        )));
    }
    let (rows, n_classes) = matrix_shape(view.shape(), name)?;
    let values: Vec<f32> = bytemuck::cast_slice(view.data()).to_vec();
    Ok(LabelMatrix::new(rows, n_classes, values))
}

fn matrix_shape(shape: &[usize], name: &str) -> Result<(usize, usize)> {
    match shape {
        [rows, cols] => Ok((*rows, *cols)),
        other => Err(Error::Data(format!(
            "{name} must be two-dimensional, found shape {other:?}"
        ))),
    }
}

fn check_alignment(x: &TokenMatrix, y: &LabelMatrix, split: &str) -> Result<()> {
    if x.rows() != y.rows() {
        return Err(Error::Data(format!(
            "{split} split has {} token rows but {} label rows",
            x.rows(),
            y.rows()
        )));
    }
    Ok(())
}

fn check_class_count(expected: usize, got: usize, split: &str) -> Result<()> {
    if expected != got {
        return Err(Error::Data(format!(
            "{split} labels have {got} classes, train has {expected}"
        )));
    }
    Ok(())
}
