//! Configuration validation

use super::schema::PipelineSpec;

/// Validation error type
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Node name must not be empty")]
    EmptyNode,

    #[error("Node name '{0}' must not contain path separators")]
    NodeWithSeparator(String),

    #[error("Invalid mode: {0} (must be one of: scratch, fine-tune)")]
    InvalidMode(String),

    #[error("Mode 'fine-tune' requires parent_node")]
    MissingParentNode,

    #[error("Dataset path does not exist: {0}")]
    DatasetNotFound(String),

    #[error("Embeddings path does not exist: {0}")]
    EmbeddingsNotFound(String),

    #[error("Categories path does not exist: {0}")]
    CategoriesNotFound(String),

    #[error("Invalid architecture: {0} (must be one of: cnn, xml-cnn)")]
    InvalidArchitecture(String),

    #[error("Invalid out channels: {0} (must be > 0)")]
    InvalidOutChannels(usize),

    #[error("Invalid hidden units: {0} (must be > 0)")]
    InvalidHiddenUnits(usize),

    #[error("Model needs at least one filter width")]
    NoFilterWidths,

    #[error("Invalid filter width: {0} (must be > 0)")]
    InvalidFilterWidth(usize),

    #[error("Invalid pool chunks: {0} (must be > 0)")]
    InvalidPoolChunks(usize),

    #[error("Invalid learning rate: {0} (must be > 0.0)")]
    InvalidLearningRate(f32),

    #[error("Invalid optimizer: {0} (must be one of: adam, sgd)")]
    InvalidOptimizer(String),

    #[error("Invalid batch size: {0} (must be > 0)")]
    InvalidBatchSize(usize),

    #[error("Invalid epochs: {0} (must be > 0)")]
    InvalidEpochs(usize),

    #[error("Invalid gradient clip value: {0} (must be > 0.0)")]
    InvalidGradClip(f32),
}

/// Validate a pipeline specification
///
/// Checks:
/// - Node names are usable as file-name components
/// - Input paths exist
/// - Numeric values are in valid ranges
/// - Enums match allowed values
pub fn validate_config(spec: &PipelineSpec) -> Result<(), ValidationError> {
    validate_node_name(&spec.node)?;

    let valid_modes = ["scratch", "fine-tune"];
    if !valid_modes.contains(&spec.mode.as_str()) {
        return Err(ValidationError::InvalidMode(spec.mode.clone()));
    }

    if spec.mode == "fine-tune" {
        match &spec.parent_node {
            Some(parent) => validate_node_name(parent)?,
            None => return Err(ValidationError::MissingParentNode),
        }
    }

    // Validate input paths (skip in tests where files may not exist)
    #[cfg(not(test))]
    {
        if !spec.data.dataset.exists() {
            return Err(ValidationError::DatasetNotFound(
                spec.data.dataset.display().to_string(),
            ));
        }

        if !spec.data.embeddings.exists() {
            return Err(ValidationError::EmbeddingsNotFound(
                spec.data.embeddings.display().to_string(),
            ));
        }

        if !spec.data.categories.exists() {
            return Err(ValidationError::CategoriesNotFound(
                spec.data.categories.display().to_string(),
            ));
        }
    }

    // Validate model sizes
    let valid_architectures = ["cnn", "xml-cnn"];
    if !valid_architectures.contains(&spec.model.architecture.to_lowercase().as_str()) {
        return Err(ValidationError::InvalidArchitecture(
            spec.model.architecture.clone(),
        ));
    }

    if spec.model.out_channels == 0 {
        return Err(ValidationError::InvalidOutChannels(spec.model.out_channels));
    }

    if spec.model.hidden_units == 0 {
        return Err(ValidationError::InvalidHiddenUnits(spec.model.hidden_units));
    }

    if spec.model.filter_widths.is_empty() {
        return Err(ValidationError::NoFilterWidths);
    }

    if let Some(&width) = spec.model.filter_widths.iter().find(|&&w| w == 0) {
        return Err(ValidationError::InvalidFilterWidth(width));
    }

    if spec.model.pool_chunks == 0 {
        return Err(ValidationError::InvalidPoolChunks(spec.model.pool_chunks));
    }

    // Validate optimizer
    if spec.optimizer.lr <= 0.0 {
        return Err(ValidationError::InvalidLearningRate(spec.optimizer.lr));
    }

    let valid_optimizers = ["adam", "sgd"];
    if !valid_optimizers.contains(&spec.optimizer.name.to_lowercase().as_str()) {
        return Err(ValidationError::InvalidOptimizer(
            spec.optimizer.name.clone(),
        ));
    }

    // Validate training parameters
    if spec.training.batch_size == 0 {
        return Err(ValidationError::InvalidBatchSize(spec.training.batch_size));
    }

    if spec.training.epochs == 0 {
        return Err(ValidationError::InvalidEpochs(spec.training.epochs));
    }

    if let Some(grad_clip) = spec.training.grad_clip {
        if grad_clip <= 0.0 {
            return Err(ValidationError::InvalidGradClip(grad_clip));
        }
    }

    Ok(())
}

/// Node names become file-name components (model_<node>.safetensors,
/// probability_<node>.csv), so they must be plain and non-empty.
fn validate_node_name(node: &str) -> Result<(), ValidationError> {
    if node.is_empty() {
        return Err(ValidationError::EmptyNode);
    }
    if node.contains('/') || node.contains('\\') || node.contains("..") {
        return Err(ValidationError::NodeWithSeparator(node.to_string()));
    }
    Ok(())
}
