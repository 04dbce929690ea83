//! Error types for the volnet-core library.
//!
//! Every fallible function returns `LayerResult<T>`. Shape-inference failures
//! are raised before any buffer is touched; the host decides whether to abort.

use crate::backend::Device;

/// All possible error conditions in the volnet-core library.
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    #[error("{layer} layer does not allow in-place computation (blob `{blob}` is both bottom and top)")]
    InPlaceUnsupported { layer: &'static str, blob: String },

    #[error("{layer} layer expects out_h * out_w == in_c (slice size {slice_size}, input channels {channels})")]
    SliceSizeMismatch {
        layer: &'static str,
        slice_size: usize,
        channels: usize,
    },

    #[error("{layer} layer expects in_h == 1 (got {height})")]
    InputHeightNotOne { layer: &'static str, height: usize },

    #[error("{layer} layer expects in_w == 1 (got {width})")]
    InputWidthNotOne { layer: &'static str, width: usize },

    #[error("{layer} layer parameter `{param}` must be at least 1 (got {value})")]
    InvalidParameter {
        layer: &'static str,
        param: &'static str,
        value: usize,
    },

    #[error("{layer} layer: {quantity} overflows addressable memory")]
    ShapeOverflow {
        layer: &'static str,
        quantity: &'static str,
    },

    #[error("{layer} layer requires the `{param}` block")]
    MissingParameter {
        layer: &'static str,
        param: &'static str,
    },

    #[error("{layer} layer takes exactly {expected} {role} blob(s), got {actual}")]
    BlobCount {
        layer: &'static str,
        role: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid input length: expected {expected}, got {actual}")]
    InvalidInputLength { expected: usize, actual: usize },

    #[error("{layer} layer used before shape inference")]
    NotConfigured { layer: &'static str },

    #[error("{layer} layer: {role} blob has shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        layer: &'static str,
        role: &'static str,
        expected: [usize; 4],
        actual: [usize; 4],
    },

    #[error("{layer} layer: {op} is not implemented for the {device} device")]
    NotImplemented {
        layer: &'static str,
        op: &'static str,
        device: Device,
    },

    #[error("unknown layer type `{0}`")]
    UnknownLayerType(String),

    #[error("layer type `{0}` is already registered")]
    DuplicateLayerType(String),

    #[error("invalid layer configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type LayerResult<T> = Result<T, LayerError>;
