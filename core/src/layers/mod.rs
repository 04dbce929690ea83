//! Layer interface and the layers this crate provides.

pub mod reshape_volume;

use crate::error::{LayerError, LayerResult};
use crate::tensor::{Blob, Element, Shape};

/// A single-input, single-output network layer over `Blob<T>`.
///
/// Call order per shape change: [`Layer::reshape`] once, then any number of
/// [`Layer::forward`] / [`Layer::backward`] calls. Source and destination
/// are borrowed separately, so one blob can never be both.
pub trait Layer<T: Element>: Send + Sync {
    /// Registered type name, e.g. `"ReshapeVolume"`.
    fn layer_type(&self) -> &'static str;

    /// Instance name from the layer definition.
    fn name(&self) -> &str;

    fn exact_num_bottom_blobs(&self) -> usize {
        1
    }

    fn exact_num_top_blobs(&self) -> usize {
        1
    }

    fn allow_in_place(&self) -> bool {
        false
    }

    /// Validate the blob names a network definition wires to this layer.
    fn setup(&self, bottom: &[&str], top: &[&str]) -> LayerResult<()> {
        let layer = self.layer_type();
        if bottom.len() != self.exact_num_bottom_blobs() {
            return Err(LayerError::BlobCount {
                layer,
                role: "bottom",
                expected: self.exact_num_bottom_blobs(),
                actual: bottom.len(),
            });
        }
        if top.len() != self.exact_num_top_blobs() {
            return Err(LayerError::BlobCount {
                layer,
                role: "top",
                expected: self.exact_num_top_blobs(),
                actual: top.len(),
            });
        }
        if !self.allow_in_place() {
            if let Some(shared) = top.iter().find(|t| bottom.contains(*t)) {
                return Err(LayerError::InPlaceUnsupported {
                    layer,
                    blob: (*shared).to_owned(),
                });
            }
        }
        Ok(())
    }

    /// Output shape for `input_shape`, or the invariant it violates.
    fn output_shape(&self, input_shape: &Shape) -> LayerResult<Shape>;

    /// Validate `bottom` and resize `top` to the output shape.
    fn reshape(&mut self, bottom: &Blob<T>, top: &mut Blob<T>) -> LayerResult<()>;

    fn forward(&self, bottom: &Blob<T>, top: &mut Blob<T>) -> LayerResult<()>;

    /// Write `bottom`'s gradient from `top`'s. A `false` flag is a no-op.
    fn backward(&self, top: &Blob<T>, propagate_down: bool, bottom: &mut Blob<T>)
        -> LayerResult<()>;
}

pub use reshape_volume::ReshapeVolumeLayer;
