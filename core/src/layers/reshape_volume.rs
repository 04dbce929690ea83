//! ReshapeVolume layer: per-sample vector → multi-channel 2D grid.
//!
//! The input holds one vector of `out_height * out_width` values per sample,
//! stored in the channel axis (`(N, H*W, 1, 1)`). Forward copies that vector
//! into every one of `out_channels` output grids, producing
//! `(N, out_channels, out_height, out_width)`. Backward is the adjoint: the
//! output gradient is summed over channels back into the single input slice.
//!
//! ```text
//! in  [n]          : v0 v1 v2 v3
//! out [n, c=0..K]  : | v0 v1 |  | v0 v1 |  ...
//!                    | v2 v3 |  | v2 v3 |
//! ```

use tracing::{debug, trace};

use crate::backend::{kernel_for, Device, VolumeGeometry, VolumeKernel};
use crate::config::{LayerConfig, ReshapeVolumeParams};
use crate::error::{LayerError, LayerResult};
use crate::layers::Layer;
use crate::tensor::{Blob, Element, Shape};

/// Registered type name.
pub const LAYER_TYPE: &str = "ReshapeVolume";

/// Broadcast-and-reshape layer. See the module docs for the layout.
///
/// One blob cannot be both source and destination:
///
/// ```compile_fail
/// use volnet_core::{Blob, Layer, ReshapeVolumeLayer, ReshapeVolumeParams};
///
/// let mut layer =
///     ReshapeVolumeLayer::<f32>::from_params("r", ReshapeVolumeParams::new(2, 2, 3)).unwrap();
/// let mut blob = Blob::<f32>::new(1, 4, 1, 1);
/// layer.reshape(&blob, &mut blob).unwrap();
/// ```
pub struct ReshapeVolumeLayer<T: Element> {
    config: LayerConfig,
    params: ReshapeVolumeParams,
    kernel: Box<dyn VolumeKernel<T>>,
    out_height: usize,
    out_width: usize,
    out_channels: usize,
    slice_size: usize,
    geometry: Option<VolumeGeometry>,
}

impl<T: Element> core::fmt::Debug for ReshapeVolumeLayer<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReshapeVolumeLayer")
            .field("name", &self.config.name)
            .field("device", &self.kernel.device())
            .field("params", &self.params)
            .field("geometry", &self.geometry)
            .finish()
    }
}

impl<T: Element> ReshapeVolumeLayer<T> {
    /// Build from a layer definition. The definition must carry a
    /// `reshape_volume_param` block.
    pub fn new(config: LayerConfig) -> LayerResult<Self> {
        if config.layer_type != LAYER_TYPE {
            return Err(LayerError::UnknownLayerType(config.layer_type));
        }
        let params = config
            .reshape_volume_param
            .ok_or(LayerError::MissingParameter {
                layer: LAYER_TYPE,
                param: "reshape_volume_param",
            })?;
        let kernel = kernel_for(config.device);
        Ok(Self {
            config,
            params,
            kernel,
            out_height: 0,
            out_width: 0,
            out_channels: 0,
            slice_size: 0,
            geometry: None,
        })
    }

    /// CPU layer with no blob wiring.
    pub fn from_params(name: impl Into<String>, params: ReshapeVolumeParams) -> LayerResult<Self> {
        Self::new(LayerConfig::reshape_volume(name, params))
    }

    pub fn params(&self) -> ReshapeVolumeParams {
        self.params
    }

    pub fn device(&self) -> Device {
        self.kernel.device()
    }

    pub fn out_height(&self) -> usize {
        self.out_height
    }

    pub fn out_width(&self) -> usize {
        self.out_width
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    /// `out_height * out_width` as of the last `reshape`.
    pub fn slice_size(&self) -> usize {
        self.slice_size
    }

    /// Geometry applied by the last successful `reshape`.
    pub fn geometry(&self) -> Option<VolumeGeometry> {
        self.geometry
    }

    fn check_params(&self) -> LayerResult<()> {
        let p = &self.params;
        for (param, value) in [
            ("out_height", p.out_height),
            ("out_width", p.out_width),
            ("out_channels", p.out_channels),
        ] {
            if value == 0 {
                return Err(LayerError::InvalidParameter {
                    layer: LAYER_TYPE,
                    param,
                    value,
                });
            }
        }
        Ok(())
    }

    fn applied_geometry(&self) -> LayerResult<VolumeGeometry> {
        self.geometry
            .ok_or(LayerError::NotConfigured { layer: LAYER_TYPE })
    }

    fn check_blob(role: &'static str, expected: Shape, blob: &Blob<T>) -> LayerResult<()> {
        if blob.shape() != expected {
            return Err(LayerError::ShapeMismatch {
                layer: LAYER_TYPE,
                role,
                expected: expected.dims,
                actual: blob.shape().dims,
            });
        }
        Ok(())
    }

    fn check_blobs(&self, geometry: &VolumeGeometry, bottom: &Blob<T>, top: &Blob<T>) -> LayerResult<()> {
        Self::check_blob("bottom", Shape::vector(geometry.num, geometry.slice_size()), bottom)?;
        Self::check_blob(
            "top",
            Shape::d4(
                geometry.num,
                geometry.out_channels,
                geometry.out_height,
                geometry.out_width,
            ),
            top,
        )
    }
}

impl<T: Element> Layer<T> for ReshapeVolumeLayer<T> {
    fn layer_type(&self) -> &'static str {
        LAYER_TYPE
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn output_shape(&self, input_shape: &Shape) -> LayerResult<Shape> {
        self.check_params()?;
        let p = &self.params;
        let slice_size = p
            .out_height
            .checked_mul(p.out_width)
            .ok_or(LayerError::ShapeOverflow {
                layer: LAYER_TYPE,
                quantity: "out_height * out_width",
            })?;

        if slice_size != input_shape.channels() {
            return Err(LayerError::SliceSizeMismatch {
                layer: LAYER_TYPE,
                slice_size,
                channels: input_shape.channels(),
            });
        }
        if input_shape.height() != 1 {
            return Err(LayerError::InputHeightNotOne {
                layer: LAYER_TYPE,
                height: input_shape.height(),
            });
        }
        if input_shape.width() != 1 {
            return Err(LayerError::InputWidthNotOne {
                layer: LAYER_TYPE,
                width: input_shape.width(),
            });
        }

        let out_shape = Shape::d4(input_shape.num(), p.out_channels, p.out_height, p.out_width);
        let fits = out_shape
            .checked_total()
            .and_then(|count| count.checked_mul(core::mem::size_of::<T>()))
            .is_some_and(|bytes| bytes <= isize::MAX as usize);
        if !fits {
            return Err(LayerError::ShapeOverflow {
                layer: LAYER_TYPE,
                quantity: "output blob size",
            });
        }
        Ok(out_shape)
    }

    fn reshape(&mut self, bottom: &Blob<T>, top: &mut Blob<T>) -> LayerResult<()> {
        self.geometry = None;
        let out_shape = self.output_shape(&bottom.shape())?;

        self.out_height = self.params.out_height;
        self.out_width = self.params.out_width;
        self.out_channels = self.params.out_channels;
        self.slice_size = self.out_height * self.out_width;

        top.reshape_like(out_shape);
        let geometry = VolumeGeometry {
            num: bottom.num(),
            out_channels: self.out_channels,
            out_height: self.out_height,
            out_width: self.out_width,
        };
        self.geometry = Some(geometry);

        debug!(
            layer = %self.config.name,
            input = ?bottom.shape().dims,
            output = ?out_shape.dims,
            "reshape volume configured"
        );
        Ok(())
    }

    fn forward(&self, bottom: &Blob<T>, top: &mut Blob<T>) -> LayerResult<()> {
        let geometry = self.applied_geometry()?;
        self.check_blobs(&geometry, bottom, top)?;
        trace!(layer = %self.config.name, num = geometry.num, "reshape volume forward");
        self.kernel.forward(LAYER_TYPE, &geometry, bottom, top)
    }

    fn backward(
        &self,
        top: &Blob<T>,
        propagate_down: bool,
        bottom: &mut Blob<T>,
    ) -> LayerResult<()> {
        if !propagate_down {
            return Ok(());
        }
        let geometry = self.applied_geometry()?;
        self.check_blobs(&geometry, bottom, top)?;
        trace!(layer = %self.config.name, num = geometry.num, "reshape volume backward");
        self.kernel.backward(LAYER_TYPE, &geometry, top, bottom)
    }
}

/// Registry constructor for [`LAYER_TYPE`].
pub fn create<T: Element>(config: LayerConfig) -> LayerResult<Box<dyn Layer<T>>> {
    Ok(Box::new(ReshapeVolumeLayer::<T>::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(h: usize, w: usize, c: usize) -> ReshapeVolumeLayer<f32> {
        ReshapeVolumeLayer::from_params("rv", ReshapeVolumeParams::new(h, w, c)).unwrap()
    }

    #[test]
    fn reshape_records_derived_slice_size() {
        let mut rv = layer(3, 2, 4);
        let bottom = Blob::new(5, 6, 1, 1);
        let mut top = Blob::new(1, 1, 1, 1);
        rv.reshape(&bottom, &mut top).unwrap();
        assert_eq!(rv.slice_size(), 6);
        assert_eq!(rv.out_channels(), 4);
        assert_eq!(
            rv.geometry(),
            Some(VolumeGeometry { num: 5, out_channels: 4, out_height: 3, out_width: 2 })
        );
        assert_eq!(top.shape(), Shape::d4(5, 4, 3, 2));
    }

    #[test]
    fn forward_before_reshape_is_rejected() {
        let rv = layer(2, 2, 2);
        let bottom = Blob::new(1, 4, 1, 1);
        let mut top = Blob::new(1, 2, 2, 2);
        assert!(matches!(
            rv.forward(&bottom, &mut top),
            Err(LayerError::NotConfigured { .. })
        ));
    }

    #[test]
    fn forward_after_batch_change_requires_reshape() {
        let mut rv = layer(2, 2, 2);
        let bottom = Blob::new(1, 4, 1, 1);
        let mut top = Blob::new(1, 1, 1, 1);
        rv.reshape(&bottom, &mut top).unwrap();

        let bigger = Blob::new(3, 4, 1, 1);
        let err = rv.forward(&bigger, &mut top).unwrap_err();
        assert!(matches!(err, LayerError::ShapeMismatch { role: "bottom", .. }));

        rv.reshape(&bigger, &mut top).unwrap();
        rv.forward(&bigger, &mut top).unwrap();
        assert_eq!(top.shape(), Shape::d4(3, 2, 2, 2));
    }

    #[test]
    fn oversized_grid_is_rejected() {
        let rv = layer(1 << 33, 1 << 31, 1);
        assert!(matches!(
            rv.output_shape(&Shape::vector(1, 0)),
            Err(LayerError::ShapeOverflow { quantity: "out_height * out_width", .. })
        ));
    }

    #[test]
    fn oversized_output_blob_is_rejected_before_allocation() {
        let mut rv = layer(1, 1, usize::MAX / 2);
        let bottom = Blob::new(1, 1, 1, 1);
        let mut top = Blob::from_data(Shape::d4(1, 1, 1, 2), vec![4.0, 5.0]).unwrap();
        let err = rv.reshape(&bottom, &mut top).unwrap_err();
        assert!(matches!(
            err,
            LayerError::ShapeOverflow { quantity: "output blob size", .. }
        ));
        assert!(err.to_string().contains("overflows"));
        assert_eq!(top.data(), &[4.0, 5.0]);

        let rv = layer(1, 1, usize::MAX);
        assert!(rv.output_shape(&Shape::vector(2, 1)).is_err());
    }

    #[test]
    fn failed_reshape_clears_previous_geometry() {
        let mut rv = layer(2, 2, 2);
        let bottom = Blob::new(1, 4, 1, 1);
        let mut top = Blob::new(0, 0, 0, 0);
        rv.reshape(&bottom, &mut top).unwrap();
        rv.forward(&bottom, &mut top).unwrap();

        let bad = Blob::new(1, 5, 1, 1);
        let mut other_top = Blob::new(0, 0, 0, 0);
        assert!(rv.reshape(&bad, &mut other_top).is_err());
        assert!(rv.geometry().is_none());
        assert!(matches!(
            rv.forward(&bottom, &mut top),
            Err(LayerError::NotConfigured { .. })
        ));
        assert!(matches!(
            rv.backward(&top, true, &mut Blob::new(1, 4, 1, 1)),
            Err(LayerError::NotConfigured { .. })
        ));
    }

    #[test]
    fn zero_parameters_are_rejected() {
        let rv = layer(2, 2, 0);
        assert!(matches!(
            rv.output_shape(&Shape::vector(1, 4)),
            Err(LayerError::InvalidParameter { param: "out_channels", value: 0, .. })
        ));
        let rv = layer(0, 2, 1);
        assert!(matches!(
            rv.output_shape(&Shape::vector(1, 0)),
            Err(LayerError::InvalidParameter { param: "out_height", .. })
        ));
    }

    #[test]
    fn missing_param_block_fails_construction() {
        let mut config = LayerConfig::reshape_volume("rv", ReshapeVolumeParams::new(1, 1, 1));
        config.reshape_volume_param = None;
        assert!(matches!(
            ReshapeVolumeLayer::<f64>::new(config),
            Err(LayerError::MissingParameter { param: "reshape_volume_param", .. })
        ));
    }

    #[test]
    fn wrong_type_name_fails_construction() {
        let mut config = LayerConfig::reshape_volume("rv", ReshapeVolumeParams::new(1, 1, 1));
        config.layer_type = "Reshape".to_owned();
        assert!(matches!(
            ReshapeVolumeLayer::<f32>::new(config),
            Err(LayerError::UnknownLayerType(name)) if name == "Reshape"
        ));
    }
}
