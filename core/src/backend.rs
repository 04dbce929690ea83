//! Compute backends for the volume reshape transform.
//!
//! A [`VolumeKernel`] carries the forward broadcast and backward reduction.
//! The default methods fail with [`LayerError::NotImplemented`]; a backend
//! only overrides what it actually supports. [`CpuKernel`] overrides both.
//! [`AcceleratedKernel`] overrides nothing: no accelerated backend is
//! compiled into this crate, so requesting it fails on first use and never
//! falls back to the CPU loops.

use core::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{LayerError, LayerResult};
use crate::math;
use crate::tensor::{Blob, Element};

/// Where a layer runs its kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cpu,
    Accelerated,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => f.write_str("cpu"),
            Device::Accelerated => f.write_str("accelerated"),
        }
    }
}

/// Validated layout shared by both passes.
///
/// Built by shape inference; kernels derive every loop bound from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeGeometry {
    pub num: usize,
    pub out_channels: usize,
    pub out_height: usize,
    pub out_width: usize,
}

impl VolumeGeometry {
    /// Elements in one `(sample, channel)` grid.
    #[inline(always)]
    pub fn slice_size(&self) -> usize {
        self.out_height * self.out_width
    }
}

/// Forward/backward capability of a backend.
pub trait VolumeKernel<T: Element>: Send + Sync {
    fn device(&self) -> Device;

    /// Replicate each sample's input vector into every output channel.
    fn forward(
        &self,
        layer: &'static str,
        _geometry: &VolumeGeometry,
        _bottom: &Blob<T>,
        _top: &mut Blob<T>,
    ) -> LayerResult<()> {
        Err(self.not_implemented(layer, "forward"))
    }

    /// Sum the output gradient over channels into the input gradient.
    fn backward(
        &self,
        layer: &'static str,
        _geometry: &VolumeGeometry,
        _top: &Blob<T>,
        _bottom: &mut Blob<T>,
    ) -> LayerResult<()> {
        Err(self.not_implemented(layer, "backward"))
    }

    fn not_implemented(&self, layer: &'static str, op: &'static str) -> LayerError {
        let device = self.device();
        warn!(layer, op, %device, "kernel not available on this device");
        LayerError::NotImplemented { layer, op, device }
    }
}

/// Portable kernels over contiguous host memory.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuKernel;

impl<T: Element> VolumeKernel<T> for CpuKernel {
    fn device(&self) -> Device {
        Device::Cpu
    }

    fn forward(
        &self,
        _layer: &'static str,
        geometry: &VolumeGeometry,
        bottom: &Blob<T>,
        top: &mut Blob<T>,
    ) -> LayerResult<()> {
        let slice = geometry.slice_size();
        let src = bottom.data();
        for n in 0..geometry.num {
            let in_off = bottom.offset(n, 0, 0, 0);
            let sample = &src[in_off..in_off + slice];
            for c in 0..geometry.out_channels {
                let out_off = top.offset(n, c, 0, 0);
                math::copy(sample, &mut top.data_mut()[out_off..out_off + slice])?;
            }
        }
        Ok(())
    }

    fn backward(
        &self,
        _layer: &'static str,
        geometry: &VolumeGeometry,
        top: &Blob<T>,
        bottom: &mut Blob<T>,
    ) -> LayerResult<()> {
        let slice = geometry.slice_size();
        let top_diff = top.diff();
        let channel = |n: usize, c: usize| {
            let off = top.offset(n, c, 0, 0);
            &top_diff[off..off + slice]
        };

        for n in 0..geometry.num {
            let in_off = bottom.offset(n, 0, 0, 0);
            let bottom_diff = &mut bottom.diff_mut()[in_off..in_off + slice];

            if geometry.out_channels == 1 {
                math::copy(channel(n, 0), bottom_diff)?;
                continue;
            }

            math::add(channel(n, 0), channel(n, 1), bottom_diff)?;
            for c in 2..geometry.out_channels {
                math::axpy(T::one(), channel(n, c), bottom_diff)?;
            }
        }
        Ok(())
    }
}

/// Placeholder for a device backend. Every call fails with `NotImplemented`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceleratedKernel;

impl<T: Element> VolumeKernel<T> for AcceleratedKernel {
    fn device(&self) -> Device {
        Device::Accelerated
    }
}

/// Kernel for `device`.
pub fn kernel_for<T: Element>(device: Device) -> Box<dyn VolumeKernel<T>> {
    match device {
        Device::Cpu => Box::new(CpuKernel),
        Device::Accelerated => Box::new(AcceleratedKernel),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Shape;

    fn geometry(num: usize, out_channels: usize) -> VolumeGeometry {
        VolumeGeometry {
            num,
            out_channels,
            out_height: 2,
            out_width: 2,
        }
    }

    #[test]
    fn cpu_forward_replicates_each_sample() {
        let bottom =
            Blob::from_data(Shape::vector(2, 4), vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0])
                .unwrap();
        let mut top = Blob::new(2, 2, 2, 2);
        CpuKernel
            .forward("ReshapeVolume", &geometry(2, 2), &bottom, &mut top)
            .unwrap();
        assert_eq!(
            top.data(),
            &[1.0, 2.0, 3.0, 4.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 5.0, 6.0, 7.0, 8.0]
        );
    }

    #[test]
    fn cpu_backward_single_channel_copies_per_sample() {
        let mut top = Blob::<f64>::new(2, 1, 2, 2);
        top.set_diff(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]).unwrap();
        let mut bottom = Blob::with_shape(Shape::vector(2, 4));
        CpuKernel
            .backward("ReshapeVolume", &geometry(2, 1), &top, &mut bottom)
            .unwrap();
        assert_eq!(bottom.diff(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn accelerated_kernel_fails_loudly() {
        let bottom = Blob::<f32>::with_shape(Shape::vector(1, 4));
        let mut top = Blob::new(1, 3, 2, 2);
        top.data_mut().fill(5.0);
        let err = AcceleratedKernel
            .forward("ReshapeVolume", &geometry(1, 3), &bottom, &mut top)
            .unwrap_err();
        assert!(matches!(
            err,
            LayerError::NotImplemented { op: "forward", device: Device::Accelerated, .. }
        ));
        assert!(top.data().iter().all(|&v| v == 5.0));

        let mut bottom = bottom;
        let err = AcceleratedKernel
            .backward("ReshapeVolume", &geometry(1, 3), &top, &mut bottom)
            .unwrap_err();
        assert!(matches!(err, LayerError::NotImplemented { op: "backward", .. }));
    }

    #[test]
    fn device_names_round_trip_through_serde() {
        assert_eq!(serde_json::to_string(&Device::Accelerated).unwrap(), "\"accelerated\"");
        let device: Device = serde_json::from_str("\"cpu\"").unwrap();
        assert_eq!(device, Device::Cpu);
    }
}
