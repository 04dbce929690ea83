//! # volnet-core: volume reshape layer
//!
//! Turns a flat per-sample vector into a multi-channel 2D volume and routes
//! gradients back the other way.
//!
//! ## Architecture
//!
//! - **Blob**: 4D `(N, C, H, W)` tensor with data and gradient buffers
//! - **Layer**: `reshape` → `forward` → `backward` over borrowed blobs
//! - **Kernels**: CPU loops, plus an accelerated slot that fails loudly
//! - **Registry**: explicit name → constructor table, no load-time magic
//! - **Config**: JSON layer definitions via serde
//!
//! ## Usage
//!
//! ```
//! use volnet_core::*;
//!
//! let registry = LayerRegistry::<f32>::with_builtin_layers();
//! let config = LayerConfig::from_json(r#"{
//!     "name": "to_volume",
//!     "type": "ReshapeVolume",
//!     "bottom": ["fc"],
//!     "top": ["volume"],
//!     "reshape_volume_param": { "out_height": 2, "out_width": 2, "out_channels": 3 }
//! }"#)?;
//! let mut layer = registry.create(&config)?;
//!
//! let bottom = Blob::from_data(Shape::vector(1, 4), vec![1.0, 2.0, 3.0, 4.0])?;
//! let mut top = Blob::new(0, 0, 0, 0);
//! layer.reshape(&bottom, &mut top)?;
//! layer.forward(&bottom, &mut top)?;
//! assert_eq!(top.shape(), Shape::d4(1, 3, 2, 2));
//!
//! top.fill_diff(1.0);
//! let mut bottom = bottom;
//! layer.backward(&top, true, &mut bottom)?;
//! assert_eq!(bottom.diff(), &[3.0, 3.0, 3.0, 3.0]);
//! # Ok::<(), volnet_core::LayerError>(())
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod layers;
pub mod math;
pub mod registry;
pub mod tensor;

pub use backend::{AcceleratedKernel, CpuKernel, Device, VolumeGeometry, VolumeKernel};
pub use config::{LayerConfig, ReshapeVolumeParams};
pub use error::{LayerError, LayerResult};
pub use layers::{Layer, ReshapeVolumeLayer};
pub use registry::{LayerCreator, LayerRegistry};
pub use tensor::{Blob, Element, Shape};
