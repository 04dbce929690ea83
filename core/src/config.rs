//! Layer definitions as they appear in a network description.
//!
//! ```json
//! {
//!   "name": "to_volume",
//!   "type": "ReshapeVolume",
//!   "bottom": ["fc7"],
//!   "top": ["volume"],
//!   "reshape_volume_param": { "out_height": 4, "out_width": 4, "out_channels": 3 }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::backend::Device;
use crate::error::LayerResult;

/// Target grid of a `ReshapeVolume` layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReshapeVolumeParams {
    pub out_height: usize,
    pub out_width: usize,
    pub out_channels: usize,
}

impl ReshapeVolumeParams {
    pub const fn new(out_height: usize, out_width: usize, out_channels: usize) -> Self {
        Self {
            out_height,
            out_width,
            out_channels,
        }
    }
}

/// One layer entry of a network definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub layer_type: String,
    #[serde(default)]
    pub bottom: Vec<String>,
    #[serde(default)]
    pub top: Vec<String>,
    #[serde(default)]
    pub device: Device,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reshape_volume_param: Option<ReshapeVolumeParams>,
}

impl LayerConfig {
    /// A `ReshapeVolume` entry running on the CPU.
    pub fn reshape_volume(name: impl Into<String>, params: ReshapeVolumeParams) -> Self {
        Self {
            name: name.into(),
            layer_type: crate::layers::reshape_volume::LAYER_TYPE.to_owned(),
            bottom: Vec::new(),
            top: Vec::new(),
            device: Device::Cpu,
            reshape_volume_param: Some(params),
        }
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    pub fn with_blobs(mut self, bottom: &[&str], top: &[&str]) -> Self {
        self.bottom = bottom.iter().map(|s| (*s).to_owned()).collect();
        self.top = top.iter().map(|s| (*s).to_owned()).collect();
        self
    }

    pub fn from_json(text: &str) -> LayerResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> LayerResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
