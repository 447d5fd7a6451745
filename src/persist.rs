//! Model files: weights as safetensors, layer constants as a JSON sidecar.
//!
//! `model.safetensors` holds one `layers.<k>.weight` tensor per layer and
//! `model.json` the [`NetworkConfig`]. Weights are stored as raw F32 bytes,
//! so a load reproduces them bit for bit.

use crate::config::NetworkConfig;
use crate::error::{Result, SpikeError};
use crate::layer::{Layer, TemporalLayer};
use crate::model::Network;
use candle_core::{Device, Tensor};
use log::info;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

fn weight_key(layer: usize) -> String {
    format!("layers.{layer}.weight")
}

pub fn config_path(path: &Path) -> PathBuf {
    path.with_extension("json")
}

pub fn save(net: &Network, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let tensors: HashMap<String, Tensor> = net
        .layers()
        .iter()
        .enumerate()
        .map(|(k, layer)| (weight_key(k), layer.weight().clone()))
        .collect();
    candle_core::safetensors::save(&tensors, path)?;
    net.config().to_json_file(config_path(path))?;
    info!("saved {} layers to {}", tensors.len(), path.display());
    Ok(())
}

pub fn load(path: impl AsRef<Path>, device: &Device) -> Result<Network> {
    let path = path.as_ref();
    let config = NetworkConfig::from_json_file(config_path(path))?;
    let mut tensors = candle_core::safetensors::load(path, device)?;

    let mut layers: Vec<Box<dyn Layer>> = Vec::with_capacity(config.layers.len());
    for (k, layer_cfg) in config.layers.into_iter().enumerate() {
        let key = weight_key(k);
        let weight = tensors.remove(&key).ok_or(SpikeError::MissingTensor(key))?;
        layers.push(Box::new(TemporalLayer::from_weight(layer_cfg, weight)?));
    }
    info!("loaded {} layers from {}", layers.len(), path.display());
    Network::from_layers(device.clone(), layers)
}
