use crate::error::{Result, SpikeError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Uniform weight initialization range `[lower, upper)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightInit {
    pub lower: f32,
    pub upper: f32,
}

impl WeightInit {
    pub fn uniform(lower: f32, upper: f32) -> Self {
        Self { lower, upper }
    }
}

impl Default for WeightInit {
    fn default() -> Self {
        Self::uniform(0.0, 0.25)
    }
}

/// Construction parameters of one temporal layer. Immutable once the layer exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub in_features: usize,
    pub out_features: usize,
    /// rise duration of the PSP, in ticks
    pub tau1: u32,
    /// fall duration of the PSP, in ticks
    pub tau2: u32,
    /// observation horizon; also the "did not fire" sentinel
    pub tmax: u32,
    pub threshold: f32,
    /// damping applied to the gradient sent to the previous layer
    pub beta: f32,
    #[serde(default)]
    pub init: WeightInit,
}

impl LayerConfig {
    pub fn new(
        in_features: usize,
        out_features: usize,
        tau1: u32,
        tau2: u32,
        tmax: u32,
        threshold: f32,
        beta: f32,
    ) -> Self {
        Self {
            in_features,
            out_features,
            tau1,
            tau2,
            tmax,
            threshold,
            beta,
            init: WeightInit::default(),
        }
    }

    pub fn with_init(mut self, init: WeightInit) -> Self {
        self.init = init;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.in_features == 0 {
            return Err(SpikeError::config("in_features", "must be positive"));
        }
        if self.out_features == 0 {
            return Err(SpikeError::config("out_features", "must be positive"));
        }
        if self.tau1 == 0 {
            return Err(SpikeError::config("tau1", "must be positive"));
        }
        if self.tau2 == 0 {
            return Err(SpikeError::config("tau2", "must be positive"));
        }
        if self.tmax == 0 {
            return Err(SpikeError::config("tmax", "must be positive"));
        }
        if !(self.threshold.is_finite() && self.threshold > 0.0) {
            return Err(SpikeError::config(
                "threshold",
                format!("must be positive and finite, got {}", self.threshold),
            ));
        }
        if !(self.beta.is_finite() && self.beta >= 0.0) {
            return Err(SpikeError::config(
                "beta",
                format!("must be non-negative and finite, got {}", self.beta),
            ));
        }
        let WeightInit { lower, upper } = self.init;
        if !(lower.is_finite() && upper.is_finite() && lower < upper) {
            return Err(SpikeError::config(
                "init",
                format!("expected a finite range lower < upper, got [{lower}, {upper})"),
            ));
        }
        Ok(())
    }
}

/// Layer stack of a feed-forward network, first layer first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub layers: Vec<LayerConfig>,
}

impl NetworkConfig {
    /// Input → hidden → output with shared constants. The hidden layer is
    /// initialized in `[0, 0.25)` and the output layer in `[0, 0.5)`.
    #[allow(clippy::too_many_arguments)]
    pub fn two_layer(
        inputs: usize,
        hidden: usize,
        outputs: usize,
        tau1: u32,
        tau2: u32,
        tmax: u32,
        threshold: f32,
        beta: f32,
    ) -> Self {
        Self {
            layers: vec![
                LayerConfig::new(inputs, hidden, tau1, tau2, tmax, threshold, beta)
                    .with_init(WeightInit::uniform(0.0, 0.25)),
                LayerConfig::new(hidden, outputs, tau1, tau2, tmax, threshold, beta)
                    .with_init(WeightInit::uniform(0.0, 0.5)),
            ],
        }
    }

    pub fn validate(&self) -> Result<()> {
        let Some(first) = self.layers.first() else {
            return Err(SpikeError::config("layers", "network needs at least one layer"));
        };
        for layer in &self.layers {
            layer.validate()?;
        }
        for pair in self.layers.windows(2) {
            if pair[0].out_features != pair[1].in_features {
                return Err(SpikeError::config(
                    "layers",
                    format!(
                        "layer with {} outputs feeds a layer with {} inputs",
                        pair[0].out_features, pair[1].in_features
                    ),
                ));
            }
        }
        if let Some(other) = self.layers.iter().find(|l| l.tmax != first.tmax) {
            return Err(SpikeError::config(
                "tmax",
                format!("must be shared across layers ({} vs {})", first.tmax, other.tmax),
            ));
        }
        Ok(())
    }

    pub fn tmax(&self) -> u32 {
        self.layers.first().map_or(0, |l| l.tmax)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let cfg: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

fn default_epochs() -> usize {
    300
}

fn default_learning_rate() -> f32 {
    0.05
}

fn default_gamma() -> f32 {
    3.0
}

fn default_batch_size() -> usize {
    4
}

fn default_log_every() -> usize {
    50
}

fn default_seed() -> u64 {
    7
}

/// Knobs of the demo training driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
    /// target margin, in ticks
    #[serde(default = "default_gamma")]
    pub gamma: f32,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_log_every")]
    pub log_every: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    pub network: NetworkConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            learning_rate: default_learning_rate(),
            gamma: default_gamma(),
            batch_size: default_batch_size(),
            log_every: default_log_every(),
            seed: default_seed(),
            network: NetworkConfig::two_layer(3, 16, 2, 2, 4, 16, 1.0, 1.0),
        }
    }
}

impl TrainConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let cfg: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        cfg.network.validate()?;
        if cfg.batch_size == 0 {
            return Err(SpikeError::config("batch_size", "must be positive"));
        }
        Ok(cfg)
    }
}
