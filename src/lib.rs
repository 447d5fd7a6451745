//! Temporal-coding spiking layers trainable with first-order optimization.
//!
//! Neurons communicate through a single spike time each. A [`layer::TemporalLayer`]
//! integrates triangular postsynaptic potentials over discrete time, reports the
//! first tick at which each output neuron crosses its threshold, and exposes an
//! analytic, causality-masked gradient of that time with respect to its weights
//! and its input spike times. Layers chain into a [`model::Network`] trained
//! against the [`loss`] target rule.

pub mod config;
pub mod dataset;
pub mod error;
pub mod kernel;
pub mod layer;
pub mod loss;
pub mod model;
pub mod optim;
pub mod persist;
pub mod stats;
pub mod train;
pub mod utils;

pub use config::{LayerConfig, NetworkConfig, TrainConfig, WeightInit};
pub use error::{Result, SpikeError};
pub use layer::{Layer, TemporalLayer};
pub use model::Network;
