use crate::config::NetworkConfig;
use crate::error::{Result, SpikeError};
use crate::layer::{ForwardContext, Layer, TemporalLayer};
use crate::loss;
use crate::optim::WeightUpdate;
use crate::stats::WeightStats;
use candle_core::{Device, Tensor};
use log::{Level, debug, log_enabled};

/// Feed-forward stack of temporal layers.
pub struct Network {
    pub device: Device,
    layers: Vec<Box<dyn Layer>>,
}

/// Gradients produced by [`Network::backward`].
pub struct NetworkGradients {
    /// one `(out, in)` tensor per layer, first layer first
    pub weights: Vec<Tensor>,
    /// gradient w.r.t. the network's input firing times
    pub input: Tensor,
}

impl Network {
    pub fn new(config: &NetworkConfig, device: &Device) -> Result<Self> {
        config.validate()?;
        let mut net = Self::empty(device.clone());
        for layer in &config.layers {
            net.add_layer(Box::new(TemporalLayer::new(layer.clone(), device)?))?;
        }
        Ok(net)
    }

    fn empty(device: Device) -> Self {
        Self {
            device,
            layers: vec![],
        }
    }

    pub fn from_layers(device: Device, layers: Vec<Box<dyn Layer>>) -> Result<Self> {
        if layers.is_empty() {
            return Err(SpikeError::config("layers", "network needs at least one layer"));
        }
        let mut net = Self::empty(device);
        for layer in layers {
            net.add_layer(layer)?;
        }
        Ok(net)
    }

    /// Appends `layer`, which must accept the current last layer's output.
    pub fn add_layer(&mut self, layer: Box<dyn Layer>) -> Result<()> {
        if let Some(last) = self.layers.last() {
            let (prev, next) = (last.config(), layer.config());
            if prev.out_features != next.in_features {
                return Err(SpikeError::ShapeMismatch {
                    context: "layer chaining",
                    expected: vec![prev.out_features],
                    actual: vec![next.in_features],
                });
            }
            if prev.tmax != next.tmax {
                return Err(SpikeError::config(
                    "tmax",
                    format!("must be shared across layers ({} vs {})", prev.tmax, next.tmax),
                ));
            }
        }
        self.layers.push(layer);
        Ok(())
    }

    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    pub fn config(&self) -> NetworkConfig {
        NetworkConfig {
            layers: self.layers.iter().map(|l| l.config().clone()).collect(),
        }
    }

    pub fn tmax(&self) -> u32 {
        self.layers.first().map_or(0, |l| l.config().tmax)
    }

    /// Runs every layer in order. The returned contexts, one per layer, feed
    /// the matching [`Network::backward`] call.
    pub fn forward(&self, input: &Tensor) -> Result<(Tensor, Vec<ForwardContext>)> {
        let mut tape = Vec::with_capacity(self.layers.len());
        let mut x = input.clone();
        for layer in &self.layers {
            let (out, ctx) = layer.forward(&x)?;
            tape.push(ctx);
            x = out;
        }
        Ok((x, tape))
    }

    /// Output firing times only.
    pub fn infer(&self, input: &Tensor) -> Result<Tensor> {
        Ok(self.forward(input)?.0)
    }

    /// Earliest-firing output neuron per sample.
    pub fn predict(&self, input: &Tensor) -> Result<Tensor> {
        Ok(loss::predict(&self.infer(input)?)?)
    }

    /// Walks the tape in reverse, handing each layer's input gradient to the
    /// layer before it.
    pub fn backward(
        &self,
        tape: Vec<ForwardContext>,
        grad_output: &Tensor,
    ) -> Result<NetworkGradients> {
        if tape.len() != self.layers.len() {
            return Err(SpikeError::ShapeMismatch {
                context: "forward tape",
                expected: vec![self.layers.len()],
                actual: vec![tape.len()],
            });
        }
        let mut weights = Vec::with_capacity(tape.len());
        let mut grad = grad_output.clone();
        for (layer, ctx) in self.layers.iter().zip(tape).rev() {
            let g = layer.backward(&ctx, &grad)?;
            weights.push(g.weight);
            grad = g.input;
        }
        weights.reverse();
        Ok(NetworkGradients {
            weights,
            input: grad,
        })
    }

    /// Replaces every layer's weights with `rule(weight, grad)`. Must only be
    /// called once the gradients of the current step are fully computed.
    pub fn apply_gradients(
        &mut self,
        grads: NetworkGradients,
        rule: &dyn WeightUpdate,
    ) -> Result<()> {
        if grads.weights.len() != self.layers.len() {
            return Err(SpikeError::ShapeMismatch {
                context: "weight gradients",
                expected: vec![self.layers.len()],
                actual: vec![grads.weights.len()],
            });
        }
        for (k, (layer, grad)) in self.layers.iter_mut().zip(grads.weights).enumerate() {
            let next = rule.update(layer.weight(), &grad)?;
            layer.set_weight(next)?;
            if log_enabled!(Level::Debug) {
                debug!("layer {k} weights: {}", WeightStats::of(layer.weight())?);
            }
        }
        Ok(())
    }
}
