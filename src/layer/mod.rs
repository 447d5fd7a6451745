pub mod forward;
pub mod gradient;

use crate::config::LayerConfig;
use crate::error::{Result, SpikeError};
use candle_core::{DType, Device, Tensor};
use log::{Level, debug, log_enabled, trace};

pub use gradient::{ForwardContext, Gradients};

/// Per-layer constants carried from the forward call into the backward call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constants {
    pub tau1: u32,
    pub tau2: u32,
    pub tmax: u32,
    pub threshold: f32,
    pub beta: f32,
}

impl From<&LayerConfig> for Constants {
    fn from(cfg: &LayerConfig) -> Self {
        Self {
            tau1: cfg.tau1,
            tau2: cfg.tau2,
            tmax: cfg.tmax,
            threshold: cfg.threshold,
            beta: cfg.beta,
        }
    }
}

pub trait Layer: Send + Sync {
    /// output firing times plus the state the matching backward call needs
    fn forward(&self, firing_time: &Tensor) -> Result<(Tensor, ForwardContext)>;

    /// gradients w.r.t. the weights and the input firing times
    fn backward(&self, ctx: &ForwardContext, grad_output: &Tensor) -> Result<Gradients>;

    /// weight getter, `(out, in)`
    fn weight(&self) -> &Tensor;

    /// swaps in new weights, e.g. after an optimizer step
    fn set_weight(&mut self, weight: Tensor) -> Result<()>;

    fn config(&self) -> &LayerConfig;

    /// how many neurons in this layer
    fn size(&self) -> usize;
}

/// Spike-time layer with a triangular PSP kernel and first-crossing readout.
pub struct TemporalLayer {
    config: LayerConfig,
    constants: Constants,
    weight: Tensor,
}

impl TemporalLayer {
    /// Validates `config` and draws weights uniformly from its init range.
    pub fn new(config: LayerConfig, device: &Device) -> Result<Self> {
        config.validate()?;
        let weight = Tensor::rand(
            config.init.lower,
            config.init.upper,
            (config.out_features, config.in_features),
            device,
        )?;
        Ok(Self {
            constants: Constants::from(&config),
            config,
            weight,
        })
    }

    pub fn from_weight(config: LayerConfig, weight: Tensor) -> Result<Self> {
        config.validate()?;
        check_weight_shape(&config, &weight)?;
        Ok(Self {
            constants: Constants::from(&config),
            config,
            weight: weight.to_dtype(DType::F32)?,
        })
    }

    pub fn constants(&self) -> Constants {
        self.constants
    }
}

fn check_weight_shape(config: &LayerConfig, weight: &Tensor) -> Result<()> {
    let expected = [config.out_features, config.in_features];
    if weight.dims() != expected {
        return Err(SpikeError::ShapeMismatch {
            context: "layer weight",
            expected: expected.to_vec(),
            actual: weight.dims().to_vec(),
        });
    }
    Ok(())
}

impl Layer for TemporalLayer {
    fn forward(&self, firing_time: &Tensor) -> Result<(Tensor, ForwardContext)> {
        let dims = firing_time.dims();
        if dims.len() != 2 || dims[1] != self.config.in_features {
            return Err(SpikeError::ShapeMismatch {
                context: "layer input",
                expected: vec![dims.first().copied().unwrap_or(0), self.config.in_features],
                actual: dims.to_vec(),
            });
        }

        let input = forward::prepare_input(firing_time, self.constants.tmax)?;
        let output = forward::spike_times(&input, &self.weight, &self.constants)?;

        if log_enabled!(Level::Debug) {
            let silent = output
                .ge(self.constants.tmax as f64)?
                .to_dtype(DType::F32)?
                .sum_all()?
                .to_scalar::<f32>()?;
            debug!(
                "forward {}->{}: batch={} silent={}/{}",
                self.config.in_features,
                self.config.out_features,
                dims[0],
                silent,
                output.elem_count()
            );
        }

        let ctx = ForwardContext {
            output_firing_time: output.clone(),
            input_firing_time: input,
            weight: self.weight.clone(),
            constants: self.constants,
        };
        Ok((output, ctx))
    }

    fn backward(&self, ctx: &ForwardContext, grad_output: &Tensor) -> Result<Gradients> {
        if grad_output.dims() != ctx.output_firing_time.dims() {
            return Err(SpikeError::ShapeMismatch {
                context: "output gradient",
                expected: ctx.output_firing_time.dims().to_vec(),
                actual: grad_output.dims().to_vec(),
            });
        }
        trace!(
            "backward {}->{}: batch={}",
            self.config.in_features,
            self.config.out_features,
            grad_output.dim(0)?
        );
        let grad_output = grad_output.to_dtype(DType::F32)?;
        Ok(gradient::causal_gradients(ctx, &grad_output)?)
    }

    fn weight(&self) -> &Tensor {
        &self.weight
    }

    fn set_weight(&mut self, weight: Tensor) -> Result<()> {
        check_weight_shape(&self.config, &weight)?;
        self.weight = weight.to_dtype(DType::F32)?;
        Ok(())
    }

    fn config(&self) -> &LayerConfig {
        &self.config
    }

    fn size(&self) -> usize {
        self.config.out_features
    }
}
