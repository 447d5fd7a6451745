//! Discrete-time integration and first-threshold-crossing search.

use super::Constants;
use crate::kernel::psp_tensor;
use candle_core::{DType, Result as CandleResult, Tensor};

/// Replace times outside `[0, tmax]` by the `tmax` sentinel and snap the
/// rest to the nearest integer tick.
pub fn prepare_input(firing_time: &Tensor, tmax: u32) -> CandleResult<Tensor> {
    let firing_time = firing_time.to_dtype(DType::F32)?;
    let sentinel = firing_time.ones_like()?.affine(tmax as f64, 0.0)?;
    let t = firing_time.gt(tmax as f64)?.where_cond(&sentinel, &firing_time)?;
    let t = t.lt(0.0)?.where_cond(&sentinel, &t)?;
    t.round()
}

/// Membrane voltage of every output neuron at ticks `0..=tmax`,
/// shape `(batch, out, tmax + 1)`, before time integration.
pub fn voltage(input: &Tensor, weight: &Tensor, c: &Constants) -> CandleResult<Tensor> {
    let (batch, n_in) = input.dims2()?;
    let n_out = weight.dim(0)?;
    let steps = c.tmax as usize + 1;

    let times = Tensor::arange(0f32, steps as f32, input.device())?.reshape((1, 1, steps))?;
    // elapsed time since each afferent spike, (batch, in, steps)
    let delta = times.broadcast_sub(&input.unsqueeze(2)?)?;
    let psp = psp_tensor(&delta, c.tau1, c.tau2)?;

    // fold batch into the time axis so a single (out, in) x (in, batch*steps) product does it
    let psp = psp.transpose(0, 1)?.contiguous()?.reshape((n_in, batch * steps))?;
    weight
        .matmul(&psp)?
        .reshape((n_out, batch, steps))?
        .transpose(0, 1)?
        .contiguous()
}

/// First tick at which the integrated voltage exceeds the threshold, with
/// `tmax` counting as a crossing when none happened earlier.
/// `input` must already be prepared; returns `(batch, out)`.
pub fn spike_times(input: &Tensor, weight: &Tensor, c: &Constants) -> CandleResult<Tensor> {
    let steps = c.tmax as usize + 1;
    let integrated = voltage(input, weight, c)?.cumsum(2)?;

    let crossed = integrated.gt(c.threshold as f64)?.to_dtype(DType::F32)?;
    let horizon = Tensor::arange(0f32, steps as f32, input.device())?
        .ge(c.tmax as f64)?
        .to_dtype(DType::F32)?
        .reshape((1, 1, steps))?;
    let crossed = crossed.broadcast_maximum(&horizon)?;

    // number of ticks before the first crossing is the crossing index
    crossed
        .cumsum(2)?
        .eq(0.0)?
        .to_dtype(DType::F32)?
        .sum(2)
}
