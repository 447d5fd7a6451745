//! Triangular postsynaptic-potential kernel.
//!
//! A presynaptic spike contributes `psp(t - t_spike)` to every downstream
//! neuron: a linear rise from 0 to 1 over `[0, tau1)`, a linear fall back to 0
//! over `[tau1, tau1 + tau2)`, and nothing outside that support.

use candle_core::{Result as CandleResult, Tensor};

/// Kernel value at elapsed time `delta`.
pub fn psp(delta: f32, tau1: u32, tau2: u32) -> f32 {
    let (t1, t2) = (tau1 as f32, tau2 as f32);
    if delta < 0.0 {
        0.0
    } else if delta < t1 {
        delta / t1
    } else if delta < t1 + t2 {
        (t1 + t2 - delta) / t2
    } else {
        0.0
    }
}

/// Local slope of the kernel at `delta`. The breakpoint at `delta == 0`
/// belongs to the rising branch.
pub fn psp_slope(delta: f32, tau1: u32, tau2: u32) -> f32 {
    let (t1, t2) = (tau1 as f32, tau2 as f32);
    if delta < 0.0 {
        0.0
    } else if delta < t1 {
        1.0 / t1
    } else if delta < t1 + t2 {
        -1.0 / t2
    } else {
        0.0
    }
}

/// Elementwise [`psp`] over a tensor of elapsed times.
pub fn psp_tensor(delta: &Tensor, tau1: u32, tau2: u32) -> CandleResult<Tensor> {
    let (t1, t2) = (tau1 as f64, tau2 as f64);
    let zeros = delta.zeros_like()?;
    let rise = div_scalar(delta, t1)?;
    let fall = div_scalar(&delta.affine(-1.0, t1 + t2)?, t2)?;

    let psp = delta.ge(t1 + t2)?.where_cond(&zeros, &fall)?;
    let psp = delta.lt(t1)?.where_cond(&rise, &psp)?;
    delta.lt(0.0)?.where_cond(&zeros, &psp)
}

/// Elementwise [`psp_slope`] over a tensor of elapsed times.
pub fn psp_slope_tensor(delta: &Tensor, tau1: u32, tau2: u32) -> CandleResult<Tensor> {
    branch_select(delta, tau1, tau2, 1.0 / tau1 as f64, -1.0 / tau2 as f64)
}

/// `1/tau1` on the rising branch, `1/tau2` on the falling branch, 0 outside
/// the support. This is the unsigned slope magnitude.
pub fn inverse_tau_tensor(delta: &Tensor, tau1: u32, tau2: u32) -> CandleResult<Tensor> {
    branch_select(delta, tau1, tau2, 1.0 / tau1 as f64, 1.0 / tau2 as f64)
}

fn branch_select(
    delta: &Tensor,
    tau1: u32,
    tau2: u32,
    on_rise: f64,
    on_fall: f64,
) -> CandleResult<Tensor> {
    let (t1, t2) = (tau1 as f64, tau2 as f64);
    let zeros = delta.zeros_like()?;
    let ones = delta.ones_like()?;
    let rise = ones.affine(on_rise, 0.0)?;
    let fall = ones.affine(on_fall, 0.0)?;

    let out = delta.ge(t1 + t2)?.where_cond(&zeros, &fall)?;
    let out = delta.lt(t1)?.where_cond(&rise, &out)?;
    delta.lt(0.0)?.where_cond(&zeros, &out)
}

// true division, `Tensor / f64` goes through a reciprocal multiply
fn div_scalar(t: &Tensor, s: f64) -> CandleResult<Tensor> {
    let s = Tensor::new(s as f32, t.device())?.to_dtype(t.dtype())?;
    t.broadcast_div(&s)
}
