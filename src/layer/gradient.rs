//! Causality-masked analytic gradient of output spike times.
//!
//! Only afferents that fired strictly before a postsynaptic neuron can have
//! caused that neuron's spike, so every other (input, output) pair gets an
//! exact zero. For the remaining pairs the threshold-crossing time moves by
//! `-t_out / threshold` per unit of voltage, attributed through the local
//! slope of the PSP kernel at `t_out - t_in`.

use super::Constants;
use crate::kernel::{inverse_tau_tensor, psp_slope_tensor};
use candle_core::{Result as CandleResult, Tensor};

/// Everything the backward pass needs from one forward call.
#[derive(Debug, Clone)]
pub struct ForwardContext {
    /// `(batch, out)`
    pub output_firing_time: Tensor,
    /// `(batch, in)`, already clamped and rounded
    pub input_firing_time: Tensor,
    /// `(out, in)` snapshot used by the forward call
    pub weight: Tensor,
    pub constants: Constants,
}

#[derive(Debug, Clone)]
pub struct Gradients {
    /// `(out, in)`, summed over the batch
    pub weight: Tensor,
    /// `(batch, in)`, to hand to the previous layer
    pub input: Tensor,
}

/// `has_fired[b, i, j]` is set iff input `i` fired strictly before output `j`.
pub fn causality_mask(ctx: &ForwardContext) -> CandleResult<Tensor> {
    let t_in = ctx.input_firing_time.unsqueeze(2)?;
    let t_out = ctx.output_firing_time.unsqueeze(1)?;
    t_in.broadcast_lt(&t_out)
}

pub fn causal_gradients(ctx: &ForwardContext, grad_output: &Tensor) -> CandleResult<Gradients> {
    let c = &ctx.constants;

    // (batch, in, out)
    let delta = ctx
        .output_firing_time
        .unsqueeze(1)?
        .broadcast_sub(&ctx.input_firing_time.unsqueeze(2)?)?;
    let has_fired = causality_mask(ctx)?;
    let zeros = delta.zeros_like()?;
    let slope = has_fired.where_cond(&psp_slope_tensor(&delta, c.tau1, c.tau2)?, &zeros)?;
    let inv_tau = has_fired.where_cond(&inverse_tau_tensor(&delta, c.tau1, c.tau2)?, &zeros)?;

    // d t_out / d v, scaled by the incoming gradient: (batch, 1, out)
    let sensitivity = grad_output
        .mul(&ctx.output_firing_time)?
        .affine(-1.0 / c.threshold as f64, 0.0)?
        .unsqueeze(1)?;

    let weight = slope
        .broadcast_mul(&sensitivity)?
        .sum(0)?
        .t()?
        .contiguous()?;

    let tmax = c.tmax as f64;
    let input = inv_tau
        .broadcast_mul(&ctx.weight.t()?.unsqueeze(0)?)?
        .broadcast_mul(&sensitivity)?
        .sum(2)?
        .affine(c.beta as f64 / (tmax * tmax), 0.0)?;

    Ok(Gradients { weight, input })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use candle_core::{DType, Device};

    fn ctx(t_out: &[&[f32]], t_in: &[&[f32]], weight: &[&[f32]], beta: f32) -> ForwardContext {
        let dev = Device::Cpu;
        let rows = |m: &[&[f32]]| {
            let cols = m[0].len();
            let flat: Vec<f32> = m.iter().flat_map(|r| r.iter().copied()).collect();
            Tensor::from_vec(flat, (m.len(), cols), &dev).unwrap()
        };
        ForwardContext {
            output_firing_time: rows(t_out),
            input_firing_time: rows(t_in),
            weight: rows(weight),
            constants: Constants {
                tau1: 2,
                tau2: 2,
                tmax: 8,
                threshold: 1.0,
                beta,
            },
        }
    }

    #[test]
    fn test_single_pair_values() -> CandleResult<()> {
        // delta = 2 sits on the falling branch: slope -1/2
        let ctx = ctx(&[&[2.0]], &[&[0.0]], &[&[1.0]], 1.0);
        let grad_out = Tensor::new(&[[1f32]], &Device::Cpu)?;
        let g = causal_gradients(&ctx, &grad_out)?;

        assert_abs_diff_eq!(g.weight.to_vec2::<f32>()?[0][0], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(g.input.to_vec2::<f32>()?[0][0], -1.0 / 64.0, epsilon = 1e-7);
        Ok(())
    }

    #[test]
    fn test_rising_branch_and_beta() -> CandleResult<()> {
        // delta = 1 on the rising branch: slope +1/2; t_out = 3
        let ctx = ctx(&[&[3.0]], &[&[2.0]], &[&[2.0]], 0.5);
        let grad_out = Tensor::new(&[[0.5f32]], &Device::Cpu)?;
        let g = causal_gradients(&ctx, &grad_out)?;

        // 0.5 * (-3) * 0.5
        assert_abs_diff_eq!(g.weight.to_vec2::<f32>()?[0][0], -0.75, epsilon = 1e-6);
        // 0.5 * 0.5 * (-3) * (2 / 2) / 64
        assert_abs_diff_eq!(g.input.to_vec2::<f32>()?[0][0], -0.75 / 64.0, epsilon = 1e-7);
        Ok(())
    }

    #[test]
    fn test_non_causal_pairs_are_zero() -> CandleResult<()> {
        // input 0 fired before the output, input 1 at the same tick, input 2 after
        let ctx = ctx(&[&[3.0]], &[&[1.0, 3.0, 5.0]], &[&[1.0, 1.0, 1.0]], 1.0);
        let grad_out = Tensor::new(&[[7f32]], &Device::Cpu)?;
        let g = causal_gradients(&ctx, &grad_out)?;

        let gw = g.weight.to_vec2::<f32>()?;
        let gi = g.input.to_vec2::<f32>()?;
        assert!(gw[0][0] != 0.0);
        assert!(gi[0][0] != 0.0);
        assert_eq!(&gw[0][1..], &[0.0, 0.0]);
        assert_eq!(&gi[0][1..], &[0.0, 0.0]);

        let mask = causality_mask(&ctx)?.to_dtype(DType::F32)?.to_vec3::<f32>()?;
        assert_eq!(mask, vec![vec![vec![1.0], vec![0.0], vec![0.0]]]);
        Ok(())
    }

    #[test]
    fn test_input_gradient_sums_over_outputs() -> CandleResult<()> {
        // outputs at 4 and 6, inputs at 1, 3, 5; with tau = (2, 3):
        //   out 0: deltas 3 (fall), 1 (rise), -1 (non-causal)
        //   out 1: deltas 5 (outside), 3 (fall), 1 (rise)
        let mut ctx = ctx(
            &[&[4.0, 6.0]],
            &[&[1.0, 3.0, 5.0]],
            &[&[1.0, 2.0, 0.5], &[0.5, 1.0, 3.0]],
            0.5,
        );
        ctx.constants = Constants {
            tau1: 2,
            tau2: 3,
            tmax: 8,
            threshold: 2.0,
            beta: 0.5,
        };
        let grad_out = Tensor::new(&[[1f32, 0.5]], &Device::Cpu)?;
        let g = causal_gradients(&ctx, &grad_out)?;

        // sensitivities: 1 * -4/2 = -2 and 0.5 * -6/2 = -1.5
        let gw = g.weight.to_vec2::<f32>()?;
        let expected_w = [[2.0 / 3.0, -1.0, 0.0], [0.0, 0.5, -0.75]];
        assert_eq!(g.weight.dims(), &[2, 3]);
        for (j, row) in expected_w.iter().enumerate() {
            for (i, &want) in row.iter().enumerate() {
                assert_abs_diff_eq!(gw[j][i], want, epsilon = 1e-6);
            }
        }

        // beta / tmax^2 = 1/128
        let gi = g.input.to_vec2::<f32>()?;
        let expected_i = [
            (-2.0 * 1.0 / 3.0) / 128.0,
            (-2.0 * 2.0 / 2.0 - 1.5 * 1.0 / 3.0) / 128.0,
            (-1.5 * 3.0 / 2.0) / 128.0,
        ];
        assert_eq!(g.input.dims(), &[1, 3]);
        for (i, &want) in expected_i.iter().enumerate() {
            assert_abs_diff_eq!(gi[0][i], want, epsilon = 1e-7);
        }
        Ok(())
    }

    #[test]
    fn test_outside_kernel_support_is_zero() -> CandleResult<()> {
        // delta = 6 >= tau1 + tau2
        let ctx = ctx(&[&[8.0]], &[&[2.0]], &[&[1.0]], 1.0);
        let grad_out = Tensor::new(&[[1f32]], &Device::Cpu)?;
        let g = causal_gradients(&ctx, &grad_out)?;
        assert_eq!(g.weight.to_vec2::<f32>()?, vec![vec![0.0]]);
        assert_eq!(g.input.to_vec2::<f32>()?, vec![vec![0.0]]);
        Ok(())
    }

    #[test]
    fn test_weight_gradient_sums_over_batch_and_keeps_layout() -> CandleResult<()> {
        // two outputs, one input; same pair repeated over two samples
        let ctx = ctx(
            &[&[2.0, 8.0], &[2.0, 8.0]],
            &[&[0.0], &[0.0]],
            &[&[1.0], &[3.0]],
            1.0,
        );
        let grad_out = Tensor::new(&[[1f32, 1.0], [1.0, 1.0]], &Device::Cpu)?;
        let g = causal_gradients(&ctx, &grad_out)?;

        assert_eq!(g.weight.dims(), &[2, 1]);
        assert_eq!(g.input.dims(), &[2, 1]);
        let gw = g.weight.to_vec2::<f32>()?;
        assert_abs_diff_eq!(gw[0][0], 2.0, epsilon = 1e-6);
        assert_eq!(gw[1][0], 0.0);
        Ok(())
    }
}
