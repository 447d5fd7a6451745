//! Target firing times and the normalized temporal loss.

use candle_core::{DType, Result as CandleResult, Tensor};

/// Desired firing time per output neuron: the labeled class should fire
/// `gamma` ticks before the earliest output (but not before 0), every other
/// class `gamma` ticks after the latest output (but not after `tmax`).
///
/// `output` is `(batch, classes)`, `labels` is `(batch,)` of class indices.
/// The target is treated as a constant by the backward pass.
pub fn target_firing_time(
    output: &Tensor,
    labels: &Tensor,
    gamma: f32,
    tmax: u32,
) -> CandleResult<Tensor> {
    let (batch, classes) = output.dims2()?;
    let gamma = gamma as f64;

    let early = output
        .min_keepdim(1)?
        .affine(1.0, -gamma)?
        .maximum(0.0)?
        .broadcast_as((batch, classes))?;
    let late = output
        .max_keepdim(1)?
        .affine(1.0, gamma)?
        .minimum(tmax as f64)?
        .broadcast_as((batch, classes))?;

    let class_ids = Tensor::arange(0u32, classes as u32, output.device())?.unsqueeze(0)?;
    let is_label = class_ids.broadcast_eq(&labels.to_dtype(DType::U32)?.unsqueeze(1)?)?;
    is_label.where_cond(&early.contiguous()?, &late.contiguous()?)
}

/// `0.5 * sum(((output - target) / tmax)^2)` per sample.
#[derive(Debug, Clone, Copy)]
pub struct TemporalLoss {
    pub tmax: u32,
}

impl TemporalLoss {
    pub fn new(tmax: u32) -> Self {
        Self { tmax }
    }

    /// Per-sample loss, `(batch,)`.
    pub fn loss(&self, output: &Tensor, target: &Tensor) -> CandleResult<Tensor> {
        let tmax = self.tmax as f64;
        output
            .sub(target)?
            .affine(1.0 / tmax, 0.0)?
            .sqr()?
            .sum(1)?
            .affine(0.5, 0.0)
    }

    /// Mean of [`Self::loss`] over the batch.
    pub fn mean_loss(&self, output: &Tensor, target: &Tensor) -> CandleResult<f32> {
        self.loss(output, target)?.mean_all()?.to_scalar::<f32>()
    }

    /// `(output - target) / tmax^2`, elementwise.
    pub fn grad(&self, output: &Tensor, target: &Tensor) -> CandleResult<Tensor> {
        let tmax = self.tmax as f64;
        output.sub(target)?.affine(1.0 / (tmax * tmax), 0.0)
    }
}

/// Index of the earliest-firing output per sample.
pub fn predict(output: &Tensor) -> CandleResult<Tensor> {
    output.argmin(1)
}

/// How many predictions match `labels`.
pub fn count_correct(output: &Tensor, labels: &Tensor) -> CandleResult<usize> {
    let hits = predict(output)?
        .eq(&labels.to_dtype(DType::U32)?)?
        .to_dtype(DType::F32)?
        .sum_all()?
        .to_scalar::<f32>()?;
    Ok(hits as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use candle_core::Device;

    #[test]
    fn test_target_rule() -> CandleResult<()> {
        let dev = Device::Cpu;
        let output = Tensor::new(&[[5f32, 9.0, 7.0], [12.0, 10.0, 11.0]], &dev)?;
        let labels = Tensor::new(&[2u32, 0], &dev)?;
        let target = target_firing_time(&output, &labels, 2.0, 20)?.to_vec2::<f32>()?;
        assert_eq!(target, vec![vec![11.0, 11.0, 3.0], vec![8.0, 14.0, 14.0]]);
        Ok(())
    }

    #[test]
    fn test_target_rule_clamps_to_window() -> CandleResult<()> {
        let dev = Device::Cpu;
        let output = Tensor::new(&[[2f32, 15.0, 18.0]], &dev)?;
        let labels = Tensor::new(&[1u32], &dev)?;
        let target = target_firing_time(&output, &labels, 5.0, 20)?.to_vec2::<f32>()?;
        assert_eq!(target, vec![vec![20.0, 0.0, 20.0]]);
        Ok(())
    }

    #[test]
    fn test_loss_value() -> CandleResult<()> {
        let dev = Device::Cpu;
        let loss = TemporalLoss::new(10);
        let output = Tensor::new(&[[4f32, 10.0], [0.0, 0.0]], &dev)?;
        let target = Tensor::new(&[[2f32, 10.0], [0.0, 0.0]], &dev)?;
        let l = loss.loss(&output, &target)?.to_vec1::<f32>()?;
        assert_relative_eq!(l[0], 0.02, max_relative = 1e-6);
        assert_eq!(l[1], 0.0);
        assert_relative_eq!(loss.mean_loss(&output, &target)?, 0.01, max_relative = 1e-6);
        Ok(())
    }

    #[test]
    fn test_loss_gradient_matches_finite_difference() -> CandleResult<()> {
        let dev = Device::Cpu;
        let loss = TemporalLoss::new(16);
        let out = vec![3.0f64, 11.0, 16.0, 7.5];
        let tgt = vec![1.0f64, 16.0, 16.0, 2.0];
        let output = Tensor::from_vec(out.iter().map(|&v| v as f32).collect(), (1, 4), &dev)?;
        let target = Tensor::from_vec(tgt.iter().map(|&v| v as f32).collect(), (1, 4), &dev)?;
        let grad = loss.grad(&output, &target)?.to_vec2::<f32>()?;

        // central differences in f64 on the closed form
        let f = |o: &[f64]| -> f64 {
            o.iter()
                .zip(&tgt)
                .map(|(o, t)| ((o - t) / 16.0).powi(2))
                .sum::<f64>()
                * 0.5
        };
        let h = 1e-3;
        for k in 0..out.len() {
            let mut plus = out.clone();
            let mut minus = out.clone();
            plus[k] += h;
            minus[k] -= h;
            let numeric = (f(&plus) - f(&minus)) / (2.0 * h);
            assert_relative_eq!(grad[0][k] as f64, numeric, epsilon = 1e-9, max_relative = 1e-4);
        }

        // and the tensor loss agrees with the closed form
        let l = loss.loss(&output, &target)?.to_vec1::<f32>()?[0] as f64;
        assert_relative_eq!(l, f(&out), max_relative = 1e-5);
        Ok(())
    }

    #[test]
    fn test_predict_earliest() -> CandleResult<()> {
        let dev = Device::Cpu;
        let output = Tensor::new(&[[5f32, 2.0, 9.0], [1.0, 8.0, 8.0]], &dev)?;
        assert_eq!(predict(&output)?.to_vec1::<u32>()?, vec![1, 0]);
        let labels = Tensor::new(&[1u32, 2], &dev)?;
        assert_eq!(count_correct(&output, &labels)?, 1);
        Ok(())
    }
}
