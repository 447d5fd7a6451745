use candle_core::{DType, Result as CandleResult, Tensor};

/// Summary of a weight matrix, for logs and model inspection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightStats {
    pub mean: f32,
    pub std: f32,
    pub min: f32,
    pub max: f32,
    pub num_weights: usize,
}

impl WeightStats {
    pub fn of(weights: &Tensor) -> CandleResult<Self> {
        let flat = weights.flatten_all()?.to_dtype(DType::F32)?;
        let num_weights = flat.elem_count();
        if num_weights == 0 {
            return Ok(WeightStats {
                mean: 0.0,
                std: 0.0,
                min: 0.0,
                max: 0.0,
                num_weights: 0,
            });
        }

        let mean = flat.mean_all()?;
        // population variance
        let variance = flat.broadcast_sub(&mean)?.sqr()?.mean_all()?;
        Ok(WeightStats {
            mean: mean.to_scalar::<f32>()?,
            std: variance.sqrt()?.to_scalar::<f32>()?,
            min: flat.min(0)?.to_scalar::<f32>()?,
            max: flat.max(0)?.to_scalar::<f32>()?,
            num_weights,
        })
    }
}

impl std::fmt::Display for WeightStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "n={} mean={:.4} std={:.4} min={:.4} max={:.4}",
            self.num_weights, self.mean, self.std, self.min, self.max
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use candle_core::Device;

    #[test]
    fn test_empty_tensor() -> CandleResult<()> {
        let w = Tensor::zeros((0, 3), DType::F32, &Device::Cpu)?;
        assert_eq!(WeightStats::of(&w)?.num_weights, 0);
        Ok(())
    }

    #[test]
    fn test_stats() -> CandleResult<()> {
        let w = Tensor::new(&[[1f32, 3.0], [-1.0, 1.0]], &Device::Cpu)?;
        let s = WeightStats::of(&w)?;
        assert_eq!(s.num_weights, 4);
        assert_relative_eq!(s.mean, 1.0);
        assert_relative_eq!(s.std, 2f32.sqrt());
        assert_eq!((s.min, s.max), (-1.0, 3.0));
        Ok(())
    }
}
