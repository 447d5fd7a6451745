pub mod sgd;

use candle_core::{Result as CandleResult, Tensor};

/// Rule turning a weight matrix and its gradient into the next weight matrix.
pub trait WeightUpdate: Send + Sync {
    fn update(&self, weight: &Tensor, grad: &Tensor) -> CandleResult<Tensor>;
}
