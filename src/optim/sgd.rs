use crate::optim::WeightUpdate;
use candle_core::{Result as CandleResult, Tensor};

/// Plain gradient descent: `w - lr * g`.
#[derive(Clone)]
pub struct Sgd {
    pub lr: f32,
}

impl Sgd {
    pub fn new(lr: f32) -> Self {
        Self { lr }
    }
}

impl WeightUpdate for Sgd {
    fn update(&self, weight: &Tensor, grad: &Tensor) -> CandleResult<Tensor> {
        let step = grad.affine(self.lr as f64, 0.0)?;
        weight.sub(&step)
    }
}
