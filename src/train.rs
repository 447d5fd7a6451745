//! One supervised step: forward, target rule, loss, backward, weight update.

use crate::error::Result;
use crate::loss::{self, TemporalLoss};
use crate::model::Network;
use crate::optim::WeightUpdate;
use candle_core::Tensor;
use log::trace;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    /// mean loss over the batch, measured before the update
    pub loss: f32,
    pub correct: usize,
    pub batch: usize,
}

pub fn train_step(
    net: &mut Network,
    input: &Tensor,
    labels: &Tensor,
    gamma: f32,
    rule: &dyn WeightUpdate,
) -> Result<StepOutcome> {
    let tmax = net.tmax();
    let (output, tape) = net.forward(input)?;

    let target = loss::target_firing_time(&output, labels, gamma, tmax)?;
    let objective = TemporalLoss::new(tmax);
    let mean_loss = objective.mean_loss(&output, &target)?;
    let correct = loss::count_correct(&output, labels)?;

    let grads = net.backward(tape, &objective.grad(&output, &target)?)?;
    net.apply_gradients(grads, rule)?;

    let batch = output.dim(0)?;
    trace!("step: loss={mean_loss:.5} correct={correct}/{batch}");
    Ok(StepOutcome {
        loss: mean_loss,
        correct,
        batch,
    })
}
