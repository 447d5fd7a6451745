use candle_core::{Device, Result as CandleResult, Tensor};
use rand::Rng;
use rand::seq::SliceRandom;

/// XOR latency-encoded into spike times. Neuron 0 is a bias that always
/// fires at tick 0; neurons 1 and 2 fire at `early` for a set bit and at
/// `late` for a cleared one. The label is `a ^ b`.
pub struct XorDataset {
    inputs: Tensor,
    labels: Tensor,
}

impl XorDataset {
    pub fn new(early: f32, late: f32, device: &Device) -> CandleResult<Self> {
        let pairs = [(0u32, 0u32), (0, 1), (1, 0), (1, 1)];
        let encode = |bit: u32| if bit == 1 { early } else { late };

        let mut ins = Vec::with_capacity(pairs.len() * 3);
        let mut labs = Vec::with_capacity(pairs.len());
        for (a, b) in pairs {
            ins.extend([0.0, encode(a), encode(b)]);
            labs.push(a ^ b);
        }
        Ok(Self {
            inputs: Tensor::from_vec(ins, (pairs.len(), 3), device)?,
            labels: Tensor::from_vec(labs, (pairs.len(),), device)?,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn features(&self) -> usize {
        self.inputs.dims()[1]
    }

    /// every sample, in order
    pub fn all(&self) -> (&Tensor, &Tensor) {
        (&self.inputs, &self.labels)
    }

    /// Shuffled `(input, label)` batches of at most `batch_size` samples.
    pub fn batches<R: Rng>(
        &self,
        batch_size: usize,
        rng: &mut R,
    ) -> CandleResult<Vec<(Tensor, Tensor)>> {
        let mut order: Vec<u32> = (0..self.len() as u32).collect();
        order.shuffle(rng);
        order
            .chunks(batch_size.max(1))
            .map(|chunk| {
                let idx = Tensor::new(chunk, self.inputs.device())?;
                Ok((
                    self.inputs.index_select(&idx, 0)?,
                    self.labels.index_select(&idx, 0)?,
                ))
            })
            .collect()
    }
}
