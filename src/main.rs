use std::env;
use std::error::Error;
use std::fs;
use std::path::Path;

use candle_core::Device;
use env_logger::Env;
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tqdm::Iter;

use temporal_spike::config::TrainConfig;
use temporal_spike::dataset::xor::XorDataset;
use temporal_spike::loss;
use temporal_spike::model::Network;
use temporal_spike::optim::sgd::Sgd;
use temporal_spike::stats::WeightStats;
use temporal_spike::train::train_step;
use temporal_spike::{persist, utils};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let cfg = match args.get(1) {
        Some(path) => TrainConfig::from_json_file(path)?,
        None => TrainConfig::default(),
    };
    let default_out = "data/xor_model.safetensors".to_string();
    let model_path = Path::new(args.get(2).unwrap_or(&default_out));

    let device = Device::new_cuda(0).unwrap_or(Device::Cpu);
    let tmax = cfg.network.tmax();
    let ds = XorDataset::new(1.0, (tmax / 2) as f32, &device)?;

    let mut net = Network::new(&cfg.network, &device)?;
    let sgd = Sgd::new(cfg.learning_rate);
    let mut rng = StdRng::seed_from_u64(cfg.seed);

    info!(
        "training {} layers for {} epochs, lr={} gamma={}",
        net.layers().len(),
        cfg.epochs,
        cfg.learning_rate,
        cfg.gamma
    );

    for epoch in (0..cfg.epochs).tqdm() {
        let mut total_loss = 0.0;
        let mut correct = 0;
        let mut seen = 0;
        for (input, labels) in ds.batches(cfg.batch_size, &mut rng)? {
            let step = train_step(&mut net, &input, &labels, cfg.gamma, &sgd)?;
            total_loss += step.loss * step.batch as f32;
            correct += step.correct;
            seen += step.batch;
        }

        if cfg.log_every > 0 && epoch % cfg.log_every == 0 {
            info!(
                "Epoch {}: loss={:.5} accuracy={}/{}",
                epoch,
                total_loss / seen as f32,
                correct,
                seen
            );
        }
    }

    for (k, layer) in net.layers().iter().enumerate() {
        info!("layer {k}: {}", WeightStats::of(layer.weight())?);
    }

    let (input, labels) = ds.all();
    let output = net.infer(input)?;
    info!(
        "final accuracy: {}/{}",
        loss::count_correct(&output, labels)?,
        ds.len()
    );

    if let Some(dir) = model_path.parent() {
        fs::create_dir_all(dir)?;
    }
    persist::save(&net, model_path)?;
    utils::save_firing_times_csv(model_path.with_extension("csv"), &output, labels)?;

    println!("Done");
    Ok(())
}
