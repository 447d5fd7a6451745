use std::env;
use std::error::Error;

use candle_core::Device;
use env_logger::Env;

use temporal_spike::persist;
use temporal_spike::stats::WeightStats;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let default_path = "data/xor_model.safetensors".to_string();
    let file_path = args.get(1).unwrap_or(&default_path);

    let net = persist::load(file_path, &Device::Cpu)?;
    println!("{} layers, tmax={}", net.layers().len(), net.tmax());

    for (k, layer) in net.layers().iter().enumerate() {
        let c = layer.config();
        println!(
            "layer {}: {} -> {} tau1={} tau2={} threshold={} beta={}",
            k, c.in_features, c.out_features, c.tau1, c.tau2, c.threshold, c.beta
        );
        println!("  weights: {}", WeightStats::of(layer.weight())?);
    }

    Ok(())
}
