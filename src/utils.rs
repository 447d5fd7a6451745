use crate::error::Result;
use candle_core::{DType, Tensor};
use std::path::Path;

/// Writes one CSV row per sample: the label followed by every output's
/// firing time.
pub fn save_firing_times_csv(
    path: impl AsRef<Path>,
    firing_time: &Tensor,
    labels: &Tensor,
) -> Result<()> {
    let rows = firing_time.to_dtype(DType::F32)?.to_vec2::<f32>()?;
    let labels = labels.to_dtype(DType::U32)?.to_vec1::<u32>()?;
    let width = rows.first().map_or(0, |r| r.len());

    let mut w = csv::Writer::from_path(path)?;
    let mut header = vec!["label".to_string()];
    header.extend((0..width).map(|k| format!("t{k}")));
    w.write_record(&header)?;
    for (label, row) in labels.iter().zip(rows) {
        let mut record = vec![label.to_string()];
        record.extend(row.iter().map(|t| t.to_string()));
        w.write_record(&record)?;
    }
    w.flush()?;
    Ok(())
}
