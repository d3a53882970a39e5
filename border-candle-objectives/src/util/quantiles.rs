use super::NamedTensors;
use anyhow::Result;
use border_objectives_core::record::Record;
use candle_core::DType;
use ordered_float::OrderedFloat;

const QUANTILES: [(&str, f64); 5] = [
    ("min", 0.0),
    ("p25", 0.25),
    ("p50", 0.5),
    ("p75", 0.75),
    ("max", 1.0),
];

/// Summarizes the distribution of absolute values over all tensors.
///
/// Returns `{prefix}min`, `{prefix}p25`, `{prefix}p50`, `{prefix}p75` and
/// `{prefix}max`, using linear interpolation between order statistics.
/// An empty collection gives an empty record.
pub fn get_magnitude_quantiles(tensors: &NamedTensors, key_prefix: &str) -> Result<Record> {
    let mut xs = Vec::new();
    for (_, t) in tensors.iter() {
        let v = t.flatten_all()?.to_dtype(DType::F32)?.to_vec1::<f32>()?;
        xs.extend(v.into_iter().map(|x| OrderedFloat(x.abs())));
    }

    let mut record = Record::empty();
    if xs.is_empty() {
        return Ok(record);
    }
    xs.sort();

    let n = xs.len();
    for (name, q) in QUANTILES {
        let pos = q * (n - 1) as f64;
        let (lo, hi) = (pos.floor() as usize, pos.ceil() as usize);
        let frac = (pos - lo as f64) as f32;
        let v = xs[lo].0 + (xs[hi].0 - xs[lo].0) * frac;
        record.insert_scalar(format!("{}{}", key_prefix, name), v);
    }

    Ok(record)
}
