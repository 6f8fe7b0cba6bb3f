//! Two-decimal rounding for serialized hours, percentages and probabilities.
//!
//! Values stay unrounded in memory so that sums over buckets and slots remain
//! exact; rounding is applied only on the way out.

use serde::Serializer;

/// Round to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `serialize_with` adaptor for `f64` fields.
pub fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(round2(*value))
}

/// `serialize_with` adaptor for `Option<f64>` fields.
pub fn serialize_option<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(v) => serializer.serialize_some(&round2(*v)),
        None => serializer.serialize_none(),
    }
}
