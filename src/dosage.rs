//! Weight-based dosage suggestion.
//!
//! Advisory only: the prescriber confirms or edits the value before it is
//! saved, and nothing downstream checks it against safety bounds.

use std::sync::LazyLock;

use regex::Regex;

static MG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+\.?\d*)\s*mg").expect("valid dosage regex"));

/// Suggest a per-dose amount from a catalog dosage string and the patient's
/// weight.
///
/// The first `<number>mg` in `common_dosage` is multiplied by `weight` and
/// rounded to a whole milligram. When there is no mg value, or the weight is
/// missing, non-positive or not finite, `common_dosage` comes back unchanged.
pub fn suggest_dosage(common_dosage: &str, weight: Option<f64>) -> String {
    let Some(weight) = weight.filter(|w| w.is_finite() && *w > 0.0) else {
        return common_dosage.to_string();
    };

    let base = MG_PATTERN
        .captures(common_dosage)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok());

    match base {
        Some(base_mg) => format!("{}mg", (weight * base_mg).round() as i64),
        None => common_dosage.to_string(),
    }
}
