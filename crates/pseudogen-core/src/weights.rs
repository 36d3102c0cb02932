//! # Weighted Options
//!
//! A random column stores its choices as ordered `(option, weight)` pairs.
//! The `rules.ini` format and the generator service both want two parallel
//! flat lists instead (`options = Red,Green` / `weights = 1,2`). The pairs are
//! the source of truth; the flat lists are always derived from them, never
//! edited directly.

use serde::{Deserialize, Serialize};

/// Weight assigned when a weight is missing or cannot be read.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// A single choice for random selection and its relative likelihood.
///
/// Weights are relative, not probabilities: `[1, 2, 1]` picks the middle
/// option half of the time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedOption {
    pub option: String,
    pub weight: f64,
}

impl WeightedOption {
    pub fn new(option: impl Into<String>, weight: f64) -> Self {
        Self {
            option: option.into(),
            weight,
        }
    }

    /// A fresh, empty pair as added by "+ Add" in the editor.
    pub fn blank() -> Self {
        Self::new("", DEFAULT_WEIGHT)
    }

    fn is_blank(&self) -> bool {
        self.option.trim().is_empty()
    }
}

/// Flatten pairs into parallel `options` and `weights` lists.
///
/// Pairs whose option text is blank are skipped along with their weight so
/// that `options[i]` always pairs with `weights[i]`. The input is untouched,
/// which lets an editor keep a half-typed row around.
pub fn encode(pairs: &[WeightedOption]) -> (Vec<String>, Vec<f64>) {
    pairs
        .iter()
        .filter(|p| !p.is_blank())
        .map(|p| (p.option.clone(), p.weight))
        .unzip()
}

/// Zip raw `options` and `weights` lists (as split from text) back into pairs.
///
/// A weight that is missing, non-numeric, negative or non-finite becomes
/// [`DEFAULT_WEIGHT`]. Weights without an option are dropped, and so are blank
/// options.
pub fn decode<S: AsRef<str>>(options: &[String], weights: &[S]) -> Vec<WeightedOption> {
    options
        .iter()
        .enumerate()
        .filter(|(_, opt)| !opt.trim().is_empty())
        .map(|(i, opt)| {
            let weight = weights
                .get(i)
                .map(|w| parse_weight(w.as_ref()))
                .unwrap_or(DEFAULT_WEIGHT);
            WeightedOption::new(opt.clone(), weight)
        })
        .collect()
}

/// Same as [`decode`] for weights that are already numbers (JSON wire form).
pub fn decode_numeric(options: &[String], weights: &[f64]) -> Vec<WeightedOption> {
    options
        .iter()
        .enumerate()
        .filter(|(_, opt)| !opt.trim().is_empty())
        .map(|(i, opt)| {
            let weight = weights
                .get(i)
                .copied()
                .filter(|w| is_usable(*w))
                .unwrap_or(DEFAULT_WEIGHT);
            WeightedOption::new(opt.clone(), weight)
        })
        .collect()
}

/// Sum of all weights, shown next to the option count in summaries.
pub fn total_weight(pairs: &[WeightedOption]) -> f64 {
    pairs.iter().map(|p| p.weight).sum()
}

fn parse_weight(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|w| is_usable(*w))
        .unwrap_or(DEFAULT_WEIGHT)
}

fn is_usable(weight: f64) -> bool {
    weight.is_finite() && weight >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_encode_keeps_lists_parallel() {
        let pairs = vec![
            WeightedOption::new("Red", 1.0),
            WeightedOption::new("  ", 5.0),
            WeightedOption::new("Blue", 2.5),
        ];
        let (options, weights) = encode(&pairs);
        assert_eq!(options, strings(&["Red", "Blue"]));
        assert_eq!(weights, vec![1.0, 2.5]);
        // The pair list itself is not touched.
        assert_eq!(pairs.len(), 3);
    }

    #[test]
    fn test_decode_defaults_missing_and_bad_weights() {
        let options = strings(&["a", "b", "c", "d"]);
        let weights = ["3", "heavy", "-2"];
        let pairs = decode(&options, &weights);
        let got: Vec<f64> = pairs.iter().map(|p| p.weight).collect();
        assert_eq!(got, vec![3.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_decode_ignores_extra_weights() {
        let pairs = decode(&strings(&["only"]), &["4", "5", "6"]);
        assert_eq!(pairs, vec![WeightedOption::new("only", 4.0)]);
    }

    #[test]
    fn test_pairs_survive_encode_decode() {
        let pairs = vec![
            WeightedOption::new("Website", 25.0),
            WeightedOption::new("Call", 0.0),
            WeightedOption::new("Social Media", 0.5),
        ];
        let (options, weights) = encode(&pairs);
        let rendered: Vec<String> = weights.iter().map(|w| w.to_string()).collect();
        assert_eq!(decode(&options, &rendered), pairs);
        assert_eq!(decode_numeric(&options, &weights), pairs);
    }

    #[test]
    fn test_encode_after_decode_is_stable() {
        let options = strings(&["x", "", "y"]);
        let weights = ["2"];
        let (o, w) = encode(&decode(&options, &weights));
        assert_eq!(o, strings(&["x", "y"]));
        assert_eq!(w, vec![2.0, 1.0]);
        let (o2, w2) = encode(&decode_numeric(&o, &w));
        assert_eq!((o2, w2), (o, w));
    }

    #[test]
    fn test_decode_numeric_rejects_nan() {
        let pairs = decode_numeric(&strings(&["a"]), &[f64::NAN]);
        assert_eq!(pairs[0].weight, DEFAULT_WEIGHT);
    }

    #[test]
    fn test_total_weight() {
        let pairs = vec![WeightedOption::new("a", 1.0), WeightedOption::new("b", 2.0)];
        assert_eq!(total_weight(&pairs), 3.0);
    }
}
