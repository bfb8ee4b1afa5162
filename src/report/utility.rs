/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean of the strictly positive values, `None` when there are none.
/// Zero cells mean "nobody counted" and must not pull the average down.
pub fn mean_of_positive(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let positive: Vec<f64> = values.into_iter().filter(|v| *v > 0.0).collect();
    if positive.is_empty() {
        None
    } else {
        Some(mean(&positive))
    }
}

/// Rounds to the nearest integer, ties to even.
pub fn round_half_even(value: f64) -> f64 {
    let rounded = value.round();
    if (value - value.trunc()).abs() == 0.5 {
        2.0 * (value / 2.0).round()
    } else {
        rounded
    }
}

/// Rounds to `decimals` places, ties to even.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    round_half_even(value * factor) / factor
}
