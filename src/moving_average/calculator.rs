use crate::storage::PricePoint;

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Average of the first `period` points of a newest-first window, or `None`
/// when fewer than `period` points are available.
pub fn window_average(newest_first: &[PricePoint], period: usize) -> Option<f64> {
    if period == 0 || newest_first.len() < period {
        return None;
    }
    let prices: Vec<f64> = newest_first[..period].iter().map(|p| p.price.to_f64()).collect();
    mean(&prices)
}
