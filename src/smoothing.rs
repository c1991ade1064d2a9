use crate::dew_point::round2;

/// Trailing moving average over a series that may have gaps
///
/// Each output value is the mean of the present values among the last 'window' entries
/// up to and including the same index, rounded to 2 decimals. It is None only when every
/// entry in that sub window is None. A window of 0 behaves as 1.
///
/// # Arguments
///
/// * 'values' - the series to smooth
/// * 'window' - number of trailing entries to average over
pub fn smooth(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let window = window.max(1);

    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let (sum, count) = values[start..=i]
                .iter()
                .flatten()
                .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));

            if count == 0 { None } else { Some(round2(sum / count as f64)) }
        })
        .collect()
}
