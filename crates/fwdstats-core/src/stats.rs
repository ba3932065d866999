//! Numeric helpers shared by the aggregators.
//!
//! Every ratio helper treats a zero denominator as a defined zero rate: idle
//! days and zero-amount forwards are valid data, not errors.

// ── Percentile helper ─────────────────────────────────────────────────────────

/// Compute the `p`-th percentile of a **sorted** slice using linear
/// interpolation between order statistics: `rank = p/100 * (n-1)`.
///
/// This matches NumPy's default `percentile` method. Returns `0.0` for an
/// empty slice.
pub fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }
    let len = sorted_data.len();
    if len == 1 {
        return sorted_data[0];
    }
    let rank = (p / 100.0) * (len as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted_data[lo];
    }
    let frac = rank - lo as f64;
    sorted_data[lo] + frac * (sorted_data[hi] - sorted_data[lo])
}

/// Integer percentile of a **sorted** slice, truncated toward zero.
///
/// The result never exceeds the largest element, so percentiles taken at
/// increasing `p` stay ordered and bounded by the maximum.
pub fn percentile_u64(sorted_data: &[u64], p: f64) -> u64 {
    let as_f64: Vec<f64> = sorted_data.iter().map(|&v| v as f64).collect();
    let value = percentile(&as_f64, p).trunc() as u64;
    match sorted_data.last() {
        Some(&max) => value.min(max),
        None => 0,
    }
}

// ── Means and rates ───────────────────────────────────────────────────────────

/// Arithmetic mean, `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Fee rate of a single forward in ppm; `0.0` when `amount_out` is zero.
pub fn event_ppm(amount_out: u64, fee: u64) -> f64 {
    if amount_out == 0 {
        return 0.0;
    }
    fee as f64 / amount_out as f64 * 1_000_000.0
}

/// `fees / forwarded * 1_000_000` truncated, computed exactly in integers.
///
/// Returns `0` when `forwarded` is zero.
pub fn ratio_ppm(fees: u64, forwarded: u64) -> u64 {
    if forwarded == 0 {
        return 0;
    }
    let ppm = u128::from(fees) * 1_000_000 / u128::from(forwarded);
    u64::try_from(ppm).unwrap_or(u64::MAX)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // ── percentile ───────────────────────────────────────────────────────────

    #[test]
    fn test_percentile_empty_returns_zero() {
        assert_eq!(percentile(&[], 50.0), 0.0);
        assert_eq!(percentile_u64(&[], 95.0), 0);
    }

    #[test]
    fn test_percentile_single_element() {
        assert_eq!(percentile(&[42.0], 95.0), 42.0);
        assert_eq!(percentile_u64(&[42], 0.0), 42);
        assert_eq!(percentile_u64(&[42], 100.0), 42);
    }

    #[test]
    fn test_percentile_two_values_interpolates() {
        // rank = 0.5 * 1 = 0.5 → 1000 + 0.5*1000
        assert_eq!(percentile_u64(&[1000, 2000], 50.0), 1500);
        // rank = 0.95 * 1 = 0.95 → 1000 + 0.95*1000
        assert_eq!(percentile_u64(&[1000, 2000], 95.0), 1950);
    }

    #[test]
    fn test_percentile_p50_even() {
        let data = vec![1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&data, 50.0) - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_percentile_u64_truncates() {
        // rank = 0.5 * 3 = 1.5 → 2 + 0.5 = 2.5 → 2
        assert_eq!(percentile_u64(&[1, 2, 3, 4], 50.0), 2);
    }

    #[test]
    fn test_percentile_p95_twenty_values() {
        // 1..=20: rank = 0.95 * 19 = 18.05 → 19 + 0.05 = 19.05
        let data: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        assert!((percentile(&data, 95.0) - 19.05).abs() < 1e-9);
    }

    // ── mean / rates ─────────────────────────────────────────────────────────

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert!((mean(&[1000.0, 2000.0]) - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn test_event_ppm_zero_amount_is_zero() {
        assert_eq!(event_ppm(0, 10), 0.0);
        assert_eq!(event_ppm(0, 0), 0.0);
    }

    #[test]
    fn test_event_ppm() {
        assert!((event_ppm(1000, 1) - 1000.0).abs() < 1e-9);
        assert!((event_ppm(2000, 4) - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn test_ratio_ppm() {
        assert_eq!(ratio_ppm(5, 3000), 1666);
        assert_eq!(ratio_ppm(0, 3000), 0);
        assert_eq!(ratio_ppm(10, 0), 0);
    }

    #[test]
    fn test_ratio_ppm_large_values_do_not_overflow() {
        assert_eq!(ratio_ppm(u64::MAX, u64::MAX), 1_000_000);
    }

    // ── properties ───────────────────────────────────────────────────────────

    proptest! {
        #[test]
        fn prop_percentiles_ordered_and_bounded(
            mut values in prop::collection::vec(0u64..10_000_000_000u64, 1..200)
        ) {
            values.sort_unstable();
            let p50 = percentile_u64(&values, 50.0);
            let p95 = percentile_u64(&values, 95.0);
            let max = *values.last().unwrap();
            prop_assert!(values[0] <= p50);
            prop_assert!(p50 <= p95);
            prop_assert!(p95 <= max);
        }
    }
}
