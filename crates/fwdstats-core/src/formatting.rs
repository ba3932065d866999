/// Satoshi per bitcoin.
pub const SATS_PER_BTC: f64 = 100_000_000.0;

/// Convert satoshi to bitcoin.
pub fn sats_to_btc(sats: u64) -> f64 {
    sats as f64 / SATS_PER_BTC
}

/// Format a satoshi amount as bitcoin with a fixed number of decimals and no
/// grouping, e.g. `0.1234`.
///
/// ```
/// use fwdstats_core::formatting::format_btc;
///
/// assert_eq!(format_btc(12_340_000, 4), "0.1234");
/// assert_eq!(format_btc(150_000_000, 6), "1.500000");
/// ```
pub fn format_btc(sats: u64, decimals: usize) -> String {
    format!("{:.prec$}", sats_to_btc(sats), prec = decimals)
}

/// Format a whole number with commas every three digits.
///
/// ```
/// use fwdstats_core::formatting::group_thousands;
///
/// assert_eq!(group_thousands(1_234_567), "1,234,567");
/// assert_eq!(group_thousands(999), "999");
/// ```
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    let remainder = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i != 0 && i % 3 == remainder {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── group_thousands ──────────────────────────────────────────────────────

    #[test]
    fn test_group_thousands_boundaries() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(100_000_000), "100,000,000");
        assert_eq!(group_thousands(u64::MAX), "18,446,744,073,709,551,615");
    }

    // ── btc ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_sats_to_btc() {
        assert!((sats_to_btc(50_000_000) - 0.5).abs() < 1e-12);
        assert_eq!(sats_to_btc(0), 0.0);
    }

    #[test]
    fn test_format_btc_decimals() {
        assert_eq!(format_btc(1, 6), "0.000000");
        assert_eq!(format_btc(100, 6), "0.000001");
        assert_eq!(format_btc(123_456_789, 4), "1.2346");
    }
}
