//! Slicer time estimates

/// Seconds in a slicer estimate such as `1d 2h 8m 58s`
///
/// Units are read in `d`, `h`, `m`, `s` order and any of them may be
/// missing. A unit whose number does not parse counts as zero.
pub fn parse_estimated_time(text: &str) -> u64 {
    let compact: String = text.chars().filter(|c| *c != ' ').collect();
    let mut rest = compact.as_str();
    let mut total = 0u64;

    for (unit, seconds) in [('d', 86_400), ('h', 3_600), ('m', 60), ('s', 1)] {
        if let Some(i) = rest.find(unit) {
            let value = rest[..i].parse::<u64>().unwrap_or(0);
            total = total.saturating_add(value.saturating_mul(seconds));
            rest = &rest[i + 1..];
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_estimate() {
        assert_eq!(parse_estimated_time("2d 12h 8m 58s"), 2 * 86_400 + 12 * 3_600 + 8 * 60 + 58);
    }

    #[test]
    fn test_partial_estimate() {
        assert_eq!(parse_estimated_time("1h 5s"), 3_605);
        assert_eq!(parse_estimated_time("42m"), 2_520);
        assert_eq!(parse_estimated_time("7s"), 7);
    }

    #[test]
    fn test_garbage_counts_as_zero() {
        assert_eq!(parse_estimated_time(""), 0);
        assert_eq!(parse_estimated_time("unknown"), 0);
        assert_eq!(parse_estimated_time("xh 3m"), 180);
    }

    #[test]
    fn test_oversized_estimate_saturates() {
        assert_eq!(parse_estimated_time("999999999999999d 1h"), u64::MAX);
        assert_eq!(parse_estimated_time("99999999999999999999d 5s"), 5);
    }
}
