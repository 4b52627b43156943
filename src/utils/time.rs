use std::time::Duration;

/// Converts a (possibly fractional) number of minutes into a [`Duration`].
/// Negative and NaN inputs collapse to zero; values too large for a `Duration`
/// (including infinity) saturate at [`Duration::MAX`].
pub fn minutes(n: f64) -> Duration {
    seconds(n * 60.0)
}

fn seconds(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}
