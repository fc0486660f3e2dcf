//! Axis tick generation and labels

const DURATION_SEC: f64 = 1.0;
const DURATION_MIN: f64 = DURATION_SEC * 60.0;

/// Labelled time ticks
pub const MAJOR_TICK_SECS: f64 = 5.0 * DURATION_MIN;
/// Unlabelled time ticks
pub const MINOR_TICK_SECS: f64 = DURATION_MIN;
/// Evenly spaced value ticks, both bounds included
pub const VALUE_TICK_COUNT: usize = 5;
/// Most ticks one time axis may carry
pub const MAX_TIME_TICKS: usize = 10_000;

/// Number of ticks [`time_ticks`] would place, counted in f64 so huge or
/// infinite ranges never overflow.
pub fn time_tick_count(start: f64, end: f64, step: f64) -> f64 {
    if !(step > 0.0) || !(start <= end) {
        return 0.0;
    }
    ((end - start) / step).floor() + 1.0
}

/// Ticks at `start, start + step, ...` up to and including `end`, at most
/// [`MAX_TIME_TICKS`] of them.
///
/// Positions are computed from the tick index so long ranges don't
/// accumulate float drift.
pub fn time_ticks(start: f64, end: f64, step: f64) -> Vec<f64> {
    let count = time_tick_count(start, end, step);
    if !(count >= 1.0) {
        return Vec::new();
    }

    let count = count.min(MAX_TIME_TICKS as f64) as usize;
    (0..count).map(|i| start + i as f64 * step).collect()
}

/// `count` evenly spaced values from `min` to `max` inclusive.
pub fn value_ticks(min: f64, max: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![min],
        _ => (0..count)
            .map(|i| min + (i as f64 / (count - 1) as f64) * (max - min))
            .collect(),
    }
}

/// Zero-padded `MM:SS` label for an elapsed-seconds offset.
pub fn format_mmss(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Value tick label
pub fn format_value(value: f64) -> String {
    format!("{value:.2}")
}
