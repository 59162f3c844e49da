use std::time::Duration;

pub(crate) fn format_duration_single(d: Duration) -> String {
    // One rounded component in s, ms or us keeps progress lines aligned.
    let total_us = d.as_micros();

    const US_PER_MS: u128 = 1_000;
    const US_PER_S: u128 = 1_000_000;

    fn round_div(value: u128, unit: u128) -> u128 {
        // Nearest integer, ties round up.
        (value + (unit / 2)) / unit
    }

    if total_us >= US_PER_S {
        return format!("{}s", round_div(total_us, US_PER_S));
    }
    if total_us >= US_PER_MS {
        return format!("{}ms", round_div(total_us, US_PER_MS));
    }

    format!("{total_us}us")
}

pub(crate) fn format_millis(ms: f64) -> String {
    if !ms.is_finite() {
        return "0.0ms".to_string();
    }
    if ms >= 1_000.0 {
        return format!("{:.2}s", ms / 1_000.0);
    }

    format!("{ms:.1}ms")
}

pub(crate) fn format_percent(fraction: f64) -> String {
    if fraction.is_finite() {
        format!("{:.1}%", fraction * 100.0)
    } else {
        "0.0%".to_string()
    }
}

pub(crate) fn format_rate(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.0}")
    } else {
        "0".to_string()
    }
}
