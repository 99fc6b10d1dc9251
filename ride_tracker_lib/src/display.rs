//! Human readable strings for the live view. Stateless; a value that cannot be formatted is
//! shown as the raw number instead.

fn with_precision(value: f64, precision: usize, unit: &str) -> String {
    if value.is_finite() {
        format!("{value:.precision$} {unit}")
    } else {
        format!("{value} {unit}")
    }
}

/// Meters per second as km/h.
pub fn speed(meters_per_second: f64) -> String {
    with_precision(meters_per_second * 3.6, 1, "km/h")
}

/// Meters as kilometers.
pub fn distance(meters: f64) -> String {
    with_precision(meters / 1000.0, 2, "km")
}

pub fn rise(meters: f64) -> String {
    with_precision(meters, 1, "m")
}

pub fn emissions(grams: f64) -> String {
    with_precision(grams, 0, "g CO₂")
}

/// Seconds as `h:mm:ss`.
pub fn duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return format!("{seconds} s");
    }

    let total = seconds.round() as u64;
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}
