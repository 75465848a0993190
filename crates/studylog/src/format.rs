/// Render fractional hours as "H hours M minutes", or "H hours" on the hour.
///
/// Minutes are rounded; a result of 60 carries into the hour count.
pub fn format_duration(hours: f64) -> String {
    let hours = if hours.is_finite() && hours > 0.0 { hours } else { 0.0 };
    let whole = hours.floor();
    let mut h = whole as u64;
    let mut m = ((hours - whole) * 60.0).round() as u64;
    if m >= 60 {
        h += 1;
        m -= 60;
    }

    if m > 0 {
        format!("{h} hours {m} minutes")
    } else {
        format!("{h} hours")
    }
}
