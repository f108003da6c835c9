/// Renders a reading with exactly one fractional digit, rounding halves away
/// from zero. Non-finite values have no textual form and yield `None`.
pub fn fixed_point(value: f64) -> Option<String> {
    if !value.is_finite() {
        return None;
    }

    let tenths = (value * 10.0).round();
    // -0.04 would otherwise come out as "-0.0"
    let tenths = if tenths == 0.0 { 0.0 } else { tenths };

    Some(format!("{:.1}", tenths / 10.0))
}
