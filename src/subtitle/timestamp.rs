//! SRT timestamp encoding (`HH:MM:SS,mmm`).

const MILLIS_PER_SECOND: u64 = 1_000;
const MILLIS_PER_MINUTE: u64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: u64 = 60 * MILLIS_PER_MINUTE;

/// Truncate a seconds value to whole milliseconds.
///
/// A few ulps of slack are added before flooring so that values written with
/// three decimals (`2.3`, `1.001`) land on the millisecond they name instead
/// of the one below it. Sub-millisecond fractions are still truncated.
/// Negative and non-finite input yields zero.
pub fn to_millis(seconds: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    let scaled = seconds * MILLIS_PER_SECOND as f64;
    (scaled + scaled * 4.0 * f64::EPSILON).floor() as u64
}

/// Format seconds as an SRT timestamp.
///
/// Every field is floor-truncated, never rounded. The hour field is at least
/// two digits and widens past 99 rather than wrapping.
pub fn encode(seconds: f64) -> String {
    let total = to_millis(seconds);
    let hours = total / MILLIS_PER_HOUR;
    let minutes = (total % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE;
    let secs = (total % MILLIS_PER_MINUTE) / MILLIS_PER_SECOND;
    let millis = total % MILLIS_PER_SECOND;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}
