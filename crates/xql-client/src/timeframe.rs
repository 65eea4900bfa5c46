use std::sync::OnceLock;

use regex::Regex;

use crate::error::XqlError;

pub const MS_PER_MINUTE: u64 = 60_000;
pub const MS_PER_HOUR: u64 = 3_600_000;
pub const MS_PER_DAY: u64 = 86_400_000;

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([0-9]+)([dhm])$").expect("time window pattern"))
}

/// Converts a relative window such as `1d`, `2h` or `15m` into milliseconds.
pub fn parse(token: &str) -> Result<u64, XqlError> {
    let invalid = || XqlError::InvalidTimeFormat(token.to_string());
    let captures = pattern().captures(token).ok_or_else(invalid)?;

    let amount = captures[1].parse::<u64>().map_err(|_| invalid())?;
    let unit = captures[2].chars().next().ok_or_else(invalid)?;

    amount.checked_mul(unit_millis(unit)?).ok_or_else(invalid)
}

fn unit_millis(unit: char) -> Result<u64, XqlError> {
    match unit {
        'd' => Ok(MS_PER_DAY),
        'h' => Ok(MS_PER_HOUR),
        'm' => Ok(MS_PER_MINUTE),
        other => Err(XqlError::UnsupportedTimeUnit(other)),
    }
}
