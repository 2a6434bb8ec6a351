//! PBS reports resource usage in a few shapes depending on where it comes from: the epilogue
//! record usually has `cput=00:02:00,mem=2048kb`, qstat has `resources_used.vmem = 4096kb`, and
//! some sites rewrite both into plain seconds and bytes. All parsers here return `None` for
//! anything they don't understand.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

/// Timestamp layout after the weekday: `Jan 5 14:03:22 2025`
const TIMESTAMP_FORMAT: &str = "%b %d %H:%M:%S %Y";

/// Seconds from `120` or `HH:MM:SS` (hours may exceed 24)
pub fn parse_seconds(value: &str) -> Option<u64> {
    let value = value.trim();
    if !value.contains(':') {
        return value.parse().ok();
    }

    let fields: Vec<&str> = value.split(':').collect();
    if fields.len() != 3 {
        return None;
    }
    let mut total: u64 = 0;
    for field in fields {
        let n: u64 = field.parse().ok()?;
        total = total.checked_mul(60)?.checked_add(n)?;
    }
    Some(total)
}

/// Bytes from `4096000` or a number with a b/kb/mb/gb/tb suffix (powers of 1024)
pub fn parse_bytes(value: &str) -> Option<u64> {
    let value = value.trim().to_lowercase();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);
    let n: u64 = digits.parse().ok()?;

    let multiplier: u64 = match unit {
        "" | "b" => 1,
        "kb" | "k" => 1 << 10,
        "mb" | "m" => 1 << 20,
        "gb" | "g" => 1 << 30,
        "tb" | "t" => 1 << 40,
        _ => return None,
    };
    n.checked_mul(multiplier)
}

/// Local time from `Mon Jan 5 14:03:22 2025`
///
/// The weekday is skipped rather than checked: it is redundant with the date and PBS builds
/// don't agree on its case.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Local>> {
    let tokens: Vec<&str> = value.split_whitespace().collect();
    let date = match tokens.len() {
        5 => tokens[1..].join(" "),
        4 => tokens.join(" "),
        _ => return None,
    };
    let naive = NaiveDateTime::parse_from_str(&date, TIMESTAMP_FORMAT).ok()?;
    Local.from_local_datetime(&naive).earliest()
}
