//! Duration strings used in guild policy (`"30m"`, `"1h"`, `"1w"`).

use std::time::Duration;

/// Parse duration string (e.g., "1h", "30m", "1d", "1h30m").
///
/// Supported units:
/// - s: seconds
/// - m: minutes
/// - h: hours
/// - d: days
/// - w: weeks
///
/// Segments are summed, so `"1d12h"` is a day and a half.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let mut total: u64 = 0;
    let mut digits = String::new();

    for c in input.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }

        let amount: u64 = digits.parse().ok()?;
        digits.clear();

        let unit = match c.to_ascii_lowercase() {
            's' => 1,
            'm' => 60,
            'h' => 3600,
            'd' => 86400,
            'w' => 604800,
            _ => return None,
        };
        total = total.checked_add(amount.checked_mul(unit)?)?;
    }

    // Trailing number without a unit
    if !digits.is_empty() {
        return None;
    }

    Some(Duration::from_secs(total))
}

/// Format seconds into human readable text ("1 week 2 days").
pub fn format_duration_full(secs: u64) -> String {
    if secs == 0 {
        return "forever".to_string();
    }

    let units = [
        (604800, "week"),
        (86400, "day"),
        (3600, "hour"),
        (60, "minute"),
        (1, "second"),
    ];

    let mut rest = secs;
    let mut parts = Vec::new();
    for (size, name) in units {
        let n = rest / size;
        if n > 0 {
            rest %= size;
            parts.push(if n == 1 {
                format!("1 {}", name)
            } else {
                format!("{} {}s", n, name)
            });
        }
    }

    parts.join(" ")
}
