/// Renders a second count the way the room displays track lengths:
/// `mm:ss` under an hour, `h:mm:ss` under a day, `d Day(s) h:mm:ss` beyond.
pub fn format_duration(total_secs: u64) -> String {
    let (m, s) = (total_secs / 60, total_secs % 60);
    let (h, m) = (m / 60, m % 60);
    let (d, h) = (h / 24, h % 24);

    if d == 0 && h == 0 {
        format!("{m:02}:{s:02}")
    } else if d == 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{d} Day(s) {h}:{m:02}:{s:02}")
    }
}

/// Parses a user supplied time point: plain seconds (`90`) or unit-suffixed
/// segments (`1h2m3s`, `4m`, `30s`). Returns `None` for anything else.
pub fn parse_time_point(input: &str) -> Option<u64> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(secs) = input.parse::<u64>() {
        return Some(secs);
    }

    let mut total: u64 = 0;
    let mut digits = String::new();
    for c in input.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let unit = match c.to_ascii_lowercase() {
            'h' => 3_600,
            'm' => 60,
            's' => 1,
            _ => return None,
        };
        let value: u64 = digits.parse().ok()?;
        digits.clear();
        total = total.checked_add(value.checked_mul(unit)?)?;
    }
    if !digits.is_empty() {
        return None;
    }
    Some(total)
}
