/// Helper utilities for the registry CLI

use regex::Regex;
use std::sync::OnceLock;

/// Parse an integer the way a browser's `parseInt(value)` does.
///
/// Leading whitespace and an optional sign are accepted, then the longest run
/// of digits is read and anything after it is ignored. A `0x` prefix switches
/// to hexadecimal. Returns `None` when no digit is found (NaN). Values past
/// the `i64` range are clamped to `i64::MAX` (or `-i64::MAX`).
pub fn parse_int_lenient(value: &str) -> Option<i64> {
    let trimmed = value.trim_start();
    let (negative, rest) = match trimmed.chars().next() {
        Some('-') => (true, &trimmed[1..]),
        Some('+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let (radix, digits) = match rest.get(..2) {
        Some("0x") | Some("0X") => (16, &rest[2..]),
        _ => (10, rest),
    };

    let mut seen_digit = false;
    let mut result: i64 = 0;
    for c in digits.chars() {
        let Some(d) = c.to_digit(radix) else { break };
        seen_digit = true;
        result = result.saturating_mul(radix as i64).saturating_add(d as i64);
    }

    if !seen_digit {
        return None;
    }

    Some(if negative { -result } else { result })
}

/// Strip ANSI escape codes from a string
pub fn strip_ansi_codes(s: &str) -> String {
    static ANSI: OnceLock<Regex> = OnceLock::new();
    let ansi_regex = ANSI.get_or_init(|| {
        // ESC [ ... <final byte>
        Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("static regex")
    });
    ansi_regex.replace_all(s, "").to_string()
}

/// Drop text from the front until `s` fits in `max_bytes`, respecting char boundaries
pub fn truncate_front(s: &mut String, max_bytes: usize) {
    if s.len() <= max_bytes {
        return;
    }
    let mut cut = s.len() - max_bytes;
    while !s.is_char_boundary(cut) {
        cut += 1;
    }
    s.drain(..cut);
}

/// Format an optional port for tables
pub fn format_port(port: Option<i64>) -> String {
    port.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string())
}
