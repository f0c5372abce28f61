//! C literal helpers shared by the expression evaluator and value extraction

/// Strip one pair of matching single or double quotes
pub fn unquote(s: &str) -> Option<&str> {
    let s = s.trim();
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' || first == b'\'') && first == last {
            return Some(&s[1..s.len() - 1]);
        }
    }
    None
}

/// Integer literal: decimal, `0x` hex or `0b` binary, optional sign and
/// `u`/`l` suffixes (`250UL`, `-0x10`).
pub fn parse_integer_literal(s: &str) -> Option<i64> {
    let s = s.trim();
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, s.strip_prefix('+').unwrap_or(s).trim_start()),
    };

    let body = body.trim_end_matches(['u', 'U', 'l', 'L']);
    let magnitude = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = body.strip_prefix("0b").or_else(|| body.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).ok()?
    } else if !body.is_empty() && body.bytes().all(|b| b.is_ascii_digit()) {
        body.parse::<i64>().ok()?
    } else {
        return None;
    };

    Some(if negative { -magnitude } else { magnitude })
}

/// Floating literal with optional `f` suffix (`0.5f`, `-1.2`, `1e3`).
///
/// Words such as `inf` or `NaN` are not numbers here.
pub fn parse_float_literal(s: &str) -> Option<f64> {
    let s = s.trim();
    let body = s.strip_prefix(['-', '+']).unwrap_or(s);
    if !body.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    if body.starts_with("0x") || body.starts_with("0X") {
        return parse_integer_literal(s).map(|n| n as f64);
    }
    let trimmed = s.trim_end_matches(['f', 'F', 'l', 'L']);
    trimmed
        .parse::<f64>()
        .ok()
        .or_else(|| parse_integer_literal(s).map(|n| n as f64))
}

/// Integer if it is one, otherwise float
pub fn parse_number(s: &str) -> Option<f64> {
    parse_integer_literal(s)
        .map(|n| n as f64)
        .or_else(|| parse_float_literal(s))
}
