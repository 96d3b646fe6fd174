//! Number formatting for chart tooltips and headers.
//!
//! Portfolio values are money, so the default display keeps exactly two
//! decimals and groups the integer part with commas.

/// Inserts thousands separators into a plain `format!`-produced number string.
///
/// Expects `-?digits(.digits)?`; anything else is returned unchanged.
pub fn group_thousands(formatted: &str) -> String {
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    if integer.is_empty() || !integer.bytes().all(|b| b.is_ascii_digit()) {
        return formatted.to_string();
    }

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, ch) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match fraction {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

/// Format an f64 with explicit decimal places and thousands separators.
pub fn display_with_decimals(amount: f64, decimals: usize) -> String {
    let formatted = format!("{:.1$}", amount, decimals);
    // No sign on values that round to zero.
    let negative_zero = formatted.starts_with('-')
        && formatted[1..].bytes().all(|b| b == b'0' || b == b'.');
    let formatted = if negative_zero {
        formatted[1..].to_string()
    } else {
        formatted
    };
    group_thousands(&formatted)
}

/// Money display: two decimals, comma-grouped.
pub fn display_money(amount: f64) -> String {
    display_with_decimals(amount, 2)
}
