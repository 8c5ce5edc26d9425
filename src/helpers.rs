use chrono::DateTime;

/// `$1.23T`, `$4.56B`, `$7.89M`, `$1.00K`, `$12.34`
pub fn format_compact(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let abs = value.abs();

    let formatted = match abs {
        v if v >= 1e12 => format!("{:.2}T", v / 1e12),
        v if v >= 1e9 => format!("{:.2}B", v / 1e9),
        v if v >= 1e6 => format!("{:.2}M", v / 1e6),
        v if v >= 1e3 => format!("{:.2}K", v / 1e3),
        v => format!("{:.2}", v),
    };

    format!("{}${}", sign, formatted)
}

/// `+1.23%`, `-4.56%`, `0.00%`
pub fn format_percentage(value: f64) -> String {
    let sign = if value > 0.0 { "+" } else { "" };
    format!("{}{:.2}%", sign, value)
}

/// Price with thousands separators and between 2 and 6 fraction digits,
/// `R$` for BRL and `$` for anything else.
pub fn format_price(value: f64, currency: &str) -> String {
    let symbol = if currency.eq_ignore_ascii_case("brl") {
        "R$"
    } else {
        "$"
    };
    let sign = if value < 0.0 { "-" } else { "" };

    let fixed = format!("{:.6}", value.abs());
    let (integer, fraction) =
        fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let mut fraction = fraction.trim_end_matches('0').to_owned();
    while fraction.len() < 2 {
        fraction.push('0');
    }

    format!("{}{}{}.{}", sign, symbol, group_thousands(integer), fraction)
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    grouped
}

/// Day label for a millisecond timestamp, e.g. `May 1`.
pub fn format_day(timestamp_ms: i64) -> String {
    DateTime::from_timestamp_millis(timestamp_ms)
        .map(|date| date.format("%b %-d").to_string())
        .unwrap_or_default()
}

/// Splits a comma separated option value, dropping empty items.
pub fn parse_list(data: &str) -> Vec<String> {
    data.split(',')
        .map(|item| item.trim().to_owned())
        .filter(|item| !item.is_empty())
        .collect()
}
