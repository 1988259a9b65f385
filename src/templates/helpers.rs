use chrono::{DateTime, NaiveDate};
use minijinja::Value;

/// `{{ amount|money }}`, `{{ amount|money("€") }}`. Numeric strings are
/// parsed; anything else passes through untouched.
pub fn money_filter(value: Value, symbol: Option<String>) -> Result<Value, minijinja::Error> {
    let amount = match value.as_str() {
        Some(s) => match s.trim().parse::<f64>() {
            Ok(n) => n,
            Err(_) => return Ok(value),
        },
        None if value.is_number() => f64::try_from(value.clone())?,
        None => return Ok(value),
    };

    let symbol = symbol.as_deref().unwrap_or("$");
    Ok(Value::from(format_currency(amount, symbol)))
}

/// `{{ "2024-01-31"|date("%d %b %Y") }}`
pub fn date_filter(value: String, format: Option<String>) -> String {
    format_date_string(&value, format.as_deref().unwrap_or("%d/%m/%Y"))
}

/// Makes a value safe to place in one layout-script line: newlines become
/// spaces and cell separators are escaped.
pub fn cell_filter(value: Value) -> String {
    let text = match value.as_str() {
        Some(s) => s.to_string(),
        None if value.is_undefined() || value.is_none() => String::new(),
        None => value.to_string(),
    };
    text.replace(['\r', '\n'], " ").replace('|', "\\|")
}

pub fn format_currency(amount: f64, symbol: &str) -> String {
    let formatted = format_number_with_separators(amount.abs(), 2);
    if amount < 0.0 {
        format!("-{}{}", symbol, formatted)
    } else {
        format!("{}{}", symbol, formatted)
    }
}

pub fn format_number_with_separators(num: f64, decimals: usize) -> String {
    let formatted = format!("{:.decimals$}", num, decimals = decimals);
    let (integer, decimal) = match formatted.split_once('.') {
        Some((i, d)) => (i, Some(d)),
        None => (formatted.as_str(), None),
    };

    let mut result = String::new();
    for (count, c) in integer.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    let integer_formatted: String = result.chars().rev().collect();

    match decimal {
        Some(d) => format!("{}.{}", integer_formatted, d),
        None => integer_formatted,
    }
}

pub fn format_date_string(date_str: &str, format: &str) -> String {
    if let Ok(date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
        return date.format(format).to_string();
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(date_str) {
        return datetime.format(format).to_string();
    }

    date_str.to_string()
}
