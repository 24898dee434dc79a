//! Display formatting for money amounts. Rounding happens only here.

/// `$12.34`
pub fn format_usd(amount: f64) -> String {
    format!("${:.2}", amount)
}

/// `KES 13,000`: rounded to a whole unit with comma grouping
pub fn format_local(amount: f64, currency: &str) -> String {
    format!("{} {}", currency, group_thousands(amount.round() as i64))
}

/// Insert a comma every three digits
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    if value < 0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
