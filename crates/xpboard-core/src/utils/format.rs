/// Audit ratio with two decimals, or `N/A` when the platform has none
pub fn format_audit_ratio(ratio: Option<f64>) -> String {
    match ratio {
        Some(r) => format!("{:.2}", r),
        None => "N/A".to_string(),
    }
}

/// Byte count in decimal megabytes (1 MB = 1,000,000 bytes)
pub fn format_megabytes(bytes: f64) -> String {
    if bytes == 0.0 {
        return "0 MB".to_string();
    }
    format!("{:.2} MB", bytes / 1_000_000.0)
}

/// Whole decimal kilobytes, as used for xp totals
pub fn format_kilobytes(bytes: f64) -> String {
    format!("{} kB", (bytes / 1000.0).floor() as i64)
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a date string to a more readable format
pub fn format_date(date: &str) -> String {
    // Try to parse ISO format and convert to readable
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%b %d, %Y").to_string()
    } else if date.len() >= 10 {
        // Try to parse YYYY-MM-DD format
        date.chars().take(10).collect()
    } else {
        date.to_string()
    }
}
