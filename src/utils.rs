// Utility functions
use chrono::{NaiveDate, NaiveDateTime};

/// Parses `YYYY-MM-DD`.
pub fn parse_iso_date(date_str: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").ok()
}

/// Parses Wikimedia's hourly stamp `YYYYMMDDHH` into its date.
pub fn parse_compact_hour(stamp: &str) -> Option<NaiveDate> {
    NaiveDateTime::parse_from_str(&format!("{}0000", stamp.trim()), "%Y%m%d%H%M%S")
        .ok()
        .map(|dt| dt.date())
}

/// Turns a source key into a human-facing name: `Eric_Dane` -> `Eric Dane`.
pub fn display_name(id: &str) -> String {
    id.replace('_', " ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Shortens text to at most `max_chars` characters, ending with "..." when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Shortens text to at most `max_units` UTF-16 code units, ending with "..."
/// when cut. Characters outside the BMP count as two units.
pub fn truncate_utf16(text: &str, max_units: usize) -> String {
    if text.encode_utf16().count() <= max_units {
        return text.to_string();
    }
    let budget = max_units.saturating_sub(3);
    let mut used = 0;
    let mut out = String::new();
    for c in text.chars() {
        used += c.len_utf16();
        if used > budget {
            break;
        }
        out.push(c);
    }
    out.push_str("...");
    out
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_hour_parses_to_date() {
        assert_eq!(
            parse_compact_hour("2025030100"),
            NaiveDate::from_ymd_opt(2025, 3, 1)
        );
        assert_eq!(parse_compact_hour("not-a-date"), None);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let long = "ä".repeat(200);
        let short = truncate_chars(&long, 180);
        assert_eq!(short.chars().count(), 180);
        assert!(short.ends_with("..."));
        assert_eq!(truncate_chars("kurz", 180), "kurz");
    }

    #[test]
    fn utf16_truncation_counts_surrogate_pairs() {
        let emoji = "📈".repeat(600);
        let short = truncate_utf16(&emoji, 1024);
        assert!(short.encode_utf16().count() <= 1024);
        // 1021 units leave room for 510 two-unit emoji
        assert_eq!(short.chars().filter(|c| *c == '📈').count(), 510);
        assert!(short.ends_with("..."));

        let plain = "x".repeat(2000);
        assert_eq!(truncate_utf16(&plain, 1024).encode_utf16().count(), 1024);
        assert_eq!(truncate_utf16("📈 kurz", 1024), "📈 kurz");
    }

    #[test]
    fn display_name_replaces_underscores() {
        assert_eq!(display_name("Künstliche_Intelligenz"), "Künstliche Intelligenz");
        assert_eq!(display_name("DGS10"), "DGS10");
    }
}
