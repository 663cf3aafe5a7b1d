//! Generated header values: Message-ID and Date.

use chrono::{DateTime, Local, TimeZone, Utc};
use rand::Rng;

/// Generates a globally unique Message-ID, angle brackets included.
///
/// Format: `<YYYYmmddHHMMSS.pid.random@domain>`.
#[must_use]
pub fn generate_message_id(domain: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let pid = std::process::id();
    let random: u64 = rand::thread_rng().r#gen();
    format!("<{timestamp}.{pid}.{random}@{domain}>")
}

/// Formats a timestamp as an RFC 2822 `Date` value.
#[must_use]
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.to_rfc2822()
}

/// Returns the current local time as an RFC 2822 `Date` value.
#[must_use]
pub fn now_date() -> String {
    format_date(&Local::now())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn test_message_id_shape() {
        let id = generate_message_id("mail.example.com");
        assert!(id.starts_with('<'));
        assert!(id.ends_with("@mail.example.com>"));

        let local = id.trim_start_matches('<').split('@').next().unwrap();
        let fields: Vec<&str> = local.split('.').collect();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].len(), 14);
        assert_eq!(fields[1], std::process::id().to_string());
    }

    #[test]
    fn test_message_ids_are_unique() {
        assert_ne!(generate_message_id("localhost"), generate_message_id("localhost"));
    }

    #[test]
    fn test_format_date() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let date = offset.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(format_date(&date), "Tue, 5 Mar 2024 07:08:09 +0200");
    }

    #[test]
    fn test_now_date_parses_back() {
        assert!(DateTime::parse_from_rfc2822(&now_date()).is_ok());
    }
}
