//! Admin configuration loaded from environment variables.
//!
//! `ADMIN_TG_IDS` holds a comma-separated list of Telegram ids that are
//! granted the admin role at startup.

use tracing::warn;

/// Parses a comma-separated list of Telegram ids.
///
/// Blank entries are skipped. Entries that are not integers are logged and
/// skipped.
#[must_use]
pub fn parse_admin_ids(raw: &str) -> Vec<i64> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| match part.parse::<i64>() {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Ignoring invalid admin id '{part}': {e}");
                None
            }
        })
        .collect()
}

/// Gets the configured admin Telegram ids, empty when `ADMIN_TG_IDS` is unset.
#[must_use]
pub fn get_admin_tg_ids() -> Vec<i64> {
    std::env::var("ADMIN_TG_IDS")
        .map(|raw| parse_admin_ids(&raw))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_admin_ids() {
        assert_eq!(parse_admin_ids("123, 456,789"), vec![123, 456, 789]);
    }

    #[test]
    fn test_parse_admin_ids_skips_blank_and_invalid() {
        assert_eq!(parse_admin_ids(" ,42,abc,,7 "), vec![42, 7]);
        assert!(parse_admin_ids("").is_empty());
    }
}
