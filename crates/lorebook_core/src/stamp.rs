//! Timestamp formatting policy for archive and export file names.
//!
//! # Invariants
//! - File name stamps are `yyyyMMdd_HHmmss` in UTC, so lexicographic order
//!   equals creation order.

use time::OffsetDateTime;

/// Current time as an RFC3339 string for archive payloads.
pub(crate) fn current_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

/// Current time as a `yyyyMMdd_HHmmss` file name stamp.
pub(crate) fn filename_stamp() -> String {
    let now = OffsetDateTime::now_utc();
    format!(
        "{:04}{:02}{:02}_{:02}{:02}{:02}",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}

#[cfg(test)]
mod tests {
    use super::{current_rfc3339, filename_stamp};

    #[test]
    fn filename_stamp_has_fixed_width() {
        let stamp = filename_stamp();
        assert_eq!(stamp.len(), 15);
        assert_eq!(stamp.as_bytes()[8], b'_');
    }

    #[test]
    fn rfc3339_timestamp_is_not_empty() {
        assert!(current_rfc3339().contains('T'));
    }
}
