//! Input validation helpers
//!
//! Centralized limits and the strict identifier check applied at the
//! engine boundary. Identifiers never reach the store unvalidated; free
//! text is truncated, not rejected.

use crate::core::{EngineError, EngineResult};

// ── Limits ──────────────────────────────────────────────────────────

/// Notes and other free-text fields
pub const MAX_NOTE_LEN: usize = 500;

/// Identifier length bound
pub const MAX_ID_LEN: usize = 64;

// ── Helpers ─────────────────────────────────────────────────────────

/// Validate an identifier against the strict format.
///
/// Accepted: 1–64 ASCII characters from `[A-Za-z0-9_:-]`. Everything the
/// store hands out (UUID simple form, prefixed record keys) fits; user
/// input that does not is rejected before any I/O.
pub fn validate_id(value: &str, field: &str) -> EngineResult<()> {
    if value.is_empty() {
        return Err(EngineError::validation(format!("{field} must not be empty")));
    }
    if value.len() > MAX_ID_LEN {
        return Err(EngineError::validation(format!(
            "{field} is too long ({} chars, max {MAX_ID_LEN})",
            value.len()
        )));
    }
    if !value
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b':')
    {
        return Err(EngineError::validation(format!(
            "{field} contains invalid characters: {value:?}"
        )));
    }
    Ok(())
}

/// Truncate notes to [`MAX_NOTE_LEN`] instead of rejecting long input.
pub fn truncate_notes(notes: &str) -> String {
    if notes.len() <= MAX_NOTE_LEN {
        return notes.to_string();
    }
    let mut end = MAX_NOTE_LEN;
    while !notes.is_char_boundary(end) {
        end -= 1;
    }
    notes[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id_accepts_store_formats() {
        assert!(validate_id("a3f9c2d41b7e4f20", "entry_id").is_ok());
        assert!(validate_id("station:grill-1", "station_id").is_ok());
        assert!(validate_id("table_12", "table_id").is_ok());
    }

    #[test]
    fn test_validate_id_rejects_malformed_input() {
        assert!(validate_id("", "id").is_err());
        assert!(validate_id("has space", "id").is_err());
        assert!(validate_id("drop;table", "id").is_err());
        assert!(validate_id(&"x".repeat(65), "id").is_err());
    }

    #[test]
    fn test_truncate_notes_respects_char_boundaries() {
        let short = "well done please";
        assert_eq!(truncate_notes(short), short);

        let long = "é".repeat(400); // 800 bytes
        let truncated = truncate_notes(&long);
        assert!(truncated.len() <= MAX_NOTE_LEN);
        assert!(truncated.chars().all(|c| c == 'é'));
    }
}
