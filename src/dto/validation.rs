//! Validation helpers for DTOs and path parameters.

use validator::ValidationError;

const MATCH_ID_MAX_LEN: usize = 128;

/// Validates that a match id is non-empty, at most 128 characters and made of ASCII
/// letters, digits, `-` or `_`.
///
/// # Examples
///
/// ```ignore
/// validate_match_id("match-42") // Ok
/// validate_match_id("")         // Err - empty
/// validate_match_id("a/b")      // Err - separator
/// ```
pub fn validate_match_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.len() > MATCH_ID_MAX_LEN {
        let mut err = ValidationError::new("match_id_length");
        err.message = Some(
            format!(
                "Match ID must be between 1 and {MATCH_ID_MAX_LEN} characters (got {})",
                id.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        let mut err = ValidationError::new("match_id_format");
        err.message = Some("Match ID may only contain letters, digits, '-' and '_'".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_match_id_valid() {
        assert!(validate_match_id("match-42").is_ok());
        assert!(validate_match_id("A_b-9").is_ok());
        assert!(validate_match_id(&"x".repeat(128)).is_ok());
    }

    #[test]
    fn test_validate_match_id_invalid_length() {
        assert!(validate_match_id("").is_err());
        assert!(validate_match_id(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_validate_match_id_invalid_format() {
        assert!(validate_match_id("a/b").is_err());
        assert!(validate_match_id("with space").is_err());
        assert!(validate_match_id("é").is_err());
    }
}
