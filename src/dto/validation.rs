//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::state::room::ROOM_ID_LENGTH;

/// Validates that a free-text field contains something other than whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be empty".into());
        return Err(err);
    }
    Ok(())
}

/// Validates that a room ID has the generated shape: [`ROOM_ID_LENGTH`] ASCII alphanumerics.
///
/// # Examples
///
/// ```ignore
/// validate_room_id("aZ09bY18") // Ok
/// validate_room_id("aZ09bY1")  // Err - too short
/// validate_room_id("aZ09bY1/") // Err - not URL-safe
/// ```
pub fn validate_room_id(id: &str) -> Result<(), ValidationError> {
    if id.len() != ROOM_ID_LENGTH {
        let mut err = ValidationError::new("room_id_length");
        err.message = Some(
            format!(
                "Room ID must be exactly {ROOM_ID_LENGTH} characters (got {})",
                id.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        let mut err = ValidationError::new("room_id_format");
        err.message = Some("Room ID must contain only ASCII letters and digits".into());
        return Err(err);
    }

    Ok(())
}
