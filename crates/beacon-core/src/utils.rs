//! Common utility functions

use uuid::Uuid;

/// Generate a new UUID v4
pub fn generate_id() -> Uuid {
    Uuid::new_v4()
}

/// Mask sensitive data for logging
pub fn mask_sensitive(data: &str) -> String {
    if data.len() <= 8 || !data.is_char_boundary(4) || !data.is_char_boundary(data.len() - 4) {
        "***".to_string()
    } else {
        format!("{}***{}", &data[..4], &data[data.len() - 4..])
    }
}
