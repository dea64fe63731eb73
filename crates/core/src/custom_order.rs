//! Custom order requests from the order form.
//!
//! The form does not submit anywhere; it composes a message the visitor pastes
//! into a direct message to the shop.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

/// What a visitor typed into the custom order form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CustomOrderRequest {
    pub name: String,
    pub instagram: String,
    pub details: String,
    /// Free-text date as entered in the date picker.
    pub date_needed: String,
}

impl CustomOrderRequest {
    /// Name and details are required before the request can be sent.
    #[must_use]
    pub fn is_submittable(&self) -> bool {
        !self.name.trim().is_empty() && !self.details.trim().is_empty()
    }

    /// The message sent to the shop.
    #[must_use]
    pub fn message(&self) -> String {
        let mut message = String::from("Hi! I'd like to place a custom order 🎨\n\n");
        let _ = writeln!(message, "Name: {}", self.name.trim());
        let _ = writeln!(message, "Instagram: {}", self.instagram.trim());
        let _ = writeln!(message, "Date Needed: {}", self.date_needed.trim());
        let _ = write!(message, "\nDetails:\n{}", self.details.trim());
        message
    }
}
