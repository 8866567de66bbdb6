//! The collected patient profile
//!
//! Terminal output of a completed intake conversation. Field names on the
//! wire are PascalCase to match the document API payload.

use serde::{Deserialize, Serialize};
use std::fmt;

/// All answers collected by the get-user-details flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserProfile {
    /// Given (first) name
    pub given: String,

    /// Family (last) name
    pub family: String,

    /// Full name as the user states it
    pub name: String,

    /// Birth date in yyyy-mm-dd form (pattern-checked only)
    pub birth_date: String,

    /// Selected gender label
    pub gender: String,

    /// Postal code (validated > 20000)
    pub address_postalcode: i64,
}

impl fmt::Display for UserProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Given: {}\n\nFamily: {}\n\nName: {}\n\nBirthdate: {}\n\nGender: {}\n\nAddress Postal Code: {}",
            self.given, self.family, self.name, self.birth_date, self.gender, self.address_postalcode
        )
    }
}
