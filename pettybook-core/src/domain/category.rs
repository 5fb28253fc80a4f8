//! Category domain model

use serde::{Deserialize, Serialize};

use super::RecordId;

/// Names seeded into an empty category set
pub const DEFAULT_CATEGORY_NAMES: [&str; 5] =
    ["Salary", "Rent", "Utilities", "Office Supplies", "Travel"];

/// A label transactions are filed under
///
/// Names are not unique; nothing stops two categories called "Travel".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: RecordId,
    pub name: String,
}

impl Category {
    pub fn new(id: impl Into<RecordId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}
