//! Roles and the levels used for authorization comparisons.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role assigned to newly registered users.
pub const DEFAULT_ROLE: &str = "user";

/// A named role with a numeric privilege level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Role {
    /// Unique role name, e.g. `moderator`.
    pub name: String,
    /// Higher levels carry more privileges.
    pub level: i32,
}

impl Role {
    /// Build a role from its name and level.
    pub fn new(name: impl Into<String>, level: i32) -> Self {
        Self {
            name: name.into(),
            level,
        }
    }

    /// Whether this role meets or exceeds `required`.
    #[must_use]
    pub fn satisfies(&self, required: &Self) -> bool {
        self.level >= required.level
    }
}
