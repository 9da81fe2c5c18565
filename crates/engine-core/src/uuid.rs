//! A `UUID4` Universally Unique Identifier (UUID) version 4 (RFC 4122).

use std::fmt::{Debug, Display, Formatter};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A UUID version 4 value, used to uniquely identify every event emitted by the core.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UUID4(Uuid);

impl UUID4 {
    /// Creates a new random [`UUID4`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a [`UUID4`] from an existing [`Uuid`], for deterministic/seeded event ids.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for UUID4 {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for UUID4 {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "UUID4('{}')", self.0)
    }
}

impl Display for UUID4 {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uuid4_are_unique() {
        assert_ne!(UUID4::new(), UUID4::new());
    }
}
