// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(i64);

        impl $name {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }

            /// Parses the text of a rendered control; surrounding whitespace is ignored.
            pub fn parse(raw: &str) -> Option<Self> {
                raw.trim().parse::<i64>().ok().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(RowId);
entity_id!(ProductId);

#[cfg(test)]
mod tests {
    use super::{ProductId, RowId};

    #[test]
    fn parse_trims_control_text() {
        assert_eq!(RowId::parse(" 42 "), Some(RowId::new(42)));
        assert_eq!(ProductId::parse("7"), Some(ProductId::new(7)));
    }

    #[test]
    fn parse_rejects_non_numeric_text() {
        assert_eq!(RowId::parse(""), None);
        assert_eq!(RowId::parse("forty-two"), None);
    }

    #[test]
    fn ids_serialize_as_bare_integers() -> anyhow::Result<()> {
        assert_eq!(serde_json::to_string(&RowId::new(42))?, "42");
        Ok(())
    }
}
