//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a tenant (isolation boundary between logistics operators).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Uuid);

/// Identifier of an aggregate root (one event stream).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateId(Uuid);

macro_rules! impl_uuid_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

impl_uuid_newtype!(TenantId, "TenantId");
impl_uuid_newtype!(AggregateId, "AggregateId");

impl AggregateId {
    /// Deterministic id derived from another stream and a position in it.
    ///
    /// Used by reactors so that a redelivered source event maps onto the same
    /// target stream.
    pub fn derived(source: AggregateId, sequence_number: u64) -> Self {
        let name = format!("{}:{}", source.0, sequence_number);
        Self(Uuid::new_v5(&source.0, name.as_bytes()))
    }

    /// Human-facing reference code: `prefix` + the last `len` hex chars, uppercased.
    ///
    /// The tail of a v7 UUID is random, so codes stay distinct for ids minted
    /// within the same millisecond.
    pub fn reference_code(&self, prefix: &str, len: usize) -> String {
        let hex = self.0.simple().to_string().to_uppercase();
        let len = len.min(hex.len());
        format!("{prefix}{}", &hex[hex.len() - len..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_code_uses_prefix_and_tail() {
        let id = AggregateId::from_uuid(
            Uuid::parse_str("0190c3f2-aaaa-7bbb-8ccc-0123456789ab").unwrap(),
        );
        assert_eq!(id.reference_code("CH", 10), "CH23456789AB");
        assert_eq!(id.reference_code("INV-", 8), "INV-456789AB");
    }

    #[test]
    fn derived_ids_are_stable_per_position() {
        let source = AggregateId::new();
        assert_eq!(AggregateId::derived(source, 3), AggregateId::derived(source, 3));
        assert_ne!(AggregateId::derived(source, 3), AggregateId::derived(source, 4));
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = "not-a-uuid".parse::<TenantId>().unwrap_err();
        assert!(matches!(err, DomainError::InvalidId(_)));
    }
}
