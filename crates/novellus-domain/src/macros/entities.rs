//! Entity and value-object macros.
//!
//! Used by `entities/` and `value_objects/` modules.

/// Define a strong-typed UUID identifier for a domain entity.
///
/// Generates a newtype struct wrapping `uuid::Uuid` with full trait
/// implementations including `Display`, `FromStr`, `Serialize`,
/// `Deserialize`, and deterministic v5 UUID derivation via `from_name`.
#[macro_export]
macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            derive_more::Display,
            derive_more::From,
            derive_more::Into,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[display("{_0}")]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Generate a new random UUID v4 identifier.
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Wrap an existing [`uuid::Uuid`].
            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Derive a deterministic v5 UUID from a human-readable name.
            ///
            /// The namespace is scoped per type so `RecordId::from_name("x")`
            /// and `ChainId::from_name("x")` produce different UUIDs.
            pub fn from_name(name: &str) -> Self {
                let ns =
                    uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, stringify!($name).as_bytes());
                Self(uuid::Uuid::new_v5(&ns, name.as_bytes()))
            }

            /// Parse from any string: tries UUID first, falls back to `from_name`.
            pub fn from_string(s: &str) -> Self {
                match uuid::Uuid::parse_str(s) {
                    Ok(u) => Self(u),
                    Err(_) => Self::from_name(s),
                }
            }

            /// Hyphenated UUID string (allocates).
            pub fn as_str(&self) -> String {
                self.0.to_string()
            }

            /// Access the inner [`uuid::Uuid`].
            pub fn inner(&self) -> uuid::Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0.to_string()
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s).map(Self)
            }
        }

        impl AsRef<uuid::Uuid> for $name {
            fn as_ref(&self) -> &uuid::Uuid {
                &self.0
            }
        }
    };
}

/// Implement `FromStr` for an enum from a fixed set of string aliases.
#[macro_export]
macro_rules! impl_from_str {
    ($name:ident, $err:literal, { $($alias:literal => $variant:expr),* $(,)? }) => {
        impl std::str::FromStr for $name {
            type Err = $crate::error::Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($alias => Ok($variant),)*
                    other => Err($crate::error::Error::invalid_argument(format!(
                        $err, other
                    ))),
                }
            }
        }
    };
}
