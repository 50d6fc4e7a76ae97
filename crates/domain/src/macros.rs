//! Macro for implementing Display and FromStr for status enums
//!
//! Queue statuses are persisted as lowercase text, so every status enum needs
//! the same pair of conversions. Parsing is case-insensitive.
//!
//! # Example
//!
//! ```rust
//! use returnsync_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum JobState {
//!     Idle,
//!     Running,
//! }
//!
//! impl_domain_status_conversions!(JobState {
//!     Idle => "idle",
//!     Running => "running",
//! });
//!
//! assert_eq!(JobState::Running.to_string(), "running");
//! assert_eq!("IDLE".parse::<JobState>(), Ok(JobState::Idle));
//! ```

/// Implements Display and FromStr traits for status enums
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their stored string
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Stored representation of the status.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
