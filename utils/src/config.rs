// Parameter tables.
//
// `define_config!` expands a list of `(field: type, "key", default, check)` rows into a
// plain struct with serde support, a `Default` impl, string overrides (`set`) and range
// validation (`validate`). The calling crate must depend on `serde` with `derive`.

use std::fmt::Display;
use std::ops::RangeInclusive;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Unknown parameter: {0}")]
    UnknownKey(String),

    #[error("Parse error for '{key}': {message}")]
    Parse { key: String, message: String },

    #[error("'{key}' = {value} is outside {min}..={max}")]
    OutOfRange {
        key: String,
        value: String,
        min: String,
        max: String,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// A constraint on a single parameter.
pub trait Check<T> {
    fn check(&self, key: &str, value: &T) -> Result<(), ConfigError>;
}

/// Accepts every value.
pub struct Any;

impl<T> Check<T> for Any {
    fn check(&self, _key: &str, _value: &T) -> Result<(), ConfigError> {
        Ok(())
    }
}

impl<T: PartialOrd + Display> Check<T> for RangeInclusive<T> {
    fn check(&self, key: &str, value: &T) -> Result<(), ConfigError> {
        if self.contains(value) {
            Ok(())
        } else {
            Err(ConfigError::OutOfRange {
                key: key.to_string(),
                value: value.to_string(),
                min: self.start().to_string(),
                max: self.end().to_string(),
            })
        }
    }
}

impl<T: Display> Check<Option<T>> for RangeInclusive<T>
where
    T: PartialOrd,
{
    fn check(&self, key: &str, value: &Option<T>) -> Result<(), ConfigError> {
        match value {
            Some(v) => Check::<T>::check(self, key, v),
            None => Ok(()),
        }
    }
}

/// Parses a parameter value given as a string.
///
/// Optional parameters accept `none` to clear the value.
pub fn parse_param<T: ParseParam>(key: &str, value: &str) -> Result<T, ConfigError> {
    T::parse_param(value.trim()).map_err(|message| ConfigError::Parse {
        key: key.to_string(),
        message,
    })
}

pub trait ParseParam: Sized {
    fn parse_param(value: &str) -> Result<Self, String>;
}

macro_rules! impl_parse_param {
    ($($type:ty),*) => {
        $(
            impl ParseParam for $type {
                fn parse_param(value: &str) -> Result<Self, String> {
                    value.parse::<$type>().map_err(|e| e.to_string())
                }
            }

            impl ParseParam for Option<$type> {
                fn parse_param(value: &str) -> Result<Self, String> {
                    if value.eq_ignore_ascii_case("none") {
                        Ok(None)
                    } else {
                        value.parse::<$type>().map(Some).map_err(|e| e.to_string())
                    }
                }
            }
        )*
    };
}

impl_parse_param!(bool, u8, u16, u32, u64, usize, i32, i64, f32, f64);

/// Implements `ParseParam` for a type through its `FromStr` impl.
#[macro_export]
macro_rules! parse_param_from_str {
    ($($type:ty),* $(,)?) => {
        $(
            impl $crate::config::ParseParam for $type {
                fn parse_param(value: &str) -> Result<Self, String> {
                    <$type as ::std::str::FromStr>::from_str(value).map_err(|e| e.to_string())
                }
            }
        )*
    };
}

#[macro_export]
macro_rules! define_config {
    (
        $(#[$meta:meta])*
        $name:ident {
            $(
                $(#[$field_meta:meta])*
                ($field:ident: $type:ty, $key:literal, $default:expr, $check:expr)
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        pub struct $name {
            $(
                $(#[$field_meta])*
                pub $field: $type,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $($field: $default,)*
                }
            }
        }

        impl $name {
            /// Names of all parameters, in declaration order.
            pub const KEYS: &'static [&'static str] = &[$($key),*];

            /// Overrides a single parameter from its string form and re-validates.
            pub fn set(&mut self, key: &str, value: &str) -> Result<(), $crate::config::ConfigError> {
                let mut candidate = self.clone();
                match key {
                    $($key => candidate.$field = $crate::config::parse_param(key, value)?,)*
                    _ => return Err($crate::config::ConfigError::UnknownKey(key.to_string())),
                }
                candidate.validate()?;
                *self = candidate;
                Ok(())
            }

            /// Checks every parameter against its declared range.
            pub fn validate(&self) -> Result<(), $crate::config::ConfigError> {
                $(
                    $crate::config::Check::check(&$check, $key, &self.$field)?;
                )*
                Ok(())
            }
        }
    };
}

/// Splits a `key=value` override.
pub fn split_override(text: &str) -> Result<(&str, &str), ConfigError> {
    text.split_once('=')
        .map(|(key, value)| (key.trim(), value.trim()))
        .ok_or_else(|| ConfigError::Parse {
            key: text.to_string(),
            message: "expected key=value".to_string(),
        })
}
