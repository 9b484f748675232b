//! # SIP Parameters
//!
//! A parameter is a `name` / `value` pair as it appears in `;name=value`
//! lists attached to headers and URIs ([RFC 3261](https://datatracker.ietf.org/doc/html/rfc3261)).
//! Both sides are byte spans into the original message buffer; parsing a
//! parameter never copies the underlying text.
//!
//! An empty value represents a bare flag parameter (`;lr`). Parameter
//! names compare case-insensitively; values compare byte-exact.
//!
//! # Examples
//!
//! ```rust
//! use sipmsg::types::Param;
//!
//! let p = Param::new("transport", "tcp");
//! assert_eq!(p.to_string(), "transport=tcp");
//!
//! let flag = Param::flag("lr");
//! assert!(flag.is_flag());
//! assert_eq!(flag.to_string(), "lr");
//! ```

use std::fmt;
use std::io;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A single `name[=value]` parameter over byte spans.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct Param {
    name: Bytes,
    value: Bytes,
}

impl Param {
    /// Creates an owned parameter from textual name and value.
    pub fn new(name: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        Param {
            name: Bytes::copy_from_slice(name.as_ref()),
            value: Bytes::copy_from_slice(value.as_ref()),
        }
    }

    /// Creates a bare flag parameter (no value).
    pub fn flag(name: impl AsRef<[u8]>) -> Self {
        Param::new(name, b"")
    }

    /// Builds a parameter directly from spans of a message buffer.
    pub fn from_spans(name: Bytes, value: Bytes) -> Self {
        Param { name, value }
    }

    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn value_bytes(&self) -> &Bytes {
        &self.value
    }

    /// True when the parameter renders as a bare flag.
    pub fn is_flag(&self) -> bool {
        self.value.is_empty()
    }

    /// Case-insensitive name comparison.
    pub fn name_is(&self, name: &[u8]) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Writes `name["=" value]` to a sink.
    pub fn write<W: io::Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&self.name)?;
        if !self.value.is_empty() {
            w.write_all(b"=")?;
            w.write_all(&self.value)?;
        }
        Ok(())
    }
}

impl PartialEq for Param {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name) && self.value == other.value
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = Vec::with_capacity(self.name.len() + self.value.len() + 1);
        self.write(&mut out).map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Param::new("a", "1").to_string(), "a=1");
        assert_eq!(Param::flag("lr").to_string(), "lr");
    }

    #[test]
    fn test_name_case_insensitive_eq() {
        assert_eq!(Param::new("Branch", "z9"), Param::new("branch", "z9"));
        assert_ne!(Param::new("branch", "z9"), Param::new("branch", "Z9"));
    }
}
