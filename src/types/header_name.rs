//! # SIP Header Names
//!
//! The header-name registry: canonical names, compact forms, and the
//! stable one-byte dictionary codes used by the compact "token" wire
//! encoding. Header names are case-insensitive in SIP; parsing preserves
//! the canonical capitalization for known headers and keeps unknown names
//! verbatim in the `Other` variant.
//!
//! # Examples
//!
//! ```rust
//! use sipmsg::types::HeaderName;
//! use std::str::FromStr;
//!
//! assert_eq!(HeaderName::from_str("v").unwrap(), HeaderName::Via);
//! assert_eq!(HeaderName::Via.as_str(), "Via");
//! assert_eq!(HeaderName::Via.compact(), Some("v"));
//!
//! let custom = HeaderName::from_str("X-Trace").unwrap();
//! assert_eq!(custom, HeaderName::Other("X-Trace".to_string()));
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Common SIP header names plus a catch-all for extension headers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeaderName {
    /// Via: path taken by the request so far
    Via,
    /// From: initiator of the request
    From,
    /// To: logical recipient of the request
    To,
    /// Call-ID: unique identifier for this call
    CallId,
    /// CSeq: command sequence number
    CSeq,
    /// Contact: where subsequent requests should be sent
    Contact,
    /// Max-Forwards: limit on the number of proxies or gateways
    MaxForwards,
    /// Content-Length: size of the message body
    ContentLength,
    /// Content-Type: media type of the message body
    ContentType,
    /// Route: forced route for a request
    Route,
    /// Record-Route: proxies that want to stay in the path
    RecordRoute,
    /// Expires: expiration time for registration or subscription
    Expires,
    /// Allow: methods supported by the UA
    Allow,
    /// Supported: features supported by the UA
    Supported,
    /// Require: required capabilities for the request
    Require,
    /// User-Agent: product information
    UserAgent,
    /// Subject: subject of the message
    Subject,
    /// Event: event package for SUBSCRIBE/NOTIFY
    Event,
    /// RAck: acknowledge a reliable provisional response
    RAck,
    /// RSeq: response sequence number (RFC 3262)
    RSeq,
    /// Custom header name
    Other(String),
}

/// Dictionary table for the token encoding: (variant, code, canonical,
/// compact form). Codes are stable wire bytes and must never be reused.
const REGISTRY: &[(HeaderName, u8, &str, Option<&str>)] = &[
    (HeaderName::Via, 0x01, "Via", Some("v")),
    (HeaderName::From, 0x02, "From", Some("f")),
    (HeaderName::To, 0x03, "To", Some("t")),
    (HeaderName::CallId, 0x04, "Call-ID", Some("i")),
    (HeaderName::CSeq, 0x05, "CSeq", None),
    (HeaderName::Contact, 0x06, "Contact", Some("m")),
    (HeaderName::MaxForwards, 0x07, "Max-Forwards", None),
    (HeaderName::ContentLength, 0x08, "Content-Length", Some("l")),
    (HeaderName::ContentType, 0x09, "Content-Type", Some("c")),
    (HeaderName::Route, 0x0A, "Route", None),
    (HeaderName::RecordRoute, 0x0B, "Record-Route", None),
    (HeaderName::Expires, 0x0C, "Expires", None),
    (HeaderName::Allow, 0x0D, "Allow", None),
    (HeaderName::Supported, 0x0E, "Supported", Some("k")),
    (HeaderName::Require, 0x0F, "Require", None),
    (HeaderName::UserAgent, 0x10, "User-Agent", None),
    (HeaderName::Subject, 0x11, "Subject", Some("s")),
    (HeaderName::Event, 0x12, "Event", Some("o")),
    (HeaderName::RAck, 0x13, "RAck", None),
    (HeaderName::RSeq, 0x14, "RSeq", None),
];

impl HeaderName {
    /// Returns the canonical name of the header.
    pub fn as_str(&self) -> &str {
        match self {
            HeaderName::Other(s) => s,
            known => {
                for (name, _, canonical, _) in REGISTRY {
                    if name == known {
                        return *canonical;
                    }
                }
                unreachable!("known header missing from registry")
            }
        }
    }

    /// Returns the single-letter compact form, if the header has one.
    pub fn compact(&self) -> Option<&str> {
        for (name, _, _, compact) in REGISTRY {
            if name == self {
                return *compact;
            }
        }
        None
    }

    /// Stable dictionary code for the token encoding; `None` for
    /// extension headers (which are escape-encoded by name).
    pub fn token_code(&self) -> Option<u8> {
        for (name, code, _, _) in REGISTRY {
            if name == self {
                return Some(*code);
            }
        }
        None
    }

    /// Whether a single wire line of this header may combine several
    /// comma-separated instances (RFC 3261 section 7.3.1). Extension
    /// headers follow the multi-value combining rule.
    pub fn comma_separable(&self) -> bool {
        matches!(
            self,
            HeaderName::Via
                | HeaderName::Contact
                | HeaderName::Route
                | HeaderName::RecordRoute
                | HeaderName::Allow
                | HeaderName::Supported
                | HeaderName::Require
                | HeaderName::Other(_)
        )
    }

    /// Reverse lookup for token decoding.
    pub fn from_token_code(code: u8) -> Option<HeaderName> {
        for (name, c, _, _) in REGISTRY {
            if *c == code {
                return Some(name.clone());
            }
        }
        None
    }
}

impl fmt::Display for HeaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HeaderName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::parser("empty header name is not allowed"));
        }
        let lower = s.to_ascii_lowercase();
        for (name, _, canonical, compact) in REGISTRY {
            if canonical.eq_ignore_ascii_case(&lower) || *compact == Some(lower.as_str()) {
                return Ok(name.clone());
            }
        }
        Ok(HeaderName::Other(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_and_compact_lookup() {
        assert_eq!(HeaderName::from_str("Via").unwrap(), HeaderName::Via);
        assert_eq!(HeaderName::from_str("VIA").unwrap(), HeaderName::Via);
        assert_eq!(HeaderName::from_str("v").unwrap(), HeaderName::Via);
        assert_eq!(HeaderName::from_str("cseq").unwrap(), HeaderName::CSeq);
        assert_eq!(HeaderName::from_str("i").unwrap(), HeaderName::CallId);
    }

    #[test]
    fn test_extension_header_preserved_verbatim() {
        let name = HeaderName::from_str("X-Custom-Header").unwrap();
        assert!(matches!(name, HeaderName::Other(ref s) if s == "X-Custom-Header"));
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(HeaderName::from_str("").is_err());
    }

    #[test]
    fn test_token_codes_unique_and_reversible() {
        let mut seen = std::collections::HashSet::new();
        for (name, code, _, _) in REGISTRY {
            assert!(seen.insert(*code), "duplicate token code {code:#x}");
            assert_eq!(HeaderName::from_token_code(*code).as_ref(), Some(name));
        }
        assert_eq!(HeaderName::Other("X-Foo".into()).token_code(), None);
    }
}
