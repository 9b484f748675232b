//! # SIP Request Methods
//!
//! Method names as defined in [RFC 3261](https://datatracker.ietf.org/doc/html/rfc3261)
//! and its common extensions (PRACK from RFC 3262, UPDATE from RFC 3311,
//! the SIP events and messaging methods). Unknown but syntactically valid
//! method tokens are preserved through the `Extension` variant.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A SIP request method.
///
/// # Examples
///
/// ```rust
/// use sipmsg::types::Method;
/// use std::str::FromStr;
///
/// assert_eq!(Method::from_str("INVITE").unwrap(), Method::Invite);
/// assert_eq!(Method::Invite.as_str(), "INVITE");
///
/// let custom = Method::from_str("PUBLISH2").unwrap();
/// assert!(matches!(custom, Method::Extension(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    /// INVITE: initiate a session
    Invite,
    /// ACK: acknowledge a final response to INVITE
    Ack,
    /// BYE: terminate a session
    Bye,
    /// CANCEL: cancel a pending request
    Cancel,
    /// OPTIONS: query capabilities
    Options,
    /// REGISTER: register contact information
    Register,
    /// PRACK: acknowledge a reliable provisional response (RFC 3262)
    Prack,
    /// UPDATE: modify session state before answer (RFC 3311)
    Update,
    /// INFO: mid-session information (RFC 6086)
    Info,
    /// SUBSCRIBE: request event notification (RFC 6665)
    Subscribe,
    /// NOTIFY: deliver an event notification (RFC 6665)
    Notify,
    /// MESSAGE: instant message (RFC 3428)
    Message,
    /// REFER: ask the recipient to issue a request (RFC 3515)
    Refer,
    /// An extension method token
    Extension(String),
}

impl Method {
    /// Returns the canonical (upper-case) method token.
    pub fn as_str(&self) -> &str {
        match self {
            Method::Invite => "INVITE",
            Method::Ack => "ACK",
            Method::Bye => "BYE",
            Method::Cancel => "CANCEL",
            Method::Options => "OPTIONS",
            Method::Register => "REGISTER",
            Method::Prack => "PRACK",
            Method::Update => "UPDATE",
            Method::Info => "INFO",
            Method::Subscribe => "SUBSCRIBE",
            Method::Notify => "NOTIFY",
            Method::Message => "MESSAGE",
            Method::Refer => "REFER",
            Method::Extension(s) => s,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::parser("empty method token"));
        }
        // Method tokens are case-sensitive per RFC 3261, and the standard
        // ones are upper-case on the wire.
        Ok(match s {
            "INVITE" => Method::Invite,
            "ACK" => Method::Ack,
            "BYE" => Method::Bye,
            "CANCEL" => Method::Cancel,
            "OPTIONS" => Method::Options,
            "REGISTER" => Method::Register,
            "PRACK" => Method::Prack,
            "UPDATE" => Method::Update,
            "INFO" => Method::Info,
            "SUBSCRIBE" => Method::Subscribe,
            "NOTIFY" => Method::Notify,
            "MESSAGE" => Method::Message,
            "REFER" => Method::Refer,
            other => {
                if !other.bytes().all(crate::parser::common::is_token_char) {
                    return Err(Error::parser(format!("invalid method token: {other:?}")));
                }
                Method::Extension(other.to_string())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_round_trip() {
        for m in ["INVITE", "ACK", "CANCEL", "PRACK", "REGISTER"] {
            assert_eq!(Method::from_str(m).unwrap().as_str(), m);
        }
    }

    #[test]
    fn test_extension_method() {
        let m = Method::from_str("PUBLISH").unwrap();
        assert_eq!(m, Method::Extension("PUBLISH".to_string()));
    }

    #[test]
    fn test_invalid_method() {
        assert!(Method::from_str("").is_err());
        assert!(Method::from_str("IN VITE").is_err());
    }
}
