//! # SIP Via Header Field
//!
//! One Via entry ([RFC 3261 Section 20.42](https://datatracker.ietf.org/doc/html/rfc3261#section-20.42)):
//! the sent-protocol, the sent-by host/port, and the parameter list. A
//! wire `Via:` line may carry several comma-separated entries; each entry
//! is one value of this type inside its header list.
//!
//! The `branch` parameter identifies the transaction this hop belongs to.
//! Only branches carrying the RFC 3261 magic cookie prefix are globally
//! unique and usable for transaction matching; [`Via::matchable_branch`]
//! applies that gate.
//!
//! # Examples
//!
//! ```rust
//! use bytes::Bytes;
//! use sipmsg::types::Via;
//!
//! let span = Bytes::from_static(b"SIP/2.0/UDP pc33.atlanta.com:5060;branch=z9hG4bK776asdhds");
//! let via = Via::parse(&span).unwrap();
//! assert_eq!(via.transport(), b"UDP");
//! assert_eq!(via.port(), Some(5060));
//! assert_eq!(via.matchable_branch(), Some(&b"z9hG4bK776asdhds"[..]));
//! ```

use std::fmt;
use std::io;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::parser::listener::{ElementContext, ElementId, HeaderListener, ScanControl};
use crate::types::param::Param;
use crate::types::params::Params;

/// RFC 3261 magic cookie: a branch with this prefix is guaranteed
/// globally unique and may be used as a transaction identifier.
pub const MAGIC_COOKIE: &[u8] = b"z9hG4bK";

/// A single Via entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Via {
    /// Sent-protocol name/version, e.g. `SIP/2.0`
    protocol: Bytes,
    /// Transport token, e.g. `UDP`
    transport: Bytes,
    /// Sent-by host, verbatim (IPv6 references keep their brackets)
    host: Bytes,
    port: Option<u16>,
    params: Params,
}

impl Via {
    /// Parses one Via entry span.
    pub fn parse(span: &Bytes) -> Result<Self> {
        let mut builder = ViaBuilder::default();
        crate::parser::headers::parse_via_instance(span, span, &mut builder)?;
        builder.finish()
    }

    pub fn protocol(&self) -> &[u8] {
        &self.protocol
    }

    pub fn transport(&self) -> &[u8] {
        &self.transport
    }

    pub fn host(&self) -> &[u8] {
        &self.host
    }

    pub fn host_bytes(&self) -> &Bytes {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }

    /// The raw branch parameter, if any.
    pub fn branch(&self) -> Option<&[u8]> {
        self.params.get(b"branch")
    }

    /// The branch parameter, but only when it carries the magic cookie
    /// prefix; anything else is treated as absent for matching purposes.
    pub fn matchable_branch(&self) -> Option<&[u8]> {
        self.branch().filter(|b| b.starts_with(MAGIC_COOKIE))
    }

    /// Writes `protocol/transport host[:port][params]`.
    pub fn write<W: io::Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&self.protocol)?;
        w.write_all(b"/")?;
        w.write_all(&self.transport)?;
        w.write_all(b" ")?;
        w.write_all(&self.host)?;
        if let Some(port) = self.port {
            write!(w, ":{port}")?;
        }
        self.params.write(w)?;
        Ok(())
    }
}

impl fmt::Display for Via {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = Vec::new();
        self.write(&mut out).map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&out))
    }
}

/// Listener-driven builder; the Via grammar pushes elements and
/// parameters here during the scan.
#[derive(Debug, Default)]
pub struct ViaBuilder {
    protocol: Option<Bytes>,
    transport: Option<Bytes>,
    host: Option<Bytes>,
    port: Option<u16>,
    params: Params,
}

impl ViaBuilder {
    pub fn finish(self) -> Result<Via> {
        Ok(Via {
            protocol: self.protocol.ok_or_else(|| Error::parser("Via: missing protocol"))?,
            transport: self
                .transport
                .ok_or_else(|| Error::parser("Via: missing transport"))?,
            host: self.host.ok_or_else(|| Error::parser("Via: missing sent-by host"))?,
            port: self.port,
            params: self.params,
        })
    }
}

impl HeaderListener for ViaBuilder {
    fn element(&mut self, _ctx: ElementContext, id: ElementId, span: Bytes) -> Result<ScanControl> {
        match id {
            ElementId::Protocol => self.protocol = Some(span),
            ElementId::Transport => self.transport = Some(span),
            ElementId::Host => self.host = Some(span),
            ElementId::Port => {
                let text = std::str::from_utf8(&span)
                    .map_err(|_| Error::parser("Via: non-ASCII port"))?;
                self.port = Some(
                    text.parse::<u16>()
                        .map_err(|_| Error::parser(format!("Via: invalid port {text:?}")))?,
                );
            }
            _ => {}
        }
        Ok(ScanControl::Continue)
    }

    fn parameter(&mut self, _ctx: ElementContext, name: Bytes, value: Bytes) -> Result<ScanControl> {
        self.params.append(Param::from_spans(name, value));
        Ok(ScanControl::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_entry() {
        let span = Bytes::from_static(b"SIP/2.0/TCP [2001:db8::1]:5061;branch=z9hG4bKabc;rport");
        let via = Via::parse(&span).unwrap();
        assert_eq!(via.protocol(), b"SIP/2.0");
        assert_eq!(via.transport(), b"TCP");
        assert_eq!(via.host(), b"[2001:db8::1]");
        assert_eq!(via.port(), Some(5061));
        assert!(via.params().contains(b"rport"));
    }

    #[test]
    fn test_round_trip() {
        let text = b"SIP/2.0/UDP pc33.atlanta.com:5060;branch=z9hG4bK776asdhds";
        let via = Via::parse(&Bytes::from_static(text)).unwrap();
        let mut out = Vec::new();
        via.write(&mut out).unwrap();
        assert_eq!(out, text);
    }

    #[test]
    fn test_branch_cookie_gate() {
        let with = Via::parse(&Bytes::from_static(b"SIP/2.0/UDP h;branch=z9hG4bK1")).unwrap();
        assert!(with.matchable_branch().is_some());

        let without = Via::parse(&Bytes::from_static(b"SIP/2.0/UDP h;branch=old2543")).unwrap();
        assert_eq!(without.branch(), Some(&b"old2543"[..]));
        assert_eq!(without.matchable_branch(), None);
    }

    #[test]
    fn test_missing_transport_rejected() {
        assert!(Via::parse(&Bytes::from_static(b"SIP/2.0 host")).is_err());
    }
}
