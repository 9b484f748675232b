//! # Address header fields (To / From / Contact / Route)
//!
//! The `name-addr` / `addr-spec` shape shared by the address-bearing
//! headers: an optional display name, a URI, and trailing parameters.
//! The URI itself stays an opaque span; the URI object model belongs to
//! a higher layer; this core only needs the address's parameters (the To
//! tag in particular) and byte-faithful re-serialization.
//!
//! # Examples
//!
//! ```rust
//! use bytes::Bytes;
//! use sipmsg::types::NameAddr;
//!
//! let span = Bytes::from_static(b"\"Bob\" <sip:bob@biloxi.com>;tag=a6c85cf");
//! let to = NameAddr::parse(&span).unwrap();
//! assert_eq!(to.uri(), b"sip:bob@biloxi.com");
//! assert_eq!(to.tag(), Some(&b"a6c85cf"[..]));
//! ```

use std::fmt;
use std::io;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::parser::listener::{ElementContext, ElementId, HeaderListener, ScanControl};
use crate::types::param::Param;
use crate::types::params::Params;

/// An address header value: `[display] <uri>;params` or `uri;params`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameAddr {
    /// Display name, verbatim (quotes preserved when quoted)
    display_name: Option<Bytes>,
    /// The addr-spec, without angle brackets
    uri: Bytes,
    /// Whether the wire form used angle brackets
    bracketed: bool,
    params: Params,
}

impl NameAddr {
    /// Parses one address span.
    pub fn parse(span: &Bytes) -> Result<Self> {
        let mut builder = NameAddrBuilder::default();
        crate::parser::headers::parse_name_addr_instance(span, span, &mut builder)?;
        builder.finish()
    }

    pub fn display_name(&self) -> Option<&[u8]> {
        self.display_name.as_deref()
    }

    pub fn uri(&self) -> &[u8] {
        &self.uri
    }

    /// Whether the wire form used angle brackets around the URI.
    pub fn is_bracketed(&self) -> bool {
        self.bracketed
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }

    /// The `tag` parameter distinguishing dialog instances.
    pub fn tag(&self) -> Option<&[u8]> {
        self.params.get(b"tag")
    }

    pub fn tag_bytes(&self) -> Option<Bytes> {
        self.params
            .iter()
            .find(|p| p.name_is(b"tag"))
            .map(|p| p.value_bytes().clone())
    }

    pub fn write<W: io::Write>(&self, w: &mut W) -> Result<()> {
        if self.bracketed {
            if let Some(display) = &self.display_name {
                w.write_all(display)?;
                w.write_all(b" ")?;
            }
            w.write_all(b"<")?;
            w.write_all(&self.uri)?;
            w.write_all(b">")?;
        } else {
            w.write_all(&self.uri)?;
        }
        self.params.write(w)?;
        Ok(())
    }
}

impl fmt::Display for NameAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = Vec::new();
        self.write(&mut out).map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&out))
    }
}

#[derive(Debug, Default)]
pub struct NameAddrBuilder {
    display_name: Option<Bytes>,
    uri: Option<Bytes>,
    bracketed: bool,
    params: Params,
}

impl NameAddrBuilder {
    pub fn finish(self) -> Result<NameAddr> {
        Ok(NameAddr {
            display_name: self.display_name,
            uri: self.uri.ok_or_else(|| Error::parser("address: missing URI"))?,
            bracketed: self.bracketed,
            params: self.params,
        })
    }
}

impl HeaderListener for NameAddrBuilder {
    fn element(&mut self, _ctx: ElementContext, id: ElementId, span: Bytes) -> Result<ScanControl> {
        match id {
            ElementId::DisplayName => self.display_name = Some(span),
            ElementId::Uri => {
                // The Uri element arrives verbatim; brackets tell us which
                // wire form to reproduce.
                if span.len() >= 2 && span.first() == Some(&b'<') && span.last() == Some(&b'>') {
                    self.bracketed = true;
                    self.uri = Some(span.slice(1..span.len() - 1));
                } else {
                    self.uri = Some(span);
                }
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
