//! # CSeq Header Field
//!
//! Sequence number plus method ([RFC 3261 Section 20.16](https://datatracker.ietf.org/doc/html/rfc3261#section-20.16)).
//! The method half is what transaction matching keys off.

use std::fmt;
use std::io;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::parser::listener::{ElementContext, ElementId, HeaderListener, ScanControl};
use crate::types::method::Method;

/// A CSeq value, e.g. `314159 INVITE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CSeq {
    seq: u32,
    method: Method,
}

impl CSeq {
    pub fn new(seq: u32, method: Method) -> Self {
        CSeq { seq, method }
    }

    /// Parses one CSeq span.
    pub fn parse(span: &Bytes) -> Result<Self> {
        let mut builder = CSeqBuilder::default();
        crate::parser::headers::parse_cseq_instance(span, span, &mut builder)?;
        builder.finish()
    }

    pub fn seq(&self) -> u32 {
        self.seq
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn write<W: io::Write>(&self, w: &mut W) -> Result<()> {
        write!(w, "{} {}", self.seq, self.method)?;
        Ok(())
    }
}

impl fmt::Display for CSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.seq, self.method)
    }
}

#[derive(Debug, Default)]
pub struct CSeqBuilder {
    seq: Option<u32>,
    method: Option<Method>,
}

impl CSeqBuilder {
    pub fn finish(self) -> Result<CSeq> {
        Ok(CSeq {
            seq: self.seq.ok_or_else(|| Error::parser("CSeq: missing sequence number"))?,
            method: self.method.ok_or_else(|| Error::parser("CSeq: missing method"))?,
        })
    }
}

impl HeaderListener for CSeqBuilder {
    fn element(&mut self, _ctx: ElementContext, id: ElementId, span: Bytes) -> Result<ScanControl> {
        match id {
            ElementId::Sequence => {
                let text = std::str::from_utf8(&span)
                    .map_err(|_| Error::parser("CSeq: non-ASCII sequence"))?;
                self.seq = Some(
                    text.parse::<u32>()
                        .map_err(|_| Error::parser(format!("CSeq: invalid sequence {text:?}")))?,
                );
            }
            ElementId::Method => {
                let text = std::str::from_utf8(&span)
                    .map_err(|_| Error::parser("CSeq: non-ASCII method"))?;
                self.method = Some(Method::from_str(text)?);
            }
            _ => {}
        }
        Ok(ScanControl::Continue)
    }
}
