//! # Typed header fields
//!
//! The sum of typed containers a header entry can be promoted to. This
//! core only carries the fields its own algorithms need (Via, the address
//! shape, CSeq); everything else promotes to [`GenericField`], a leading
//! value plus a parameter table. Embedders plug richer containers in via
//! the header factory on [`MessageContext`](crate::context::MessageContext).

use std::fmt;
use std::io;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::context::MessageContext;
use crate::error::Result;
use crate::parser::listener::{ElementContext, ElementId, HeaderListener, ScanControl};
use crate::types::cseq::CSeq;
use crate::types::header_name::HeaderName;
use crate::types::name_addr::NameAddr;
use crate::types::param::Param;
use crate::types::params::Params;
use crate::types::via::Via;

/// A promoted, typed header value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypedField {
    Via(Via),
    NameAddr(NameAddr),
    CSeq(CSeq),
    Generic(GenericField),
}

impl TypedField {
    /// Builds a typed value from one instance span by re-running the
    /// tokenizer over it, through the context's header factory.
    pub fn parse(name: &HeaderName, span: &Bytes, ctx: &MessageContext) -> Result<TypedField> {
        ctx.factory().construct(name, span)
    }

    pub fn as_via(&self) -> Option<&Via> {
        match self {
            TypedField::Via(via) => Some(via),
            _ => None,
        }
    }

    pub fn as_name_addr(&self) -> Option<&NameAddr> {
        match self {
            TypedField::NameAddr(addr) => Some(addr),
            _ => None,
        }
    }

    pub fn as_cseq(&self) -> Option<&CSeq> {
        match self {
            TypedField::CSeq(cseq) => Some(cseq),
            _ => None,
        }
    }

    pub fn write<W: io::Write>(&self, w: &mut W) -> Result<()> {
        match self {
            TypedField::Via(via) => via.write(w),
            TypedField::NameAddr(addr) => addr.write(w),
            TypedField::CSeq(cseq) => cseq.write(w),
            TypedField::Generic(generic) => generic.write(w),
        }
    }
}

impl fmt::Display for TypedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = Vec::new();
        self.write(&mut out).map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&out))
    }
}

/// Fallback container for headers without a dedicated type: the leading
/// value span and the trailing parameter table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericField {
    value: Bytes,
    params: Params,
}

impl GenericField {
    /// Parses one generic `value;params` instance span.
    pub fn parse(span: &Bytes) -> Result<Self> {
        let mut builder = GenericBuilder::default();
        crate::parser::headers::parse_generic_instance(span, span, &mut builder)?;
        Ok(builder.finish())
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }

    pub fn write<W: io::Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&self.value)?;
        self.params.write(w)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct GenericBuilder {
    value: Bytes,
    params: Params,
}

impl GenericBuilder {
    pub fn finish(self) -> GenericField {
        GenericField {
            value: self.value,
            params: self.params,
        }
    }
}

impl HeaderListener for GenericBuilder {
    fn element(&mut self, _ctx: ElementContext, id: ElementId, span: Bytes) -> Result<ScanControl> {
        if id == ElementId::Value {
            self.value = span;
        }
        Ok(ScanControl::Continue)
    }

    fn parameter(&mut self, _ctx: ElementContext, name: Bytes, value: Bytes) -> Result<ScanControl> {
        self.params.append(Param::from_spans(name, value));
        Ok(ScanControl::Continue)
    }
}
