//! # SIP messages
//!
//! The message object: a request or response start line, the header
//! lists in wire order, and the body span. Parsing stores every header
//! as a span and defers everything else; the only headers tokenized in
//! depth during the initial scan are the ones the transaction key needs,
//! and only when a key is requested.
//!
//! # Examples
//!
//! ```rust
//! use bytes::Bytes;
//! use sipmsg::context::MessageContext;
//! use sipmsg::types::{HeaderName, SipMessage};
//!
//! let raw = Bytes::from_static(
//!     b"OPTIONS sip:carol@chicago.com SIP/2.0\r\n\
//!       Via: SIP/2.0/UDP pc33.atlanta.com;branch=z9hG4bKhjhs8ass877\r\n\
//!       To: <sip:carol@chicago.com>\r\n\
//!       CSeq: 63104 OPTIONS\r\n\
//!       \r\n",
//! );
//! let ctx = MessageContext::new();
//! let mut msg = SipMessage::parse(&raw, &ctx).unwrap();
//!
//! let via = msg.header_mut(&HeaderName::Via).unwrap();
//! let first = via.first(&ctx).unwrap().unwrap();
//! assert_eq!(first.as_via().unwrap().branch(), Some(&b"z9hG4bKhjhs8ass877"[..]));
//! ```

use std::io;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::context::MessageContext;
use crate::error::{Error, Result};
use crate::parser::headers::split_instances;
use crate::parser::listener::{
    ElementContext, ElementId, HeaderInterest, HeaderListener, MessageListener, ScanControl,
};
use crate::transaction::{TransactionKey, TransactionKeyBuilder};
use crate::types::header::HeaderList;
use crate::types::header_name::HeaderName;
use crate::types::method::Method;

/// Request-line or status-line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartLine {
    Request {
        method: Method,
        /// Request-URI span, verbatim.
        uri: Bytes,
    },
    Response {
        status: u16,
        /// Reason phrase span; may be empty.
        reason: Bytes,
    },
}

impl StartLine {
    pub fn is_request(&self) -> bool {
        matches!(self, StartLine::Request { .. })
    }

    pub fn write<W: io::Write>(&self, w: &mut W) -> Result<()> {
        match self {
            StartLine::Request { method, uri } => {
                write!(w, "{method} ")?;
                w.write_all(uri)?;
                w.write_all(b" SIP/2.0")?;
            }
            StartLine::Response { status, reason } => {
                write!(w, "SIP/2.0 {status}")?;
                if !reason.is_empty() {
                    w.write_all(b" ")?;
                    w.write_all(reason)?;
                }
            }
        }
        Ok(())
    }
}

/// A parsed SIP message: start line, header lists in wire order, body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SipMessage {
    start: StartLine,
    headers: Vec<HeaderList>,
    body: Bytes,
}

impl SipMessage {
    /// Parses a message buffer. All headers are stored as spans; nothing
    /// is tokenized in depth.
    pub fn parse(buf: &Bytes, ctx: &MessageContext) -> Result<SipMessage> {
        let mut collector = MessageCollector::new(ctx, None);
        crate::parser::message::parse_message(buf, &mut collector)?;
        collector.finish()
    }

    /// Parses a message buffer and extracts the transaction key in the
    /// same single pass: the scan tokenizes exactly Via, To, and CSeq in
    /// depth and feeds the key builder as a second listener.
    pub fn parse_with_key(
        buf: &Bytes,
        ctx: &MessageContext,
    ) -> Result<(SipMessage, TransactionKey)> {
        let mut key = TransactionKeyBuilder::default();
        let mut collector = MessageCollector::new(ctx, Some(&mut key));
        crate::parser::message::parse_message(buf, &mut collector)?;
        Ok((collector.finish()?, key.finish()))
    }

    /// Builds an empty message shell programmatically.
    pub fn new(start: StartLine) -> SipMessage {
        SipMessage {
            start,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn start(&self) -> &StartLine {
        &self.start
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn set_body(&mut self, body: Bytes) {
        self.body = body;
    }

    /// Header lists in wire (first-seen) order.
    pub fn headers(&self) -> impl Iterator<Item = &HeaderList> {
        self.headers.iter()
    }

    pub fn header(&self, name: &HeaderName) -> Option<&HeaderList> {
        self.headers.iter().find(|l| l.name() == name)
    }

    pub fn header_mut(&mut self, name: &HeaderName) -> Option<&mut HeaderList> {
        self.headers.iter_mut().find(|l| l.name() == name)
    }

    /// The list for `name`, created (unbounded) if absent.
    pub fn header_or_insert(&mut self, name: HeaderName) -> &mut HeaderList {
        if let Some(idx) = self.headers.iter().position(|l| l.name() == &name) {
            &mut self.headers[idx]
        } else {
            self.headers.push(HeaderList::new(name));
            self.headers.last_mut().expect("just pushed")
        }
    }

    /// Derives the transaction key from an already-parsed message by
    /// re-running the tokenizer over the stored Via/To/CSeq spans.
    pub fn transaction_key(&self) -> Result<TransactionKey> {
        let mut builder = TransactionKeyBuilder::default();
        for name in [HeaderName::Via, HeaderName::To, HeaderName::CSeq] {
            if let Some(list) = self.header(&name) {
                for entry in list.iter() {
                    match entry {
                        crate::types::header::HeaderEntry::Raw(span)
                        | crate::types::header::HeaderEntry::Single(span) => {
                            crate::parser::headers::parse_header_value(&name, span, &mut builder)?;
                        }
                        crate::types::header::HeaderEntry::Parsed(field) => {
                            feed_key_from_field(&mut builder, field)?;
                        }
                    }
                }
            }
        }
        Ok(builder.finish())
    }

    /// Serializes to textual wire form, one line per header instance.
    pub fn write_text<W: io::Write>(&self, w: &mut W, ctx: &MessageContext) -> Result<()> {
        self.start.write(w)?;
        w.write_all(b"\r\n")?;
        for list in &self.headers {
            list.write_lines(w, ctx)?;
        }
        w.write_all(b"\r\n")?;
        if !self.body.is_empty() {
            w.write_all(&self.body)?;
        }
        Ok(())
    }

    /// Textual wire bytes as an owned buffer.
    pub fn to_wire(&self, ctx: &MessageContext) -> Result<Bytes> {
        let mut out = Vec::new();
        self.write_text(&mut out, ctx)?;
        Ok(Bytes::from(out))
    }

    /// Empties headers and body for pool reuse, keeping allocated
    /// capacity. The start line is left in place; the next parse-into or
    /// programmatic fill overwrites it.
    pub fn re_init(&mut self) {
        self.headers.clear();
        self.body = Bytes::new();
    }
}

/// Replays a typed field's key-relevant parts into the key builder, for
/// messages whose Via/To/CSeq were already promoted.
fn feed_key_from_field(builder: &mut TransactionKeyBuilder, field: &crate::types::field::TypedField) -> Result<()> {
    use crate::types::field::TypedField;
    match field {
        TypedField::Via(via) => {
            builder.element(
                ElementContext::Via,
                ElementId::Protocol,
                Bytes::copy_from_slice(via.protocol()),
            )?;
            builder.element(ElementContext::Via, ElementId::Host, via.host_bytes().clone())?;
            if let Some(port) = via.port() {
                builder.element(
                    ElementContext::Via,
                    ElementId::Port,
                    Bytes::from(port.to_string()),
                )?;
            }
            for param in via.params().iter() {
                builder.parameter(
                    ElementContext::Via,
                    Bytes::copy_from_slice(param.name()),
                    param.value_bytes().clone(),
                )?;
            }
        }
        TypedField::NameAddr(addr) => {
            for param in addr.params().iter() {
                builder.parameter(
                    ElementContext::NameAddr,
                    Bytes::copy_from_slice(param.name()),
                    param.value_bytes().clone(),
                )?;
            }
        }
        TypedField::CSeq(cseq) => {
            builder.element(
                ElementContext::CSeq,
                ElementId::Method,
                Bytes::from(cseq.method().as_str().to_string()),
            )?;
        }
        TypedField::Generic(_) => {}
    }
    Ok(())
}

/// Builds a [`SipMessage`] from the scan callbacks, optionally feeding a
/// transaction-key builder from the same pass.
struct MessageCollector<'a> {
    start: Option<StartLine>,
    headers: Vec<HeaderList>,
    body: Bytes,
    header_limit: Option<usize>,
    key: Option<&'a mut TransactionKeyBuilder>,
}

impl<'a> MessageCollector<'a> {
    fn new(ctx: &MessageContext, key: Option<&'a mut TransactionKeyBuilder>) -> Self {
        MessageCollector {
            start: None,
            headers: Vec::new(),
            body: Bytes::new(),
            header_limit: ctx.header_limit,
            key,
        }
    }

    fn finish(self) -> Result<SipMessage> {
        Ok(SipMessage {
            start: self
                .start
                .ok_or_else(|| Error::parser("message: scan ended before the start line"))?,
            headers: self.headers,
            body: self.body,
        })
    }
}

impl HeaderListener for MessageCollector<'_> {
    fn element(&mut self, ctx: ElementContext, id: ElementId, span: Bytes) -> Result<ScanControl> {
        match &mut self.key {
            Some(key) => key.element(ctx, id, span),
            None => Ok(ScanControl::Continue),
        }
    }

    fn parameter(&mut self, ctx: ElementContext, name: Bytes, value: Bytes) -> Result<ScanControl> {
        match &mut self.key {
            Some(key) => key.parameter(ctx, name, value),
            None => Ok(ScanControl::Continue),
        }
    }
}

impl MessageListener for MessageCollector<'_> {
    fn message_begin(&mut self, start: &StartLine) -> ScanControl {
        self.start = Some(start.clone());
        ScanControl::Continue
    }

    fn header_begin(&mut self, name: &HeaderName) -> HeaderInterest {
        // Deep tokenization is paid only for the key's headers, and only
        // when a key is being built at all.
        if self.key.is_some()
            && matches!(name, HeaderName::Via | HeaderName::To | HeaderName::CSeq)
        {
            HeaderInterest::Elements
        } else {
            HeaderInterest::Store
        }
    }

    fn header_value(&mut self, name: &HeaderName, span: Bytes) {
        let limit = self.header_limit;
        let list = match self.headers.iter_mut().find(|l| l.name() == name) {
            Some(list) => list,
            None => {
                let list = match limit {
                    Some(l) => HeaderList::with_limit(name.clone(), l),
                    None => HeaderList::new(name.clone()),
                };
                self.headers.push(list);
                self.headers.last_mut().expect("just pushed")
            }
        };
        // The tokenizer ingests split instances; combined text on one
        // wire line becomes one entry per instance.
        for instance in split_instances(name, &span) {
            list.ingest(instance);
        }
    }

    fn body(&mut self, span: Bytes) {
        self.body = span;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invite() -> Bytes {
        Bytes::from_static(
            b"INVITE sip:bob@biloxi.com SIP/2.0\r\n\
              Via: SIP/2.0/UDP pc33.atlanta.com:5060;branch=z9hG4bK776asdhds\r\n\
              Max-Forwards: 70\r\n\
              To: Bob <sip:bob@biloxi.com>\r\n\
              From: Alice <sip:alice@atlanta.com>;tag=1928301774\r\n\
              Call-ID: a84b4c76e66710@pc33.atlanta.com\r\n\
              CSeq: 314159 INVITE\r\n\
              Route: <sip:p1.example.com;lr>, <sip:p2.example.com;lr>\r\n\
              \r\n",
        )
    }

    #[test]
    fn test_parse_stores_headers_in_wire_order() {
        let ctx = MessageContext::new();
        let msg = SipMessage::parse(&invite(), &ctx).unwrap();
        let names: Vec<&str> = msg.headers().map(|l| l.name().as_str()).collect();
        assert_eq!(
            names,
            ["Via", "Max-Forwards", "To", "From", "Call-ID", "CSeq", "Route"]
        );
    }

    #[test]
    fn test_combined_wire_line_ingests_split() {
        let ctx = MessageContext::new();
        let msg = SipMessage::parse(&invite(), &ctx).unwrap();
        assert_eq!(msg.header(&HeaderName::Route).unwrap().len(), 2);
    }

    #[test]
    fn test_header_limit_applies_to_parse() {
        let ctx = MessageContext::new().with_header_limit(1);
        let msg = SipMessage::parse(&invite(), &ctx).unwrap();
        assert_eq!(msg.header(&HeaderName::Route).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_with_key_single_pass() {
        let ctx = MessageContext::new();
        let (msg, key) = SipMessage::parse_with_key(&invite(), &ctx).unwrap();
        assert_eq!(key.branch(), Some(&b"z9hG4bK776asdhds"[..]));
        assert_eq!(key.method(), Some(&Method::Invite));
        assert_eq!(key.source_host(), Some(&b"pc33.atlanta.com"[..]));
        assert_eq!(key.source_port(), Some(5060));
        // To has no tag on an initial INVITE.
        assert_eq!(key.to_tag(), None);
        // The headers are still stored as spans.
        assert!(msg
            .header(&HeaderName::Via)
            .unwrap()
            .iter()
            .all(|e| !e.is_parsed()));
    }

    #[test]
    fn test_transaction_key_from_parsed_message() {
        let ctx = MessageContext::new();
        let mut msg = SipMessage::parse(&invite(), &ctx).unwrap();
        // Promote Via first, then derive the key from typed fields.
        msg.header_mut(&HeaderName::Via).unwrap().validate(&ctx).unwrap();
        let key = msg.transaction_key().unwrap();
        assert_eq!(key.branch(), Some(&b"z9hG4bK776asdhds"[..]));
        assert_eq!(key.method(), Some(&Method::Invite));
    }

    #[test]
    fn test_write_text_round_trips_structurally() {
        let ctx = MessageContext::new();
        let msg = SipMessage::parse(&invite(), &ctx).unwrap();
        let wire = msg.to_wire(&ctx).unwrap();
        let again = SipMessage::parse(&wire, &ctx).unwrap();
        assert_eq!(msg.start(), again.start());
        let names: Vec<_> = again.headers().map(|l| l.name().clone()).collect();
        assert_eq!(names.len(), 7);
        assert_eq!(again.header(&HeaderName::Route).unwrap().len(), 2);
    }

    #[test]
    fn test_re_init_clears_for_reuse() {
        let ctx = MessageContext::new();
        let mut msg = SipMessage::parse(&invite(), &ctx).unwrap();
        msg.re_init();
        assert_eq!(msg.headers().count(), 0);
        assert!(msg.body().is_empty());
    }
}
