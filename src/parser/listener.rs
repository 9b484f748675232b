//! # Parser listener protocol
//!
//! The seam between the tokenizer and the object model. The tokenizer
//! scans the buffer once and pushes what it finds through these traits;
//! parameter tables, header lists, and the transaction key all build
//! themselves from the same pass by implementing [`HeaderListener`].
//!
//! Callbacks are synchronous and hand out spans of the original buffer.
//! A listener that wants the tokenizer to stop consuming answers
//! [`ScanControl::Stop`]; intent is a value, never an error. Domain
//! violations are reported by returning `Err`; the tokenizer aborts only
//! the current header and asks the message-level listener (via
//! [`MessageListener::header_error`]) whether the scan itself should
//! continue.

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::types::header_name::HeaderName;
use crate::types::message::StartLine;

/// Whether the tokenizer should keep consuming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanControl {
    Continue,
    Stop,
}

/// Answer to [`MessageListener::header_begin`]: how much of this header
/// the listener wants to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderInterest {
    /// Store the raw value span only; skip the deep per-header grammar.
    /// This is the common case, since most headers are never inspected.
    Store,
    /// Also run the deep grammar and deliver `element` / `parameter`
    /// callbacks for this header's internals.
    Elements,
}

/// Which per-header grammar produced an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementContext {
    Via,
    NameAddr,
    CSeq,
    Generic,
}

/// Leaf token kinds within a header value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementId {
    /// Via protocol name/version, e.g. `SIP/2.0`
    Protocol,
    /// Via transport token, e.g. `UDP`
    Transport,
    /// Via sent-by host
    Host,
    /// Via sent-by port
    Port,
    /// name-addr display name
    DisplayName,
    /// name-addr URI, verbatim: angle brackets are preserved when the
    /// wire form used them
    Uri,
    /// CSeq sequence number
    Sequence,
    /// CSeq method token
    Method,
    /// Undifferentiated leading value of a generic header
    Value,
}

/// Receives the internals of a single header (or a bare parameter list).
///
/// Implemented by typed-field builders, by [`Params`](crate::types::Params)
/// itself, and by the transaction-key builder so it can ride along on the
/// initial message scan.
pub trait HeaderListener {
    /// A leaf token. The span aliases the original buffer; copy before
    /// retaining beyond the call if the buffer may be recycled.
    fn element(&mut self, ctx: ElementContext, id: ElementId, span: Bytes) -> Result<ScanControl> {
        let _ = (ctx, id, span);
        Ok(ScanControl::Continue)
    }

    /// A `name[=value]` parameter; `value` is empty for bare flags.
    fn parameter(&mut self, ctx: ElementContext, name: Bytes, value: Bytes) -> Result<ScanControl> {
        let _ = (ctx, name, value);
        Ok(ScanControl::Continue)
    }
}

/// Drives a whole-message scan.
pub trait MessageListener: HeaderListener {
    /// First callback of the scan; the start line decides request vs
    /// response handling for the rest of the parse.
    fn message_begin(&mut self, start: &StartLine) -> ScanControl;

    /// Called once per header, before its value is delivered. The answer
    /// selects whether this header's internals are tokenized at all.
    fn header_begin(&mut self, name: &HeaderName) -> HeaderInterest;

    /// The header's complete raw value span. Always delivered, regardless
    /// of the `header_begin` answer: raw storage is the default
    /// representation and deep parsing is layered on top.
    fn header_value(&mut self, name: &HeaderName, span: Bytes);

    /// A deep parse of one header failed. Returning `Continue` abandons
    /// that header only; `Stop` ends the scan.
    fn header_error(&mut self, name: &HeaderName, err: Error) -> ScanControl {
        let _ = (name, err);
        ScanControl::Continue
    }

    /// The message body span, delivered after the blank line. Not called
    /// for messages without a body.
    fn body(&mut self, span: Bytes) {
        let _ = span;
    }
}
