//! # Compact binary ("token") wire form
//!
//! An alternative encoding of the same message model, sized for links
//! where the textual form is too heavy. Layout:
//!
//! ```text
//! message   = start-tag start-fields *header TOK_END body
//! start-tag = TOK_REQUEST / TOK_RESPONSE
//! header    = (dictionary-code / TOK_ESCAPE frame(name)) frame(value) *param
//! param     = TOK_PARAM frame(name) frame(value)   ; empty value = flag
//! frame     = u16-be-length bytes
//! body      = u32-be-length bytes
//! ```
//!
//! Known header names serialize as their stable one-byte dictionary code
//! (see [`HeaderName::token_code`]); extension headers pay the escape
//! byte plus their framed name. Parameters of promoted entries are
//! emitted individually behind [`TOK_PARAM`] markers; span entries are
//! framed verbatim. Decoding rebuilds an identical in-memory structure,
//! and round-tripping through either wire form is lossless for every
//! modeled field.

use bytes::Bytes;

use crate::context::MessageContext;
use crate::error::{Error, Result};
use crate::types::field::TypedField;
use crate::types::header::HeaderEntry;
use crate::types::header_name::HeaderName;
use crate::types::message::{SipMessage, StartLine};
use crate::types::method::Method;

/// Start-line tag for requests.
pub const TOK_REQUEST: u8 = 0xF1;
/// Start-line tag for responses.
pub const TOK_RESPONSE: u8 = 0xF2;
/// Introduces a framed extension-header name.
pub const TOK_ESCAPE: u8 = 0x7F;
/// Marks one encoded parameter pair.
pub const TOK_PARAM: u8 = 0x7E;
/// Terminates the header block.
pub const TOK_END: u8 = 0x00;

/// Encodes a message into the compact form.
pub fn encode_message(msg: &SipMessage, _ctx: &MessageContext) -> Result<Bytes> {
    let mut out = Vec::new();
    match msg.start() {
        StartLine::Request { method, uri } => {
            out.push(TOK_REQUEST);
            frame(&mut out, method.as_str().as_bytes())?;
            frame(&mut out, uri)?;
        }
        StartLine::Response { status, reason } => {
            out.push(TOK_RESPONSE);
            out.extend_from_slice(&status.to_be_bytes());
            frame(&mut out, reason)?;
        }
    }
    for list in msg.headers() {
        for entry in list.iter() {
            encode_name(&mut out, list.name())?;
            encode_entry(&mut out, entry)?;
        }
    }
    out.push(TOK_END);
    let body = msg.body();
    out.extend_from_slice(&u32::try_from(body.len()).map_err(|_| {
        Error::TokenEncoding("body exceeds the encodable length".into())
    })?.to_be_bytes());
    out.extend_from_slice(body);
    Ok(Bytes::from(out))
}

/// Decodes a compact-form buffer back into a message. Headers come back
/// as single-instance spans; lazy splitting and promotion behave exactly
/// as after a textual parse.
pub fn decode_message(buf: &Bytes, ctx: &MessageContext) -> Result<SipMessage> {
    let mut r = Reader { data: buf, pos: 0 };
    let start = match r.byte()? {
        TOK_REQUEST => {
            let method_bytes = r.frame()?;
            let method_text = std::str::from_utf8(method_bytes)
                .map_err(|_| Error::TokenEncoding("non-ASCII method".into()))?;
            let method: Method = method_text
                .parse()
                .map_err(|_| Error::TokenEncoding("invalid method token".into()))?;
            let uri = Bytes::copy_from_slice(r.frame()?);
            StartLine::Request { method, uri }
        }
        TOK_RESPONSE => {
            let status = u16::from_be_bytes([r.byte()?, r.byte()?]);
            let reason = Bytes::copy_from_slice(r.frame()?);
            StartLine::Response { status, reason }
        }
        other => {
            return Err(Error::TokenEncoding(format!(
                "unknown start tag {other:#04x}"
            )))
        }
    };

    let mut msg = SipMessage::new(start);
    loop {
        let tag = r.byte()?;
        if tag == TOK_END {
            break;
        }
        let name = match tag {
            TOK_ESCAPE => {
                let name_bytes = r.frame()?;
                let text = std::str::from_utf8(name_bytes)
                    .map_err(|_| Error::TokenEncoding("non-ASCII header name".into()))?;
                text.parse::<HeaderName>()
                    .map_err(|_| Error::TokenEncoding("empty header name".into()))?
            }
            TOK_PARAM => {
                return Err(Error::TokenEncoding("parameter outside a header".into()))
            }
            code => HeaderName::from_token_code(code).ok_or_else(|| {
                Error::TokenEncoding(format!("unknown dictionary code {code:#04x}"))
            })?,
        };

        let mut text = r.frame()?.to_vec();
        while r.peek() == Some(TOK_PARAM) {
            r.byte()?;
            let pname = r.frame()?.to_vec();
            let pvalue = r.frame()?.to_vec();
            text.push(b';');
            text.extend_from_slice(&pname);
            if !pvalue.is_empty() {
                text.push(b'=');
                text.extend_from_slice(&pvalue);
            }
        }
        let limit = ctx.header_limit;
        let list = msg.header_or_insert(name);
        if let Some(l) = limit {
            if list.len() >= l {
                continue;
            }
        }
        list.ingest(Bytes::from(text));
    }

    let len = u32::from_be_bytes([r.byte()?, r.byte()?, r.byte()?, r.byte()?]) as usize;
    let body = r.take(len)?;
    msg.set_body(Bytes::copy_from_slice(body));
    if r.pos != r.data.len() {
        return Err(Error::TokenEncoding("trailing bytes after body".into()));
    }
    Ok(msg)
}

fn encode_name(out: &mut Vec<u8>, name: &HeaderName) -> Result<()> {
    match name.token_code() {
        Some(code) => out.push(code),
        None => {
            out.push(TOK_ESCAPE);
            frame(out, name.as_str().as_bytes())?;
        }
    }
    Ok(())
}

fn encode_entry(out: &mut Vec<u8>, entry: &HeaderEntry) -> Result<()> {
    match entry {
        HeaderEntry::Raw(span) | HeaderEntry::Single(span) => frame(out, span),
        HeaderEntry::Parsed(field) => {
            frame(out, &field_core_text(field)?)?;
            let params = match field {
                TypedField::Via(via) => Some(via.params()),
                TypedField::NameAddr(addr) => Some(addr.params()),
                TypedField::Generic(generic) => Some(generic.params()),
                TypedField::CSeq(_) => None,
            };
            if let Some(params) = params {
                for param in params.iter() {
                    out.push(TOK_PARAM);
                    frame(out, param.name())?;
                    frame(out, param.value())?;
                }
            }
            Ok(())
        }
    }
}

/// A promoted field's value text without its parameters, which travel
/// as marked pairs.
fn field_core_text(field: &TypedField) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    match field {
        TypedField::Via(via) => {
            out.extend_from_slice(via.protocol());
            out.push(b'/');
            out.extend_from_slice(via.transport());
            out.push(b' ');
            out.extend_from_slice(via.host());
            if let Some(port) = via.port() {
                out.extend_from_slice(format!(":{port}").as_bytes());
            }
        }
        TypedField::NameAddr(addr) => {
            if let Some(display) = addr.display_name() {
                out.extend_from_slice(display);
                out.push(b' ');
            }
            if addr.is_bracketed() {
                out.push(b'<');
                out.extend_from_slice(addr.uri());
                out.push(b'>');
            } else {
                out.extend_from_slice(addr.uri());
            }
        }
        TypedField::CSeq(cseq) => {
            cseq.write(&mut out)?;
        }
        TypedField::Generic(generic) => {
            out.extend_from_slice(generic.value());
        }
    }
    Ok(out)
}

fn frame(out: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    let len = u16::try_from(bytes.len())
        .map_err(|_| Error::TokenEncoding("frame exceeds the encodable length".into()))?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn byte(&mut self) -> Result<u8> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or_else(|| Error::TokenEncoding("truncated input".into()))?;
        self.pos += 1;
        Ok(b)
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&e| e <= self.data.len())
            .ok_or_else(|| Error::TokenEncoding("truncated input".into()))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn frame(&mut self) -> Result<&'a [u8]> {
        let len = u16::from_be_bytes([self.byte()?, self.byte()?]) as usize;
        self.take(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invite() -> Bytes {
        Bytes::from_static(
            b"INVITE sip:bob@biloxi.com SIP/2.0\r\n\
              Via: SIP/2.0/UDP pc33.atlanta.com:5060;branch=z9hG4bK776asdhds\r\n\
              To: Bob <sip:bob@biloxi.com>\r\n\
              CSeq: 314159 INVITE\r\n\
              X-Trace: abc;hop=1\r\n\
              \r\n\
              body-bytes",
        )
    }

    #[test]
    fn test_round_trip_span_entries() {
        let ctx = MessageContext::new();
        let msg = SipMessage::parse(&invite(), &ctx).unwrap();
        let encoded = encode_message(&msg, &ctx).unwrap();
        let decoded = decode_message(&encoded, &ctx).unwrap();

        assert_eq!(msg.start(), decoded.start());
        assert_eq!(msg.body(), decoded.body());
        let names: Vec<_> = decoded.headers().map(|l| l.name().clone()).collect();
        assert_eq!(
            names,
            [
                HeaderName::Via,
                HeaderName::To,
                HeaderName::CSeq,
                HeaderName::Other("X-Trace".into()),
            ]
        );
        // Re-encoding the decoded message is byte-stable.
        assert_eq!(encode_message(&decoded, &ctx).unwrap(), encoded);
    }

    #[test]
    fn test_promoted_entries_emit_param_markers() {
        let ctx = MessageContext::new();
        let mut msg = SipMessage::parse(&invite(), &ctx).unwrap();
        msg.header_mut(&HeaderName::Via).unwrap().validate(&ctx).unwrap();
        let encoded = encode_message(&msg, &ctx).unwrap();
        assert!(encoded.contains(&TOK_PARAM));

        // The decoded structure equals the never-promoted one.
        let mut decoded = decode_message(&encoded, &ctx).unwrap();
        let mut plain = SipMessage::parse(&invite(), &ctx).unwrap();
        let equal = decoded
            .header_mut(&HeaderName::Via)
            .unwrap()
            .equals(plain.header_mut(&HeaderName::Via).unwrap(), &ctx)
            .unwrap();
        assert!(equal);
    }

    #[test]
    fn test_response_start_line() {
        let ctx = MessageContext::new();
        let raw = Bytes::from_static(b"SIP/2.0 486 Busy Here\r\nCSeq: 2 INVITE\r\n\r\n");
        let msg = SipMessage::parse(&raw, &ctx).unwrap();
        let decoded = decode_message(&encode_message(&msg, &ctx).unwrap(), &ctx).unwrap();
        assert_eq!(
            decoded.start(),
            &StartLine::Response {
                status: 486,
                reason: Bytes::from_static(b"Busy Here"),
            }
        );
    }

    #[test]
    fn test_malformed_input_rejected() {
        let ctx = MessageContext::new();
        for bad in [
            &[][..],
            &[0x55][..],                   // unknown start tag
            &[TOK_REQUEST, 0x00][..],      // truncated frame
            &[TOK_REQUEST, 0x00, 0x02, b'O', b'K'][..], // truncated overall
        ] {
            let buf = Bytes::copy_from_slice(bad);
            assert!(decode_message(&buf, &ctx).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn test_unknown_dictionary_code_rejected() {
        let ctx = MessageContext::new();
        let mut bytes = Vec::new();
        bytes.push(TOK_RESPONSE);
        bytes.extend_from_slice(&200u16.to_be_bytes());
        bytes.extend_from_slice(&[0x00, 0x00]); // empty reason
        bytes.push(0x6A); // not in the dictionary
        let buf = Bytes::from(bytes);
        assert!(matches!(
            decode_message(&buf, &ctx),
            Err(Error::TokenEncoding(_))
        ));
    }
}
