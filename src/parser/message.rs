//! Whole-message scan: start line, then headers, then body. One linear
//! pass; every span handed to the listener aliases the input buffer.

use std::str::FromStr;

use bytes::Bytes;
use tracing::trace;

use crate::error::{Error, Result};
use crate::parser::common::{is_token_char, is_wsp, trimmed_range};
use crate::parser::headers::parse_header_value;
use crate::parser::listener::{HeaderInterest, MessageListener, ScanControl};
use crate::types::header_name::HeaderName;
use crate::types::message::StartLine;
use crate::types::method::Method;

const SIP_VERSION: &[u8] = b"SIP/2.0";

/// Scans a complete message, driving the listener. Structural errors
/// (malformed start line, a header line without a colon) are fatal to
/// the scan; errors inside one header's deep grammar are routed through
/// [`MessageListener::header_error`] and by default abandon only that
/// header.
pub fn parse_message<L: MessageListener>(buf: &Bytes, listener: &mut L) -> Result<()> {
    let data: &[u8] = buf;
    let line_end = find_crlf(data, 0)
        .ok_or_else(|| Error::parser("message: missing CRLF after start line"))?;
    let start = parse_start_line(buf, &data[..line_end])?;
    if listener.message_begin(&start) == ScanControl::Stop {
        return Ok(());
    }

    let mut pos = line_end + 2;
    loop {
        if pos >= data.len() {
            // Tolerate a missing blank line at end-of-input.
            return Ok(());
        }
        if data[pos..].starts_with(b"\r\n") {
            pos += 2;
            break;
        }

        let colon = data[pos..]
            .iter()
            .position(|&c| c == b':')
            .map(|p| pos + p)
            .ok_or_else(|| Error::parser("message: header line without a colon"))?;
        let name_raw = &data[pos..colon];
        let (ns, ne) = trimmed_range(name_raw);
        let name_bytes = &name_raw[ns..ne];
        if name_bytes.is_empty() || !name_bytes.iter().copied().all(is_token_char) {
            return Err(Error::parser(format!(
                "message: malformed header name {:?}",
                String::from_utf8_lossy(name_raw)
            )));
        }
        // Token chars are ASCII, so this cannot fail.
        let name_text = std::str::from_utf8(name_bytes).expect("token bytes are ASCII");
        let name = HeaderName::from_str(name_text)?;

        // The value runs to the first CRLF not followed by folding
        // whitespace; a folded continuation stays inside the one span.
        let vstart = colon + 1;
        let mut scan = vstart;
        let vend = loop {
            match find_crlf(data, scan) {
                Some(e) => {
                    if data.get(e + 2).is_some_and(|&c| is_wsp(c)) {
                        scan = e + 2;
                    } else {
                        break e;
                    }
                }
                None => break data.len(),
            }
        };
        let value_raw = &data[vstart..vend];
        let (vs, ve) = trimmed_range(value_raw);
        let value_span = buf.slice_ref(&value_raw[vs..ve]);
        pos = if vend < data.len() { vend + 2 } else { data.len() };

        let interest = listener.header_begin(&name);
        listener.header_value(&name, value_span.clone());
        if interest == HeaderInterest::Elements {
            if let Err(err) = parse_header_value(&name, &value_span, listener) {
                trace!(header = %name, error = %err, "deep parse failed");
                if listener.header_error(&name, err) == ScanControl::Stop {
                    return Ok(());
                }
            }
        }
    }

    if pos < data.len() {
        listener.body(buf.slice(pos..));
    }
    Ok(())
}

/// Request-line / status-line ([RFC 3261 section 7.1](https://datatracker.ietf.org/doc/html/rfc3261#section-7.1)).
fn parse_start_line(buf: &Bytes, line: &[u8]) -> Result<StartLine> {
    if let Some(rest) = line.strip_prefix(SIP_VERSION) {
        // Status-Line = SIP-Version SP Status-Code SP Reason-Phrase
        let rest = rest
            .strip_prefix(b" ")
            .ok_or_else(|| Error::parser("status line: missing status code"))?;
        let digits_end = rest
            .iter()
            .position(|c| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits_end != 3 {
            return Err(Error::parser("status line: status code is not three digits"));
        }
        let status: u16 = std::str::from_utf8(&rest[..3])
            .expect("digits are ASCII")
            .parse()
            .expect("three digits fit in u16");
        let reason = match rest[3..].strip_prefix(b" ") {
            Some(r) => r,
            None if rest.len() == 3 => &rest[3..],
            None => return Err(Error::parser("status line: junk after status code")),
        };
        Ok(StartLine::Response {
            status,
            reason: buf.slice_ref(reason),
        })
    } else {
        // Request-Line = Method SP Request-URI SP SIP-Version
        let mut parts = line.splitn(3, |&c| c == b' ');
        let method_part = parts.next().unwrap_or_default();
        let uri_part = parts
            .next()
            .ok_or_else(|| Error::parser("request line: missing request URI"))?;
        let version_part = parts
            .next()
            .ok_or_else(|| Error::parser("request line: missing SIP version"))?;
        if version_part != SIP_VERSION {
            return Err(Error::parser(format!(
                "request line: unsupported version {:?}",
                String::from_utf8_lossy(version_part)
            )));
        }
        if uri_part.is_empty() {
            return Err(Error::parser("request line: empty request URI"));
        }
        let method_text = std::str::from_utf8(method_part)
            .map_err(|_| Error::parser("request line: non-ASCII method"))?;
        Ok(StartLine::Request {
            method: Method::from_str(method_text)?,
            uri: buf.slice_ref(uri_part),
        })
    }
}

fn find_crlf(data: &[u8], from: usize) -> Option<usize> {
    let mut i = from;
    while i + 1 < data.len() {
        if data[i] == b'\r' && data[i + 1] == b'\n' {
            return Some(i);
        }
        i += 1;
    }
    None
}
