//! Deep per-header grammars. Each function scans one region of the
//! original buffer and pushes leaf elements and parameters through a
//! [`HeaderListener`]; nothing is copied. These run in two situations:
//! inline during the initial message scan (when the message listener asks
//! for a header's internals) and again later, over a single stored span,
//! when a header list lazily splits or promotes an entry.

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::parser::common::{is_wsp, split_top_level, trimmed_range};
use crate::parser::listener::{ElementContext, ElementId, HeaderListener, ScanControl};
use crate::parser::params::parse_params_in;
use crate::types::header_name::HeaderName;

/// Splits a possibly comma-combined header value into its instance
/// spans, in wire order. Headers that cannot be combined yield their
/// whole (trimmed) value as the single instance.
pub fn split_instances(name: &HeaderName, span: &Bytes) -> Vec<Bytes> {
    if name.comma_separable() {
        split_top_level(span, b',')
            .into_iter()
            .map(|(s, e)| span.slice(s..e))
            .collect()
    } else {
        let (s, e) = trimmed_range(span);
        vec![span.slice(s..e)]
    }
}

/// Tokenizes a full header value (possibly several comma-joined
/// instances), dispatching to the grammar selected by the header
/// identifier.
pub fn parse_header_value(
    name: &HeaderName,
    span: &Bytes,
    listener: &mut dyn HeaderListener,
) -> Result<()> {
    for instance in split_instances(name, span) {
        if parse_instance(name, &instance, listener)? == ScanControl::Stop {
            break;
        }
    }
    Ok(())
}

/// Tokenizes exactly one instance span. This is the lazy-promotion entry
/// point: a header list re-runs it over one stored span to build the
/// typed container.
pub fn parse_instance(
    name: &HeaderName,
    span: &Bytes,
    listener: &mut dyn HeaderListener,
) -> Result<ScanControl> {
    match name {
        HeaderName::Via => parse_via_instance(span, span, listener),
        HeaderName::To
        | HeaderName::From
        | HeaderName::Contact
        | HeaderName::Route
        | HeaderName::RecordRoute => parse_name_addr_instance(span, span, listener),
        HeaderName::CSeq => parse_cseq_instance(span, span, listener),
        _ => parse_generic_instance(span, span, listener),
    }
}

/// Via = sent-protocol LWS sent-by *( SEMI via-params )
/// sent-protocol = protocol-name SLASH protocol-version SLASH transport
pub fn parse_via_instance(
    buf: &Bytes,
    seg: &[u8],
    listener: &mut dyn HeaderListener,
) -> Result<ScanControl> {
    let (ts, te) = trimmed_range(seg);
    let seg = &seg[ts..te];

    let ws = seg
        .iter()
        .position(|&c| is_wsp(c))
        .ok_or_else(|| Error::parser("Via: missing sent-by"))?;
    let proto = &seg[..ws];
    let slashes: Vec<usize> = proto
        .iter()
        .enumerate()
        .filter(|(_, &c)| c == b'/')
        .map(|(i, _)| i)
        .collect();
    if slashes.len() != 2 {
        return Err(Error::parser(format!(
            "Via: malformed sent-protocol {:?}",
            String::from_utf8_lossy(proto)
        )));
    }
    let protocol = &proto[..slashes[1]];
    let transport = &proto[slashes[1] + 1..];
    if protocol.is_empty() || transport.is_empty() {
        return Err(Error::parser("Via: empty sent-protocol component"));
    }
    if listener.element(ElementContext::Via, ElementId::Protocol, buf.slice_ref(protocol))?
        == ScanControl::Stop
    {
        return Ok(ScanControl::Stop);
    }
    if listener.element(ElementContext::Via, ElementId::Transport, buf.slice_ref(transport))?
        == ScanControl::Stop
    {
        return Ok(ScanControl::Stop);
    }

    let sent_by = &seg[ws..];
    let params_at = sent_by.iter().position(|&c| c == b';');
    let host_port_part = match params_at {
        Some(p) => &sent_by[..p],
        None => sent_by,
    };
    let (hs, he) = trimmed_range(host_port_part);
    let host_port = &host_port_part[hs..he];
    if host_port.is_empty() {
        return Err(Error::parser("Via: missing sent-by host"));
    }

    let (host, rest) = if host_port[0] == b'[' {
        // IPv6 reference keeps its brackets in the host span.
        let close = host_port
            .iter()
            .position(|&c| c == b']')
            .ok_or_else(|| Error::parser("Via: unterminated IPv6 reference"))?;
        (&host_port[..=close], &host_port[close + 1..])
    } else {
        match host_port.iter().position(|&c| c == b':') {
            Some(colon) => (&host_port[..colon], &host_port[colon..]),
            None => (host_port, &host_port[host_port.len()..]),
        }
    };
    if listener.element(ElementContext::Via, ElementId::Host, buf.slice_ref(host))?
        == ScanControl::Stop
    {
        return Ok(ScanControl::Stop);
    }

    if let Some(stripped) = rest.strip_prefix(b":") {
        let (ps, pe) = trimmed_range(stripped);
        let port = &stripped[ps..pe];
        if port.is_empty() || !port.iter().all(u8::is_ascii_digit) {
            return Err(Error::parser("Via: invalid sent-by port"));
        }
        if listener.element(ElementContext::Via, ElementId::Port, buf.slice_ref(port))?
            == ScanControl::Stop
        {
            return Ok(ScanControl::Stop);
        }
    } else if !rest.is_empty() {
        return Err(Error::parser("Via: trailing bytes after sent-by host"));
    }

    match params_at {
        Some(p) => parse_params_in(buf, &sent_by[p..], ElementContext::Via, b';', listener),
        None => Ok(ScanControl::Continue),
    }
}

/// name-addr / addr-spec with trailing header parameters. The Uri element
/// is delivered verbatim (angle brackets included when present) so the
/// receiver can reproduce the wire form.
pub fn parse_name_addr_instance(
    buf: &Bytes,
    seg: &[u8],
    listener: &mut dyn HeaderListener,
) -> Result<ScanControl> {
    let (ts, te) = trimmed_range(seg);
    let seg = &seg[ts..te];
    if seg.is_empty() {
        return Err(Error::parser("address: empty value"));
    }

    if let Some(lt) = find_unquoted(seg, b'<') {
        let display_part = &seg[..lt];
        let (ds, de) = trimmed_range(display_part);
        if ds < de {
            if listener.element(
                ElementContext::NameAddr,
                ElementId::DisplayName,
                buf.slice_ref(&display_part[ds..de]),
            )? == ScanControl::Stop
            {
                return Ok(ScanControl::Stop);
            }
        }
        let gt = seg[lt..]
            .iter()
            .position(|&c| c == b'>')
            .map(|p| lt + p)
            .ok_or_else(|| Error::parser("address: unterminated angle bracket"))?;
        if gt == lt + 1 {
            return Err(Error::parser("address: empty URI"));
        }
        if listener.element(
            ElementContext::NameAddr,
            ElementId::Uri,
            buf.slice_ref(&seg[lt..=gt]),
        )? == ScanControl::Stop
        {
            return Ok(ScanControl::Stop);
        }
        let after = &seg[gt + 1..];
        match after.iter().position(|&c| c == b';') {
            Some(p) => parse_params_in(buf, &after[p..], ElementContext::NameAddr, b';', listener),
            None => Ok(ScanControl::Continue),
        }
    } else {
        // addr-spec form: the URI runs to the first top-level semicolon,
        // so every parameter here belongs to the header, not the URI.
        let uri_end = find_unquoted(seg, b';').unwrap_or(seg.len());
        let (us, ue) = trimmed_range(&seg[..uri_end]);
        if us == ue {
            return Err(Error::parser("address: empty URI"));
        }
        if listener.element(
            ElementContext::NameAddr,
            ElementId::Uri,
            buf.slice_ref(&seg[us..ue]),
        )? == ScanControl::Stop
        {
            return Ok(ScanControl::Stop);
        }
        if uri_end < seg.len() {
            parse_params_in(buf, &seg[uri_end..], ElementContext::NameAddr, b';', listener)
        } else {
            Ok(ScanControl::Continue)
        }
    }
}

/// CSeq = 1*DIGIT LWS Method
pub fn parse_cseq_instance(
    buf: &Bytes,
    seg: &[u8],
    listener: &mut dyn HeaderListener,
) -> Result<ScanControl> {
    let (ts, te) = trimmed_range(seg);
    let seg = &seg[ts..te];
    let ws = seg
        .iter()
        .position(|&c| is_wsp(c))
        .ok_or_else(|| Error::parser("CSeq: missing method"))?;
    let digits = &seg[..ws];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(Error::parser("CSeq: invalid sequence number"));
    }
    if listener.element(ElementContext::CSeq, ElementId::Sequence, buf.slice_ref(digits))?
        == ScanControl::Stop
    {
        return Ok(ScanControl::Stop);
    }
    let (ms, me) = trimmed_range(&seg[ws..]);
    let method = &seg[ws + ms..ws + me];
    if method.is_empty() {
        return Err(Error::parser("CSeq: missing method"));
    }
    listener.element(ElementContext::CSeq, ElementId::Method, buf.slice_ref(method))
}

/// Generic header: an undifferentiated leading value up to the first
/// top-level semicolon, then parameters.
pub fn parse_generic_instance(
    buf: &Bytes,
    seg: &[u8],
    listener: &mut dyn HeaderListener,
) -> Result<ScanControl> {
    let (ts, te) = trimmed_range(seg);
    let seg = &seg[ts..te];
    let value_end = find_unquoted(seg, b';').unwrap_or(seg.len());
    let (vs, ve) = trimmed_range(&seg[..value_end]);
    if listener.element(
        ElementContext::Generic,
        ElementId::Value,
        buf.slice_ref(&seg[vs..ve]),
    )? == ScanControl::Stop
    {
        return Ok(ScanControl::Stop);
    }
    if value_end < seg.len() {
        parse_params_in(buf, &seg[value_end..], ElementContext::Generic, b';', listener)
    } else {
        Ok(ScanControl::Continue)
    }
}

fn find_unquoted(seg: &[u8], needle: u8) -> Option<usize> {
    let mut in_quotes = false;
    let mut i = 0;
    while i < seg.len() {
        match seg[i] {
            b'\\' if in_quotes && i + 1 < seg.len() => i += 1,
            b'"' => in_quotes = !in_quotes,
            c if c == needle && !in_quotes => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Trace {
        elements: Vec<(ElementId, String)>,
        params: Vec<(String, String)>,
    }

    impl HeaderListener for Trace {
        fn element(
            &mut self,
            _ctx: ElementContext,
            id: ElementId,
            span: Bytes,
        ) -> Result<ScanControl> {
            self.elements
                .push((id, String::from_utf8_lossy(&span).into_owned()));
            Ok(ScanControl::Continue)
        }

        fn parameter(
            &mut self,
            _ctx: ElementContext,
            name: Bytes,
            value: Bytes,
        ) -> Result<ScanControl> {
            self.params.push((
                String::from_utf8_lossy(&name).into_owned(),
                String::from_utf8_lossy(&value).into_owned(),
            ));
            Ok(ScanControl::Continue)
        }
    }

    #[test]
    fn test_via_elements_in_order() {
        let span = Bytes::from_static(b"SIP/2.0/UDP pc33.atlanta.com:5060;branch=z9hG4bK77");
        let mut trace = Trace::default();
        parse_via_instance(&span, &span, &mut trace).unwrap();
        assert_eq!(
            trace.elements,
            [
                (ElementId::Protocol, "SIP/2.0".into()),
                (ElementId::Transport, "UDP".into()),
                (ElementId::Host, "pc33.atlanta.com".into()),
                (ElementId::Port, "5060".into()),
            ]
        );
        assert_eq!(trace.params, [("branch".into(), "z9hG4bK77".into())]);
    }

    #[test]
    fn test_multi_instance_via_value() {
        let span = Bytes::from_static(
            b"SIP/2.0/UDP first.example.com;branch=z9hG4bKa, SIP/2.0/TCP second.example.com;branch=z9hG4bKb",
        );
        let mut trace = Trace::default();
        parse_header_value(&HeaderName::Via, &span, &mut trace).unwrap();
        let hosts: Vec<_> = trace
            .elements
            .iter()
            .filter(|(id, _)| *id == ElementId::Host)
            .map(|(_, h)| h.as_str())
            .collect();
        assert_eq!(hosts, ["first.example.com", "second.example.com"]);
    }

    #[test]
    fn test_cseq_elements() {
        let span = Bytes::from_static(b"  4711 REGISTER ");
        let mut trace = Trace::default();
        parse_cseq_instance(&span, &span, &mut trace).unwrap();
        assert_eq!(
            trace.elements,
            [
                (ElementId::Sequence, "4711".into()),
                (ElementId::Method, "REGISTER".into()),
            ]
        );
    }

    #[test]
    fn test_name_addr_uri_verbatim() {
        let span = Bytes::from_static(b"Bob <sip:bob@biloxi.com;transport=tcp>;tag=99");
        let mut trace = Trace::default();
        parse_name_addr_instance(&span, &span, &mut trace).unwrap();
        assert_eq!(
            trace.elements,
            [
                (ElementId::DisplayName, "Bob".into()),
                (ElementId::Uri, "<sip:bob@biloxi.com;transport=tcp>".into()),
            ]
        );
        // Only the header param, not the URI param.
        assert_eq!(trace.params, [("tag".into(), "99".into())]);
    }

    #[test]
    fn test_split_instances_respects_header_kind() {
        let via = Bytes::from_static(b"SIP/2.0/UDP a, SIP/2.0/UDP b");
        assert_eq!(split_instances(&HeaderName::Via, &via).len(), 2);

        // A Subject may legitimately contain commas; it never splits.
        let subject = Bytes::from_static(b"lunch, then the meeting");
        assert_eq!(split_instances(&HeaderName::Subject, &subject).len(), 1);
    }

    #[test]
    fn test_via_rejects_garbage() {
        for bad in [
            &b"SIP/2.0 host"[..],
            &b"SIP/2.0/UDP"[..],
            &b"SIP/2.0/UDP host:port"[..],
        ] {
            let span = Bytes::copy_from_slice(bad);
            let mut trace = Trace::default();
            assert!(parse_via_instance(&span, &span, &mut trace).is_err(), "{bad:?}");
        }
    }
}
