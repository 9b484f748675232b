//! Shared low-level tokens for the SIP grammar (RFC 3261 section 25.1).

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    combinator::recognize,
    multi::many0,
    sequence::{pair, tuple},
    IResult,
};

// Type alias for parser result
pub type ParseResult<'a, O> = IResult<&'a [u8], O>;

/// token = 1*(alphanum / "-" / "." / "!" / "%" / "*" / "_" / "+" / "`" / "'" / "~")
pub fn is_token_char(c: u8) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            b'-' | b'.' | b'!' | b'%' | b'*' | b'_' | b'+' | b'`' | b'\'' | b'~'
        )
}

pub fn token(input: &[u8]) -> ParseResult<&[u8]> {
    take_while1(is_token_char)(input)
}

pub fn is_wsp(c: u8) -> bool {
    c == b' ' || c == b'\t'
}

/// LWS = [*WSP CRLF] 1*WSP, linear whitespace allowing a fold
pub fn lws(input: &[u8]) -> ParseResult<&[u8]> {
    recognize(pair(
        many0(tuple((take_while(is_wsp), tag(b"\r\n")))),
        take_while1(is_wsp),
    ))(input)
}

/// SWS = [LWS], optional linear whitespace
pub fn sws(input: &[u8]) -> ParseResult<&[u8]> {
    recognize(many0(alt((take_while1(is_wsp), tag(b"\r\n ") , tag(b"\r\n\t")))))(input)
}

/// HCOLON = *( SP / HTAB ) ":" SWS
pub fn hcolon(input: &[u8]) -> ParseResult<&[u8]> {
    recognize(tuple((take_while(is_wsp), tag(b":"), sws)))(input)
}

pub fn crlf(input: &[u8]) -> ParseResult<&[u8]> {
    tag(b"\r\n")(input)
}

pub fn digits(input: &[u8]) -> ParseResult<&[u8]> {
    take_while1(|c: u8| c.is_ascii_digit())(input)
}

/// quoted-string, recognized with its surrounding quotes and `\`-escapes
/// intact so the span stays byte-faithful to the wire.
pub fn quoted_string(input: &[u8]) -> ParseResult<&[u8]> {
    if input.first() != Some(&b'"') {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        )));
    }
    let mut i = 1;
    while i < input.len() {
        match input[i] {
            b'\\' if i + 1 < input.len() => i += 2,
            b'"' => return Ok((&input[i + 1..], &input[..i + 1])),
            _ => i += 1,
        }
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

/// Trims WSP and CRLF from both ends of a slice, yielding the trimmed
/// subrange as (start, end) offsets.
pub fn trimmed_range(slice: &[u8]) -> (usize, usize) {
    let mut start = 0;
    let mut end = slice.len();
    while start < end && matches!(slice[start], b' ' | b'\t' | b'\r' | b'\n') {
        start += 1;
    }
    while end > start && matches!(slice[end - 1], b' ' | b'\t' | b'\r' | b'\n') {
        end -= 1;
    }
    (start, end)
}

/// Splits `slice` on `sep` at the top level: separators inside quoted
/// strings or angle brackets do not split. Returns trimmed, non-empty
/// subranges. The single-pass scan never backtracks.
pub fn split_top_level(slice: &[u8], sep: u8) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut i = 0;
    while i < slice.len() {
        match slice[i] {
            b'\\' if in_quotes && i + 1 < slice.len() => i += 1,
            b'"' => in_quotes = !in_quotes,
            b'<' if !in_quotes => in_brackets = true,
            b'>' if !in_quotes => in_brackets = false,
            c if c == sep && !in_quotes && !in_brackets => {
                push_trimmed(slice, start, i, &mut ranges);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    push_trimmed(slice, start, slice.len(), &mut ranges);
    ranges
}

fn push_trimmed(slice: &[u8], start: usize, end: usize, out: &mut Vec<(usize, usize)>) {
    let (ts, te) = trimmed_range(&slice[start..end]);
    if ts < te {
        out.push((start + ts, start + te));
    }
}
