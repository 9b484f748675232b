//! Parameter-list tokenizer: scans `;name=value;flag` runs and pushes
//! each pair through the listener protocol.

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::parser::common::{is_token_char, quoted_string, split_top_level, trimmed_range};
use crate::parser::listener::{ElementContext, HeaderListener, ScanControl};

/// Parses a standalone parameter span (as stored by a [`Params`]
/// table), delivering one `parameter` callback per entry. A leading
/// delimiter is accepted and consumed.
///
/// [`Params`]: crate::types::Params
pub fn parse_params(span: &Bytes, delimiter: u8, listener: &mut dyn HeaderListener) -> Result<()> {
    parse_params_in(span, span, ElementContext::Generic, delimiter, listener)?;
    Ok(())
}

/// Scans the parameter run inside `seg` (a subslice of `buf`); spans
/// delivered to the listener alias `buf`. Single pass, no backtracking.
pub(crate) fn parse_params_in(
    buf: &Bytes,
    seg: &[u8],
    ctx: ElementContext,
    delimiter: u8,
    listener: &mut dyn HeaderListener,
) -> Result<ScanControl> {
    for (start, end) in split_top_level(seg, delimiter) {
        let entry = &seg[start..end];
        let (name, value) = split_entry(entry)?;
        let control = listener.parameter(ctx, buf.slice_ref(name), buf.slice_ref(value))?;
        if control == ScanControl::Stop {
            return Ok(ScanControl::Stop);
        }
    }
    Ok(ScanControl::Continue)
}

/// Splits one `name[=value]` entry. The value keeps its quotes when
/// quoted; a missing value yields an empty slice (bare flag).
fn split_entry(entry: &[u8]) -> Result<(&[u8], &[u8])> {
    let eq = find_top_level_eq(entry);
    let (name_part, value_part) = match eq {
        Some(pos) => (&entry[..pos], &entry[pos + 1..]),
        None => (entry, &entry[entry.len()..]),
    };
    let (ns, ne) = trimmed_range(name_part);
    let name = &name_part[ns..ne];
    if name.is_empty() || !name.iter().copied().all(is_token_char) {
        return Err(Error::parser(format!(
            "invalid parameter name: {:?}",
            String::from_utf8_lossy(name_part)
        )));
    }
    let (vs, ve) = trimmed_range(value_part);
    let value = &value_part[vs..ve];
    if value.first() == Some(&b'"') {
        // Must be a complete quoted-string; keep it verbatim.
        let (rest, quoted) = quoted_string(value)
            .map_err(|_| Error::parser("unterminated quoted parameter value"))?;
        if !rest.is_empty() {
            return Err(Error::parser("trailing bytes after quoted parameter value"));
        }
        return Ok((name, quoted));
    }
    Ok((name, value))
}

fn find_top_level_eq(entry: &[u8]) -> Option<usize> {
    let mut in_quotes = false;
    let mut i = 0;
    while i < entry.len() {
        match entry[i] {
            b'\\' if in_quotes && i + 1 < entry.len() => i += 1,
            b'"' => in_quotes = !in_quotes,
            b'=' if !in_quotes => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}
