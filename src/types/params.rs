//! # Parameter table
//!
//! A linked container of [`Param`] entries behind a generic `;name=value`
//! list. Lookup is by case-insensitive name; equality is set-equality
//! (order never matters for parameters, unlike header lists); `re_init`
//! empties the table for pool reuse.
//!
//! The table carries its delimiter byte (`;` by default; URI headers use
//! `&`) and a leading-delimiter flag deciding whether the first entry is
//! preceded by a delimiter when written.
//!
//! # Examples
//!
//! ```rust
//! use sipmsg::types::Params;
//!
//! let mut params = Params::new();
//! params.set(b"a", b"1");
//! params.set(b"b", b"2");
//!
//! let mut out = Vec::new();
//! params.write(&mut out).unwrap();
//! assert_eq!(out, b";a=1;b=2");
//!
//! // Replace-by-name, case-insensitively.
//! params.set(b"A", b"9");
//! assert_eq!(params.get(b"a"), Some(&b"9"[..]));
//! assert_eq!(params.len(), 2);
//! ```

use std::fmt;
use std::io;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::list::SpliceList;
use crate::parser::listener::{ElementContext, HeaderListener, ScanControl};
use crate::types::param::Param;

/// Default delimiter between parameters.
pub const DEFAULT_DELIMITER: u8 = b';';

/// A generic parameter list with case-insensitive name lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    list: SpliceList<Param>,
    delimiter: u8,
    /// Whether `write` emits a delimiter before the first entry.
    leading: bool,
}

impl Params {
    /// An empty `;`-delimited table with a leading delimiter.
    pub fn new() -> Self {
        Params {
            list: SpliceList::new(),
            delimiter: DEFAULT_DELIMITER,
            leading: true,
        }
    }

    /// An empty table with an explicit delimiter and leading flag.
    pub fn with_delimiter(delimiter: u8, leading: bool) -> Self {
        Params {
            list: SpliceList::new(),
            delimiter,
            leading,
        }
    }

    /// Parses a `;a=1;b=2`-shaped span. Spans of the result alias the
    /// input buffer; whether the input opened with a delimiter is
    /// remembered so writing reproduces the original shape.
    pub fn parse(span: &Bytes) -> Result<Self> {
        Self::parse_with(span, DEFAULT_DELIMITER)
    }

    /// [`Params::parse`] with an explicit delimiter byte.
    pub fn parse_with(span: &Bytes, delimiter: u8) -> Result<Self> {
        let mut params = Params::with_delimiter(delimiter, true);
        params.leading = span
            .iter()
            .find(|c| !c.is_ascii_whitespace())
            .map_or(true, |&c| c == delimiter);
        crate::parser::params::parse_params(span, delimiter, &mut params)?;
        Ok(params)
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    pub fn set_leading(&mut self, leading: bool) {
        self.leading = leading;
    }

    /// Replaces the value of an existing parameter (matched by
    /// case-insensitive name) or appends a new one.
    ///
    /// An empty `name` is silently ignored: callers routinely forward
    /// optional inputs here and absence is not an error.
    pub fn set(&mut self, name: &[u8], value: &[u8]) {
        if name.is_empty() {
            return;
        }
        let param = Param::new(name, value);
        let existing = self
            .list
            .ids()
            .find(|&id| self.list.get(id).is_some_and(|p| p.name_is(name)));
        match existing {
            Some(id) => {
                self.list.replace(id, param);
            }
            None => {
                self.list.push_back(param);
            }
        }
    }

    /// Appends without the replace-by-name check. This is the tokenizer's
    /// ingestion path; wire duplicates are kept as-is.
    pub fn append(&mut self, param: Param) {
        self.list.push_back(param);
    }

    /// Returns the value span for `name`, if present. A flag parameter
    /// yields an empty slice.
    pub fn get(&self, name: &[u8]) -> Option<&[u8]> {
        self.list
            .iter()
            .find(|p| p.name_is(name))
            .map(|p| p.value())
    }

    /// Removes the parameter named `name`, returning its value. An empty
    /// `name` is silently ignored, like [`Params::set`].
    pub fn remove(&mut self, name: &[u8]) -> Option<Bytes> {
        if name.is_empty() {
            return None;
        }
        let id = self
            .list
            .ids()
            .find(|&id| self.list.get(id).is_some_and(|p| p.name_is(name)))?;
        Some(self.list.remove(id).value_bytes().clone())
    }

    pub fn contains(&self, name: &[u8]) -> bool {
        self.list.iter().any(|p| p.name_is(name))
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.list.iter()
    }

    /// Empties the table for pool reuse, restoring the default delimiter
    /// configuration and keeping allocated capacity.
    pub fn re_init(&mut self) {
        self.list.re_init();
        self.delimiter = DEFAULT_DELIMITER;
        self.leading = true;
    }

    /// Writes `delimiter name ["=" value]` per entry, honoring the
    /// leading-delimiter flag.
    pub fn write<W: io::Write>(&self, w: &mut W) -> Result<()> {
        let mut first = true;
        for param in self.list.iter() {
            if !first || self.leading {
                w.write_all(&[self.delimiter])?;
            }
            first = false;
            param.write(w)?;
        }
        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::new()
    }
}

/// A parameter table is its own parse listener: the tokenizer's
/// `parameter` callbacks append straight into the list.
impl HeaderListener for Params {
    fn parameter(&mut self, _ctx: ElementContext, name: Bytes, value: Bytes) -> Result<ScanControl> {
        self.append(Param::from_spans(name, value));
        Ok(ScanControl::Continue)
    }
}

/// Set-equality: order is irrelevant, duplicates are counted.
impl PartialEq for Params {
    fn eq(&self, other: &Self) -> bool {
        if self.list.len() != other.list.len() {
            return false;
        }
        let mut used = vec![false; other.list.len()];
        for param in self.list.iter() {
            let mut matched = false;
            for (i, candidate) in other.list.iter().enumerate() {
                if !used[i] && param == candidate {
                    used[i] = true;
                    matched = true;
                    break;
                }
            }
            if !matched {
                return false;
            }
        }
        true
    }
}

impl Eq for Params {}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = Vec::new();
        self.write(&mut out).map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&out))
    }
}
