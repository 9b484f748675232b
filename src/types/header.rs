//! # Header entries and header lists
//!
//! A header list holds every instance of one header name, in wire order.
//! Each entry is in one of three states, promoted on demand and never
//! demoted:
//!
//! - **Raw**: an unparsed span that may still combine several
//!   comma-joined instances (programmatically injected text starts here);
//! - **Single**: one instance, split out but not yet parsed (the
//!   tokenizer ingests directly into this state);
//! - **Parsed**: the typed container built by the header factory.
//!
//! Most headers of most messages never leave their span state; that is
//! the point. Splitting re-runs the tokenizer over exactly the still-raw
//! spans; promotion re-runs it over exactly one instance; a failure in
//! either leaves the entry (and its siblings) in their prior state and
//! surfaces only to the caller that asked.
//!
//! # Examples
//!
//! ```rust
//! use bytes::Bytes;
//! use sipmsg::context::MessageContext;
//! use sipmsg::types::{HeaderList, HeaderName};
//!
//! let ctx = MessageContext::new();
//! let mut list = HeaderList::new(HeaderName::Via);
//! list.append_raw(Bytes::from_static(
//!     b"SIP/2.0/UDP a.example.com;branch=z9hG4bK1, SIP/2.0/UDP b.example.com;branch=z9hG4bK2",
//! ));
//! assert_eq!(list.len(), 1);
//!
//! list.split_all().unwrap();
//! assert_eq!(list.len(), 2);
//!
//! let first = list.first(&ctx).unwrap().unwrap();
//! assert_eq!(first.as_via().unwrap().host(), b"a.example.com");
//! ```

use std::io;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::context::MessageContext;
use crate::error::Result;
use crate::list::{NodeId, SpliceList};
use crate::parser::headers::split_instances;
use crate::types::field::TypedField;
use crate::types::header_name::HeaderName;

/// One instance (or not-yet-split run of instances) of a header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderEntry {
    /// Unparsed text, possibly several comma-joined instances.
    Raw(Bytes),
    /// Exactly one instance, still a span.
    Single(Bytes),
    /// Promoted typed container.
    Parsed(TypedField),
}

impl HeaderEntry {
    pub fn is_parsed(&self) -> bool {
        matches!(self, HeaderEntry::Parsed(_))
    }

    pub fn as_field(&self) -> Option<&TypedField> {
        match self {
            HeaderEntry::Parsed(field) => Some(field),
            _ => None,
        }
    }

    /// Writes the entry's value text: spans verbatim, typed containers
    /// through their own serializers.
    pub fn write<W: io::Write>(&self, w: &mut W) -> Result<()> {
        match self {
            HeaderEntry::Raw(span) | HeaderEntry::Single(span) => {
                w.write_all(span)?;
                Ok(())
            }
            HeaderEntry::Parsed(field) => field.write(w),
        }
    }
}

/// Every instance of one header name, in wire order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderList {
    name: HeaderName,
    entries: SpliceList<HeaderEntry>,
    /// Ingestion cap; once full, further instances are silently dropped.
    limit: Option<usize>,
}

impl HeaderList {
    pub fn new(name: HeaderName) -> Self {
        HeaderList {
            name,
            entries: SpliceList::new(),
            limit: None,
        }
    }

    pub fn with_limit(name: HeaderName, limit: usize) -> Self {
        HeaderList {
            name,
            entries: SpliceList::new(),
            limit: Some(limit),
        }
    }

    pub fn name(&self) -> &HeaderName {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeaderEntry> {
        self.entries.iter()
    }

    fn has_room(&self) -> bool {
        self.limit.map_or(true, |l| self.entries.len() < l)
    }

    /// Appends one already-split instance span (the tokenizer's
    /// ingestion path). Returns false when the list is full and the
    /// instance was dropped.
    pub fn ingest(&mut self, span: Bytes) -> bool {
        if !self.has_room() {
            trace!(header = %self.name, "ingestion limit reached, dropping instance");
            return false;
        }
        self.entries.push_back(HeaderEntry::Single(span));
        true
    }

    /// Appends combined (possibly multi-instance) text via the programmatic
    /// injection path. The entry starts raw and is split on demand.
    pub fn append_raw(&mut self, span: Bytes) -> bool {
        if !self.has_room() {
            trace!(header = %self.name, "ingestion limit reached, dropping raw text");
            return false;
        }
        self.entries.push_back(HeaderEntry::Raw(span));
        true
    }

    /// Appends an already-typed value.
    pub fn append_field(&mut self, field: TypedField) -> bool {
        if !self.has_room() {
            return false;
        }
        self.entries.push_back(HeaderEntry::Parsed(field));
        true
    }

    /// Splits every still-raw entry into its single instances, splicing
    /// each run in place of its source entry and preserving order. Cost
    /// is proportional to the raw remainder only; split and parsed
    /// entries are not rescanned.
    pub fn split_all(&mut self) -> Result<()> {
        let raw_ids: Vec<NodeId> = self
            .entries
            .ids()
            .filter(|&id| matches!(self.entries.get(id), Some(HeaderEntry::Raw(_))))
            .collect();
        for id in raw_ids {
            let span = match self.entries.get(id) {
                Some(HeaderEntry::Raw(span)) => span.clone(),
                _ => continue,
            };
            let mut instances = split_instances(&self.name, &span);
            if let Some(limit) = self.limit {
                // The raw entry itself occupies one slot; its expansion may
                // not push the list past the cap.
                let allowed = limit.saturating_sub(self.entries.len() - 1);
                if instances.len() > allowed {
                    trace!(header = %self.name, dropped = instances.len() - allowed,
                        "split exceeded ingestion limit");
                    instances.truncate(allowed);
                }
            }
            self.entries
                .replace_with_run(id, instances.into_iter().map(HeaderEntry::Single));
        }
        Ok(())
    }

    fn promote_at(&mut self, id: NodeId, ctx: &MessageContext) -> Result<()> {
        let span = match self.entries.get(id) {
            Some(HeaderEntry::Single(span)) => span.clone(),
            _ => return Ok(()),
        };
        let field = TypedField::parse(&self.name, &span, ctx)?;
        self.entries.replace(id, HeaderEntry::Parsed(field));
        Ok(())
    }

    /// Promotes every entry to its typed form. Already-parsed entries are
    /// untouched, so a second validation re-parses nothing. A failure
    /// surfaces to the caller and leaves the failing entry (and everything
    /// after it) in span form.
    pub fn validate(&mut self, ctx: &MessageContext) -> Result<()> {
        self.split_all()?;
        let ids: Vec<NodeId> = self.entries.ids().collect();
        for id in ids {
            self.promote_at(id, ctx)?;
        }
        Ok(())
    }

    /// The first instance, validated on demand.
    pub fn first(&mut self, ctx: &MessageContext) -> Result<Option<&TypedField>> {
        self.split_all()?;
        if let Some(id) = self.entries.head() {
            self.promote_at(id, ctx)?;
        }
        Ok(self.entries.front().and_then(HeaderEntry::as_field))
    }

    /// The last instance, validated on demand.
    pub fn last(&mut self, ctx: &MessageContext) -> Result<Option<&TypedField>> {
        self.split_all()?;
        if let Some(id) = self.entries.tail() {
            self.promote_at(id, ctx)?;
        }
        Ok(self.entries.back().and_then(HeaderEntry::as_field))
    }

    pub fn remove_first(&mut self) -> Option<HeaderEntry> {
        self.entries.pop_front()
    }

    pub fn remove_last(&mut self) -> Option<HeaderEntry> {
        self.entries.pop_back()
    }

    /// Order-sensitive equality: both lists are fully validated first,
    /// then compared pairwise. (Parameter tables are set-equal; header
    /// lists are not: `X, Y` and `Y, X` differ.)
    pub fn equals(&mut self, other: &mut HeaderList, ctx: &MessageContext) -> Result<bool> {
        if self.name != other.name {
            return Ok(false);
        }
        self.validate(ctx)?;
        other.validate(ctx)?;
        Ok(self.entries == other.entries)
    }

    fn write_name<W: io::Write>(&self, w: &mut W, ctx: &MessageContext) -> Result<()> {
        let name = if ctx.compact_names {
            self.name.compact().unwrap_or_else(|| self.name.as_str())
        } else {
            self.name.as_str()
        };
        w.write_all(name.as_bytes())?;
        w.write_all(b": ")?;
        Ok(())
    }

    /// Writes `Name: v1, v2, ... CRLF`, all instances on one line.
    pub fn write_combined<W: io::Write>(&self, w: &mut W, ctx: &MessageContext) -> Result<()> {
        if self.entries.is_empty() {
            return Ok(());
        }
        self.write_name(w, ctx)?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                w.write_all(b", ")?;
            }
            entry.write(w)?;
        }
        w.write_all(b"\r\n")?;
        Ok(())
    }

    /// Writes one `Name: value CRLF` line per entry.
    pub fn write_lines<W: io::Write>(&self, w: &mut W, ctx: &MessageContext) -> Result<()> {
        for entry in self.entries.iter() {
            self.write_name(w, ctx)?;
            entry.write(w)?;
            w.write_all(b"\r\n")?;
        }
        Ok(())
    }

    /// Empties the list for pool reuse, keeping its name, limit, and
    /// allocated capacity.
    pub fn re_init(&mut self) {
        self.entries.re_init();
    }
}
