//! # Transaction key
//!
//! The derived value that indexes RFC 3261 transactions
//! ([Section 17.2.3](https://datatracker.ietf.org/doc/html/rfc3261#section-17.2.3)).
//! It captures, from a single parse of Via/To/CSeq, the top Via branch
//! (only when the magic cookie vouches for its global uniqueness), the
//! CSeq method, the To tag, and the Via sent-by host/port.
//!
//! Two context flags shape matching:
//!
//! - **incoming**: fold the source host/port into identity; a server
//!   must not match requests arriving from different sources;
//! - **lookup**: suppress method-sensitivity so an ACK, CANCEL, or PRACK
//!   probe can find the INVITE transaction it targets. With the flag
//!   unset those three methods require exact method equality, since their
//!   keys are otherwise structurally identical to the INVITE's.
//!
//! The hash is a multiply-by-31 polynomial over the identity fields, computed
//! lazily and cached; changing a flag invalidates the cache. The method
//! never participates in the hash: a lookup-mode CANCEL probe must land
//! in its INVITE's bucket, and `Hash`/`Eq` consistency forbids hashing a
//! field that equality only sometimes consults.
//!
//! # Examples
//!
//! ```rust
//! use bytes::Bytes;
//! use sipmsg::context::MessageContext;
//! use sipmsg::transaction::TransactionKey;
//! use sipmsg::types::SipMessage;
//!
//! let raw = Bytes::from_static(
//!     b"INVITE sip:bob@biloxi.com SIP/2.0\r\n\
//!       Via: SIP/2.0/UDP pc33.atlanta.com;branch=z9hG4bK776asdhds\r\n\
//!       To: Bob <sip:bob@biloxi.com>\r\n\
//!       From: Alice <sip:alice@atlanta.com>;tag=1928301774\r\n\
//!       CSeq: 314159 INVITE\r\n\
//!       \r\n",
//! );
//! let ctx = MessageContext::new();
//! let (_msg, key) = SipMessage::parse_with_key(&raw, &ctx).unwrap();
//! assert!(key.validate().is_ok());
//! ```

use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::parser::listener::{ElementContext, ElementId, HeaderListener, ScanControl};
use crate::types::method::Method;
use crate::types::via::MAGIC_COOKIE;

/// RFC 3261 transaction-matching key.
///
/// Equality and hashing follow the matching rules exactly; the cached
/// hash makes the key deliberately `!Sync`, which states the external
/// single-writer discipline in the type system.
#[derive(Debug, Clone)]
pub struct TransactionKey {
    /// Top Via branch; `None` unless it carried the magic cookie.
    branch: Option<Bytes>,
    /// CSeq method.
    method: Option<Method>,
    /// To tag, captured for diagnostics and dialog-layer use.
    to_tag: Option<Bytes>,
    /// Top Via sent-by host, verbatim.
    source_host: Option<Bytes>,
    /// Top Via sent-by port.
    source_port: Option<u16>,
    incoming: bool,
    lookup: bool,
    cached_hash: Cell<Option<u64>>,
}

/// Methods whose keys would collide with their target INVITE: they get
/// exact method comparison unless the lookup flag suppresses it.
const METHOD_SENSITIVE: [Method; 3] = [Method::Cancel, Method::Ack, Method::Prack];

impl TransactionKey {
    /// Builds a key by scanning one message's Via/To/CSeq headers.
    /// Prefer [`SipMessage::parse_with_key`](crate::types::SipMessage::parse_with_key),
    /// which extracts the key during the initial scan.
    pub fn builder() -> TransactionKeyBuilder {
        TransactionKeyBuilder::default()
    }

    pub fn branch(&self) -> Option<&[u8]> {
        self.branch.as_deref()
    }

    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    pub fn to_tag(&self) -> Option<&[u8]> {
        self.to_tag.as_deref()
    }

    pub fn source_host(&self) -> Option<&[u8]> {
        self.source_host.as_deref()
    }

    pub fn source_port(&self) -> Option<u16> {
        self.source_port
    }

    pub fn is_incoming(&self) -> bool {
        self.incoming
    }

    pub fn is_lookup(&self) -> bool {
        self.lookup
    }

    /// Folds the source host/port into identity. Invalidates the cached
    /// hash.
    pub fn set_incoming(&mut self, incoming: bool) {
        if self.incoming != incoming {
            self.incoming = incoming;
            self.cached_hash.set(None);
        }
    }

    /// Marks the key as a lookup probe: method-sensitivity is suppressed
    /// so ACK/CANCEL/PRACK match their target transaction. Invalidates
    /// the cached hash.
    pub fn set_lookup(&mut self, lookup: bool) {
        if self.lookup != lookup {
            self.lookup = lookup;
            self.cached_hash.set(None);
        }
    }

    /// Rejects a key that could silently collide with unrelated
    /// transactions: no magic-cookie branch, or no recognizable CSeq
    /// method. Call before using the key for a table lookup.
    pub fn validate(&self) -> Result<()> {
        if self.branch.is_none() {
            return Err(Error::InvalidTransactionKey(
                "no magic-cookie branch was found in the top Via".into(),
            ));
        }
        if self.method.is_none() {
            return Err(Error::InvalidTransactionKey(
                "no CSeq method was found".into(),
            ));
        }
        Ok(())
    }

    /// The lazily cached polynomial hash over the identity fields.
    pub fn hash_value(&self) -> u64 {
        if let Some(h) = self.cached_hash.get() {
            return h;
        }
        let mut h: u64 = 17;
        if let Some(branch) = &self.branch {
            for &b in branch.iter() {
                h = h.wrapping_mul(31).wrapping_add(u64::from(b));
            }
        }
        if self.incoming {
            if let Some(host) = &self.source_host {
                for &b in host.iter() {
                    h = h.wrapping_mul(31).wrapping_add(u64::from(b));
                }
            }
            h = h
                .wrapping_mul(31)
                .wrapping_add(u64::from(self.source_port.unwrap_or(0)));
        }
        self.cached_hash.set(Some(h));
        h
    }

    fn method_sensitive(&self) -> bool {
        !self.lookup
            && self
                .method
                .as_ref()
                .is_some_and(|m| METHOD_SENSITIVE.contains(m))
    }
}

impl PartialEq for TransactionKey {
    fn eq(&self, other: &Self) -> bool {
        // Branch must match exactly, including both-absent.
        if self.branch != other.branch {
            return false;
        }
        // Method-sensitivity triggers when either side is a non-lookup
        // ACK/CANCEL/PRACK key; symmetric by construction.
        if (self.method_sensitive() || other.method_sensitive()) && self.method != other.method {
            return false;
        }
        if (self.incoming || other.incoming)
            && (self.source_host != other.source_host || self.source_port != other.source_port)
        {
            return false;
        }
        true
    }
}

impl Eq for TransactionKey {}

impl Hash for TransactionKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_value());
    }
}

impl fmt::Display for TransactionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn span(field: &Option<Bytes>) -> String {
            field
                .as_deref()
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_else(|| "-".into())
        }
        write!(
            f,
            "txn-key[branch={} method={} to-tag={} source={}:{} incoming={} lookup={}]",
            span(&self.branch),
            self.method
                .as_ref()
                .map(Method::as_str)
                .unwrap_or("-"),
            span(&self.to_tag),
            span(&self.source_host),
            self.source_port
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".into()),
            self.incoming,
            self.lookup,
        )
    }
}

/// Builds a [`TransactionKey`] from listener callbacks; wire it into the
/// message scan (it only ever receives Via, To, and CSeq internals) or
/// drive it manually over stored spans.
#[derive(Debug, Default)]
pub struct TransactionKeyBuilder {
    branch: Option<Bytes>,
    method: Option<Method>,
    to_tag: Option<Bytes>,
    source_host: Option<Bytes>,
    source_port: Option<u16>,
    /// Set once the top Via instance has been consumed; later Via hops
    /// are not part of transaction identity.
    via_done: bool,
    via_seen: bool,
}

impl TransactionKeyBuilder {
    pub fn finish(self) -> TransactionKey {
        TransactionKey {
            branch: self.branch,
            method: self.method,
            to_tag: self.to_tag,
            source_host: self.source_host,
            source_port: self.source_port,
            incoming: false,
            lookup: false,
            cached_hash: Cell::new(None),
        }
    }
}

impl HeaderListener for TransactionKeyBuilder {
    fn element(&mut self, ctx: ElementContext, id: ElementId, span: Bytes) -> Result<ScanControl> {
        match (ctx, id) {
            (ElementContext::Via, ElementId::Protocol) => {
                if self.via_seen {
                    self.via_done = true;
                } else {
                    self.via_seen = true;
                }
            }
            (ElementContext::Via, ElementId::Host) if !self.via_done => {
                self.source_host = Some(span);
            }
            (ElementContext::Via, ElementId::Port) if !self.via_done => {
                let text = std::str::from_utf8(&span)
                    .map_err(|_| Error::parser("Via: non-ASCII port"))?;
                self.source_port = text.parse::<u16>().ok();
            }
            (ElementContext::CSeq, ElementId::Method) => {
                let text = std::str::from_utf8(&span)
                    .map_err(|_| Error::parser("CSeq: non-ASCII method"))?;
                self.method = Some(Method::from_str(text)?);
            }
            _ => {}
        }
        Ok(ScanControl::Continue)
    }

    fn parameter(&mut self, ctx: ElementContext, name: Bytes, value: Bytes) -> Result<ScanControl> {
        match ctx {
            ElementContext::Via if !self.via_done => {
                // Only a magic-cookie branch identifies a transaction;
                // anything else is treated as absent.
                if name.eq_ignore_ascii_case(b"branch")
                    && value.starts_with(MAGIC_COOKIE)
                    && self.branch.is_none()
                {
                    self.branch = Some(value);
                }
            }
            ElementContext::NameAddr => {
                if name.eq_ignore_ascii_case(b"tag") && self.to_tag.is_none() {
                    self.to_tag = Some(value);
                }
            }
            _ => {}
        }
        Ok(ScanControl::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(branch: Option<&str>, method: Method) -> TransactionKey {
        TransactionKey {
            branch: branch.map(|b| Bytes::copy_from_slice(b.as_bytes())),
            method: Some(method),
            to_tag: None,
            source_host: Some(Bytes::from_static(b"client.example.com")),
            source_port: Some(5060),
            incoming: false,
            lookup: false,
            cached_hash: Cell::new(None),
        }
    }

    #[test]
    fn test_branch_must_match_including_both_absent() {
        assert_eq!(key(None, Method::Invite), key(None, Method::Invite));
        assert_ne!(
            key(Some("z9hG4bKa"), Method::Invite),
            key(Some("z9hG4bKb"), Method::Invite)
        );
        assert_ne!(key(Some("z9hG4bKa"), Method::Invite), key(None, Method::Invite));
    }

    #[test]
    fn test_lookup_suppresses_method_sensitivity() {
        let invite = key(Some("z9hG4bKa"), Method::Invite);
        let mut cancel = key(Some("z9hG4bKa"), Method::Cancel);

        // Non-lookup CANCEL vs INVITE: methods differ, unequal both ways.
        assert_ne!(cancel, invite);
        assert_ne!(invite, cancel);

        cancel.set_lookup(true);
        assert_eq!(cancel, invite);
        assert_eq!(invite, cancel);
        assert_eq!(cancel.hash_value(), invite.hash_value());
    }

    #[test]
    fn test_non_sensitive_methods_ignore_method_field() {
        // Two different non-sensitive methods with the same branch match;
        // the branch alone identifies the transaction.
        assert_eq!(
            key(Some("z9hG4bKa"), Method::Invite),
            key(Some("z9hG4bKa"), Method::Bye)
        );
    }

    #[test]
    fn test_incoming_folds_source_into_identity() {
        let mut a = key(Some("z9hG4bKa"), Method::Invite);
        let mut b = key(Some("z9hG4bKa"), Method::Invite);
        b.source_port = Some(5061);

        // Without the flag the differing port is invisible.
        assert_eq!(a, b);

        a.set_incoming(true);
        b.set_incoming(true);
        assert_ne!(a, b);
        assert_ne!(a.hash_value(), b.hash_value());
    }

    #[test]
    fn test_flag_change_invalidates_cached_hash() {
        let mut k = key(Some("z9hG4bKa"), Method::Invite);
        let before = k.hash_value();
        assert_eq!(k.cached_hash.get(), Some(before));
        k.set_incoming(true);
        assert_eq!(k.cached_hash.get(), None);
        let after = k.hash_value();
        assert_ne!(before, after);
    }

    #[test]
    fn test_validate_rejects_incomplete_key() {
        let no_branch = key(None, Method::Invite);
        assert!(matches!(
            no_branch.validate(),
            Err(Error::InvalidTransactionKey(_))
        ));

        let mut no_method = key(Some("z9hG4bKa"), Method::Invite);
        no_method.method = None;
        assert!(no_method.validate().is_err());

        assert!(key(Some("z9hG4bKa"), Method::Invite).validate().is_ok());
    }

    #[test]
    fn test_display_dump_names_fields() {
        let k = key(Some("z9hG4bKa"), Method::Cancel);
        let dump = k.to_string();
        assert!(dump.contains("branch=z9hG4bKa"));
        assert!(dump.contains("method=CANCEL"));
    }
}
