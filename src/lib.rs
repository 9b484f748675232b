//! # sipmsg
//!
//! Zero-copy SIP message model and parsing core: the object model and
//! single-pass tokenizer a proxy or server builds its signaling on.
//!
//! Raw [RFC 3261](https://datatracker.ietf.org/doc/html/rfc3261) bytes
//! become structured, mutable, poolable messages with minimal copying
//! (every header and parameter is a span into the original buffer until
//! something actually asks for a typed view) and serialize back to wire
//! bytes in either the textual form or a compact binary "token" form.
//!
//! ## What lives here
//!
//! - [`list`]: the splice list, an arena-backed doubly linked container
//!   with O(1) insert/remove/replace next to a known element;
//! - [`types`]: parameters and parameter tables, header entries with
//!   lazy raw/split/parsed promotion, the minimal typed fields (Via,
//!   address, CSeq), and [`SipMessage`](types::SipMessage) itself;
//! - [`parser`]: the nom tokenizer and the push listener seam it drives;
//! - [`transaction`]: the RFC 3261 transaction-matching key;
//! - [`token`]: the compact binary wire form;
//! - [`context`]: the explicit configuration value (compact names,
//!   header factory, ingestion limits) threaded through parse and
//!   serialize calls.
//!
//! ## Example
//!
//! ```rust
//! use bytes::Bytes;
//! use sipmsg::prelude::*;
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
//! let (msg, mut key) = SipMessage::parse_with_key(&raw, &ctx).unwrap();
//!
//! key.set_lookup(true);
//! key.validate().unwrap();
//! assert!(msg.start().is_request());
//! ```
//!
//! ## Threading
//!
//! All operations run synchronously on the caller's thread. A message
//! and everything it owns belong to one thread at a time; nothing here
//! locks. Pool owners must guarantee exclusive access across `re_init`
//! before handing an object to new work.

pub mod context;
pub mod error;
pub mod list;
pub mod parser;
pub mod token;
pub mod transaction;
pub mod types;

pub mod prelude;

pub use context::{HeaderFactory, MessageContext};
pub use error::{Error, Result};
