//! # Message context
//!
//! The knobs that would otherwise be process-wide globals (the
//! compact-vs-full header-name serialization preference and the pluggable
//! header-name-to-constructor factory), carried as an explicit value
//! and threaded through every parse and serialize call. Tests get
//! deterministic, isolated configuration; an embedder that wants one
//! shared configuration simply holds one context.
//!
//! # Examples
//!
//! ```rust
//! use bytes::Bytes;
//! use sipmsg::context::MessageContext;
//! use sipmsg::types::{HeaderName, TypedField};
//!
//! let ctx = MessageContext::new();
//! let field = TypedField::parse(
//!     &HeaderName::Via,
//!     &Bytes::from_static(b"SIP/2.0/UDP host;branch=z9hG4bK1"),
//!     &ctx,
//! ).unwrap();
//! assert!(field.as_via().is_some());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;
use crate::types::cseq::CSeq;
use crate::types::field::{GenericField, TypedField};
use crate::types::header_name::HeaderName;
use crate::types::name_addr::NameAddr;
use crate::types::via::Via;

/// Constructor for one header's typed container. `Arc<dyn Fn>` rather
/// than a plain fn pointer so embedders (and tests) can register stateful
/// constructors.
pub type HeaderCtor = Arc<dyn Fn(&HeaderName, &Bytes) -> Result<TypedField> + Send + Sync>;

/// Maps header identifiers to typed-container constructors. Unregistered
/// headers fall back to [`GenericField`].
#[derive(Clone)]
pub struct HeaderFactory {
    ctors: HashMap<HeaderName, HeaderCtor>,
    fallback: HeaderCtor,
}

impl HeaderFactory {
    /// The standard table: Via, the address headers, and CSeq.
    pub fn new() -> Self {
        let mut factory = HeaderFactory {
            ctors: HashMap::new(),
            fallback: Arc::new(|_, span| Ok(TypedField::Generic(GenericField::parse(span)?))),
        };
        factory.register(
            HeaderName::Via,
            Arc::new(|_, span| Ok(TypedField::Via(Via::parse(span)?))),
        );
        let addr: HeaderCtor = Arc::new(|_, span| Ok(TypedField::NameAddr(NameAddr::parse(span)?)));
        for name in [
            HeaderName::To,
            HeaderName::From,
            HeaderName::Contact,
            HeaderName::Route,
            HeaderName::RecordRoute,
        ] {
            factory.register(name, addr.clone());
        }
        factory.register(
            HeaderName::CSeq,
            Arc::new(|_, span| Ok(TypedField::CSeq(CSeq::parse(span)?))),
        );
        factory
    }

    /// Registers (or replaces) the constructor for a header.
    pub fn register(&mut self, name: HeaderName, ctor: HeaderCtor) {
        self.ctors.insert(name, ctor);
    }

    /// Builds the typed container for one instance span.
    pub fn construct(&self, name: &HeaderName, span: &Bytes) -> Result<TypedField> {
        let ctor = self.ctors.get(name).unwrap_or(&self.fallback);
        ctor(name, span)
    }
}

impl Default for HeaderFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HeaderFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderFactory")
            .field("registered", &self.ctors.len())
            .finish()
    }
}

/// Configuration threaded through parse and serialize calls.
#[derive(Debug, Clone, Default)]
pub struct MessageContext {
    /// Prefer compact header names (`v:` instead of `Via:`) when writing.
    pub compact_names: bool,
    /// Ingestion cap applied to every header list a parse creates;
    /// `None` is unbounded. This is the only defense this core offers
    /// against adversarial instance floods; parse cost itself is linear.
    pub header_limit: Option<usize>,
    factory: HeaderFactory,
}

impl MessageContext {
    pub fn new() -> Self {
        MessageContext {
            compact_names: false,
            header_limit: None,
            factory: HeaderFactory::new(),
        }
    }

    pub fn with_compact_names(mut self, compact: bool) -> Self {
        self.compact_names = compact;
        self
    }

    pub fn with_header_limit(mut self, limit: usize) -> Self {
        self.header_limit = Some(limit);
        self
    }

    pub fn factory(&self) -> &HeaderFactory {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut HeaderFactory {
        &mut self.factory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_unregistered_header_falls_back_to_generic() {
        let ctx = MessageContext::new();
        let field = ctx
            .factory()
            .construct(
                &HeaderName::Other("X-Custom".into()),
                &Bytes::from_static(b"abc;x=1"),
            )
            .unwrap();
        assert!(matches!(field, TypedField::Generic(_)));
    }

    #[test]
    fn test_custom_constructor_wins() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let mut ctx = MessageContext::new();
        ctx.factory_mut().register(
            HeaderName::Subject,
            Arc::new(move |_, span| {
                seen.fetch_add(1, Ordering::Relaxed);
                Ok(TypedField::Generic(GenericField::parse(span)?))
            }),
        );
        ctx.factory()
            .construct(&HeaderName::Subject, &Bytes::from_static(b"hello"))
            .unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }
}
