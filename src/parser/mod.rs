//! The tokenizer and its listener seam.
//!
//! One family of entry points, all shaped "scan this buffer region,
//! driving that listener": [`message::parse_message`] for a whole
//! message, [`headers::parse_header_value`] / [`headers::parse_instance`]
//! for a header's internals (the lazy-promotion path re-enters here), and
//! [`params::parse_params`] for bare parameter runs. Scans are single
//! pass and never backtrack; every span pushed to a listener aliases the
//! input buffer.

pub mod common;
pub mod headers;
pub mod listener;
pub mod message;
pub mod params;

pub use listener::{
    ElementContext, ElementId, HeaderInterest, HeaderListener, MessageListener, ScanControl,
};
pub use message::parse_message;
