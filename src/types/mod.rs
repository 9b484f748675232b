//! The SIP message object model: parameters, headers, typed fields, and
//! the message itself.

pub mod cseq;
pub mod field;
pub mod header;
pub mod header_name;
pub mod message;
pub mod method;
pub mod name_addr;
pub mod param;
pub mod params;
pub mod via;

pub use cseq::CSeq;
pub use field::{GenericField, TypedField};
pub use header::{HeaderEntry, HeaderList};
pub use header_name::HeaderName;
pub use message::{SipMessage, StartLine};
pub use method::Method;
pub use name_addr::NameAddr;
pub use param::Param;
pub use params::Params;
pub use via::{Via, MAGIC_COOKIE};
