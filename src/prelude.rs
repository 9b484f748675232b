//! Convenience re-exports of the common surface.

pub use crate::context::{HeaderCtor, HeaderFactory, MessageContext};
pub use crate::error::{Error, Result};
pub use crate::list::{NodeId, SpliceList};
pub use crate::parser::{
    ElementContext, ElementId, HeaderInterest, HeaderListener, MessageListener, ScanControl,
};
pub use crate::token::{decode_message, encode_message};
pub use crate::transaction::{TransactionKey, TransactionKeyBuilder};
pub use crate::types::{
    CSeq, GenericField, HeaderEntry, HeaderList, HeaderName, Method, NameAddr, Param, Params,
    SipMessage, StartLine, TypedField, Via, MAGIC_COOKIE,
};
