//! Transaction matching support: the derived key that indexes RFC 3261
//! transactions.

mod key;

pub use key::{TransactionKey, TransactionKeyBuilder};
