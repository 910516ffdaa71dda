//! # herd-id
//!
//! Typed identifiers for herd records.
//!
//! Every record ID is `{prefix}_{ulid}`, where the prefix names the record
//! kind:
//!
//! - `usr_01HV4Z2WQXKJNM8GPQY6VBKC3D` (user)
//! - `cat_01HV4Z3MXNKPQR9HSTZ7WCLD4E` (one animal)
//! - `trt_01HV4Z4NYPLTRS0JTUA8XDME5F` (one treatment)
//!
//! Cattle also carry a human-facing tag number (`A12`); that lives in
//! `herd-tag` and is unrelated to these IDs.

mod error;
mod macros;
mod types;

pub use error::IdError;
pub use types::*;

#[doc(hidden)]
pub use ulid::Ulid;
