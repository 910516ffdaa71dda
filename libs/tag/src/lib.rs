//! # herd-tag
//!
//! Tag parsing and tag allocation for herd cattle records.
//!
//! ## Tag Format
//!
//! A tag is an uppercase letter prefix followed by a short decimal number:
//! `{prefix}{number}`.
//!
//! Examples:
//! - `A1`
//! - `AB12`
//! - `ZZ999`
//!
//! Prefixes are drawn from a fixed ordered domain (`A`..`Z`, then `AA`..`ZZ`,
//! 702 in total). Each prefix holds at most [`PREFIX_CAPACITY`] tags before the
//! allocator moves on to the next prefix.
//!
//! ## Allocation
//!
//! Allocation is a pure function of a snapshot of existing tags. The same
//! snapshot always yields the same batch, and a batch never repeats a tag that
//! appears in the snapshot. Uniqueness across concurrent writers is left to the
//! store that persists the tags.

mod allocate;
mod error;
mod legacy;
mod parse;
mod prefix;
mod snapshot;

pub use allocate::{allocate, TagAllocator};
pub use error::TagError;
#[allow(deprecated)]
pub use legacy::random_unused_prefix;
pub use parse::{parse_tag, Tag};
pub use prefix::{
    all_prefixes, next_available_prefix, next_available_prefix_with_capacity, PrefixUsage,
    Prefixes, PREFIX_COUNT,
};
pub use snapshot::TagSnapshot;

/// Canonical number of tags allowed under a single prefix.
pub const PREFIX_CAPACITY: u32 = 50;

/// Largest capacity the allocator accepts.
///
/// Tag numbers are at most three digits, so anything above this would mint
/// tags the parser can no longer read back.
pub const MAX_PREFIX_CAPACITY: u32 = 999;
