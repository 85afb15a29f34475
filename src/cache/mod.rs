//! Cache addressing and retrieval
//!
//! `layout` derives cache-relative paths from artifact identities;
//! `local` reads artifact bytes out of a cache root on disk. Both sides of
//! the cache (the uploader, which is not this crate, and this retriever)
//! must agree on the layout without coordination, so path derivation is a
//! pure function of the identity.

pub mod layout;
pub mod local;

pub use layout::{CacheLayout, LayoutError};
pub use local::{FetchError, FetchResult, LocalCache};
