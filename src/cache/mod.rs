//! Listing caching layer
//!
//! TTL-based caching of traversed course structures and shallow folder listings.
//! Cuts upstream listing calls to one traversal per root per TTL window.

pub mod listing;

pub use listing::{CacheKey, CacheStats, CachedListing, ListingCache};
