//! API Controller modules
//!
//! Controllers read through the shared query caches, so concurrent
//! requests for the same data share one provider call.

pub mod coins;
pub mod misc;
pub mod response;
pub mod search;
