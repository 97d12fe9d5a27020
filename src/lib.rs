//! Data-integrity core of a tour-booking API.
//!
//! Two independent pieces: a rating aggregator that keeps each tour's
//! `ratings_quantity`/`ratings_average` consistent with its set of reviews,
//! and the user credential lifecycle (hashing, change tracking, single-use
//! reset tokens). The HTTP layer above is expected to call in through the
//! stores; nothing here speaks a protocol of its own.

pub mod config;
pub mod credentials;
pub mod error;
pub mod models;
pub mod ratings;
pub mod stores;

pub use error::{Error, Result};
pub use ratings::{RatingAggregator, RatingStats, ReviewChanged};
pub use stores::{ReviewStore, UserStore};
