//! Store record models.
//!
//! These are the shapes the store backends accept and return. They are separate from the API
//! models in [`crate::api::models`] so that storage and wire formats can evolve independently;
//! validation happens on the way from one to the other.
//!
//! - [`cars`]: vehicle listings, their filters and sort order
//! - [`inquiries`]: customer contact requests
//! - [`attributes`]: reference values for the search UI
//! - [`users`]: back office accounts

pub mod attributes;
pub mod cars;
pub mod inquiries;
pub mod users;
