//! Request and response types for the HTTP API.
//!
//! Field names are camelCase on the wire. Every response is wrapped in the envelope from
//! [`responses`].

pub mod attributes;
pub mod auth;
pub mod cars;
pub mod inquiries;
pub mod pagination;
pub mod responses;
pub mod users;
