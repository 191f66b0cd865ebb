//! Module for user administration.
//!
//! Covers what the admin screen does with accounts: browsing profiles,
//! approving or rejecting them, and creating new ones.

pub mod handlers;
pub mod routes;
