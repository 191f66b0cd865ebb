//! Module for course categories.

pub mod handlers;
pub mod routes;
