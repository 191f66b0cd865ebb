//! Module for the course catalog and course viewer.

pub mod handlers;
pub mod routes;
