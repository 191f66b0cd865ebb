//! Administration console for the academy platform.
//!
//! Sessions, profiles and access decisions live in [`auth`]; account import
//! and course progress in [`services`]; the command groups in [`api`].

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod database;
pub mod errors;
pub mod services;

#[cfg(test)]
mod testing;
