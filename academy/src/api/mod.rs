//! Central module for organizing the console's command groups.
//!
//! This module acts as a top-level container for the different domains the
//! console manages: user administration, courses and categories. Sign-in
//! and session commands live in `auth`.

pub mod category;
pub mod course;
pub mod user;
