//! Module for the platform's relational data.
//!
//! Rows live in the hosted store; this module only maps them to Rust types
//! and wraps the queries the console issues against them.

pub mod models;
pub mod queries;

pub const PROFILES: &str = "profiles";
pub const COURSES: &str = "courses";
pub const CATEGORIES: &str = "categories";
pub const LESSONS: &str = "lessons";
pub const USER_COURSE_ACCESS: &str = "user_course_access";

/// Remote procedure resolving a user id to zero or one profile row.
pub const GET_USER_PROFILE_RPC: &str = "get_user_profile";
