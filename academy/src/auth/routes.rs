//! The screen table and the access each screen requires.
//!
//! Paths may contain `:name` segments which match any single segment and
//! are returned as parameters.

use std::collections::HashMap;

use crate::auth::middleware::{evaluate, AccessRequirement, GateDecision};
use crate::auth::models::AuthSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub pattern: &'static str,
    pub requirement: AccessRequirement,
}

pub const ROUTES: &[Route] = &[
    Route { pattern: "/", requirement: AccessRequirement::PUBLIC },
    Route { pattern: "/signup", requirement: AccessRequirement::PUBLIC },
    Route { pattern: "/signin", requirement: AccessRequirement::PUBLIC },
    Route { pattern: "/courses", requirement: AccessRequirement::PUBLIC },
    Route { pattern: "/course/:courseId", requirement: AccessRequirement::APPROVED },
    Route { pattern: "/admin", requirement: AccessRequirement::ADMIN },
];

#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatch {
    pub route: &'static Route,
    pub params: HashMap<String, String>,
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn match_pattern(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let expected = segments(pattern);
    let actual = segments(path);
    if expected.len() != actual.len() {
        return None;
    }

    let mut params = HashMap::new();
    for (want, got) in expected.iter().zip(actual.iter()) {
        match want.strip_prefix(':') {
            Some(name) => {
                params.insert(name.to_string(), got.to_string());
            }
            None if want == got => {}
            None => return None,
        }
    }
    Some(params)
}

/// Finds the route for `path`, ignoring any query string.
pub fn resolve(path: &str) -> Option<RouteMatch> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    ROUTES.iter().find_map(|route| {
        match_pattern(route.pattern, path).map(|params| RouteMatch { route, params })
    })
}

/// Gate decision for `path`, or `None` for unknown paths.
pub fn check(snapshot: &AuthSnapshot, path: &str) -> Option<GateDecision> {
    resolve(path).map(|m| evaluate(snapshot, &m.route.requirement))
}
