//! Access control for protected screens.
//!
//! [`evaluate`] turns the current auth state and a route's
//! [`AccessRequirement`] into a [`GateDecision`]. It holds no state and
//! never talks to the network.

use std::fmt;

use crate::auth::models::AuthSnapshot;
use crate::database::models::Role;

pub const SIGN_IN_PATH: &str = "/signin";
pub const HOME_PATH: &str = "/";
pub const CATALOG_PATH: &str = "/courses";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessRequirement {
    pub require_auth: bool,
    pub role: Option<Role>,
    pub require_approved: bool,
}

impl AccessRequirement {
    pub const PUBLIC: Self = Self {
        require_auth: false,
        role: None,
        require_approved: false,
    };

    pub const AUTHENTICATED: Self = Self {
        require_auth: true,
        role: None,
        require_approved: false,
    };

    pub const APPROVED: Self = Self {
        require_auth: true,
        role: None,
        require_approved: true,
    };

    pub const ADMIN: Self = Self {
        require_auth: true,
        role: Some(Role::Admin),
        require_approved: false,
    };

    pub fn is_public(&self) -> bool {
        *self == Self::PUBLIC
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    SignedOut,
    MissingRole(Role),
    NotApproved,
}

impl DenyReason {
    /// Where the user is sent instead.
    pub fn redirect_to(&self) -> &'static str {
        match self {
            DenyReason::SignedOut => SIGN_IN_PATH,
            DenyReason::MissingRole(_) => HOME_PATH,
            DenyReason::NotApproved => CATALOG_PATH,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            DenyReason::SignedOut => "يجب تسجيل الدخول",
            DenyReason::MissingRole(_) => "ليس لديك صلاحية الوصول إلى هذه الصفحة",
            DenyReason::NotApproved => "يجب أن يتم الموافقة على حسابك أولاً",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::SignedOut => write!(f, "not signed in"),
            DenyReason::MissingRole(role) => write!(f, "requires role {role}"),
            DenyReason::NotApproved => write!(f, "account not approved"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Auth state still loading. Render nothing, redirect nowhere.
    Pending,
    Allow,
    Deny(DenyReason),
}

impl GateDecision {
    pub fn redirect_to(&self) -> Option<&'static str> {
        match self {
            GateDecision::Deny(reason) => Some(reason.redirect_to()),
            _ => None,
        }
    }
}

pub fn evaluate(snapshot: &AuthSnapshot, requirement: &AccessRequirement) -> GateDecision {
    if requirement.is_public() {
        return GateDecision::Allow;
    }
    if snapshot.loading {
        return GateDecision::Pending;
    }
    if snapshot.user.is_none() {
        return GateDecision::Deny(DenyReason::SignedOut);
    }

    let profile = snapshot.profile.as_ref();
    if let Some(required) = requirement.role {
        if !profile.is_some_and(|p| p.role.satisfies(required)) {
            return GateDecision::Deny(DenyReason::MissingRole(required));
        }
    }
    if requirement.require_approved && !profile.is_some_and(|p| p.is_approved()) {
        return GateDecision::Deny(DenyReason::NotApproved);
    }
    GateDecision::Allow
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::ProfileStatus;
    use crate::testing::{profile, session};

    fn signed_in(role: Role, status: ProfileStatus) -> AuthSnapshot {
        let session = session("u1");
        AuthSnapshot {
            user: Some(session.user.clone()),
            session: Some(session),
            profile: Some(profile("u1", role, status)),
            loading: false,
            profile_pending: false,
        }
    }

    fn signed_out() -> AuthSnapshot {
        AuthSnapshot {
            loading: false,
            ..AuthSnapshot::default()
        }
    }

    #[test]
    fn loading_is_pending_not_redirect() {
        let decision = evaluate(&AuthSnapshot::initial(), &AccessRequirement::ADMIN);
        assert_eq!(decision, GateDecision::Pending);
        assert_eq!(decision.redirect_to(), None);
    }

    #[test]
    fn public_routes_ignore_state() {
        assert_eq!(evaluate(&AuthSnapshot::initial(), &AccessRequirement::PUBLIC), GateDecision::Allow);
        assert_eq!(evaluate(&signed_out(), &AccessRequirement::PUBLIC), GateDecision::Allow);
    }

    #[test]
    fn signed_out_goes_to_sign_in() {
        let decision = evaluate(&signed_out(), &AccessRequirement::AUTHENTICATED);
        assert_eq!(decision.redirect_to(), Some("/signin"));
    }

    #[test]
    fn role_mismatch_goes_home() {
        let decision = evaluate(&signed_in(Role::User, ProfileStatus::Approved), &AccessRequirement::ADMIN);
        assert_eq!(decision, GateDecision::Deny(DenyReason::MissingRole(Role::Admin)));
        assert_eq!(decision.redirect_to(), Some("/"));
    }

    #[test]
    fn missing_profile_fails_role_check() {
        let mut snapshot = signed_in(Role::Admin, ProfileStatus::Approved);
        snapshot.profile = None;
        assert!(matches!(
            evaluate(&snapshot, &AccessRequirement::ADMIN),
            GateDecision::Deny(DenyReason::MissingRole(_))
        ));
    }

    #[test]
    fn admin_without_approval_is_denied_when_approval_required() {
        let requirement = AccessRequirement {
            require_auth: true,
            role: Some(Role::Admin),
            require_approved: true,
        };
        let decision = evaluate(&signed_in(Role::Admin, ProfileStatus::Pending), &requirement);
        assert_eq!(decision, GateDecision::Deny(DenyReason::NotApproved));
        assert_eq!(decision.redirect_to(), Some("/courses"));
    }

    #[test]
    fn matching_role_allowed_without_approval_requirement() {
        let snapshot = signed_in(Role::Admin, ProfileStatus::Pending);
        assert_eq!(evaluate(&snapshot, &AccessRequirement::ADMIN), GateDecision::Allow);
    }

    #[test]
    fn admin_satisfies_user_role() {
        let requirement = AccessRequirement {
            require_auth: true,
            role: Some(Role::User),
            require_approved: false,
        };
        let snapshot = signed_in(Role::Admin, ProfileStatus::Approved);
        assert_eq!(evaluate(&snapshot, &requirement), GateDecision::Allow);
    }

    #[test]
    fn approved_learner_can_open_courses() {
        let snapshot = signed_in(Role::User, ProfileStatus::Approved);
        assert_eq!(evaluate(&snapshot, &AccessRequirement::APPROVED), GateDecision::Allow);
        let rejected = signed_in(Role::User, ProfileStatus::Rejected);
        assert_eq!(
            evaluate(&rejected, &AccessRequirement::APPROVED),
            GateDecision::Deny(DenyReason::NotApproved)
        );
    }
}
