//! Rust structs that represent the platform's table mappings.
//!
//! These models define the structure of rows as the REST layer returns them
//! for `profiles`, `courses`, `categories`, `lessons` and
//! `user_course_access`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Whether holding `self` is enough for a route that asks for `required`.
    pub fn satisfies(&self, required: Role) -> bool {
        match required {
            Role::User => true,
            Role::Admin => *self == Role::Admin,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    Pending,
    Approved,
    Rejected,
}

impl ProfileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileStatus::Pending => "pending",
            ProfileStatus::Approved => "approved",
            ProfileStatus::Rejected => "rejected",
        }
    }

    /// Arabic label shown next to a user.
    pub fn label(&self) -> &'static str {
        match self {
            ProfileStatus::Pending => "قيد المراجعة",
            ProfileStatus::Approved => "مقبول",
            ProfileStatus::Rejected => "مرفوض",
        }
    }
}

impl fmt::Display for ProfileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(ProfileStatus::Pending),
            "approved" => Ok(ProfileStatus::Approved),
            "rejected" => Ok(ProfileStatus::Rejected),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

/// Application-level record for one identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub role: Role,
    pub status: ProfileStatus,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_approved(&self) -> bool {
        self.status == ProfileStatus::Approved
    }

    /// Two-letter avatar fallback.
    pub fn initials(&self) -> String {
        if let Some(name) = self.full_name.as_deref().filter(|n| !n.trim().is_empty()) {
            let words: Vec<&str> = name.split_whitespace().collect();
            if words.len() >= 2 {
                return words[..2]
                    .iter()
                    .filter_map(|w| w.chars().next())
                    .collect::<String>()
                    .to_uppercase();
            }
            return name.trim().chars().take(2).collect::<String>().to_uppercase();
        }
        if let Some(email) = self.email.as_deref().filter(|e| !e.is_empty()) {
            return email.chars().take(2).collect::<String>().to_uppercase();
        }
        "U".to_string()
    }
}

/// Embedded category columns selected alongside a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub name_ar: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub instructor_name: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub is_published: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub categories: Option<CategoryRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub name_ar: String,
    pub slug: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: String,
    #[serde(default)]
    pub course_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub order_index: i32,
    #[serde(default)]
    pub is_free: bool,
    #[serde(default)]
    pub content: Option<String>,
}

/// A learner's enrolment in one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseAccess {
    pub user_id: String,
    pub course_id: String,
    #[serde(default)]
    pub accessed_at: Option<String>,
    #[serde(default)]
    pub progress: u8,
    /// Ids of the lessons finished so far; `progress` is derived from it.
    #[serde(default)]
    pub completed_lessons: Vec<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(full_name: Option<&str>, email: Option<&str>) -> Profile {
        Profile {
            id: "u1".into(),
            email: email.map(Into::into),
            full_name: full_name.map(Into::into),
            avatar_url: None,
            role: Role::User,
            status: ProfileStatus::Pending,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn profile_row_deserializes() {
        let row = serde_json::json!({
            "id": "u1",
            "email": "a@example.com",
            "full_name": "أحمد علي",
            "avatar_url": null,
            "role": "admin",
            "status": "approved",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z"
        });
        let p: Profile = serde_json::from_value(row).unwrap();
        assert!(p.is_admin());
        assert!(p.is_approved());
    }

    #[test]
    fn admin_satisfies_user_requirement() {
        assert!(Role::Admin.satisfies(Role::User));
        assert!(!Role::User.satisfies(Role::Admin));
    }

    #[test]
    fn initials_follow_name_then_email() {
        assert_eq!(profile(Some("sara ahmed"), None).initials(), "SA");
        assert_eq!(profile(Some("omar"), None).initials(), "OM");
        assert_eq!(profile(None, Some("zed@example.com")).initials(), "ZE");
        assert_eq!(profile(None, None).initials(), "U");
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Approved".parse::<ProfileStatus>().unwrap(), ProfileStatus::Approved);
        assert!("archived".parse::<ProfileStatus>().is_err());
    }
}
