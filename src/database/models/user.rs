use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    #[serde(other)]
    Member,
}

impl Role {
    pub fn is_member(&self) -> bool {
        matches!(self, Role::Member)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email: String,
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Absent on stored documents for ordinary members.
    #[serde(default, skip_serializing_if = "Role::is_member")]
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Registration payload. Carries no role: new accounts are always members.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    #[serde(rename = "photoURL", default)]
    pub photo_url: Option<String>,
}

impl From<NewUser> for User {
    fn from(new: NewUser) -> Self {
        Self {
            id: None,
            name: new.name,
            email: new.email,
            photo_url: new.photo_url,
            role: Role::Member,
        }
    }
}
