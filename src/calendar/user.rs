use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Unknown role '{0}'")]
pub struct UnknownRole(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
    Viewer,
}

/// What a role may do. Every role check in the crate goes through this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Permissions {
    pub can_create_events: bool,
    pub can_edit_events: bool,
    pub can_delete_events: bool,
    pub can_manage_users: bool,
}

impl Permissions {
    pub const fn none() -> Self {
        Self {
            can_create_events: false,
            can_edit_events: false,
            can_delete_events: false,
            can_manage_users: false,
        }
    }

    pub fn includes(&self, other: &Permissions) -> bool {
        (self.can_create_events || !other.can_create_events)
            && (self.can_edit_events || !other.can_edit_events)
            && (self.can_delete_events || !other.can_delete_events)
            && (self.can_manage_users || !other.can_manage_users)
    }
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Editor, Role::Viewer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "Administrator",
            Role::Editor => "Editor",
            Role::Viewer => "Viewer",
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            Role::Admin => "Full access, user management",
            Role::Editor => "Create and edit events",
            Role::Viewer => "View events only",
        }
    }

    pub const fn permissions(&self) -> Permissions {
        match self {
            Role::Admin => Permissions {
                can_create_events: true,
                can_edit_events: true,
                can_delete_events: true,
                can_manage_users: true,
            },
            Role::Editor => Permissions {
                can_create_events: true,
                can_edit_events: true,
                can_delete_events: false,
                can_manage_users: false,
            },
            Role::Viewer => Permissions::none(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.permissions().can_manage_users
    }

    pub fn next(&self) -> Role {
        match self {
            Role::Admin => Role::Editor,
            Role::Editor => Role::Viewer,
            Role::Viewer => Role::Admin,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            "viewer" => Ok(Role::Viewer),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl User {
    pub fn permissions(&self) -> Permissions {
        self.role.permissions()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl NewUser {
    pub fn new(email: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            role,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub const BOOTSTRAP_USERS: [(&str, &str, Role); 3] = [
    ("admin@oiaa.edu", "OIAA Administrator", Role::Admin),
    ("coordinator@oiaa.edu", "Event Coordinator", Role::Editor),
    ("assistant@oiaa.edu", "Office Assistant", Role::Viewer),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_has_every_capability() {
        let p = Role::Admin.permissions();
        assert!(p.can_create_events && p.can_edit_events && p.can_delete_events && p.can_manage_users);
    }

    #[test]
    fn editor_can_create_and_edit_only() {
        assert_eq!(
            Role::Editor.permissions(),
            Permissions {
                can_create_events: true,
                can_edit_events: true,
                can_delete_events: false,
                can_manage_users: false,
            }
        );
    }

    #[test]
    fn viewer_has_no_capabilities() {
        assert_eq!(Role::Viewer.permissions(), Permissions::none());
    }

    #[test]
    fn capabilities_nest_by_privilege() {
        let admin = Role::Admin.permissions();
        let editor = Role::Editor.permissions();
        let viewer = Role::Viewer.permissions();

        assert!(admin.includes(&editor));
        assert!(editor.includes(&viewer));
        assert!(admin.includes(&viewer));
        assert!(!viewer.includes(&editor));
        assert!(!editor.includes(&admin));
    }

    #[test]
    fn projection_is_deterministic() {
        for role in Role::ALL {
            assert_eq!(role.permissions(), role.permissions());
        }
    }

    #[test]
    fn only_admin_is_admin() {
        assert!(Role::Admin.is_admin());
        assert!(!Role::Editor.is_admin());
        assert!(!Role::Viewer.is_admin());
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("Editor".parse::<Role>(), Ok(Role::Editor));
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn role_deserializes_from_wire_name() {
        let user: User = serde_json::from_str(
            r#"{"id":"1","email":"a@oiaa.edu","name":"A","role":"viewer"}"#,
        )
        .unwrap();
        assert_eq!(user.role, Role::Viewer);
    }

    #[test]
    fn email_is_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Admin@OIAA.edu "), "admin@oiaa.edu");
    }
}
