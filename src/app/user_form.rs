use crate::calendar::{NewUser, Role, User, UserUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserField {
    Name,
    Email,
    Role,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserForm {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub active_field: UserField,
    pub user_id: Option<String>,
}

impl Default for UserForm {
    fn default() -> Self {
        Self::new()
    }
}

impl UserForm {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            role: Role::Viewer,
            active_field: UserField::Name,
            user_id: None,
        }
    }

    pub fn for_user(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            active_field: UserField::Name,
            user_id: Some(user.id.clone()),
        }
    }

    pub fn is_editing(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn next_field(&mut self) {
        self.active_field = match self.active_field {
            UserField::Name => UserField::Email,
            UserField::Email => UserField::Role,
            UserField::Role => UserField::Name,
        };
    }

    pub fn prev_field(&mut self) {
        self.active_field = match self.active_field {
            UserField::Name => UserField::Role,
            UserField::Email => UserField::Name,
            UserField::Role => UserField::Email,
        };
    }

    pub fn active_buffer_mut(&mut self) -> Option<&mut String> {
        match self.active_field {
            UserField::Name => Some(&mut self.name),
            UserField::Email => Some(&mut self.email),
            UserField::Role => None,
        }
    }

    pub fn cycle_role(&mut self) {
        self.role = self.role.next();
    }

    /// Returns the first missing required field, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.name.trim().is_empty() {
            Some("Name")
        } else if self.email.trim().is_empty() {
            Some("Email")
        } else {
            None
        }
    }

    pub fn to_new_user(&self) -> NewUser {
        NewUser::new(self.email.trim(), self.name.trim(), self.role)
    }

    pub fn to_update(&self) -> UserUpdate {
        UserUpdate {
            email: Some(self.email.trim().to_string()),
            name: Some(self.name.trim().to_string()),
            role: Some(self.role),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_defaults_to_viewer() {
        let form = UserForm::new();
        assert_eq!(form.role, Role::Viewer);
        assert!(!form.is_editing());
    }

    #[test]
    fn missing_fields_are_reported_in_order() {
        let mut form = UserForm::new();
        assert_eq!(form.missing_field(), Some("Name"));

        form.name = "Staff".to_string();
        assert_eq!(form.missing_field(), Some("Email"));

        form.email = "staff@oiaa.edu".to_string();
        assert_eq!(form.missing_field(), None);
    }

    #[test]
    fn role_field_cycles_roles() {
        let mut form = UserForm::new();
        form.active_field = UserField::Role;

        assert!(form.active_buffer_mut().is_none());
        form.cycle_role();
        assert_eq!(form.role, Role::Admin);
    }

    #[test]
    fn edit_form_carries_user_id() {
        let user = User {
            id: "u1".to_string(),
            email: "a@oiaa.edu".to_string(),
            name: "A".to_string(),
            role: Role::Editor,
        };

        let form = UserForm::for_user(&user);

        assert_eq!(form.user_id.as_deref(), Some("u1"));
        assert_eq!(form.to_update().role, Some(Role::Editor));
    }
}
