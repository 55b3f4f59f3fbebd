//! Login and registration forms: local validation, backend call, and the
//! operator-facing message for each outcome.

#![allow(missing_docs)]

use std::fmt;

use serde::Serialize;

use super::session::Session;
use crate::api::{ApiError, ConflictKind, Identity, Profile, RequestApi, Role};

pub const LOGIN_SUCCESS: &str = "Login successful!";
pub const LOGIN_FIELDS_REQUIRED: &str = "Both username and password are required.";
pub const LOGIN_INVALID: &str = "Invalid username or password.";
pub const LOGIN_FAILED: &str = "Login failed. Please try again.";

pub const REGISTER_SUCCESS: &str = "Registration successful!";
pub const USERNAME_TAKEN: &str = "This username is already taken. Try a different one.";
pub const EMAIL_TAKEN: &str = "An account with this email already exists.";
pub const REGISTER_UNAVAILABLE: &str = "Registration failed. Please try again later.";

// ──────────────────── login ────────────────────

/// Where a fresh session lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Landing {
    AdminDashboard,
    UserDashboard,
}

impl Landing {
    #[must_use]
    pub const fn for_role(role: Role) -> Self {
        match role {
            Role::Admin => Self::AdminDashboard,
            Role::User => Self::UserDashboard,
        }
    }
}

/// Login failure carrying the message shown under the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginError {
    pub message: &'static str,
    /// Backend failure, absent for local validation.
    pub cause: Option<ApiError>,
}

impl fmt::Display for LoginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message)
    }
}

impl std::error::Error for LoginError {}

/// Validate, authenticate, and build the session.
pub fn login<A: RequestApi + ?Sized>(
    api: &A,
    username: &str,
    password: &str,
) -> Result<(Session, Landing), LoginError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(LoginError {
            message: LOGIN_FIELDS_REQUIRED,
            cause: None,
        });
    }
    match api.login(username, password) {
        Ok(role) => Ok((
            Session::established(Identity::new(username, password), role),
            Landing::for_role(role),
        )),
        Err(err) => Err(LoginError {
            message: login_failure_message(&err),
            cause: Some(err),
        }),
    }
}

#[must_use]
pub const fn login_failure_message(err: &ApiError) -> &'static str {
    match err {
        ApiError::Unauthorized => LOGIN_INVALID,
        _ => LOGIN_FAILED,
    }
}

// ──────────────────── registration ────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Email,
    Username,
    Password,
    ConfirmPassword,
}

/// Per-field validation messages, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(Vec<(Field, &'static str)>);

impl FieldErrors {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, field: Field) -> Option<&'static str> {
        self.0.iter().find(|(f, _)| *f == field).map(|(_, m)| *m)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &'static str)> + '_ {
        self.0.iter().copied()
    }

    fn push(&mut self, field: Field, message: &'static str) {
        self.0.push((field, message));
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.0.iter().map(|(_, m)| *m).collect();
        f.write_str(&messages.join("; "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum PasswordStrength {
    Weak,
    Medium,
    Strong,
}

impl PasswordStrength {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Weak => "Weak",
            Self::Medium => "Medium",
            Self::Strong => "Strong",
        }
    }
}

const SYMBOLS: &str = "!@#$%^&*";

/// Weak under six characters; strong with an upper-case letter, a digit and
/// one of `!@#$%^&*`; medium otherwise.
#[must_use]
pub fn password_strength(password: &str) -> PasswordStrength {
    if password.chars().count() < 6 {
        PasswordStrength::Weak
    } else if password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| SYMBOLS.contains(c))
    {
        PasswordStrength::Strong
    } else {
        PasswordStrength::Medium
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegistrationForm {
    /// Collect every field error; on success the profile to submit.
    pub fn validate(&self) -> Result<Profile, FieldErrors> {
        let mut errors = FieldErrors::default();
        if self.name.trim().is_empty() {
            errors.push(Field::Name, "Name is required");
        }
        if self.email.trim().is_empty() {
            errors.push(Field::Email, "Email is required");
        }
        if self.username.trim().is_empty() {
            errors.push(Field::Username, "Username is required");
        }
        if self.password.is_empty() {
            errors.push(Field::Password, "Password is required");
        }
        if self.confirm_password.is_empty() {
            errors.push(Field::ConfirmPassword, "Please confirm password");
        } else if self.password != self.confirm_password {
            errors.push(Field::ConfirmPassword, "Passwords do not match");
        }
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Profile {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            username: self.username.trim().to_string(),
            password: self.password.clone(),
        })
    }

    #[must_use]
    pub fn strength(&self) -> PasswordStrength {
        password_strength(&self.password)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// Local validation failed; nothing was sent.
    Invalid(FieldErrors),
    /// Backend refused or was unreachable.
    Failed { message: String, cause: ApiError },
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(errors) => fmt::Display::fmt(errors, f),
            Self::Failed { message, .. } => f.write_str(message),
        }
    }
}

impl std::error::Error for RegistrationError {}

/// Validate and submit a registration.
pub fn register<A: RequestApi + ?Sized>(
    api: &A,
    form: &RegistrationForm,
) -> Result<Profile, RegistrationError> {
    let profile = form.validate().map_err(RegistrationError::Invalid)?;
    api.register(&profile)
        .map_err(|cause| RegistrationError::Failed {
            message: registration_failure_message(&cause),
            cause,
        })?;
    Ok(profile)
}

#[must_use]
pub fn registration_failure_message(err: &ApiError) -> String {
    match err {
        ApiError::Conflict(ConflictKind::Username) => USERNAME_TAKEN.to_string(),
        ApiError::Conflict(ConflictKind::Email) => EMAIL_TAKEN.to_string(),
        ApiError::Rejected { details } => format!("Registration failed: {details}"),
        _ => REGISTER_UNAVAILABLE.to_string(),
    }
}
