//! Login session and the login/registration form rules.

pub mod forms;
pub mod session;
