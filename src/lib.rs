#![forbid(unsafe_code)]

//! Request Manager (rqm): client for a service-request tracking backend.
//!
//! Users file requests and may delete their own while open; administrators
//! see every request and move it through its lifecycle until it is resolved
//! or rejected. The pieces:
//!
//! 1. **View-model**: pure filter, sort and paginate over fetched records
//! 2. **Transition gate**: which status controls a record may offer
//! 3. **Dashboards**: Elm-style controllers over an API client, a
//!    notification sink, a confirmation prompt and an activity log
//!
//! # Library usage
//!
//! ```rust,no_run
//! use request_manager::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use request_manager::core::config::Config;
//! use request_manager::view::list::compute_view;
//! ```

pub mod prelude;

pub mod api;
pub mod auth;
pub mod core;
pub mod dashboard;
pub mod logger;
pub mod model;
pub mod notify;
pub mod view;
