//! Admin and user request dashboards.
//!
//! Elm-style split: [`model`] holds state, messages and commands, [`update`]
//! is the pure reducer, [`runtime`] executes commands against the
//! collaborators, and [`render`] draws the result.

pub mod model;
pub mod render;
pub mod runtime;
pub mod update;

#[cfg(test)]
mod test_properties;
