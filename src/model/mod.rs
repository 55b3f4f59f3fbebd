//! Domain types: status vocabulary, request records, timestamps, and the
//! status transition gate.

pub mod record;
pub mod status;
pub mod timestamp;
pub mod transition;
