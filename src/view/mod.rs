//! List view-model shared by the admin and user dashboards.

pub mod list;
pub mod query;

#[cfg(test)]
mod test_properties;
