//! Row models.

pub mod user;
