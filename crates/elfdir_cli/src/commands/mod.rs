//! CLI command implementations.

pub mod dump;
pub mod embed;
pub mod list;
pub mod sections;
