pub mod backend;
pub mod classify;
pub mod config;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod i18n;
pub mod report;
pub mod types;

// Re-export the localization functions
pub use crate::i18n::{t, t_with_args};
