//! args-to-schema library - expose modules for testing
//!
//! The binary is a thin wrapper around [`commands::migrate::run_migrate`] and
//! [`commands::config::handle_config`].

pub mod commands;
pub mod common;
pub mod errors;

pub use argschema_logger as logger;
pub use common::GlobalOpts;
