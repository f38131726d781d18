//! Octavia library root.

pub mod chat;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod persona;
pub mod providers;
pub mod store;
pub mod vercel;

pub use chat::Assistant;
pub use cli::Commands;
pub use config::{load_settings, Settings};
pub use crate::core::Router;
pub use error::{Error, Result};
pub use providers::{Inference, UserInput};
pub use store::Store;
