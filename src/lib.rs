pub mod args;
pub mod cli;
pub mod config;
pub mod error;
pub mod import;
pub mod ledger;
mod terminal;

pub use config::{AccountTypeNames, Config};
pub use error::ImportError;
