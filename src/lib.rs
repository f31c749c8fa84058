pub mod config;
pub mod crx;
pub mod download;
pub mod error;
pub mod identity;
pub mod input;
pub mod install;
pub mod models;
pub mod output;
pub mod unpack;
pub mod update;

pub use error::{ErrorKind, Result, StoreError};
pub use models::*;
