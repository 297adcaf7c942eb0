pub mod cluster;
pub mod config;
pub mod error;
pub mod expiring;
pub mod io;
pub mod leader;
pub mod paths;
pub mod poller;
pub mod ports;
pub mod request;
pub mod task;
pub mod types;

pub use error::{ExpiryError, Result};
