pub mod auth;
pub mod clients;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod server;
pub mod services;
pub mod storage;

pub use error::{Result, ShopError};
