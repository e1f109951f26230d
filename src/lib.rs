pub mod board;
pub mod codec;
pub mod config;
pub mod connection;
pub mod consts;
pub mod error;
pub mod events;
pub mod feed;
pub mod model;
pub mod render;
pub mod transport;

pub use error::{MonitorError, Result};
