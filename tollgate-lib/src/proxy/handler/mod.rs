pub mod broker;
pub mod config;
pub mod headers;
pub mod request;
pub mod stats;

pub use request::handle_request;
