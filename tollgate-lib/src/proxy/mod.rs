pub mod client;
pub mod connection;
pub mod context;
pub mod forwarding;
pub mod handler;
pub mod http_result;
pub mod server;
pub mod synthetic_response;

pub use client::UpstreamClient;
pub use context::GatewayContext;
pub use http_result::HttpError;
pub use server::{run, serve};
