//! Tool server: the four tracing tools over MCP on stdio

pub mod handler;

pub use handler::{serve, TracebufServer, SERVER_NAME};
