//! Pluggable request/response carriers (component G).

pub mod file_replay;
pub mod http;
pub mod mock;

pub use file_replay::FileReplayTransport;
pub use http::HttpTransport;
pub use mock::{MockCaServer, MockTransport};
