// Photo server module.
// Provides the client and types for the upload server's HTTP API.

pub mod client;
pub mod endpoints;
pub mod types;

pub use client::FrameClient;
pub use endpoints::PhotoSource;
pub use types::*;
