//! OAuth integration handshake and backend pass-through
//!
//! # Flow
//! 1. [`Handshake::start`] requests an authorization URL and opens a surface
//! 2. [`Handshake::finish`] waits for the surface to close (bounded, cancellable)
//! 3. credentials are retrieved once and published to the [`ConsoleSession`]
//! 4. [`PassThrough`] forwards data-load and contact calls for the connected session

pub mod backend;
pub mod error;
pub mod handshake;
pub mod passthrough;
pub mod poller;
pub mod session;
pub mod surface;
pub mod types;

#[cfg(test)]
pub mod fake_backend;

pub use backend::BackendClient;
pub use error::IntegrationError;
pub use handshake::Handshake;
pub use passthrough::PassThrough;
pub use poller::CompletionPoller;
pub use session::ConsoleSession;
