//! Console API module
//!
//! HTTP API over one in-memory [`ConsoleSession`](crate::integration::ConsoleSession)
//!
//! # Features
//! - Set the session identity (user, organization, integration type)
//! - Start, close, and cancel the OAuth handshake
//! - Load integration data and run HubSpot contact operations
//! - Clear fields (drop credentials)
//!
//! # Usage
//! ```ignore
//! let state = ConsoleState::new(session, handshake, passthrough, api_key);
//! let router = create_console_router(state, &config.cors_origins);
//! ```

mod error;
mod handlers;
mod middleware;
mod router;
pub mod types;

pub use middleware::ConsoleState;
pub use router::create_console_router;
