//! HTTP client library for the game hosting platform.
//!
//! Talks to `platform-server` over its JSON surface and can be used by any
//! client application — a CLI, a bot, a UI.
//!
//! ```no_run
//! use platform_client::PlatformClient;
//!
//! # async fn run() -> platform_client::ClientResult<()> {
//! let client = PlatformClient::new("http://localhost:5000")?;
//! client.register_player("alice", "hunter2").await?;
//! client.login_player("alice", "hunter2").await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
pub mod types;

pub use client::PlatformClient;
pub use error::{ClientError, ClientResult};
