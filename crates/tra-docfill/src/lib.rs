//! TRA document filler application.
//!
//! Wraps the `docgen` pipeline with everything a running install needs:
//! - [`config`]: layered settings (defaults, TOML, environment, flags)
//! - [`relay`] / [`relay_client`]: the file relay server and its client
//! - [`platform`]: board context, installation storage, usage notification
//! - [`session`] / [`state_machine`]: one mounted session and its phases
//! - [`diagnostics`]: storage and API connectivity checks
//! - [`cli`]: the `tra-docfill` commands

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod platform;
pub mod relay;
pub mod relay_client;
pub mod session;
pub mod state_machine;
pub mod telemetry;

pub use config::DocfillConfig;
pub use platform::{CliPlatform, PlatformContext};
pub use relay::{build_router, RelayError, RelayState};
pub use relay_client::RelayClient;
pub use session::{Session, SessionError, SessionSettings};
pub use state_machine::{SessionMachine, SessionState};
