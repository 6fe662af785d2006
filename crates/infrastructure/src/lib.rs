//! Amparo Infrastructure - Adapters and runtime wiring
//!
//! This crate provides concrete implementations of the ports defined in the
//! application layer: the GoTrue identity provider and PostgREST profile
//! store of a Supabase-compatible backend, the system clock and notifiers.
//! It also owns configuration loading, tracing setup and the bootstrap that
//! wires everything into a running synchronizer.

pub mod adapters;
pub mod bootstrap;
pub mod config;
pub mod supabase;
pub mod telemetry;

pub use adapters::{ChannelNotifier, SystemClock, TracingNotifier};
pub use bootstrap::{AmparoRuntime, BootstrapError};
pub use config::{AppConfig, BackendConfig, ConfigError};
pub use supabase::{
    AccessTokenSource, BackendClient, BackendError, GoTrueIdentityProvider, PostgrestProfileStore,
};
pub use telemetry::{TelemetryError, init_tracing};
