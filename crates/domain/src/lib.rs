//! Amparo Domain - Core identity and authorization types
//!
//! This crate defines the domain model for the Amparo session core:
//! sessions, roles, authorization profiles, the synchronizer state machine
//! and guard decisions. All types here are pure Rust with no I/O dependencies.

pub mod auth;
pub mod error;
pub mod guard;
pub mod id;
pub mod notice;
pub mod profile;
pub mod role;
pub mod route;
pub mod settings;
pub mod state;

pub use auth::{AuthFailure, Identity, RecoveryLink, Session};
pub use error::{DomainError, DomainResult};
pub use guard::{GuardDecision, RouteTarget};
pub use id::IdentityId;
pub use notice::{Notice, NoticeKind};
pub use profile::{AuthorizationProfile, ProfilePatch, ProfileRow};
pub use role::Role;
pub use route::{AccessPolicy, RouteRule, RouteTable};
pub use settings::SyncSettings;
pub use state::{CommitOutcome, Readiness, SessionTransition, SyncPhase, SynchronizerState};
