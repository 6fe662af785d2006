//! Session, identity and authorization synchronization.
//!
//! This module provides:
//! - The identity client facade over the provider port
//! - Profile resolution through the privileged role path
//! - The session/profile synchronizer state machine
//! - Route guards and the path-level route gate

mod guards;
mod identity_client;
mod profile_resolver;
mod route_gate;
mod synchronizer;

pub use guards::{AuthenticatedGuard, GuardWatch, RoleGuard, RouteGuard};
pub use identity_client::{IdentityClient, SessionSubscription};
pub use profile_resolver::ProfileResolver;
pub use route_gate::{Navigation, RouteGate};
pub use synchronizer::{RefreshOutcome, Synchronizer};
