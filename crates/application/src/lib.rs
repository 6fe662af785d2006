//! Amparo Application - Use cases and ports
//!
//! This crate contains the application logic of the session core: the
//! identity facade, profile resolution, the session/profile synchronizer,
//! route guards and the password recovery use cases. External systems are
//! reached only through the traits in [`ports`].

pub mod auth;
pub mod error;
pub mod ports;
pub mod use_cases;

#[cfg(test)]
mod testing;

pub use auth::{
    AuthenticatedGuard, GuardWatch, IdentityClient, Navigation, ProfileResolver, RefreshOutcome,
    RoleGuard, RouteGate, RouteGuard, SessionSubscription, Synchronizer,
};
pub use error::{ApplicationError, ApplicationResult};
