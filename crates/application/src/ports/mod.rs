//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the application core and external systems.
//! Each port is a trait that can be implemented by adapters in the infrastructure layer.

mod clock;
mod identity_provider;
mod notifier;
mod profile_store;

pub use clock::Clock;
pub use identity_provider::{
    IdentityProvider, IdentityProviderError, SessionEvents, SignUpMetadata, SignUpOutcome,
};
pub use notifier::Notifier;
pub use profile_store::{ProfileStore, ProfileStoreError};
