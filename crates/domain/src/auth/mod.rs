//! Authentication domain types

mod failure;
mod recovery;
mod session;

pub use failure::AuthFailure;
pub use recovery::RecoveryLink;
pub use session::{Identity, Session};
