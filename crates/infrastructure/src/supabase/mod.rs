//! Adapters for a Supabase-compatible backend.
//!
//! - [`GoTrueIdentityProvider`] talks to the GoTrue auth API (`/auth/v1`).
//! - [`PostgrestProfileStore`] talks to the PostgREST data API (`/rest/v1`).
//!
//! Both share one [`BackendClient`], which carries the project URL, the
//! anon key sent as the `apikey` header, and the request timeout.

mod backend;
mod gotrue;
mod postgrest;
mod wire;

pub use backend::{AccessTokenSource, BackendClient, BackendError};
pub use gotrue::GoTrueIdentityProvider;
pub use postgrest::PostgrestProfileStore;
