//! Application use cases (business logic orchestration).

mod complete_password_reset;
mod request_password_reset;

pub use complete_password_reset::*;
pub use request_password_reset::*;
