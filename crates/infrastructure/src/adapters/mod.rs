//! Small port adapters that need no backend.

mod clock;
mod notifier;

pub use clock::SystemClock;
pub use notifier::{ChannelNotifier, TracingNotifier};
