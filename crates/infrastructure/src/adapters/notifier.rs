//! Notifier adapters.

use tokio::sync::mpsc;
use tracing::{info, warn};

use amparo_application::ports::Notifier;
use amparo_domain::{Notice, NoticeKind};

/// Writes notices to the log. Used by headless deployments.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        let description = notice.description.as_deref().unwrap_or_default();
        match notice.kind {
            NoticeKind::Error | NoticeKind::AccessDenied => {
                warn!(kind = ?notice.kind, title = %notice.title, description, "notice");
            }
            NoticeKind::Success | NoticeKind::Info => {
                info!(kind = ?notice.kind, title = %notice.title, description, "notice");
            }
        }
    }
}

/// Forwards notices to a channel drained by the presentation layer.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
    /// Creates the notifier and the receiving end of its channel.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notice: Notice) {
        // Nobody is listening once the presentation layer is gone.
        let _ = self.tx.send(notice);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_channel_notifier_forwards_in_order() {
        let (notifier, mut rx) = ChannelNotifier::channel();
        notifier.notify(Notice::signed_in());
        notifier.notify(Notice::access_denied());

        assert_eq!(rx.try_recv().unwrap(), Notice::signed_in());
        assert_eq!(rx.try_recv().unwrap().kind, NoticeKind::AccessDenied);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_notifier_survives_dropped_receiver() {
        let (notifier, rx) = ChannelNotifier::channel();
        drop(rx);
        notifier.notify(Notice::signed_out());
    }
}
