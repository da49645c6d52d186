use tokio::sync::broadcast;

use qar_proto::SyncOp;

/// Fan-out channel for entity synchronization ops.
///
/// Every joined peer subscribes once and applies the ops to its local
/// replica. The channel imposes a single total order on all ops of a
/// session, so replicas converge even when peers publish concurrently.
#[derive(Debug)]
pub struct SessionHub {
    ops: broadcast::Sender<SyncOp>,
}

impl SessionHub {
    #[must_use]
    pub fn new(depth: usize) -> Self {
        let (ops, _) = broadcast::channel(depth.max(1));
        Self { ops }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncOp> {
        self.ops.subscribe()
    }

    /// Publish an op to all subscribed replicas. An op published while no
    /// replica is subscribed is dropped; the publisher has already applied
    /// it locally.
    pub fn publish(&self, op: SyncOp) {
        let _ = self.ops.send(op);
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.ops.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qar_proto::sync::Stamp;
    use qar_proto::{PanelId, PeerId};

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let hub = SessionHub::new(8);
        let mut rx1 = hub.subscribe();
        let mut rx2 = hub.subscribe();

        let op = SyncOp::PanelRemove {
            stamp: Stamp::new(1, PeerId::new()),
            id: PanelId::new(),
        };
        hub.publish(op.clone());

        assert_eq!(rx1.recv().await.expect("rx1"), op);
        assert_eq!(rx2.recv().await.expect("rx2"), op);
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let hub = SessionHub::new(8);
        hub.publish(SyncOp::PanelRemove {
            stamp: Stamp::new(1, PeerId::new()),
            id: PanelId::new(),
        });
        assert_eq!(hub.subscriber_count(), 0);
    }
}
