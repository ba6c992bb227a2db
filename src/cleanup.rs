//! Best-effort removal of previously published discovery registrations.

use crate::discovery::{DiscoveryPublisher, MessageBus};
use tracing::{error, info};

/// Publish a removal for every identity, attempting all of them even when
/// some fail. Returns the number of failed removals.
pub async fn run<B: MessageBus>(
    publisher: &DiscoveryPublisher<B>,
    identities: &[String],
) -> usize {
    let mut failures = 0;
    for identity in identities {
        match publisher.remove(identity).await {
            Ok(()) => info!(identity = %identity, "removed discovery registration"),
            Err(e) => {
                failures += 1;
                error!(identity = %identity, error = %e, "failed to remove discovery registration");
            }
        }
    }
    failures
}
