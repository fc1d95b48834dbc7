// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Owned subscription cancellation.

use std::fmt;
use std::sync::Arc;

/// Releases one sink from a topic.
///
/// Implemented by transports so that a [`SubscriptionHandle`] can cancel
/// itself without borrowing the transport.
pub trait Unsubscribe: Send + Sync {
    /// Removes the sink identified by `sink_id` from `topic`.
    fn unsubscribe(&self, topic: &str, sink_id: u64);
}

/// Capability to cancel one subscription.
///
/// The subscription is released exactly once: by [`cancel`](Self::cancel),
/// or when the handle is dropped. A handle therefore has to be stored for as
/// long as the subscription should stay live.
#[must_use = "dropping a SubscriptionHandle cancels the subscription"]
pub struct SubscriptionHandle {
    topic: String,
    sink_id: u64,
    owner: Option<Arc<dyn Unsubscribe>>,
}

impl SubscriptionHandle {
    /// Creates a handle that releases `sink_id` from `topic` on `owner`.
    pub fn new(topic: impl Into<String>, sink_id: u64, owner: Arc<dyn Unsubscribe>) -> Self {
        Self {
            topic: topic.into(),
            sink_id,
            owner: Some(owner),
        }
    }

    /// Returns the subscribed topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns the transport-assigned sink id.
    #[must_use]
    pub fn sink_id(&self) -> u64 {
        self.sink_id
    }

    /// Cancels the subscription.
    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(owner) = self.owner.take() {
            tracing::debug!(topic = %self.topic, sink = self.sink_id, "Releasing subscription");
            owner.unsubscribe(&self.topic, self.sink_id);
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("topic", &self.topic)
            .field("sink_id", &self.sink_id)
            .field("active", &self.owner.is_some())
            .finish()
    }
}
