//! FILENAME: core/grid-model/src/events.rs
//! PURPOSE: Typed-topic event bus for model change notifications.
//! CONTEXT: Consumers (renderers, selection UI, host glue) subscribe to a
//! topic and receive plain-data events. There is no property interception
//! anywhere in the model: every mutator that changes observable state
//! publishes explicitly. Handlers run synchronously on the publishing
//! thread; re-entering the model from a handler while a refresh is in
//! progress is a precondition violation, not a supported path.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::node::RowId;

// ============================================================================
// TOPICS AND EVENTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventTopic {
    /// Full data replacement happened.
    RowDataChanged,
    /// A pipeline run finished; the display list is current.
    ModelUpdated,
    /// Row selection changed (batched: one event per cause).
    SelectionChanged,
    /// A queued batch of async transactions was applied.
    AsyncTransactionsFlushed,
}

/// Plain-data event payloads. Events never borrow the model, so handlers
/// can hold on to them freely.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum GridEvent {
    #[serde(rename_all = "camelCase")]
    RowDataChanged {
        /// Leaf rows in the new data set.
        row_count: usize,
    },
    #[serde(rename_all = "camelCase")]
    ModelUpdated {
        /// Renderer should animate row movement.
        animate: bool,
        /// Currently rendered rows can be kept and patched instead of
        /// redrawn from scratch.
        keep_rendered_rows: bool,
        /// The run was caused by a full data replacement.
        new_data: bool,
    },
    #[serde(rename_all = "camelCase")]
    SelectionChanged {
        row_ids: Vec<RowId>,
    },
    #[serde(rename_all = "camelCase")]
    AsyncTransactionsFlushed {
        /// Number of transactions applied in this flush.
        transaction_count: usize,
    },
}

impl GridEvent {
    pub fn topic(&self) -> EventTopic {
        match self {
            GridEvent::RowDataChanged { .. } => EventTopic::RowDataChanged,
            GridEvent::ModelUpdated { .. } => EventTopic::ModelUpdated,
            GridEvent::SelectionChanged { .. } => EventTopic::SelectionChanged,
            GridEvent::AsyncTransactionsFlushed { .. } => EventTopic::AsyncTransactionsFlushed,
        }
    }
}

// ============================================================================
// EVENT BUS
// ============================================================================

/// Identifier handed back by `subscribe`, unique per bus.
pub type SubscriptionId = u64;

/// Handle needed to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    pub topic: EventTopic,
    pub id: SubscriptionId,
}

type Handler = Box<dyn Fn(&GridEvent)>;

/// Explicit subscribe/publish bus keyed by `EventTopic`.
pub struct EventBus {
    handlers: FxHashMap<EventTopic, Vec<(SubscriptionId, Handler)>>,
    next_id: SubscriptionId,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus {
            handlers: FxHashMap::default(),
            next_id: 0,
        }
    }

    /// Registers a handler for one topic and returns the handle that
    /// removes it again.
    pub fn subscribe<F>(&mut self, topic: EventTopic, handler: F) -> Subscription
    where
        F: Fn(&GridEvent) + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.handlers
            .entry(topic)
            .or_default()
            .push((id, Box::new(handler)));
        Subscription { topic, id }
    }

    /// Removes a previously registered handler. Returns false when the
    /// subscription is unknown (already removed, or from another bus).
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        match self.handlers.get_mut(&subscription.topic) {
            Some(list) => {
                let before = list.len();
                list.retain(|(id, _)| *id != subscription.id);
                list.len() != before
            }
            None => false,
        }
    }

    /// Delivers an event to every handler of its topic, in subscription
    /// order.
    pub fn publish(&self, event: &GridEvent) {
        if let Some(list) = self.handlers.get(&event.topic()) {
            for (_, handler) in list {
                handler(event);
            }
        }
    }

    pub fn listener_count(&self, topic: EventTopic) -> usize {
        self.handlers.get(&topic).map(Vec::len).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        EventBus::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
