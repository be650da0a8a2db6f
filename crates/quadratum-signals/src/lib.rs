//! # quadratum-signals
//!
//! Signal dispatcher for the quadratum pipeline. Form instances publish
//! lifecycle notifications (view, validation failure, submission attempt)
//! that other collaborators, typically analytics scripts, can subscribe to
//! without the pipeline knowing about them.
//!
//! Signals can be chained: a signal created with [`Signal::child_of`]
//! delivers to its own receivers first and then bubbles the same payload to
//! its parent, the way a DOM event bubbles from a form up to the document.
//!
//! ## Usage
//!
//! ```
//! use quadratum_signals::Signal;
//! use std::sync::Arc;
//!
//! let page: Arc<Signal<String>> = Arc::new(Signal::new());
//! let form = Signal::child_of(Arc::clone(&page));
//!
//! page.connect("analytics", Arc::new(|event: &String| {
//!     println!("page saw {event}");
//! }));
//!
//! let delivered = form.send(&"quadratum.form.view".to_string());
//! assert_eq!(delivered, 1);
//! ```

use std::sync::{Arc, RwLock};

/// The type signature for a signal receiver callback.
///
/// Receivers must be `Send + Sync` so that signals can be dispatched from
/// any task.
pub type SignalReceiver<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A signal that can be connected to and dispatched.
///
/// Each signal carries a payload type `T`. Receivers are called in the order
/// they were connected.
pub struct Signal<T: 'static> {
    receivers: RwLock<Vec<(String, SignalReceiver<T>)>>,
    parent: Option<Arc<Signal<T>>>,
}

impl<T: 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("receivers", &self.receiver_count())
            .field("bubbles", &self.parent.is_some())
            .finish()
    }
}

impl<T: 'static> Signal<T> {
    /// Creates a new root signal with no connected receivers.
    pub fn new() -> Self {
        Self {
            receivers: RwLock::new(Vec::new()),
            parent: None,
        }
    }

    /// Creates a signal whose payloads bubble up to `parent` after local
    /// delivery.
    pub fn child_of(parent: Arc<Self>) -> Self {
        Self {
            receivers: RwLock::new(Vec::new()),
            parent: Some(parent),
        }
    }

    /// Connects a receiver to this signal.
    ///
    /// The `receiver_id` is used to identify the receiver for later
    /// disconnection. If a receiver with the same ID is already connected,
    /// it is replaced, so connecting twice never duplicates delivery.
    pub fn connect(&self, receiver_id: impl Into<String>, callback: SignalReceiver<T>) {
        let id = receiver_id.into();
        let mut receivers = self.receivers.write().expect("signal lock poisoned");

        if let Some(entry) = receivers.iter_mut().find(|(rid, _)| *rid == id) {
            entry.1 = callback;
        } else {
            receivers.push((id, callback));
        }
    }

    /// Disconnects the receiver with the given ID.
    ///
    /// Returns `true` if a receiver was found and removed.
    pub fn disconnect(&self, receiver_id: &str) -> bool {
        let mut receivers = self.receivers.write().expect("signal lock poisoned");
        let len_before = receivers.len();
        receivers.retain(|(id, _)| id != receiver_id);
        receivers.len() < len_before
    }

    /// Sends the payload to all connected receivers, then bubbles it to the
    /// parent chain.
    ///
    /// Returns the total number of receivers invoked.
    pub fn send(&self, payload: &T) -> usize {
        // Snapshot so receivers may connect/disconnect without deadlocking.
        let receivers: Vec<SignalReceiver<T>> = self
            .receivers
            .read()
            .expect("signal lock poisoned")
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in &receivers {
            callback(payload);
        }

        let bubbled = self.parent.as_ref().map_or(0, |parent| parent.send(payload));
        tracing::trace!(local = receivers.len(), bubbled, "signal dispatched");
        receivers.len() + bubbled
    }

    /// Returns the number of receivers connected directly to this signal.
    pub fn receiver_count(&self) -> usize {
        self.receivers.read().expect("signal lock poisoned").len()
    }

    /// Returns `true` if this signal bubbles to a parent.
    pub const fn bubbles(&self) -> bool {
        self.parent.is_some()
    }
}
