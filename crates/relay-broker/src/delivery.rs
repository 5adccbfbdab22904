//! Deliveries and the zero-capacity streams that carry them.
//!
//! A delivery stream is a rendezvous: it never buffers a message. A writer
//! offers one [`Delivery`] and stays suspended until a reader takes it, so a
//! publisher with no reader on the other side waits indefinitely. Tests rely
//! on this to synchronize publisher and consumer without sleeps.
//!
//! # Handoff contract
//!
//! - [`DeliverySender::send`] completes only after a reader has taken the
//!   delivery through [`DeliveryStream::recv`] or
//!   [`DeliveryStream::try_recv`].
//! - Concurrent writers on one stream are served in the order they started
//!   waiting (FIFO per stream).
//! - Dropping a pending `send` future withdraws the offer: no reader ever
//!   observes a withdrawn delivery.
//! - `recv` returns `None` only once every writer has been dropped.

use std::{
    collections::VecDeque,
    pin::pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::{Notify, oneshot};

/// A message handed to a queue reader.
///
/// Deliveries carry no acknowledgement state and cannot be modified once
/// constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    exchange: String,
    routing_key: String,
    body: Bytes,
    content_type: String,
}

impl Delivery {
    /// Create a delivery.
    pub fn new(
        exchange: impl Into<String>,
        routing_key: impl Into<String>,
        body: Bytes,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            body,
            content_type: content_type.into(),
        }
    }

    /// Exchange the message was published to.
    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Routing key the message was published with.
    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    /// Message payload.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// MIME content type of the payload.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }
}

/// A message as handed to `basic.publish`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Publishing {
    /// Message payload.
    pub body: Bytes,
    /// MIME content type of the payload.
    pub content_type: String,
}

impl Publishing {
    /// Create a message with an empty content type.
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self { body: body.into(), content_type: String::new() }
    }

    /// Set the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

/// Every reader of a delivery stream is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("delivery stream closed")]
pub struct StreamClosed;

/// Failure of a bounded send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendTimeoutError {
    /// Every reader of the stream is gone.
    #[error("delivery stream closed")]
    Closed,

    /// No reader took the delivery before the deadline; the offer was
    /// withdrawn.
    #[error("no reader took the delivery within {0:?}")]
    Elapsed(Duration),
}

impl From<StreamClosed> for SendTimeoutError {
    fn from(_: StreamClosed) -> Self {
        Self::Closed
    }
}

/// A delivery waiting for a reader, plus the signal the reader fires on take.
#[derive(Debug)]
struct Offer {
    id: u64,
    delivery: Delivery,
    taken: oneshot::Sender<()>,
}

#[derive(Debug, Default)]
struct State {
    /// Offers in the order their writers started waiting.
    pending: VecDeque<Offer>,
    next_id: u64,
    writers: usize,
    readers: usize,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<State>,
    /// Signalled once per new offer, and to every waiter when the last writer
    /// goes away.
    offered: Notify,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pop offers until one is still live and hand it over.
    ///
    /// The take signal fires under the state lock, so a writer that
    /// withdraws under the same lock either finds its offer gone and taken,
    /// or removes it before any reader saw it.
    fn take(&self) -> Option<Delivery> {
        let mut state = self.state();

        while let Some(offer) = state.pending.pop_front() {
            if offer.taken.send(()).is_ok() {
                return Some(offer.delivery);
            }
            tracing::trace!("Discarding withdrawn offer from exchange {}", offer.delivery.exchange);
        }

        None
    }

    fn withdraw(&self, id: u64) {
        self.state().pending.retain(|offer| offer.id != id);
    }
}

/// Removes a pending offer when its `send` future ends, however it ends.
struct Withdraw<'a> {
    shared: &'a Shared,
    id: u64,
}

impl Drop for Withdraw<'_> {
    fn drop(&mut self) {
        self.shared.withdraw(self.id);
    }
}

/// Create a connected writer/reader pair with zero capacity.
pub fn stream() -> (DeliverySender, DeliveryStream) {
    let shared = Arc::new(Shared::default());
    {
        let mut state = shared.state();
        state.writers = 1;
        state.readers = 1;
    }

    (DeliverySender { shared: Arc::clone(&shared) }, DeliveryStream { shared })
}

/// Writing half of a delivery stream.
#[derive(Debug)]
pub struct DeliverySender {
    shared: Arc<Shared>,
}

impl DeliverySender {
    /// Offer a delivery and wait until a reader takes it.
    ///
    /// Suspends indefinitely while no reader is receiving. Cancelling the
    /// returned future withdraws the offer.
    pub async fn send(&self, delivery: Delivery) -> Result<(), StreamClosed> {
        let (accepted, _withdraw) = self.offer(delivery)?;

        // The offer is dropped unaccepted only if the reading half is gone.
        accepted.await.map_err(|_| StreamClosed)
    }

    /// Offer a delivery and wait at most `timeout` for a reader to take it.
    ///
    /// On expiry the offer is withdrawn before the error is reported, so a
    /// delivery is either taken and `Ok` is returned, or never observed by
    /// any reader.
    pub async fn send_timeout(
        &self,
        delivery: Delivery,
        timeout: Duration,
    ) -> Result<(), SendTimeoutError> {
        let (mut accepted, withdraw) = self.offer(delivery)?;

        match tokio::time::timeout(timeout, &mut accepted).await {
            Ok(taken) => taken.map_err(|_| SendTimeoutError::Closed),
            Err(_) => {
                drop(withdraw);
                // A reader may have taken it between the last poll and the
                // deadline.
                match accepted.try_recv() {
                    Ok(()) => Ok(()),
                    Err(_) => Err(SendTimeoutError::Elapsed(timeout)),
                }
            },
        }
    }

    /// Queue an offer and wake one reader.
    fn offer(
        &self,
        delivery: Delivery,
    ) -> Result<(oneshot::Receiver<()>, Withdraw<'_>), StreamClosed> {
        let (taken, accepted) = oneshot::channel();

        let id = {
            let mut state = self.shared.state();
            if state.readers == 0 {
                return Err(StreamClosed);
            }
            let id = state.next_id;
            state.next_id += 1;
            state.pending.push_back(Offer { id, delivery, taken });
            id
        };
        self.shared.offered.notify_one();

        Ok((accepted, Withdraw { shared: &self.shared, id }))
    }
}

impl Clone for DeliverySender {
    fn clone(&self) -> Self {
        self.shared.state().writers += 1;
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl Drop for DeliverySender {
    fn drop(&mut self) {
        let last = {
            let mut state = self.shared.state();
            state.writers -= 1;
            state.writers == 0
        };
        if last {
            self.shared.offered.notify_waiters();
        }
    }
}

/// Reading half of a delivery stream.
///
/// Clones are handles onto the same stream. Concurrent readers each take
/// whole deliveries, but which reader receives which delivery is undefined.
#[derive(Debug)]
pub struct DeliveryStream {
    shared: Arc<Shared>,
}

impl DeliveryStream {
    /// Wait for the next delivery.
    ///
    /// Returns `None` once every writer has been dropped.
    pub async fn recv(&self) -> Option<Delivery> {
        loop {
            let mut notified = pin!(self.shared.offered.notified());
            notified.as_mut().enable();

            if let Some(delivery) = self.shared.take() {
                return Some(delivery);
            }
            if self.shared.state().writers == 0 {
                return None;
            }

            notified.await;
        }
    }

    /// Take a delivery only if a writer is offering one right now.
    ///
    /// Sees every writer currently blocked on the stream, oldest first.
    pub fn try_recv(&self) -> Option<Delivery> {
        self.shared.take()
    }
}

impl Clone for DeliveryStream {
    fn clone(&self) -> Self {
        self.shared.state().readers += 1;
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl Drop for DeliveryStream {
    fn drop(&mut self) {
        let mut state = self.shared.state();
        state.readers -= 1;
        if state.readers == 0 {
            // Dropping the take signals fails every blocked writer.
            state.pending.clear();
        }
    }
}
