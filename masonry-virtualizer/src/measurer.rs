use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::{Item, MeasureError};

/// Resolver token handed out with every measurement request.
///
/// A ticket is only honoured while it matches the measurement in flight; once the collection
/// changes (new generation) every older ticket is stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeasureTicket {
    pub generation: u64,
    pub seq: u64,
}

/// The item currently being measured, paired with its ticket.
#[derive(Clone, Debug)]
pub struct PendingMeasurement<K, T> {
    pub ticket: MeasureTicket,
    pub item: Item<K, T>,
    pub width: u32,
}

/// What the host must render offscreen: `item` at `width`, answered with `ticket`.
#[derive(Debug)]
pub struct MeasureRequest<'a, K, T> {
    pub ticket: MeasureTicket,
    pub item: &'a Item<K, T>,
    pub width: u32,
}

impl<K, T> Clone for MeasureRequest<'_, K, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, T> Copy for MeasureRequest<'_, K, T> {}

/// Staging area for items that do not have a height yet.
///
/// Items are measured strictly one at a time in FIFO order. Rendering many unmeasured items at
/// once (each possibly decoding an image) is what this queue exists to avoid.
#[derive(Clone, Debug)]
pub struct OffscreenMeasurer<K, T> {
    queue: VecDeque<Item<K, T>>,
    in_flight: Option<PendingMeasurement<K, T>>,
    generation: u64,
    next_seq: u64,
}

impl<K: PartialEq, T> OffscreenMeasurer<K, T> {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            in_flight: None,
            generation: 0,
            next_seq: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Items waiting for a height, including the one in flight.
    pub fn len(&self) -> usize {
        self.queue.len() + usize::from(self.in_flight.is_some())
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_none() && self.queue.is_empty()
    }

    pub fn in_flight(&self) -> Option<&PendingMeasurement<K, T>> {
        self.in_flight.as_ref()
    }

    /// Ids of every unplaced item, in flight first.
    pub fn pending_ids(&self) -> impl Iterator<Item = &K> + '_ {
        self.in_flight
            .iter()
            .map(|p| &p.item.id)
            .chain(self.queue.iter().map(|item| &item.id))
    }

    /// Replaces the queue with `items` and starts a new generation.
    ///
    /// The measurement in flight, if any, is abandoned: its ticket will be rejected.
    pub fn replace(&mut self, items: impl IntoIterator<Item = Item<K, T>>) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(_abandoned) = self.in_flight.take() {
            mdebug!(
                seq = _abandoned.ticket.seq,
                generation = _abandoned.ticket.generation,
                "measurement abandoned"
            );
        }
        self.queue.clear();
        self.queue.extend(items);
        mtrace!(
            generation = self.generation,
            queued = self.queue.len(),
            "OffscreenMeasurer::replace"
        );
    }

    /// Drains every unplaced item (in flight first) and starts a new generation.
    pub fn take_all(&mut self) -> Vec<Item<K, T>> {
        self.generation = self.generation.wrapping_add(1);
        let mut out = Vec::with_capacity(self.len());
        if let Some(pending) = self.in_flight.take() {
            out.push(pending.item);
        }
        out.extend(self.queue.drain(..));
        out
    }

    /// Swaps the payload of a pending item in place. Returns `false` if `id` is not pending.
    pub fn set_payload(&mut self, id: &K, payload: T) -> bool {
        let slot = self
            .in_flight
            .as_mut()
            .map(|p| &mut p.item)
            .filter(|item| item.id == *id)
            .or_else(|| self.queue.iter_mut().find(|item| item.id == *id));
        match slot {
            Some(item) => {
                item.payload = payload;
                true
            }
            None => false,
        }
    }

    /// Starts measuring the next queued item at `width`.
    ///
    /// Returns `None` while another measurement is in flight or when the queue is empty.
    pub fn begin(&mut self, width: u32) -> Option<MeasureRequest<'_, K, T>> {
        if self.in_flight.is_some() {
            return None;
        }
        let item = self.queue.pop_front()?;
        let ticket = MeasureTicket {
            generation: self.generation,
            seq: self.next_seq,
        };
        self.next_seq = self.next_seq.wrapping_add(1);
        mtrace!(seq = ticket.seq, width, "OffscreenMeasurer::begin");
        let pending = self.in_flight.insert(PendingMeasurement {
            ticket,
            item,
            width,
        });
        Some(MeasureRequest {
            ticket: pending.ticket,
            item: &pending.item,
            width: pending.width,
        })
    }

    /// The request currently in flight, if any.
    pub fn current(&self) -> Option<MeasureRequest<'_, K, T>> {
        self.in_flight.as_ref().map(|pending| MeasureRequest {
            ticket: pending.ticket,
            item: &pending.item,
            width: pending.width,
        })
    }

    /// Resolves the measurement identified by `ticket`.
    ///
    /// A stale ticket is dropped and `None` returned. A failed measurement resolves to
    /// `fallback_height` so one broken item cannot stall the queue.
    pub fn finish(
        &mut self,
        ticket: MeasureTicket,
        result: Result<u32, MeasureError>,
        fallback_height: u32,
    ) -> Option<(Item<K, T>, u32)> {
        if self.in_flight.as_ref().map(|p| p.ticket) != Some(ticket) {
            mdebug!(
                seq = ticket.seq,
                generation = ticket.generation,
                current = self.generation,
                "stale measurement dropped"
            );
            return None;
        }
        let pending = self.in_flight.take()?;
        let height = match result {
            Ok(height) => height,
            Err(_err) => {
                mwarn!(error = %_err, fallback_height, "measurement failed; using fallback height");
                fallback_height
            }
        };
        Some((pending.item, height))
    }
}

impl<K: PartialEq, T> Default for OffscreenMeasurer<K, T> {
    fn default() -> Self {
        Self::new()
    }
}
