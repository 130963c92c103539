//! Two-lane FIFO event queue with a single terminal marker.
//!
//! Historical market events go to the historical lane, followed by exactly
//! one terminal marker (`close`). Events produced while processing (signals,
//! orders, fills) go to the derived lane. `dequeue` always drains the derived
//! lane first, so a derived event can never be stranded behind the terminal
//! marker. Within each lane order is strictly FIFO.

use std::collections::VecDeque;
use thiserror::Error;

use crate::domain::{Event, MarketEvent};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("market event enqueued after the terminal marker")]
    Closed,

    #[error("terminal marker already enqueued")]
    AlreadyClosed,
}

/// What `dequeue` hands back.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueItem {
    Event(Event),
    /// No further events will be produced.
    Terminal,
}

#[derive(Debug)]
enum HistoricalEntry {
    Market(MarketEvent),
    Terminal,
}

#[derive(Debug, Default)]
pub struct EventQueue {
    historical: VecDeque<HistoricalEntry>,
    derived: VecDeque<Event>,
    closed: bool,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event. Market events join the historical lane and are
    /// refused once the queue is closed; everything else joins the derived lane.
    pub fn enqueue(&mut self, event: Event) -> Result<(), QueueError> {
        match event {
            Event::Market(market) => {
                if self.closed {
                    return Err(QueueError::Closed);
                }
                self.historical.push_back(HistoricalEntry::Market(market));
            }
            derived => self.derived.push_back(derived),
        }
        Ok(())
    }

    /// Append the terminal marker behind all historical events.
    pub fn close(&mut self) -> Result<(), QueueError> {
        if self.closed {
            return Err(QueueError::AlreadyClosed);
        }
        self.historical.push_back(HistoricalEntry::Terminal);
        self.closed = true;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Next item: derived events first, then the historical lane.
    /// `None` once everything, terminal marker included, has been taken.
    pub fn dequeue(&mut self) -> Option<QueueItem> {
        if let Some(event) = self.derived.pop_front() {
            return Some(QueueItem::Event(event));
        }
        self.historical.pop_front().map(|entry| match entry {
            HistoricalEntry::Market(market) => QueueItem::Event(Event::Market(market)),
            HistoricalEntry::Terminal => QueueItem::Terminal,
        })
    }

    /// Pending events, excluding the terminal marker.
    pub fn len(&self) -> usize {
        let markers = self
            .historical
            .iter()
            .filter(|e| matches!(e, HistoricalEntry::Terminal))
            .count();
        self.historical.len() - markers + self.derived.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
