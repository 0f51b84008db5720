//! Sequencing of overlapping lookups.
//!
//! Every lookup takes a ticket for the surface that started it. When it completes, its
//! result is applied only if no newer lookup was started from the same surface since.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Where a lookup was started.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Surface {
  /// A click on the map.
  Click,
  /// One of the form's search buttons.
  Form,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket {
  pub surface: Surface,
  pub seq: u64,
  started_at: Instant,
}

impl Ticket {
  #[must_use]
  pub fn elapsed(&self) -> std::time::Duration {
    self.started_at.elapsed()
  }
}

#[derive(Default)]
struct TrackerState {
  next_seq: u64,
  newest: HashMap<Surface, u64>,
  in_flight: HashMap<u64, Surface>,
}

/// Hands out monotonically increasing tickets and remembers the newest one per surface.
#[derive(Default)]
pub struct LookupTracker {
  state: Mutex<TrackerState>,
}

impl LookupTracker {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  fn state(&self) -> MutexGuard<'_, TrackerState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Starts a lookup; every older ticket of `surface` is superseded from now on.
  pub fn begin(&self, surface: Surface) -> Ticket {
    let mut state = self.state();
    state.next_seq += 1;
    let seq = state.next_seq;
    state.newest.insert(surface, seq);
    state.in_flight.insert(seq, surface);
    Ticket {
      surface,
      seq,
      started_at: Instant::now(),
    }
  }

  /// Marks the lookup as completed.
  pub fn finish(&self, ticket: Ticket) {
    self.state().in_flight.remove(&ticket.seq);
  }

  /// Whether `ticket` is still the newest lookup of its surface.
  #[must_use]
  pub fn is_current(&self, ticket: Ticket) -> bool {
    self.state().newest.get(&ticket.surface) == Some(&ticket.seq)
  }

  /// Supersedes every outstanding lookup of `surface` without starting a new one.
  pub fn cancel(&self, surface: Surface) {
    let mut state = self.state();
    state.next_seq += 1;
    let seq = state.next_seq;
    state.newest.insert(surface, seq);
  }

  /// Number of lookups started and not yet finished.
  #[must_use]
  pub fn in_flight(&self, surface: Surface) -> usize {
    self
      .state()
      .in_flight
      .values()
      .filter(|s| **s == surface)
      .count()
  }
}

/// Finishes its ticket when dropped, so abandoned lookups do not stay in flight.
pub struct LookupGuard {
  ticket: Ticket,
  tracker: Arc<LookupTracker>,
}

impl LookupGuard {
  #[must_use]
  pub fn new(tracker: Arc<LookupTracker>, surface: Surface) -> Self {
    let ticket = tracker.begin(surface);
    Self { ticket, tracker }
  }

  #[must_use]
  pub fn ticket(&self) -> Ticket {
    self.ticket
  }

  #[must_use]
  pub fn is_current(&self) -> bool {
    self.tracker.is_current(self.ticket)
  }
}

impl Drop for LookupGuard {
  fn drop(&mut self) {
    self.tracker.finish(self.ticket);
  }
}
