// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-flight guard for navigation requests.
//!
//! A pager accepts one navigation at a time. The guard holds a ticket while
//! the request resolves and gives it back when the future completes or is
//! dropped. Changing the base filter clears the slot, so a stale request
//! releasing its ticket later cannot unlock a newer one.

use parking_lot::Mutex;

use crate::error::{PagerError, Result};

#[derive(Debug, Default)]
pub(crate) struct FlightSlot {
    active: Option<u64>,
    issued: u64,
}

impl FlightSlot {
    fn acquire(&mut self) -> Result<u64> {
        if self.active.is_some() {
            return Err(PagerError::Busy);
        }
        self.issued += 1;
        self.active = Some(self.issued);
        Ok(self.issued)
    }

    fn release(&mut self, ticket: u64) {
        if self.active == Some(ticket) {
            self.active = None;
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub(crate) fn clear(&mut self) {
        self.active = None;
    }
}

/// Pager state owning a [`FlightSlot`].
pub(crate) trait Flighted {
    fn flight(&mut self) -> &mut FlightSlot;
}

pub(crate) struct FlightGuard<'a, S: Flighted> {
    state: &'a Mutex<S>,
    ticket: u64,
}

impl<'a, S: Flighted> FlightGuard<'a, S> {
    /// Take the slot, or fail with [`PagerError::Busy`].
    pub(crate) fn acquire(state: &'a Mutex<S>) -> Result<Self> {
        let ticket = state.lock().flight().acquire()?;
        Ok(Self { state, ticket })
    }
}

impl<S: Flighted> Drop for FlightGuard<'_, S> {
    fn drop(&mut self) {
        self.state.lock().flight().release(self.ticket);
    }
}
