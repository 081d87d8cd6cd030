//! Task event words.
//!
//! Each protocol task owns a 32-bit event word. Peers signal it by OR-ing
//! bits in; the owner consumes bits with an atomic read-and-clear. Bits are
//! level-triggered: a set bit stays pending until its owner takes it.
//!
//! The words live in [`EventFlags`] cells so that peers — including code
//! running in interrupt context — can signal without a mutable borrow of
//! the port.

use core::marker::PhantomData;

use bitflags::{Flags, bitflags};

use crate::sync::CriticalSectionCell;

bitflags! {
    /// Events consumed by the PRL-RX task.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RxEvents: u32 {
        /// Restart message reception (counters already cleared by the signaller).
        const RESET = 1 << 0;
        /// The PHY received a frame and answered it with GoodCRC.
        const GCRC_SENT = 1 << 1;
    }
}

bitflags! {
    /// Events consumed by the PRL-TX task.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TxEvents: u32 {
        /// Reset the transmitter and the PHY.
        const RESET = 1 << 0;
        /// Abandon any transmission in progress.
        const DISCARD = 1 << 1;
        /// A message is waiting in the transmit mailbox.
        const MSG_TX = 1 << 2;
        /// The PHY saw GoodCRC for the last transmission.
        const TX_SENT = 1 << 3;
        /// The PHY exhausted its retries without GoodCRC.
        const RETRY_FAIL = 1 << 4;
        /// The next transmission starts an atomic message sequence (PD 3.0).
        const START_AMS = 1 << 5;
    }
}

bitflags! {
    /// Events consumed by the hard reset task.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HardResetEvents: u32 {
        /// The policy engine requests a hard reset.
        const RESET = 1 << 0;
        /// The PHY observed hard reset signalling from the port partner.
        const RECEIVED = 1 << 1;
        /// The PHY finished sending hard reset signalling.
        const SENT = 1 << 2;
        /// The policy engine finished transitioning to default.
        const DONE = 1 << 3;
    }
}

bitflags! {
    /// Events consumed by the policy engine.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PolicyEvents: u32 {
        /// A message was delivered to the policy engine mailbox.
        const MSG_RX = 1 << 0;
        /// The last transmission was acknowledged by the port partner.
        const TX_DONE = 1 << 1;
        /// The last transmission failed or was discarded.
        const TX_ERR = 1 << 2;
        /// A hard reset was received; transition to default.
        const RESET = 1 << 3;
        /// Hard reset signalling has been sent on our behalf.
        const HARD_SENT = 1 << 4;
        /// The PHY reports over-temperature.
        const OVERTEMP = 1 << 5;
        /// The application asks for the source's capabilities.
        const GET_SOURCE_CAP = 1 << 6;
        /// The application wants to negotiate a different power level.
        const NEW_POWER = 1 << 7;
        /// The application wants a fresh PPS request.
        const PPS_REQUEST = 1 << 8;
    }
}

/// A level-triggered event word.
///
/// `set` ORs bits in atomically; `take` clears the requested bits and
/// returns those that were pending. Untaken bits remain pending.
pub struct EventFlags<F> {
    bits: CriticalSectionCell<u32>,
    _marker: PhantomData<F>,
}

impl<F: Flags<Bits = u32>> EventFlags<F> {
    /// Create an empty event word (const, suitable for static initialization).
    pub const fn new() -> Self {
        Self {
            bits: CriticalSectionCell::new(0),
            _marker: PhantomData,
        }
    }

    /// Signal events (atomic OR).
    #[inline]
    pub fn set(&self, events: F) {
        self.bits.with(|bits| *bits |= events.bits());
    }

    /// Consume the pending subset of `mask` (atomic read-and-clear).
    ///
    /// Bits outside `mask` stay pending.
    #[inline]
    pub fn take(&self, mask: F) -> F {
        let hit = self.bits.with(|bits| {
            let hit = *bits & mask.bits();
            *bits &= !hit;
            hit
        });
        F::from_bits_truncate(hit)
    }

    /// Read the pending events without consuming them.
    #[inline]
    pub fn peek(&self) -> F {
        F::from_bits_truncate(self.bits.with(|bits| *bits))
    }
}

impl<F: Flags<Bits = u32>> Default for EventFlags<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// The event words of all four event-driven tasks.
///
/// The INT_N poller owns no word; it only translates PHY status into the
/// words below.
pub(crate) struct Events {
    pub prl_rx: EventFlags<RxEvents>,
    pub prl_tx: EventFlags<TxEvents>,
    pub hard_reset: EventFlags<HardResetEvents>,
    pub policy: EventFlags<PolicyEvents>,
}

impl Events {
    pub const fn new() -> Self {
        Self {
            prl_rx: EventFlags::new(),
            prl_tx: EventFlags::new(),
            hard_reset: EventFlags::new(),
            policy: EventFlags::new(),
        }
    }
}
