//! The sink port: task wiring and the poll loop.
//!
//! A [`SinkPort`] owns the five cooperative tasks of the stack — INT_N
//! poller, PRL-RX, PRL-TX, hard reset, and the policy engine — together
//! with the message pool, the two mailboxes, the event words and the shared
//! protocol counters.
//!
//! The tasks are explicit state machines stepped by [`SinkPort::poll`]:
//! each step either makes progress (consumes events, transitions state,
//! touches the PHY) or reports itself blocked, and `poll` runs rounds over
//! all tasks until every one of them is blocked. An event wait in the
//! machine descriptions maps to "blocked until a masked bit is pending or
//! the deadline recorded at entry has passed"; a yield maps to "state
//! advanced, continue next round". This preserves the event-OR-then-decide
//! ordering semantics whether `poll` is driven from a main loop, a timer
//! interrupt, or an RTOS thread.

mod hard_reset;
mod intn;
mod policy;
mod prl_rx;
mod prl_tx;

use crate::dpm::DevicePolicyManager;
use crate::event::Events;
use crate::message::{Mailbox, MsgPool, SpecRev};
use crate::phy::PdPhy;
use crate::timing::Instant;

pub use policy::SinkState;

use hard_reset::HardResetTask;
use intn::IntnPoller;
use policy::PolicyEngine;
use prl_rx::PrlRx;
use prl_tx::PrlTx;

// =============================================================================
// Shared protocol state
// =============================================================================

/// Counters and negotiation state shared between the protocol-layer tasks.
pub(crate) struct PrlState {
    /// MessageID of the last message delivered to the policy engine;
    /// `None` until the first delivery and after every reset.
    pub rx_message_id: Option<u8>,
    /// MessageID to stamp into the next transmission, advancing modulo 8
    /// after every completed or failed attempt.
    pub tx_message_id_count: u8,
    /// Negotiated specification revision.
    pub revision: SpecRev,
}

impl PrlState {
    pub const fn new() -> Self {
        Self {
            rx_message_id: None,
            tx_message_id_count: 0,
            revision: SpecRev::R2_0,
        }
    }

    /// Advance the transmit MessageID counter modulo 8.
    pub fn advance_tx_message_id(&mut self) {
        self.tx_message_id_count = (self.tx_message_id_count + 1) % 8;
    }
}

// =============================================================================
// Task context
// =============================================================================

/// Borrowed view of the port handed to each task step.
///
/// The task structs themselves live outside this context, so a task can
/// mutate its own state while reaching every shared resource.
pub(crate) struct Ctx<'a, PHY: PdPhy, DPM: DevicePolicyManager, const POOL: usize> {
    pub phy: &'a mut PHY,
    pub dpm: &'a mut DPM,
    pub pool: &'a mut MsgPool<POOL>,
    pub pe_mailbox: &'a mut Mailbox<POOL>,
    pub tx_mailbox: &'a mut Mailbox<POOL>,
    pub events: &'a Events,
    pub prl: &'a mut PrlState,
}

// =============================================================================
// Sink port
// =============================================================================

/// A USB-PD sink port.
///
/// # Type Parameters
/// * `PHY` - the PD PHY driver
/// * `DPM` - the application's device policy manager
/// * `POOL` - message pool capacity (4-8; both mailboxes share it)
///
/// # Example
/// ```ignore
/// let mut port = SinkPort::<_, _, 8>::new(phy, dpm);
///
/// loop {
///     port.poll(now());
///     wait_for_tick_or_intn();
/// }
/// ```
pub struct SinkPort<PHY: PdPhy, DPM: DevicePolicyManager, const POOL: usize = 8> {
    phy: PHY,
    dpm: DPM,
    pool: MsgPool<POOL>,
    pe_mailbox: Mailbox<POOL>,
    tx_mailbox: Mailbox<POOL>,
    events: Events,
    prl: PrlState,
    intn: IntnPoller,
    prl_rx: PrlRx,
    prl_tx: PrlTx,
    hard_reset: HardResetTask,
    policy: PolicyEngine,
}

impl<PHY: PdPhy, DPM: DevicePolicyManager, const POOL: usize> SinkPort<PHY, DPM, POOL> {
    /// Create a port around a PHY driver and a device policy manager.
    pub fn new(phy: PHY, dpm: DPM) -> Self {
        Self {
            phy,
            dpm,
            pool: MsgPool::new(),
            pe_mailbox: Mailbox::new(),
            tx_mailbox: Mailbox::new(),
            events: Events::new(),
            prl: PrlState::new(),
            intn: IntnPoller::new(),
            prl_rx: PrlRx::new(),
            prl_tx: PrlTx::new(),
            hard_reset: HardResetTask::new(),
            policy: PolicyEngine::new(),
        }
    }

    /// Run the stack until every task is blocked.
    ///
    /// Call at least once per millisecond (the INT_N sampling period), or
    /// whenever the interrupt line asserts. `now` must come from a
    /// monotonic millisecond tick.
    pub fn poll(&mut self, now: Instant) {
        loop {
            let mut ctx = Ctx {
                phy: &mut self.phy,
                dpm: &mut self.dpm,
                pool: &mut self.pool,
                pe_mailbox: &mut self.pe_mailbox,
                tx_mailbox: &mut self.tx_mailbox,
                events: &self.events,
                prl: &mut self.prl,
            };

            let mut progress = self.intn.step(&mut ctx, now);
            progress |= self.prl_rx.step(&mut ctx);
            progress |= self.prl_tx.step(&mut ctx);
            progress |= self.hard_reset.step(&mut ctx, now);
            progress |= self.policy.step(&mut ctx, now);

            if !progress {
                break;
            }
        }
    }

    // =========================================================================
    // State accessors
    // =========================================================================

    /// The policy engine's current state.
    #[inline]
    pub fn state(&self) -> SinkState {
        self.policy.public_state()
    }

    /// True while an explicit contract is in force (PS_RDY received).
    #[inline]
    pub fn explicit_contract(&self) -> bool {
        self.policy.explicit_contract()
    }

    /// True when the sink was asked to operate at minimum power (after a
    /// Wait response or GotoMin).
    #[inline]
    pub fn minimum_power(&self) -> bool {
        self.policy.minimum_power()
    }

    /// The negotiated specification revision.
    #[inline]
    pub fn spec_rev(&self) -> SpecRev {
        self.prl.revision
    }

    /// Borrow the PHY driver.
    #[inline]
    pub fn phy(&self) -> &PHY {
        &self.phy
    }

    /// Mutably borrow the PHY driver (for application-side measurements).
    #[inline]
    pub fn phy_mut(&mut self) -> &mut PHY {
        &mut self.phy
    }

    /// Borrow the device policy manager.
    #[inline]
    pub fn dpm(&self) -> &DPM {
        &self.dpm
    }

    /// Mutably borrow the device policy manager.
    #[inline]
    pub fn dpm_mut(&mut self) -> &mut DPM {
        &mut self.dpm
    }

    // =========================================================================
    // Application requests
    // =========================================================================
    //
    // These only set event bits, so they are safe to call from interrupt
    // context while another context runs `poll`.

    /// Ask the source to resend its capabilities.
    pub fn request_source_capabilities(&self) {
        self.events
            .policy
            .set(crate::event::PolicyEvents::GET_SOURCE_CAP);
    }

    /// Re-run capability evaluation (the DPM will be consulted again).
    pub fn request_new_power(&self) {
        self.events.policy.set(crate::event::PolicyEvents::NEW_POWER);
    }

    /// Re-send the cached request (PPS voltage/current adjustment).
    pub fn request_pps_rerequest(&self) {
        self.events
            .policy
            .set(crate::event::PolicyEvents::PPS_REQUEST);
    }
}

// =============================================================================
// End-to-end tests (simulated PHY)
// =============================================================================
