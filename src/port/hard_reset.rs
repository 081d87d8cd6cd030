//! Hard reset machine.
//!
//! Drives hard reset in both directions: emitting the ordered set when the
//! policy engine asks for one, and reacting when the PHY observes one from
//! the port partner. This is the only task allowed to synchronously restart
//! PRL-RX and PRL-TX; either way the protocol-layer counters are cleared
//! before the policy engine is released into its default transition.

use crate::dpm::DevicePolicyManager;
use crate::event::{HardResetEvents, PolicyEvents, RxEvents, TxEvents};
use crate::phy::PdPhy;
use crate::timing::{Instant, T_HARD_RESET_COMPLETE};

use super::Ctx;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HrState {
    /// Waiting for a local request or a PHY-observed hard reset.
    ResetLayer,
    /// PRL-RX signalled; PRL-TX next after one yield.
    ResetTx { local: bool },
    /// Both protocol tasks signalled; branch by trigger direction.
    Dispatch { local: bool },
    /// Ordered set requested from the PHY; waiting for confirmation.
    WaitPhy,
    /// Waiting for the policy engine to finish its default transition.
    WaitPe,
}

pub(crate) struct HardResetTask {
    state: HrState,
    deadline: Option<Instant>,
}

impl HardResetTask {
    pub const fn new() -> Self {
        Self {
            state: HrState::ResetLayer,
            deadline: None,
        }
    }

    pub fn step<PHY: PdPhy, DPM: DevicePolicyManager, const POOL: usize>(
        &mut self,
        ctx: &mut Ctx<'_, PHY, DPM, POOL>,
        now: Instant,
    ) -> bool {
        match self.state {
            HrState::ResetLayer => {
                let evt = ctx
                    .events
                    .hard_reset
                    .take(HardResetEvents::RESET | HardResetEvents::RECEIVED);
                if evt.is_empty() {
                    return false;
                }

                ctx.prl.rx_message_id = None;
                ctx.prl.tx_message_id_count = 0;
                ctx.events.prl_rx.set(RxEvents::RESET);

                self.state = HrState::ResetTx {
                    local: evt.contains(HardResetEvents::RESET),
                };
                true
            }
            HrState::ResetTx { local } => {
                ctx.events.prl_tx.set(TxEvents::RESET);
                self.state = HrState::Dispatch { local };
                true
            }
            HrState::Dispatch { local } => {
                if local {
                    ctx.phy.send_hard_reset();
                    self.deadline = Some(now + T_HARD_RESET_COMPLETE);
                    self.state = HrState::WaitPhy;
                } else {
                    // Partner-initiated: tell the policy engine to return
                    // to default.
                    ctx.events.policy.set(PolicyEvents::RESET);
                    self.state = HrState::WaitPe;
                }
                true
            }
            HrState::WaitPhy => {
                let sent = !ctx.events.hard_reset.take(HardResetEvents::SENT).is_empty();
                let timed_out = self.deadline.is_some_and(|at| now >= at);
                if !sent && !timed_out {
                    return false;
                }
                self.deadline = None;

                // Whether or not the PHY confirmed in time, the contract is
                // void; release the policy engine.
                ctx.events.policy.set(PolicyEvents::RESET);
                ctx.events.policy.set(PolicyEvents::HARD_SENT);
                self.state = HrState::WaitPe;
                true
            }
            HrState::WaitPe => {
                if ctx.events.hard_reset.take(HardResetEvents::DONE).is_empty() {
                    return false;
                }
                self.state = HrState::ResetLayer;
                true
            }
        }
    }
}
