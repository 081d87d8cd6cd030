//! Protocol layer transmitter (PRL-TX).
//!
//! Serializes the policy engine's transmit requests: stamps the MessageID,
//! submits frames to the PHY, validates the GoodCRC echo, and reports the
//! outcome back as `TX_DONE` or `TX_ERR`. At most one transmission is in
//! flight at any time.
//!
//! The MessageID counter advances after every completed or failed attempt,
//! and once more when an in-progress transmission is discarded — the
//! partner may have seen the frame even if we never saw its GoodCRC.

use crate::dpm::DevicePolicyManager;
use crate::event::{PolicyEvents, RxEvents, TxEvents};
use crate::message::{ControlMsgType, Message, MsgId};
use crate::phy::{PdPhy, TypecCurrent};

use super::Ctx;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxState {
    /// Reset the PHY and fail any transmission in progress.
    PhyReset,
    /// Waiting for reset, discard, or a mailbox post.
    WaitMessage,
    /// Soft_Reset popped from the mailbox; counters cleared and PRL-RX
    /// signalled, one yield pending.
    Reset,
    /// Stamping and submitting the pending message (may stall on PD 3.0
    /// collision avoidance).
    ConstructMessage,
    /// Frame submitted; waiting for the PHY's verdict.
    WaitResponse,
    /// Abandon the in-progress transmission.
    DiscardMessage,
}

pub(crate) struct PrlTx {
    state: TxState,
    /// The message currently being transmitted, if any.
    tx_message: Option<MsgId>,
    /// Set while collision avoidance holds the next transmission until the
    /// source advertises SinkTxOk.
    ams_wait: bool,
}

impl PrlTx {
    pub const fn new() -> Self {
        Self {
            state: TxState::PhyReset,
            tx_message: None,
            ams_wait: false,
        }
    }

    /// Fail the in-flight message (and anything still queued) toward PE.
    fn fail_pending<PHY: PdPhy, DPM: DevicePolicyManager, const POOL: usize>(
        &mut self,
        ctx: &mut Ctx<'_, PHY, DPM, POOL>,
    ) {
        if let Some(msg) = self.tx_message.take() {
            ctx.pool.free(msg);
            ctx.events.policy.set(PolicyEvents::TX_ERR);
        }
        while let Some(msg) = ctx.tx_mailbox.take() {
            ctx.pool.free(msg);
            ctx.events.policy.set(PolicyEvents::TX_ERR);
        }
    }

    pub fn step<PHY: PdPhy, DPM: DevicePolicyManager, const POOL: usize>(
        &mut self,
        ctx: &mut Ctx<'_, PHY, DPM, POOL>,
    ) -> bool {
        match self.state {
            TxState::PhyReset => {
                ctx.phy.reset();
                self.ams_wait = false;
                self.fail_pending(ctx);
                self.state = TxState::WaitMessage;
                true
            }
            TxState::WaitMessage => {
                let evt = ctx
                    .events
                    .prl_tx
                    .take(TxEvents::RESET | TxEvents::DISCARD | TxEvents::MSG_TX);
                if evt.is_empty() {
                    return false;
                }
                if evt.contains(TxEvents::RESET) {
                    self.state = TxState::PhyReset;
                    return true;
                }
                if evt.contains(TxEvents::DISCARD) {
                    self.state = TxState::DiscardMessage;
                    return true;
                }

                let Some(msg) = ctx.tx_mailbox.take() else {
                    // Spurious wake; the mailbox was drained by a reset.
                    return true;
                };
                if !ctx.tx_mailbox.is_empty() {
                    ctx.events.prl_tx.set(TxEvents::MSG_TX);
                }

                let soft_reset = ctx.pool.get(&msg).is_control(ControlMsgType::SoftReset);
                self.tx_message = Some(msg);
                if soft_reset {
                    // Transmitting Soft_Reset starts both ends from MessageID 0.
                    ctx.prl.tx_message_id_count = 0;
                    ctx.events.prl_rx.set(RxEvents::RESET);
                    self.state = TxState::Reset;
                } else {
                    self.state = TxState::ConstructMessage;
                }
                true
            }
            TxState::Reset => {
                self.state = TxState::ConstructMessage;
                true
            }
            TxState::ConstructMessage => {
                let evt = ctx.events.prl_tx.take(TxEvents::RESET | TxEvents::DISCARD);
                if evt.contains(TxEvents::RESET) {
                    self.ams_wait = false;
                    self.state = TxState::PhyReset;
                    return true;
                }
                if evt.contains(TxEvents::DISCARD) {
                    self.ams_wait = false;
                    self.state = TxState::DiscardMessage;
                    return true;
                }

                let ams_requested = !ctx.events.prl_tx.take(TxEvents::START_AMS).is_empty();
                if !self.ams_wait
                    && ams_requested
                    && ctx.prl.revision == crate::message::SpecRev::R3_0
                {
                    self.ams_wait = true;
                }
                if self.ams_wait {
                    // PD 3.0 collision avoidance: hold the first message of
                    // an AMS until the source advertises SinkTxOk.
                    if ctx.phy.typec_current() != TypecCurrent::SINK_TX_OK {
                        return false;
                    }
                    self.ams_wait = false;
                }

                let Some(msg) = self.tx_message.as_ref() else {
                    self.state = TxState::WaitMessage;
                    return true;
                };
                let count = ctx.prl.tx_message_id_count;
                ctx.pool.get_mut(msg).header_mut().set_message_id(count);
                ctx.phy.send_message(ctx.pool.get(msg));
                self.state = TxState::WaitResponse;
                true
            }
            TxState::WaitResponse => {
                let evt = ctx.events.prl_tx.take(
                    TxEvents::RESET | TxEvents::DISCARD | TxEvents::TX_SENT | TxEvents::RETRY_FAIL,
                );
                if evt.is_empty() {
                    return false;
                }
                if evt.contains(TxEvents::RESET) {
                    self.state = TxState::PhyReset;
                    return true;
                }
                if evt.contains(TxEvents::DISCARD) {
                    self.state = TxState::DiscardMessage;
                    return true;
                }
                if evt.contains(TxEvents::TX_SENT) {
                    if Self::goodcrc_matches(ctx) {
                        self.finish(ctx, PolicyEvents::TX_DONE);
                    } else {
                        self.finish(ctx, PolicyEvents::TX_ERR);
                    }
                } else {
                    // Retries exhausted at the PHY.
                    self.finish(ctx, PolicyEvents::TX_ERR);
                }
                true
            }
            TxState::DiscardMessage => {
                if self.tx_message.is_some() {
                    // The partner may have received the discarded frame.
                    ctx.prl.advance_tx_message_id();
                }
                self.state = TxState::PhyReset;
                true
            }
        }
    }

    /// Validate the GoodCRC echo: control GoodCRC, zero objects, MessageID
    /// matching the transmission.
    fn goodcrc_matches<PHY: PdPhy, DPM: DevicePolicyManager, const POOL: usize>(
        ctx: &mut Ctx<'_, PHY, DPM, POOL>,
    ) -> bool {
        let mut echo = Message::empty();
        ctx.phy.read_message(&mut echo);
        echo.is_control(ControlMsgType::GoodCrc)
            && echo.header().message_id() == ctx.prl.tx_message_id_count
    }

    fn finish<PHY: PdPhy, DPM: DevicePolicyManager, const POOL: usize>(
        &mut self,
        ctx: &mut Ctx<'_, PHY, DPM, POOL>,
        outcome: PolicyEvents,
    ) {
        ctx.prl.advance_tx_message_id();
        ctx.events.policy.set(outcome);
        if let Some(msg) = self.tx_message.take() {
            ctx.pool.free(msg);
        }
        self.state = TxState::WaitMessage;
    }
}
