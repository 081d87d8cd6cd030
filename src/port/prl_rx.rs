//! Protocol layer receiver (PRL-RX).
//!
//! Reads frames the PHY has already acknowledged, filters duplicates by
//! MessageID, and delivers the survivors to the policy engine mailbox. An
//! inbound message preempts any transmission in progress: the receiver
//! signals a discard to PRL-TX before delivering.
//!
//! A received Soft_Reset resets the protocol-layer counters here, then
//! travels on to the policy engine like any other message.

use crate::dpm::DevicePolicyManager;
use crate::event::{PolicyEvents, RxEvents, TxEvents};
use crate::message::{ControlMsgType, MsgId};
use crate::phy::PdPhy;

use super::Ctx;

enum RxState {
    /// Waiting for the PHY to report a received frame.
    WaitPhy,
    /// Soft_Reset seen; counters cleared and PRL-TX signalled, one yield
    /// pending so the transmitter can observe the reset first.
    Reset { msg: MsgId },
    /// Frame in hand; duplicate filter not yet applied.
    CheckMessageId { msg: MsgId },
    /// Discard signalled to PRL-TX, one yield pending before delivery.
    StoreMessageId { msg: MsgId },
}

pub(crate) struct PrlRx {
    state: RxState,
}

impl PrlRx {
    pub const fn new() -> Self {
        Self {
            state: RxState::WaitPhy,
        }
    }

    pub fn step<PHY: PdPhy, DPM: DevicePolicyManager, const POOL: usize>(
        &mut self,
        ctx: &mut Ctx<'_, PHY, DPM, POOL>,
    ) -> bool {
        match core::mem::replace(&mut self.state, RxState::WaitPhy) {
            RxState::WaitPhy => {
                let evt = ctx.events.prl_rx.take(RxEvents::RESET | RxEvents::GCRC_SENT);
                if evt.is_empty() {
                    return false;
                }
                // A reset consumes the wake; any coincident frame event is
                // dropped with it. The partner restarts its MessageIDs, so
                // forget the stored one.
                if evt.contains(RxEvents::RESET) {
                    ctx.prl.rx_message_id = None;
                    return true;
                }

                let msg = ctx.pool.alloc();
                ctx.phy.read_message(ctx.pool.get_mut(&msg));

                if ctx.pool.get(&msg).is_control(ControlMsgType::SoftReset) {
                    ctx.prl.rx_message_id = None;
                    ctx.prl.tx_message_id_count = 0;
                    ctx.events.prl_tx.set(TxEvents::RESET);
                    self.state = RxState::Reset { msg };
                } else {
                    self.state = RxState::CheckMessageId { msg };
                }
                true
            }
            RxState::Reset { msg } => {
                // If our own reset fired while yielding, drop the frame.
                if !ctx.events.prl_rx.take(RxEvents::RESET).is_empty() {
                    ctx.prl.rx_message_id = None;
                    ctx.pool.free(msg);
                } else {
                    // The Soft_Reset itself still goes to the policy engine.
                    self.state = RxState::CheckMessageId { msg };
                }
                true
            }
            RxState::CheckMessageId { msg } => {
                if !ctx.events.prl_rx.take(RxEvents::RESET).is_empty() {
                    ctx.prl.rx_message_id = None;
                    ctx.pool.free(msg);
                    return true;
                }

                let id = ctx.pool.get(&msg).header().message_id();
                if ctx.prl.rx_message_id == Some(id) {
                    // Retransmission of a message we already delivered.
                    ctx.pool.free(msg);
                } else {
                    // Delivery preempts any transmission in progress.
                    ctx.events.prl_tx.set(TxEvents::DISCARD);
                    self.state = RxState::StoreMessageId { msg };
                }
                true
            }
            RxState::StoreMessageId { msg } => {
                ctx.prl.rx_message_id = Some(ctx.pool.get(&msg).header().message_id());
                if ctx.pe_mailbox.post(msg).is_err() {
                    unreachable!("pe mailbox sized to the pool cannot overflow");
                }
                ctx.events.policy.set(PolicyEvents::MSG_RX);
                true
            }
        }
    }
}
