//! INT_N poller.
//!
//! Samples the PHY interrupt line once per millisecond. When the line is
//! asserted, reads the status registers in one pass and fans the bits out
//! to the owning tasks' event words. The poller is stateless between
//! iterations; it is the only translator from PHY hardware events to task
//! events.

use crate::dpm::DevicePolicyManager;
use crate::event::{HardResetEvents, PolicyEvents, RxEvents, TxEvents};
use crate::phy::PdPhy;
use crate::timing::{INTN_POLL_INTERVAL, Instant};

use super::Ctx;

pub(crate) struct IntnPoller {
    next_sample: Option<Instant>,
}

impl IntnPoller {
    pub const fn new() -> Self {
        Self { next_sample: None }
    }

    pub fn step<PHY: PdPhy, DPM: DevicePolicyManager, const POOL: usize>(
        &mut self,
        ctx: &mut Ctx<'_, PHY, DPM, POOL>,
        now: Instant,
    ) -> bool {
        if let Some(at) = self.next_sample {
            if now < at {
                return false;
            }
        }
        self.next_sample = Some(now + INTN_POLL_INTERVAL);

        if !ctx.phy.intn_asserted() {
            return false;
        }

        let status = ctx.phy.status();

        if status.gcrc_sent {
            ctx.events.prl_rx.set(RxEvents::GCRC_SENT);
        }
        if status.tx_sent {
            ctx.events.prl_tx.set(TxEvents::TX_SENT);
        }
        if status.retry_fail {
            ctx.events.prl_tx.set(TxEvents::RETRY_FAIL);
        }
        if status.hard_reset {
            ctx.events.hard_reset.set(HardResetEvents::RECEIVED);
        }
        if status.hard_sent {
            ctx.events.hard_reset.set(HardResetEvents::SENT);
        }
        if status.ocp_temp && status.overtemp {
            ctx.events.policy.set(PolicyEvents::OVERTEMP);
        }

        status.any()
    }
}
