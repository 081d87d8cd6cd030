//! Sink policy engine.
//!
//! Implements the sink policy state graph: capability discovery, power
//! requests (fixed and PPS), contract transitions, soft/hard reset
//! escalation, and the Type-C current fallback when the source never
//! responds. All PD timing budgets live here; the protocol layer below is
//! timer-free except for the hard reset confirmation.
//!
//! Decision order on concurrent events is fixed per state: a reset
//! dominates everything, then local conditions, then inbound messages,
//! then timeouts.

use crate::dpm::DevicePolicyManager;
use crate::event::{HardResetEvents, PolicyEvents, TxEvents};
use crate::message::{ControlMsgType, DataMsgType, Message, MsgId, SpecRev, pdo};
use crate::phy::{PdPhy, TypecCurrent};
use crate::timing::{
    Duration, Instant, N_HARD_RESET_COUNT, T_CHUNKING_NOT_SUPPORTED, T_PD_DEBOUNCE,
    T_PS_TRANSITION, T_PPS_REQUEST, T_SENDER_RESPONSE, T_SINK_REQUEST, T_TYPEC_SINK_WAIT_CAP,
};

use super::Ctx;

// =============================================================================
// States
// =============================================================================

/// Sub-stage of a state that transmits and then waits for the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxStage {
    Submit,
    AwaitOutcome,
}

/// Sub-stage of a state that transmits, waits for the outcome, then waits
/// for the partner's reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReqStage {
    Submit,
    AwaitOutcome,
    AwaitReply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HardStage {
    Check,
    AwaitSent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PeState {
    Startup,
    Discovery,
    WaitCap,
    EvalCap,
    SelectCap(ReqStage),
    TransitionSink,
    Ready,
    GetSourceCap(TxStage),
    GiveSinkCap(TxStage),
    SendSoftReset(ReqStage),
    SendNotSupported(TxStage),
    SoftReset(TxStage),
    HardReset(HardStage),
    TransitionDefault,
    ChunkReceived,
    NotSupportedReceived,
    SourceUnresponsive,
}

/// Externally visible policy engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SinkState {
    /// Initial state after power-up or a hard reset.
    Startup,
    /// Waiting for VBUS (assumed present on bus-powered designs).
    Discovery,
    /// Waiting for Source_Capabilities.
    WaitCap,
    /// Consulting the device policy manager.
    EvalCap,
    /// Request sent; waiting for Accept/Reject/Wait.
    SelectCap,
    /// Accept received; waiting for PS_RDY.
    TransitionSink,
    /// Explicit contract in force (or degraded operation after Wait).
    Ready,
    /// Asking the source for fresh capabilities.
    GetSourceCap,
    /// Answering Get_Sink_Cap.
    GiveSinkCap,
    /// Escalating an unexpected message to a soft reset.
    SendSoftReset,
    /// Answering an unsupported message.
    SendNotSupported,
    /// Accepting a received Soft_Reset.
    SoftReset,
    /// Driving a hard reset.
    HardReset,
    /// Returning the board to default power.
    TransitionDefault,
    /// Pausing before rejecting a chunked extended message.
    ChunkReceived,
    /// The partner rejected our last request as unsupported.
    NotSupportedReceived,
    /// The source never responded; Type-C current fallback.
    SourceUnresponsive,
}

// =============================================================================
// Policy engine
// =============================================================================

pub(crate) struct PolicyEngine {
    state: PeState,
    /// Deadline of the wait in progress, armed on entry to a timed state.
    deadline: Option<Instant>,
    explicit_contract: bool,
    min_power: bool,
    hard_reset_counter: u8,
    /// 1-based object position of the first PPS APDO in the current
    /// capabilities, or [`pdo::NO_PPS_INDEX`].
    pps_index: u8,
    /// Object position of the previous request when it targeted a PPS
    /// APDO, or [`pdo::NO_PPS_INDEX`].
    last_pps: u8,
    /// Cached source capabilities; the DPM borrows them on evaluation.
    caps: Option<Message>,
    /// Set when `caps` changed since the PPS index was computed.
    caps_updated: bool,
    /// Cached copy of the last request the DPM built.
    last_request: Option<Message>,
    /// SinkPPSPeriodicTimer, armed while a PPS contract is in force.
    pps_deadline: Option<Instant>,
    /// Previous Type-C current sample in the fallback loop.
    typec_sample: Option<TypecCurrent>,
    /// Last advertisement applied through the DPM.
    typec_applied: Option<TypecCurrent>,
}

impl PolicyEngine {
    pub const fn new() -> Self {
        Self {
            state: PeState::Startup,
            deadline: None,
            explicit_contract: false,
            min_power: false,
            hard_reset_counter: 0,
            pps_index: pdo::NO_PPS_INDEX,
            last_pps: pdo::NO_PPS_INDEX,
            caps: None,
            caps_updated: false,
            last_request: None,
            pps_deadline: None,
            typec_sample: None,
            typec_applied: None,
        }
    }

    pub fn public_state(&self) -> SinkState {
        match self.state {
            PeState::Startup => SinkState::Startup,
            PeState::Discovery => SinkState::Discovery,
            PeState::WaitCap => SinkState::WaitCap,
            PeState::EvalCap => SinkState::EvalCap,
            PeState::SelectCap(_) => SinkState::SelectCap,
            PeState::TransitionSink => SinkState::TransitionSink,
            PeState::Ready => SinkState::Ready,
            PeState::GetSourceCap(_) => SinkState::GetSourceCap,
            PeState::GiveSinkCap(_) => SinkState::GiveSinkCap,
            PeState::SendSoftReset(_) => SinkState::SendSoftReset,
            PeState::SendNotSupported(_) => SinkState::SendNotSupported,
            PeState::SoftReset(_) => SinkState::SoftReset,
            PeState::HardReset(_) => SinkState::HardReset,
            PeState::TransitionDefault => SinkState::TransitionDefault,
            PeState::ChunkReceived => SinkState::ChunkReceived,
            PeState::NotSupportedReceived => SinkState::NotSupportedReceived,
            PeState::SourceUnresponsive => SinkState::SourceUnresponsive,
        }
    }

    pub fn explicit_contract(&self) -> bool {
        self.explicit_contract
    }

    pub fn minimum_power(&self) -> bool {
        self.min_power
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn goto(&mut self, next: PeState) -> bool {
        self.state = next;
        self.deadline = None;
        true
    }

    /// Arm the state's deadline on first entry to its wait.
    fn arm(&mut self, now: Instant, timeout: Duration) {
        if self.deadline.is_none() {
            self.deadline = Some(now + timeout);
        }
    }

    fn timed_out(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|at| now >= at)
    }

    /// Pop the next delivered message, keeping `MSG_RX` armed while more
    /// are queued.
    fn pop_message<PHY: PdPhy, DPM: DevicePolicyManager, const POOL: usize>(
        ctx: &mut Ctx<'_, PHY, DPM, POOL>,
    ) -> Option<MsgId> {
        let id = ctx.pe_mailbox.take()?;
        if !ctx.pe_mailbox.is_empty() {
            ctx.events.policy.set(PolicyEvents::MSG_RX);
        }
        Some(id)
    }

    /// Take one delivered message out of the pool, by value.
    fn take_message<PHY: PdPhy, DPM: DevicePolicyManager, const POOL: usize>(
        ctx: &mut Ctx<'_, PHY, DPM, POOL>,
    ) -> Option<Message> {
        let id = Self::pop_message(ctx)?;
        let msg = *ctx.pool.get(&id);
        ctx.pool.free(id);
        Some(msg)
    }

    /// Hand a message to PRL-TX. The policy engine never has more than one
    /// transmission outstanding.
    fn submit<PHY: PdPhy, DPM: DevicePolicyManager, const POOL: usize>(
        ctx: &mut Ctx<'_, PHY, DPM, POOL>,
        msg: Message,
    ) {
        let id = ctx.pool.alloc();
        *ctx.pool.get_mut(&id) = msg;
        if ctx.tx_mailbox.post(id).is_err() {
            unreachable!("tx mailbox sized to the pool cannot overflow");
        }
        ctx.events.prl_tx.set(TxEvents::MSG_TX);
    }

    fn store_capabilities(&mut self, ctx_revision: &mut SpecRev, msg: &Message) {
        // Negotiate downward: we speak 2.0 and 3.0.
        *ctx_revision = if msg.header().spec_rev() >= SpecRev::R3_0 {
            SpecRev::R3_0
        } else {
            SpecRev::R2_0
        };
        self.caps = Some(*msg);
        self.caps_updated = true;
        // A responsive source resets the hard reset budget.
        self.hard_reset_counter = 0;
    }

    fn requested_position(&self) -> u8 {
        self.last_request
            .as_ref()
            .map(|request| pdo::rdo::object_position(request.object(0)))
            .unwrap_or(0)
    }

    // =========================================================================
    // Step
    // =========================================================================

    #[allow(clippy::too_many_lines)]
    pub fn step<PHY: PdPhy, DPM: DevicePolicyManager, const POOL: usize>(
        &mut self,
        ctx: &mut Ctx<'_, PHY, DPM, POOL>,
        now: Instant,
    ) -> bool {
        match self.state {
            PeState::Startup => {
                self.explicit_contract = false;
                ctx.dpm.start();
                self.goto(PeState::Discovery)
            }
            PeState::Discovery => {
                // Bus-powered sink: VBUS is present or we would not be
                // running.
                self.goto(PeState::WaitCap)
            }
            PeState::WaitCap => self.wait_cap(ctx, now),
            PeState::EvalCap => self.eval_cap(ctx),
            PeState::SelectCap(stage) => self.select_cap(ctx, now, stage),
            PeState::TransitionSink => self.transition_sink(ctx, now),
            PeState::Ready => self.ready(ctx, now),
            PeState::GetSourceCap(stage) => match stage {
                TxStage::Submit => {
                    let msg = Message::control(ControlMsgType::GetSourceCap, ctx.prl.revision);
                    Self::submit(ctx, msg);
                    self.goto(PeState::GetSourceCap(TxStage::AwaitOutcome))
                }
                TxStage::AwaitOutcome => self.await_outcome(ctx, PeState::Ready),
            },
            PeState::GiveSinkCap(stage) => match stage {
                TxStage::Submit => {
                    let mut caps =
                        Message::data(DataMsgType::SinkCapabilities, ctx.prl.revision, &[]);
                    ctx.dpm.sink_capability(&mut caps);
                    Self::submit(ctx, caps);
                    self.goto(PeState::GiveSinkCap(TxStage::AwaitOutcome))
                }
                TxStage::AwaitOutcome => self.await_outcome(ctx, PeState::Ready),
            },
            PeState::SendSoftReset(stage) => self.send_soft_reset(ctx, now, stage),
            PeState::SendNotSupported(stage) => match stage {
                TxStage::Submit => {
                    // Not_Supported exists only from PD 3.0 on.
                    let kind = if ctx.prl.revision >= SpecRev::R3_0 {
                        ControlMsgType::NotSupported
                    } else {
                        ControlMsgType::Reject
                    };
                    let msg = Message::control(kind, ctx.prl.revision);
                    Self::submit(ctx, msg);
                    self.goto(PeState::SendNotSupported(TxStage::AwaitOutcome))
                }
                TxStage::AwaitOutcome => {
                    if !ctx.events.policy.take(PolicyEvents::RESET).is_empty() {
                        return self.goto(PeState::TransitionDefault);
                    }
                    let evt = ctx
                        .events
                        .policy
                        .take(PolicyEvents::TX_DONE | PolicyEvents::TX_ERR);
                    if evt.is_empty() {
                        return false;
                    }
                    if evt.contains(PolicyEvents::TX_ERR) {
                        // A failed response escalates one level, not two.
                        return self.goto(PeState::SendSoftReset(ReqStage::Submit));
                    }
                    self.goto(PeState::Ready)
                }
            },
            PeState::SoftReset(stage) => match stage {
                TxStage::Submit => {
                    // The protocol layer already reset its counters when
                    // the Soft_Reset came through.
                    let msg = Message::control(ControlMsgType::Accept, ctx.prl.revision);
                    Self::submit(ctx, msg);
                    self.goto(PeState::SoftReset(TxStage::AwaitOutcome))
                }
                TxStage::AwaitOutcome => self.await_outcome(ctx, PeState::WaitCap),
            },
            PeState::HardReset(stage) => match stage {
                HardStage::Check => {
                    if self.hard_reset_counter > N_HARD_RESET_COUNT {
                        self.typec_sample = None;
                        self.typec_applied = None;
                        #[cfg(feature = "defmt")]
                        defmt::warn!("source unresponsive, falling back to Type-C current");
                        return self.goto(PeState::SourceUnresponsive);
                    }
                    #[cfg(feature = "defmt")]
                    defmt::debug!("hard reset (attempt {})", self.hard_reset_counter + 1);
                    ctx.events.hard_reset.set(HardResetEvents::RESET);
                    self.goto(PeState::HardReset(HardStage::AwaitSent))
                }
                HardStage::AwaitSent => {
                    // A pending RESET is consumed here too: the hard reset
                    // machine raises it alongside HARD_SENT, and both end
                    // in the same default transition.
                    let evt = ctx
                        .events
                        .policy
                        .take(PolicyEvents::HARD_SENT | PolicyEvents::RESET);
                    if evt.is_empty() {
                        return false;
                    }
                    if evt.contains(PolicyEvents::HARD_SENT) {
                        self.hard_reset_counter += 1;
                    }
                    self.goto(PeState::TransitionDefault)
                }
            },
            PeState::TransitionDefault => {
                self.explicit_contract = false;
                self.min_power = false;
                self.pps_deadline = None;
                ctx.dpm.transition_default();

                // Anything parked for us predates the reset.
                while let Some(id) = ctx.pe_mailbox.take() {
                    ctx.pool.free(id);
                }
                ctx.events.policy.take(PolicyEvents::all());

                ctx.events.hard_reset.set(HardResetEvents::DONE);
                self.goto(PeState::Startup)
            }
            PeState::ChunkReceived => {
                if !ctx.events.policy.take(PolicyEvents::RESET).is_empty() {
                    return self.goto(PeState::TransitionDefault);
                }
                self.arm(now, T_CHUNKING_NOT_SUPPORTED);
                if self.timed_out(now) {
                    return self.goto(PeState::SendNotSupported(TxStage::Submit));
                }
                false
            }
            PeState::NotSupportedReceived => {
                ctx.dpm.not_supported_received();
                self.goto(PeState::Ready)
            }
            PeState::SourceUnresponsive => self.source_unresponsive(ctx, now),
        }
    }

    // =========================================================================
    // State bodies
    // =========================================================================

    fn wait_cap<PHY: PdPhy, DPM: DevicePolicyManager, const POOL: usize>(
        &mut self,
        ctx: &mut Ctx<'_, PHY, DPM, POOL>,
        now: Instant,
    ) -> bool {
        self.arm(now, T_TYPEC_SINK_WAIT_CAP);

        if !ctx.events.policy.take(PolicyEvents::RESET).is_empty() {
            return self.goto(PeState::TransitionDefault);
        }
        if !ctx.events.policy.take(PolicyEvents::MSG_RX).is_empty() {
            let Some(msg) = Self::take_message(ctx) else {
                return true;
            };
            if msg.data_type() == Some(DataMsgType::SourceCapabilities)
                && msg.header().num_objects() >= 1
            {
                self.store_capabilities(&mut ctx.prl.revision, &msg);
                return self.goto(PeState::EvalCap);
            }
            if msg.is_control(ControlMsgType::SoftReset) {
                return self.goto(PeState::SoftReset(TxStage::Submit));
            }
            return self.goto(PeState::HardReset(HardStage::Check));
        }
        if !ctx.events.policy.take(PolicyEvents::OVERTEMP).is_empty() {
            // Too hot to negotiate; hold here until the source shows up.
            return true;
        }
        if self.timed_out(now) {
            return self.goto(PeState::HardReset(HardStage::Check));
        }
        false
    }

    fn eval_cap<PHY: PdPhy, DPM: DevicePolicyManager, const POOL: usize>(
        &mut self,
        ctx: &mut Ctx<'_, PHY, DPM, POOL>,
    ) -> bool {
        let Some(caps) = self.caps else {
            return self.goto(PeState::WaitCap);
        };

        if self.caps_updated {
            self.pps_index = pdo::first_pps_index(caps.objects());
            self.last_pps = pdo::NO_PPS_INDEX;
            self.caps_updated = false;
        }
        if self.last_request.is_some() {
            // Remember whether the request we are about to replace pointed
            // at a PPS APDO; Sink Standby decisions depend on it.
            let previous = self.requested_position();
            self.last_pps = if previous >= self.pps_index {
                previous
            } else {
                pdo::NO_PPS_INDEX
            };
        }

        let mut request = Message::request(0, ctx.prl.revision);
        ctx.dpm.evaluate_capability(&caps, &mut request);
        self.last_request = Some(request);

        self.goto(PeState::SelectCap(ReqStage::Submit))
    }

    fn select_cap<PHY: PdPhy, DPM: DevicePolicyManager, const POOL: usize>(
        &mut self,
        ctx: &mut Ctx<'_, PHY, DPM, POOL>,
        now: Instant,
        stage: ReqStage,
    ) -> bool {
        match stage {
            ReqStage::Submit => {
                let Some(request) = self.last_request else {
                    return self.goto(PeState::WaitCap);
                };
                Self::submit(ctx, request);
                self.goto(PeState::SelectCap(ReqStage::AwaitOutcome))
            }
            ReqStage::AwaitOutcome => {
                if !ctx.events.policy.take(PolicyEvents::RESET).is_empty() {
                    return self.goto(PeState::TransitionDefault);
                }
                let evt = ctx
                    .events
                    .policy
                    .take(PolicyEvents::TX_DONE | PolicyEvents::TX_ERR);
                if evt.is_empty() {
                    return false;
                }
                if evt.contains(PolicyEvents::TX_ERR) {
                    return self.goto(PeState::HardReset(HardStage::Check));
                }

                // Keep a PPS contract alive with periodic re-requests.
                if ctx.prl.revision == SpecRev::R3_0
                    && self.requested_position() >= self.pps_index
                {
                    self.pps_deadline = Some(now + T_PPS_REQUEST);
                } else {
                    self.pps_deadline = None;
                }
                self.goto(PeState::SelectCap(ReqStage::AwaitReply))
            }
            ReqStage::AwaitReply => {
                self.arm(now, T_SENDER_RESPONSE);

                if !ctx.events.policy.take(PolicyEvents::RESET).is_empty() {
                    return self.goto(PeState::TransitionDefault);
                }
                if !ctx.events.policy.take(PolicyEvents::MSG_RX).is_empty() {
                    let Some(msg) = Self::take_message(ctx) else {
                        return true;
                    };
                    if msg.is_control(ControlMsgType::Accept) {
                        // A transition to a new object position goes
                        // through Sink Standby; a same-position PPS
                        // adjustment (including the periodic re-request)
                        // does not.
                        let position = self.requested_position();
                        if position != self.last_pps {
                            ctx.dpm.transition_standby();
                        }
                        self.last_pps = if position >= self.pps_index {
                            position
                        } else {
                            pdo::NO_PPS_INDEX
                        };
                        self.min_power = false;
                        return self.goto(PeState::TransitionSink);
                    }
                    if msg.is_control(ControlMsgType::SoftReset) {
                        return self.goto(PeState::SoftReset(TxStage::Submit));
                    }
                    if msg.is_control(ControlMsgType::Reject)
                        || msg.is_control(ControlMsgType::Wait)
                    {
                        if !self.explicit_contract {
                            return self.goto(PeState::WaitCap);
                        }
                        self.min_power = msg.is_control(ControlMsgType::Wait);
                        return self.goto(PeState::Ready);
                    }
                    return self.goto(PeState::SendSoftReset(ReqStage::Submit));
                }
                if self.timed_out(now) {
                    return self.goto(PeState::HardReset(HardStage::Check));
                }
                false
            }
        }
    }

    fn transition_sink<PHY: PdPhy, DPM: DevicePolicyManager, const POOL: usize>(
        &mut self,
        ctx: &mut Ctx<'_, PHY, DPM, POOL>,
        now: Instant,
    ) -> bool {
        self.arm(now, T_PS_TRANSITION);

        if !ctx.events.policy.take(PolicyEvents::RESET).is_empty() {
            return self.goto(PeState::TransitionDefault);
        }
        if !ctx.events.policy.take(PolicyEvents::MSG_RX).is_empty() {
            let Some(msg) = Self::take_message(ctx) else {
                return true;
            };
            if msg.is_control(ControlMsgType::PsRdy) {
                self.explicit_contract = true;
                if !self.min_power {
                    ctx.dpm.transition_requested();
                }
                return self.goto(PeState::Ready);
            }
            // Any other message during a power transition voids the
            // contract.
            ctx.dpm.transition_default();
            return self.goto(PeState::HardReset(HardStage::Check));
        }
        if self.timed_out(now) {
            return self.goto(PeState::HardReset(HardStage::Check));
        }
        false
    }

    fn ready<PHY: PdPhy, DPM: DevicePolicyManager, const POOL: usize>(
        &mut self,
        ctx: &mut Ctx<'_, PHY, DPM, POOL>,
        now: Instant,
    ) -> bool {
        if self.min_power {
            // Poll the source at tSinkRequest until it lifts the Wait.
            self.arm(now, T_SINK_REQUEST);
        }

        if !ctx.events.policy.take(PolicyEvents::RESET).is_empty() {
            return self.goto(PeState::TransitionDefault);
        }
        if !ctx.events.policy.take(PolicyEvents::OVERTEMP).is_empty() {
            return self.goto(PeState::HardReset(HardStage::Check));
        }
        if !ctx.events.policy.take(PolicyEvents::GET_SOURCE_CAP).is_empty() {
            ctx.events.prl_tx.set(TxEvents::START_AMS);
            return self.goto(PeState::GetSourceCap(TxStage::Submit));
        }
        if !ctx.events.policy.take(PolicyEvents::NEW_POWER).is_empty() {
            ctx.events.prl_tx.set(TxEvents::START_AMS);
            return self.goto(PeState::EvalCap);
        }
        if !ctx.events.policy.take(PolicyEvents::PPS_REQUEST).is_empty() {
            ctx.events.prl_tx.set(TxEvents::START_AMS);
            return self.goto(PeState::SelectCap(ReqStage::Submit));
        }
        if !ctx.events.policy.take(PolicyEvents::MSG_RX).is_empty() {
            let Some(msg) = Self::take_message(ctx) else {
                return true;
            };
            return self.ready_message(ctx, msg);
        }

        if let Some(at) = self.pps_deadline {
            if now >= at {
                self.pps_deadline = None;
                return self.goto(PeState::SelectCap(ReqStage::Submit));
            }
        }
        if self.min_power && self.timed_out(now) {
            return self.goto(PeState::SelectCap(ReqStage::Submit));
        }
        false
    }

    /// Classify a message delivered while Ready.
    fn ready_message<PHY: PdPhy, DPM: DevicePolicyManager, const POOL: usize>(
        &mut self,
        ctx: &mut Ctx<'_, PHY, DPM, POOL>,
        msg: Message,
    ) -> bool {
        if ctx.prl.revision == SpecRev::R3_0 && msg.is_oversized_chunk() {
            return self.goto(PeState::ChunkReceived);
        }

        match msg.data_type() {
            // Vendor messages are tolerated and ignored.
            Some(DataMsgType::VendorDefined) => return true,
            Some(DataMsgType::SourceCapabilities) if msg.header().num_objects() >= 1 => {
                self.store_capabilities(&mut ctx.prl.revision, &msg);
                return self.goto(PeState::EvalCap);
            }
            // A sink cannot serve requests or another sink's capabilities.
            Some(DataMsgType::Request | DataMsgType::SinkCapabilities) => {
                return self.goto(PeState::SendNotSupported(TxStage::Submit));
            }
            _ => {}
        }

        match msg.control_type() {
            Some(ControlMsgType::Ping) => true,
            Some(
                ControlMsgType::DrSwap
                | ControlMsgType::PrSwap
                | ControlMsgType::VconnSwap
                | ControlMsgType::GetSourceCap,
            ) => self.goto(PeState::SendNotSupported(TxStage::Submit)),
            Some(ControlMsgType::GotoMin) => {
                if ctx.dpm.giveback_enabled() {
                    ctx.dpm.transition_min();
                    self.min_power = true;
                    self.goto(PeState::TransitionSink)
                } else {
                    self.goto(PeState::SendNotSupported(TxStage::Submit))
                }
            }
            Some(ControlMsgType::GetSinkCap) => self.goto(PeState::GiveSinkCap(TxStage::Submit)),
            Some(ControlMsgType::SoftReset) => self.goto(PeState::SoftReset(TxStage::Submit)),
            Some(ControlMsgType::NotSupported) => self.goto(PeState::NotSupportedReceived),
            _ => self.goto(PeState::SendSoftReset(ReqStage::Submit)),
        }
    }

    fn send_soft_reset<PHY: PdPhy, DPM: DevicePolicyManager, const POOL: usize>(
        &mut self,
        ctx: &mut Ctx<'_, PHY, DPM, POOL>,
        now: Instant,
        stage: ReqStage,
    ) -> bool {
        match stage {
            ReqStage::Submit => {
                let msg = Message::control(ControlMsgType::SoftReset, ctx.prl.revision);
                Self::submit(ctx, msg);
                self.goto(PeState::SendSoftReset(ReqStage::AwaitOutcome))
            }
            ReqStage::AwaitOutcome => {
                if !ctx.events.policy.take(PolicyEvents::RESET).is_empty() {
                    return self.goto(PeState::TransitionDefault);
                }
                let evt = ctx
                    .events
                    .policy
                    .take(PolicyEvents::TX_DONE | PolicyEvents::TX_ERR);
                if evt.is_empty() {
                    return false;
                }
                if evt.contains(PolicyEvents::TX_ERR) {
                    return self.goto(PeState::HardReset(HardStage::Check));
                }
                self.goto(PeState::SendSoftReset(ReqStage::AwaitReply))
            }
            ReqStage::AwaitReply => {
                self.arm(now, T_SENDER_RESPONSE);

                if !ctx.events.policy.take(PolicyEvents::RESET).is_empty() {
                    return self.goto(PeState::TransitionDefault);
                }
                if !ctx.events.policy.take(PolicyEvents::MSG_RX).is_empty() {
                    let Some(msg) = Self::take_message(ctx) else {
                        return true;
                    };
                    if msg.is_control(ControlMsgType::Accept) {
                        return self.goto(PeState::WaitCap);
                    }
                    if msg.is_control(ControlMsgType::SoftReset) {
                        return self.goto(PeState::SoftReset(TxStage::Submit));
                    }
                    return self.goto(PeState::HardReset(HardStage::Check));
                }
                if self.timed_out(now) {
                    return self.goto(PeState::HardReset(HardStage::Check));
                }
                false
            }
        }
    }

    /// Shared `TX_DONE`/`TX_ERR` wait: error escalates to hard reset,
    /// success continues to `next`.
    fn await_outcome<PHY: PdPhy, DPM: DevicePolicyManager, const POOL: usize>(
        &mut self,
        ctx: &mut Ctx<'_, PHY, DPM, POOL>,
        next: PeState,
    ) -> bool {
        if !ctx.events.policy.take(PolicyEvents::RESET).is_empty() {
            return self.goto(PeState::TransitionDefault);
        }
        let evt = ctx
            .events
            .policy
            .take(PolicyEvents::TX_DONE | PolicyEvents::TX_ERR);
        if evt.is_empty() {
            return false;
        }
        if evt.contains(PolicyEvents::TX_ERR) {
            return self.goto(PeState::HardReset(HardStage::Check));
        }
        self.goto(next)
    }

    fn source_unresponsive<PHY: PdPhy, DPM: DevicePolicyManager, const POOL: usize>(
        &mut self,
        ctx: &mut Ctx<'_, PHY, DPM, POOL>,
        now: Instant,
    ) -> bool {
        // Terminal until physical reinsertion: only the Type-C current
        // fallback loop runs, debounced between samples.
        self.arm(now, T_PD_DEBOUNCE);
        if !self.timed_out(now) {
            return false;
        }
        self.deadline = None;

        let sample = ctx.phy.typec_current();
        if ctx.dpm.evaluate_typec_current(sample).is_some() {
            if self.typec_sample == Some(sample) && self.typec_applied != Some(sample) {
                ctx.dpm.transition_typec(sample);
                self.typec_applied = Some(sample);
            }
            self.typec_sample = Some(sample);
        }
        true
    }
}
