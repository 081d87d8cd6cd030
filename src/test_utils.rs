//! Testing utilities and mock implementations
//!
//! This module provides mock implementations for testing the stack on the
//! host without hardware access: a scriptable PHY, a programmable device
//! policy manager, and a harness that advances a simulated millisecond
//! clock through [`SinkPort::poll`].
//!
//! Only available when running `cargo test`.

#![cfg(test)]
#![allow(missing_docs)]

extern crate std;

use std::collections::VecDeque;
use std::vec::Vec;

use crate::dpm::DevicePolicyManager;
use crate::message::{ControlMsgType, DataMsgType, Message, SpecRev, pdo};
use crate::phy::{PdPhy, PhyStatus, TypecCurrent};
use crate::port::SinkPort;
use crate::timing::{Duration, Instant};

// =============================================================================
// Mock PHY
// =============================================================================

/// Mock PD PHY for testing without hardware.
///
/// Statuses and inbound frames are queued in lockstep: each INT_N sample
/// pops one status, and the task it wakes reads the matching frame. In
/// `auto_goodcrc` mode (the default) every transmission is immediately
/// confirmed: a `tx_sent` status and a GoodCRC echo with the transmitted
/// MessageID are queued, the way a FUSB302B confirms in hardware.
#[derive(Debug, Default)]
pub struct MockPhy {
    /// Pending status register reads, one per INT_N sample.
    statuses: VecDeque<PhyStatus>,
    /// Pending frames served by `read_message`.
    inbound: VecDeque<Message>,
    /// Record of transmitted messages.
    pub sent: Vec<Message>,
    /// Number of hard reset ordered sets emitted.
    pub hard_resets_sent: usize,
    /// Number of PHY resets.
    pub resets: usize,
    /// Current advertisement reported to the stack.
    pub typec: TypecCurrent,
    /// Confirm transmissions automatically.
    pub auto_goodcrc: bool,
    /// Fail the next transmission with `retry_fail` instead.
    pub fail_next_tx: bool,
    /// Swallow the next transmission entirely (no status at all).
    pub drop_next_tx: bool,
}

impl MockPhy {
    pub fn new() -> Self {
        Self {
            typec: TypecCurrent::SINK_TX_OK,
            auto_goodcrc: true,
            ..Self::default()
        }
    }

    /// Queue an inbound frame as the PHY would report it: one `gcrc_sent`
    /// status plus the frame itself.
    pub fn deliver(&mut self, msg: Message) {
        self.statuses.push_back(PhyStatus {
            gcrc_sent: true,
            ..PhyStatus::default()
        });
        self.inbound.push_back(msg);
    }

    /// Queue a raw status read.
    pub fn push_status(&mut self, status: PhyStatus) {
        self.statuses.push_back(status);
    }

    /// Messages of a given control type that were transmitted.
    pub fn sent_control(&self, kind: ControlMsgType) -> usize {
        self.sent.iter().filter(|m| m.is_control(kind)).count()
    }

    /// Messages of a given data type that were transmitted.
    pub fn sent_data(&self, kind: DataMsgType) -> usize {
        self.sent
            .iter()
            .filter(|m| m.data_type() == Some(kind))
            .count()
    }
}

impl PdPhy for MockPhy {
    fn reset(&mut self) {
        self.resets += 1;
    }

    fn send_message(&mut self, msg: &Message) {
        self.sent.push(*msg);
        if self.drop_next_tx {
            self.drop_next_tx = false;
            return;
        }
        if self.fail_next_tx {
            self.fail_next_tx = false;
            self.statuses.push_back(PhyStatus {
                retry_fail: true,
                ..PhyStatus::default()
            });
            return;
        }
        if self.auto_goodcrc {
            self.statuses.push_back(PhyStatus {
                tx_sent: true,
                ..PhyStatus::default()
            });
            let mut echo = Message::control(ControlMsgType::GoodCrc, SpecRev::R2_0);
            echo.header_mut().set_message_id(msg.header().message_id());
            self.inbound.push_back(echo);
        }
    }

    fn send_hard_reset(&mut self) {
        self.hard_resets_sent += 1;
        if self.auto_goodcrc {
            self.statuses.push_back(PhyStatus {
                hard_sent: true,
                ..PhyStatus::default()
            });
        }
    }

    fn read_message(&mut self, out: &mut Message) {
        *out = self.inbound.pop_front().unwrap_or_else(Message::empty);
    }

    fn status(&mut self) -> PhyStatus {
        self.statuses.pop_front().unwrap_or_default()
    }

    fn typec_current(&mut self) -> TypecCurrent {
        self.typec
    }

    fn intn_asserted(&mut self) -> bool {
        !self.statuses.is_empty()
    }
}

// =============================================================================
// Bench DPM
// =============================================================================

/// What the bench DPM asks for when evaluating capabilities.
#[derive(Debug, Clone, Copy)]
pub enum RequestSelect {
    /// Request a fixed PDO at its full advertised current.
    Fixed { position: u8 },
    /// Request a PPS APDO at a programmable operating point.
    Pps { position: u8, mv: u32, ma: u32 },
}

/// Programmable device policy manager that records every callback.
#[derive(Debug)]
pub struct BenchDpm {
    pub select: RequestSelect,
    pub giveback: bool,
    pub typec_fallback: bool,
    pub log: Vec<&'static str>,
}

impl BenchDpm {
    pub fn new(select: RequestSelect) -> Self {
        Self {
            select,
            giveback: false,
            typec_fallback: false,
            log: Vec::new(),
        }
    }

    pub fn calls(&self, name: &str) -> usize {
        self.log.iter().filter(|&&entry| entry == name).count()
    }
}

impl DevicePolicyManager for BenchDpm {
    fn start(&mut self) {
        self.log.push("start");
    }

    fn evaluate_capability(&mut self, caps: &Message, request: &mut Message) {
        self.log.push("evaluate_capability");
        match self.select {
            RequestSelect::Fixed { position } => {
                let supply = caps.object((position - 1) as usize);
                let ma = pdo::fixed_max_current_ma(supply);
                request.set_objects(&[pdo::rdo::fixed(position, ma, ma)]);
            }
            RequestSelect::Pps { position, mv, ma } => {
                request.set_objects(&[pdo::rdo::pps(position, mv, ma)]);
            }
        }
    }

    fn sink_capability(&mut self, out: &mut Message) {
        self.log.push("sink_capability");
        out.set_objects(&[pdo::fixed(5000, 3000)]);
    }

    fn transition_default(&mut self) {
        self.log.push("transition_default");
    }

    fn transition_standby(&mut self) {
        self.log.push("transition_standby");
    }

    fn transition_requested(&mut self) {
        self.log.push("transition_requested");
    }

    fn transition_min(&mut self) {
        self.log.push("transition_min");
    }

    fn transition_typec(&mut self, _advertised: TypecCurrent) {
        self.log.push("transition_typec");
    }

    fn giveback_enabled(&self) -> bool {
        self.giveback
    }

    fn evaluate_typec_current(&mut self, advertised: TypecCurrent) -> Option<u16> {
        if !self.typec_fallback {
            return None;
        }
        Some(match advertised {
            TypecCurrent::None => 0,
            TypecCurrent::UsbDefault => 500,
            TypecCurrent::Ma1500 => 1500,
            TypecCurrent::Ma3000 => 3000,
        })
    }

    fn not_supported_received(&mut self) {
        self.log.push("not_supported_received");
    }
}

// =============================================================================
// Message builders
// =============================================================================

/// A control message as the source would send it.
pub fn source_control(kind: ControlMsgType, rev: SpecRev, id: u8) -> Message {
    let mut msg = Message::control(kind, rev);
    msg.header_mut().set_message_id(id);
    msg
}

/// A data message as the source would send it.
pub fn source_data(kind: DataMsgType, rev: SpecRev, id: u8, objects: &[u32]) -> Message {
    let mut msg = Message::data(kind, rev, objects);
    msg.header_mut().set_message_id(id);
    msg
}

/// The four-PDO capability set used by most scenarios:
/// 5 V/3 A, 9 V/2 A, 15 V/1.67 A, 20 V/1.25 A.
pub fn standard_caps() -> [u32; 4] {
    [
        pdo::fixed(5000, 3000),
        pdo::fixed(9000, 2000),
        pdo::fixed(15000, 1670),
        pdo::fixed(20000, 1250),
    ]
}

// =============================================================================
// Harness
// =============================================================================

/// Drives a port against the mock PHY on a simulated millisecond clock.
pub struct Harness {
    pub port: SinkPort<MockPhy, BenchDpm, 8>,
    pub now: Instant,
}

impl Harness {
    pub fn new(dpm: BenchDpm) -> Self {
        Self {
            port: SinkPort::new(MockPhy::new(), dpm),
            now: Instant::from_ticks(0),
        }
    }

    /// Poll for `ms` simulated milliseconds.
    pub fn run_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            self.port.poll(self.now);
            self.now += Duration::millis(1);
        }
    }

    /// Poll until the predicate holds, up to `max_ms` milliseconds.
    /// Returns whether the predicate was reached.
    pub fn run_until(
        &mut self,
        max_ms: u32,
        predicate: impl Fn(&SinkPort<MockPhy, BenchDpm, 8>) -> bool,
    ) -> bool {
        for _ in 0..max_ms {
            self.port.poll(self.now);
            if predicate(&self.port) {
                return true;
            }
            self.now += Duration::millis(1);
        }
        false
    }

    pub fn deliver(&mut self, msg: Message) {
        self.port.phy_mut().deliver(msg);
    }
}
