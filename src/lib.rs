//! USB Power Delivery sink protocol stack
//!
//! A `no_std`, no_alloc implementation of a USB-PD sink for microcontrollers
//! driving an external Type-C PHY (FUSB302B-class). The PHY handles BMC
//! signalling, CRC, GoodCRC and retries in hardware; this crate implements
//! everything above that: the protocol layer, hard reset handling, and the
//! sink policy engine with all PD timing budgets.
//!
//! # Architecture
//!
//! Five cooperative tasks run inside a [`SinkPort`]:
//!
//! 1. **INT_N poller** ([`port`]): translates PHY status into task events
//! 2. **PRL-RX / PRL-TX** ([`port`]): MessageID handling, GoodCRC matching
//! 3. **Hard reset** ([`port`]): reset sequencing in both directions
//! 4. **Policy engine** ([`port`]): the sink policy state graph
//!
//! They communicate exclusively through per-task event words
//! ([`event`]) and bounded mailboxes of pooled messages ([`message`]), so
//! the same semantics hold whether [`SinkPort::poll`] runs from a main
//! loop, a 1 kHz tick interrupt, or an RTOS thread.
//!
//! # Standard Compliance
//!
//! - **USB-PD r2.0 / r3.0**: sink policy engine state graph, protocol
//!   layer MessageID rules, timing budgets
//! - **PD 3.0 extras**: PPS requests with periodic re-request, SinkTxOk
//!   collision avoidance, Not_Supported responses, chunking rejection
//!
//! The wire format beyond the header is treated as opaque data objects;
//! [`message::pdo`] has the accessors a device policy manager needs.
//!
//! # Features
//!
//! - `defmt`: enable defmt formatting for protocol and error types
//!
//! # Example
//!
//! ```ignore
//! use usbpd_sink::{DevicePolicyManager, Message, SinkPort};
//! use usbpd_sink::message::pdo;
//!
//! struct Dpm;
//!
//! impl DevicePolicyManager for Dpm {
//!     fn evaluate_capability(&mut self, caps: &Message, request: &mut Message) {
//!         // Take the first capability at its full current.
//!         let ma = pdo::fixed_max_current_ma(caps.object(0));
//!         request.set_objects(&[pdo::rdo::fixed(1, ma, ma)]);
//!     }
//!
//!     fn sink_capability(&mut self, out: &mut Message) {
//!         out.set_objects(&[pdo::fixed(5000, 3000)]);
//!     }
//! }
//!
//! let mut port = SinkPort::<_, _, 8>::new(phy, Dpm);
//! loop {
//!     port.poll(now());
//!     // sleep until the next millisecond tick or INT_N edge
//! }
//! ```
//!
//! # Non-goals
//!
//! Source and dual-role operation, the swap messages, extended message
//! reassembly, VDM/cable discovery and authentication are out of scope;
//! the stack answers what it must (Reject/Not_Supported) and otherwise
//! stays a plain sink.

#![no_std]
#![deny(missing_docs)]
#![allow(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]
// Clippy lint levels live here; thresholds and config are in Cargo.toml.
#![deny(clippy::correctness)]
#![warn(
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::cloned_instead_of_copied,
    clippy::explicit_iter_loop,
    clippy::implicit_clone,
    clippy::inconsistent_struct_constructor,
    clippy::manual_assert,
    clippy::manual_let_else,
    clippy::match_same_arms,
    clippy::needless_pass_by_value,
    clippy::semicolon_if_nothing_returned,
    clippy::uninlined_format_args,
    clippy::unnested_or_patterns,
    clippy::std_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::alloc_instead_of_core
)]
#![allow(
    clippy::similar_names,
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_lossless
)]

#[cfg(test)]
extern crate std;

// =============================================================================
// Modules
// =============================================================================

pub mod dpm;
pub mod error;
pub mod event;
pub mod message;
pub mod phy;
pub mod port;
pub mod sync;
pub mod timing;

// Test utilities (only available during testing)
#[cfg(test)]
pub mod test_utils;

// =============================================================================
// Re-exports
// =============================================================================

pub use dpm::DevicePolicyManager;
pub use error::{Error, MailboxError, PoolError, Result};
pub use message::{ControlMsgType, DataMsgType, Header, Message, SpecRev};
pub use phy::{PdPhy, PhyStatus, TypecCurrent};
pub use port::{SinkPort, SinkState};
pub use timing::{Duration, Instant};
