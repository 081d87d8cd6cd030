//! Device policy manager trait.
//!
//! The device policy manager (DPM) is the application-side authority over
//! power policy: it chooses which capability to request, applies power
//! transitions to the board, and hears about protocol outcomes. The stack
//! invokes it from [`SinkPort::poll`](crate::SinkPort::poll); callbacks
//! must not block.
//!
//! Only [`evaluate_capability`](DevicePolicyManager::evaluate_capability)
//! and [`sink_capability`](DevicePolicyManager::sink_capability) are
//! required. The remaining callbacks default to no-ops, the trait-level
//! equivalent of optional callback pointers.

use crate::message::Message;
use crate::phy::TypecCurrent;

/// Application callbacks consumed by the policy engine.
pub trait DevicePolicyManager {
    /// The stack started (or restarted after a hard reset).
    fn start(&mut self) {}

    /// Choose a power level from the source's capabilities.
    ///
    /// `caps` is the Source_Capabilities message. `request` arrives with a
    /// Request header already stamped for the negotiated revision; the DPM
    /// fills in the request data object (see
    /// [`rdo`](crate::message::pdo::rdo)).
    fn evaluate_capability(&mut self, caps: &Message, request: &mut Message);

    /// Fill in this sink's capabilities.
    ///
    /// `out` arrives with a Sink_Capabilities header already stamped; the
    /// DPM provides the power data objects.
    fn sink_capability(&mut self, out: &mut Message);

    /// Transition the board to the default (vSafe5V) power level.
    fn transition_default(&mut self) {}

    /// Transition to Sink Standby before a programmable voltage change.
    fn transition_standby(&mut self) {}

    /// The negotiated power level is now available; apply it.
    fn transition_requested(&mut self) {}

    /// Reduce to the minimum operating current (GotoMin).
    fn transition_min(&mut self) {}

    /// Fall back to unnegotiated Type-C current at the advertised level.
    fn transition_typec(&mut self, _advertised: TypecCurrent) {}

    /// Whether this sink honors GotoMin (GiveBack support).
    fn giveback_enabled(&self) -> bool {
        false
    }

    /// Evaluate an advertised Type-C current for the fallback path.
    ///
    /// Return the usable current in milliamperes, or `None` if this DPM
    /// does not support Type-C fallback (the default). When unsupported,
    /// the stack never calls [`transition_typec`](Self::transition_typec).
    fn evaluate_typec_current(&mut self, _advertised: TypecCurrent) -> Option<u16> {
        None
    }

    /// The port partner answered a request of ours with Not_Supported.
    fn not_supported_received(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{DataMsgType, SpecRev};

    struct MinimalDpm;

    impl DevicePolicyManager for MinimalDpm {
        fn evaluate_capability(&mut self, _caps: &Message, request: &mut Message) {
            request.set_objects(&[crate::message::pdo::rdo::fixed(1, 100, 100)]);
        }

        fn sink_capability(&mut self, out: &mut Message) {
            out.set_objects(&[crate::message::pdo::fixed(5000, 100)]);
        }
    }

    #[test]
    fn optional_callbacks_default_to_noops() {
        let mut dpm = MinimalDpm;
        dpm.start();
        dpm.transition_default();
        dpm.transition_standby();
        dpm.transition_requested();
        dpm.transition_min();
        dpm.transition_typec(TypecCurrent::Ma1500);
        dpm.not_supported_received();
        assert!(!dpm.giveback_enabled());
        assert_eq!(dpm.evaluate_typec_current(TypecCurrent::Ma3000), None);
    }

    #[test]
    fn required_callbacks_fill_messages() {
        let mut dpm = MinimalDpm;

        let caps = Message::data(
            DataMsgType::SourceCapabilities,
            SpecRev::R3_0,
            &[crate::message::pdo::fixed(5000, 3000)],
        );
        let mut request = Message::request(0, SpecRev::R3_0);
        dpm.evaluate_capability(&caps, &mut request);
        assert_eq!(request.header().num_objects(), 1);

        let mut sink_caps = Message::data(DataMsgType::SinkCapabilities, SpecRev::R3_0, &[]);
        dpm.sink_capability(&mut sink_caps);
        assert_eq!(sink_caps.header().num_objects(), 1);
    }
}
