//! Time base and USB-PD timing budgets.
//!
//! The stack is driven by a millisecond tick supplied by the caller through
//! [`SinkPort::poll`](crate::SinkPort::poll). All protocol deadlines are
//! expressed as [`Duration`] constants taken from the USB-PD specification.

/// Millisecond-resolution instant, as provided by the application's tick source.
pub type Instant = fugit::Instant<u32, 1, 1000>;

/// Millisecond-resolution duration.
pub type Duration = fugit::Duration<u32, 1, 1000>;

/// SinkWaitCapTimer: maximum wait for Source_Capabilities after attach.
pub const T_TYPEC_SINK_WAIT_CAP: Duration = Duration::millis(310);

/// SenderResponseTimer: maximum wait for a response to a transmitted request.
pub const T_SENDER_RESPONSE: Duration = Duration::millis(30);

/// PSTransitionTimer: maximum wait for PS_RDY after Accept.
pub const T_PS_TRANSITION: Duration = Duration::millis(500);

/// SinkRequestTimer: delay before re-requesting after a Wait response.
pub const T_SINK_REQUEST: Duration = Duration::millis(100);

/// SinkPPSPeriodicTimer: keep-alive re-request period for PPS contracts.
pub const T_PPS_REQUEST: Duration = Duration::secs(10);

/// HardResetCompleteTimer: maximum wait for the PHY to confirm a sent hard reset.
pub const T_HARD_RESET_COMPLETE: Duration = Duration::millis(5);

/// ChunkingNotSupportedTimer: pause before rejecting a chunked extended message.
pub const T_CHUNKING_NOT_SUPPORTED: Duration = Duration::millis(45);

/// PDDebounceTimer: settling time between Type-C current samples.
pub const T_PD_DEBOUNCE: Duration = Duration::millis(15);

/// nHardResetCount: hard reset attempts before the source is considered
/// unresponsive.
pub const N_HARD_RESET_COUNT: u8 = 2;

/// Sampling period of the INT_N poller.
pub const INTN_POLL_INTERVAL: Duration = Duration::millis(1);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budgets_match_the_standard() {
        assert_eq!(T_TYPEC_SINK_WAIT_CAP.to_millis(), 310);
        assert_eq!(T_SENDER_RESPONSE.to_millis(), 30);
        assert_eq!(T_PS_TRANSITION.to_millis(), 500);
        assert_eq!(T_SINK_REQUEST.to_millis(), 100);
        assert_eq!(T_PPS_REQUEST.to_millis(), 10_000);
        assert_eq!(T_HARD_RESET_COMPLETE.to_millis(), 5);
        assert_eq!(T_CHUNKING_NOT_SUPPORTED.to_millis(), 45);
        assert_eq!(T_PD_DEBOUNCE.to_millis(), 15);
        assert_eq!(N_HARD_RESET_COUNT, 2);
    }

    #[test]
    fn instants_order_across_wraparound() {
        let near_wrap = Instant::from_ticks(u32::MAX - 2);
        let after_wrap = near_wrap + Duration::millis(10);
        assert!(after_wrap > near_wrap);
    }
}
