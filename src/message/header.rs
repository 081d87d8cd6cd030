//! PD message header accessors.
//!
//! The 16-bit message header (USB-PD r3.0, table 6-1, SOP variant):
//!
//! | Bits  | Field                  |
//! |-------|------------------------|
//! | 15    | Extended               |
//! | 14:12 | Number of Data Objects |
//! | 11:9  | MessageID              |
//! | 8     | Port Power Role        |
//! | 7:6   | Specification Revision |
//! | 5     | Port Data Role         |
//! | 4:0   | Message Type           |
//!
//! Beyond these accessors the stack is format-agnostic; data objects are
//! opaque `u32` words interpreted by the [`pdo`](crate::message::pdo)
//! helpers where the policy engine needs them.

// =============================================================================
// Field masks and shifts
// =============================================================================

const EXTENDED: u16 = 1 << 15;
const NUM_OBJECTS_SHIFT: u16 = 12;
const NUM_OBJECTS_MASK: u16 = 0x7 << NUM_OBJECTS_SHIFT;
const MESSAGE_ID_SHIFT: u16 = 9;
const MESSAGE_ID_MASK: u16 = 0x7 << MESSAGE_ID_SHIFT;
const POWER_ROLE_SOURCE: u16 = 1 << 8;
const SPEC_REV_SHIFT: u16 = 6;
const SPEC_REV_MASK: u16 = 0x3 << SPEC_REV_SHIFT;
const DATA_ROLE_DFP: u16 = 1 << 5;
const MESSAGE_TYPE_MASK: u16 = 0x1F;

// =============================================================================
// Message type enums
// =============================================================================

/// Control message types (messages without data objects).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ControlMsgType {
    /// Acknowledges correct receipt of any message (handled by the PHY).
    GoodCrc = 0x01,
    /// Source asks the sink to reduce to its minimum operating current.
    GotoMin = 0x02,
    /// The last request was accepted.
    Accept = 0x03,
    /// The last request was rejected.
    Reject = 0x04,
    /// Source-side keep-alive.
    Ping = 0x05,
    /// Power supply is ready at the negotiated level.
    PsRdy = 0x06,
    /// Request for the partner's source capabilities.
    GetSourceCap = 0x07,
    /// Request for the partner's sink capabilities.
    GetSinkCap = 0x08,
    /// Data role swap request.
    DrSwap = 0x09,
    /// Power role swap request.
    PrSwap = 0x0A,
    /// VCONN source swap request.
    VconnSwap = 0x0B,
    /// The request cannot be met right now; try again later.
    Wait = 0x0C,
    /// Reset protocol-layer counters on both ends.
    SoftReset = 0x0D,
    /// The received message is not supported (PD 3.0).
    NotSupported = 0x10,
}

impl ControlMsgType {
    /// Decode from a raw header message-type field.
    pub const fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0x01 => Self::GoodCrc,
            0x02 => Self::GotoMin,
            0x03 => Self::Accept,
            0x04 => Self::Reject,
            0x05 => Self::Ping,
            0x06 => Self::PsRdy,
            0x07 => Self::GetSourceCap,
            0x08 => Self::GetSinkCap,
            0x09 => Self::DrSwap,
            0x0A => Self::PrSwap,
            0x0B => Self::VconnSwap,
            0x0C => Self::Wait,
            0x0D => Self::SoftReset,
            0x10 => Self::NotSupported,
            _ => return None,
        })
    }
}

/// Data message types (messages carrying 1-7 data objects).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DataMsgType {
    /// The source's power data objects.
    SourceCapabilities = 0x01,
    /// A sink's request data object.
    Request = 0x02,
    /// Built-in self test carrier.
    Bist = 0x03,
    /// The sink's power data objects.
    SinkCapabilities = 0x04,
    /// Alert status (PD 3.0).
    Alert = 0x06,
    /// Structured or unstructured vendor messages.
    VendorDefined = 0x0F,
}

impl DataMsgType {
    /// Decode from a raw header message-type field.
    pub const fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0x01 => Self::SourceCapabilities,
            0x02 => Self::Request,
            0x03 => Self::Bist,
            0x04 => Self::SinkCapabilities,
            0x06 => Self::Alert,
            0x0F => Self::VendorDefined,
            _ => return None,
        })
    }
}

/// Specification revision carried in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SpecRev {
    /// USB-PD revision 1.0 (legacy).
    R1_0 = 0,
    /// USB-PD revision 2.0.
    R2_0 = 1,
    /// USB-PD revision 3.0.
    R3_0 = 2,
}

impl SpecRev {
    /// Decode from the raw two-bit field. The reserved value maps to 3.0.
    pub const fn from_raw(raw: u8) -> Self {
        match raw & 0x3 {
            0 => Self::R1_0,
            1 => Self::R2_0,
            _ => Self::R3_0,
        }
    }
}

// =============================================================================
// Header
// =============================================================================

/// A 16-bit PD message header.
///
/// The stack always speaks as a UFP sink, so the role bits of locally built
/// headers are fixed; received headers expose whatever the partner sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Header(u16);

impl Header {
    /// Wrap a raw header value.
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// The raw header value.
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Header template for a locally built message: UFP, sink, given
    /// revision. Type, object count and MessageID are stamped separately.
    pub const fn template(revision: SpecRev) -> Self {
        Self((revision as u16) << SPEC_REV_SHIFT)
    }

    /// The raw five-bit message type field.
    pub const fn message_type(self) -> u8 {
        (self.0 & MESSAGE_TYPE_MASK) as u8
    }

    /// Number of data objects following the header (0-7).
    pub const fn num_objects(self) -> usize {
        ((self.0 & NUM_OBJECTS_MASK) >> NUM_OBJECTS_SHIFT) as usize
    }

    /// The three-bit MessageID.
    pub const fn message_id(self) -> u8 {
        ((self.0 & MESSAGE_ID_MASK) >> MESSAGE_ID_SHIFT) as u8
    }

    /// The specification revision field.
    pub const fn spec_rev(self) -> SpecRev {
        SpecRev::from_raw(((self.0 & SPEC_REV_MASK) >> SPEC_REV_SHIFT) as u8)
    }

    /// The extended-message bit (PD 3.0).
    pub const fn extended(self) -> bool {
        (self.0 & EXTENDED) != 0
    }

    /// True if the sender declares itself a power source.
    pub const fn from_source(self) -> bool {
        (self.0 & POWER_ROLE_SOURCE) != 0
    }

    /// True if the sender declares itself a DFP.
    pub const fn from_dfp(self) -> bool {
        (self.0 & DATA_ROLE_DFP) != 0
    }

    /// Set the message type field.
    pub const fn with_message_type(self, message_type: u8) -> Self {
        Self((self.0 & !MESSAGE_TYPE_MASK) | (message_type as u16 & MESSAGE_TYPE_MASK))
    }

    /// Set the number-of-data-objects field.
    pub const fn with_num_objects(self, count: usize) -> Self {
        Self((self.0 & !NUM_OBJECTS_MASK) | (((count as u16) << NUM_OBJECTS_SHIFT) & NUM_OBJECTS_MASK))
    }

    /// Set the MessageID field.
    pub const fn with_message_id(self, id: u8) -> Self {
        Self((self.0 & !MESSAGE_ID_MASK) | (((id as u16) << MESSAGE_ID_SHIFT) & MESSAGE_ID_MASK))
    }

    /// Stamp the MessageID field in place.
    pub fn set_message_id(&mut self, id: u8) {
        *self = self.with_message_id(id);
    }
}

// =============================================================================
// Extended header (PD 3.0)
// =============================================================================

/// First 16 bits of an extended message payload (USB-PD r3.0, table 6-3).
///
/// Only the fields needed for the chunking-not-supported check are exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExtHeader(u16);

/// Largest extended data size a chunking-incapable sink accepts (bytes).
pub const MAX_EXT_LEGACY_LEN: u16 = 26;

impl ExtHeader {
    const CHUNKED: u16 = 1 << 15;
    const DATA_SIZE_MASK: u16 = 0x1FF;

    /// Wrap a raw extended header value.
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// The chunked bit.
    pub const fn chunked(self) -> bool {
        (self.0 & Self::CHUNKED) != 0
    }

    /// Total payload size in bytes.
    pub const fn data_size(self) -> u16 {
        self.0 & Self::DATA_SIZE_MASK
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
