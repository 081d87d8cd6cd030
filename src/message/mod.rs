//! PD messages, the bounded message pool, and mailboxes.
//!
//! A [`Message`] is a fixed-width record: one 16-bit header plus up to
//! seven 32-bit data objects (at most 30 bytes on the wire). Messages in
//! flight through the stack live in a [`MsgPool`] and are referenced by
//! move-only [`MsgId`] handles; ownership of a handle moves along the
//! pipeline (PRL-RX allocates, the policy engine or PRL-TX frees), so a
//! freed-then-used or doubly-freed slot is unrepresentable without a
//! compile error.

pub mod header;
pub mod pdo;

use heapless::Deque;

pub use header::{ControlMsgType, DataMsgType, ExtHeader, Header, MAX_EXT_LEGACY_LEN, SpecRev};

use crate::error::{MailboxError, PoolError};

/// Maximum number of data objects in one message.
pub const MAX_OBJECTS: usize = 7;

/// Wire size of the largest message (header plus seven objects).
pub const MAX_WIRE_SIZE: usize = 2 + 4 * MAX_OBJECTS;

// =============================================================================
// Message
// =============================================================================

/// A USB-PD message: header plus data objects.
///
/// The object count lives in the header; `objects()` exposes exactly that
/// many words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Message {
    header: Header,
    objects: [u32; MAX_OBJECTS],
}

impl Message {
    /// An empty message (zero header, no objects).
    pub const fn empty() -> Self {
        Self {
            header: Header::from_raw(0),
            objects: [0; MAX_OBJECTS],
        }
    }

    /// Build a control message (no data objects).
    pub const fn control(kind: ControlMsgType, revision: SpecRev) -> Self {
        Self {
            header: Header::template(revision).with_message_type(kind as u8),
            objects: [0; MAX_OBJECTS],
        }
    }

    /// Build a data message from a slice of objects.
    ///
    /// Objects beyond [`MAX_OBJECTS`] are ignored.
    pub fn data(kind: DataMsgType, revision: SpecRev, objects: &[u32]) -> Self {
        let mut msg = Self {
            header: Header::template(revision).with_message_type(kind as u8),
            objects: [0; MAX_OBJECTS],
        };
        msg.set_objects(objects);
        msg
    }

    /// Build a Request message carrying a single request data object.
    pub fn request(rdo: u32, revision: SpecRev) -> Self {
        Self::data(DataMsgType::Request, revision, &[rdo])
    }

    /// The message header.
    pub const fn header(&self) -> Header {
        self.header
    }

    /// Mutable access to the header (MessageID stamping, templates).
    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    /// Replace the header.
    pub fn set_header(&mut self, header: Header) {
        self.header = header;
    }

    /// The data objects declared by the header.
    pub fn objects(&self) -> &[u32] {
        let count = self.header.num_objects().min(MAX_OBJECTS);
        &self.objects[..count]
    }

    /// A single data object by 0-based index (0 if out of range).
    pub fn object(&self, index: usize) -> u32 {
        if index < self.header.num_objects().min(MAX_OBJECTS) {
            self.objects[index]
        } else {
            0
        }
    }

    /// Store data objects and update the header count.
    pub fn set_objects(&mut self, objects: &[u32]) {
        let count = objects.len().min(MAX_OBJECTS);
        self.objects[..count].copy_from_slice(&objects[..count]);
        self.header = self.header.with_num_objects(count);
    }

    /// True for a control message of the given kind (zero objects, not
    /// extended).
    pub fn is_control(&self, kind: ControlMsgType) -> bool {
        self.control_type() == Some(kind)
    }

    /// The control message type, if this is a control message.
    pub fn control_type(&self) -> Option<ControlMsgType> {
        if self.header.num_objects() == 0 && !self.header.extended() {
            ControlMsgType::from_raw(self.header.message_type())
        } else {
            None
        }
    }

    /// The data message type, if this is a data message.
    pub fn data_type(&self) -> Option<DataMsgType> {
        if self.header.num_objects() > 0 && !self.header.extended() {
            DataMsgType::from_raw(self.header.message_type())
        } else {
            None
        }
    }

    /// The extended header, if the extended bit is set.
    pub fn ext_header(&self) -> Option<ExtHeader> {
        if self.header.extended() && self.header.num_objects() > 0 {
            Some(ExtHeader::from_raw(self.objects[0] as u16))
        } else {
            None
        }
    }

    /// True for a chunked extended message whose payload exceeds what a
    /// chunking-incapable sink accepts.
    pub fn is_oversized_chunk(&self) -> bool {
        self.ext_header()
            .is_some_and(|ext| ext.chunked() && ext.data_size() > MAX_EXT_LEGACY_LEN)
    }

    /// Serialize header and objects little-endian into `out`.
    ///
    /// Returns the number of bytes written. `out` must hold at least
    /// [`MAX_WIRE_SIZE`] bytes.
    pub fn to_bytes(&self, out: &mut [u8]) -> usize {
        let count = self.header.num_objects().min(MAX_OBJECTS);
        out[0..2].copy_from_slice(&self.header.raw().to_le_bytes());
        for (i, obj) in self.objects[..count].iter().enumerate() {
            out[2 + 4 * i..6 + 4 * i].copy_from_slice(&obj.to_le_bytes());
        }
        2 + 4 * count
    }

    /// Parse a message from little-endian wire bytes.
    ///
    /// Returns `None` if the buffer is shorter than the header's declared
    /// object count.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 2 {
            return None;
        }
        let header = Header::from_raw(u16::from_le_bytes([bytes[0], bytes[1]]));
        let count = header.num_objects().min(MAX_OBJECTS);
        if bytes.len() < 2 + 4 * count {
            return None;
        }
        let mut objects = [0u32; MAX_OBJECTS];
        for (i, obj) in objects[..count].iter_mut().enumerate() {
            let at = 2 + 4 * i;
            *obj = u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        }
        Some(Self { header, objects })
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::empty()
    }
}

// =============================================================================
// Message Pool
// =============================================================================

/// Move-only handle to a pooled message slot.
///
/// A handle is created only by [`MsgPool::try_alloc`] and destroyed only by
/// [`MsgPool::free`]; it is deliberately neither `Copy` nor `Clone`, so each
/// slot has exactly one owner at any time.
#[derive(Debug, PartialEq, Eq)]
pub struct MsgId(u8);

impl MsgId {
    /// The slot index this handle refers to.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Fixed-capacity pool of message slots.
///
/// The pool is sized so that, given the stack's invariants (one in-flight
/// transmission, one in-flight reception, at most one message parked at the
/// policy engine), allocation always succeeds; exhaustion indicates a bug.
pub struct MsgPool<const N: usize> {
    slots: [Message; N],
    busy: [bool; N],
}

impl<const N: usize> MsgPool<N> {
    /// Create a pool with all slots free.
    pub const fn new() -> Self {
        Self {
            slots: [Message::empty(); N],
            busy: [false; N],
        }
    }

    /// Allocate a slot, if one is free. The slot content is cleared.
    pub fn try_alloc(&mut self) -> Result<MsgId, PoolError> {
        for (i, busy) in self.busy.iter_mut().enumerate() {
            if !*busy {
                *busy = true;
                self.slots[i] = Message::empty();
                return Ok(MsgId(i as u8));
            }
        }
        Err(PoolError::Exhausted)
    }

    /// Allocate a slot.
    ///
    /// # Panics
    ///
    /// Panics if the pool is exhausted. The stack's ownership invariants
    /// guarantee a free slot; running out is a fatal invariant violation.
    pub fn alloc(&mut self) -> MsgId {
        match self.try_alloc() {
            Ok(id) => id,
            Err(_) => panic!("message pool exhausted"),
        }
    }

    /// Return a slot to the pool, consuming its handle.
    pub fn free(&mut self, id: MsgId) {
        self.busy[id.index()] = false;
    }

    /// Borrow the message a handle refers to.
    pub fn get(&self, id: &MsgId) -> &Message {
        &self.slots[id.index()]
    }

    /// Mutably borrow the message a handle refers to.
    pub fn get_mut(&mut self, id: &MsgId) -> &mut Message {
        &mut self.slots[id.index()]
    }

    /// Number of busy slots.
    pub fn in_use(&self) -> usize {
        self.busy.iter().filter(|busy| **busy).count()
    }
}

impl<const N: usize> Default for MsgPool<N> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Mailbox
// =============================================================================

/// Bounded single-producer/single-consumer queue of message handles.
///
/// Posting moves handle ownership to the mailbox; taking moves it to the
/// consumer. Capacity equals the pool size, so a mailbox holding only
/// unique handles cannot overflow.
pub struct Mailbox<const N: usize> {
    queue: Deque<MsgId, N>,
}

impl<const N: usize> Mailbox<N> {
    /// Create an empty mailbox.
    pub const fn new() -> Self {
        Self { queue: Deque::new() }
    }

    /// Post a handle.
    pub fn post(&mut self, id: MsgId) -> Result<(), MailboxError> {
        self.queue.push_back(id).map_err(|_| MailboxError::Full)
    }

    /// Take the oldest handle, if any.
    pub fn take(&mut self) -> Option<MsgId> {
        self.queue.pop_front()
    }

    /// True if no handles are queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of queued handles.
    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

impl<const N: usize> Default for Mailbox<N> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
