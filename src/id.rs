// canbus/src/id.rs
//
// Implements CANbus identifiers and frame classification.
//
// This file is part of the Rust 'canbus' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! CAN identifiers, the flag bits of the SocketCAN ID word, and the frame
//! kind derived from them.
//!
//! The kernel packs the arbitration ID and three flag bits into a single
//! 32-bit word:
//!
//! ```text
//! bit 31     EFF - 29-bit extended frame format
//! bit 30     RTR - remote transmission request
//! bit 29     ERR - error message frame
//! bit 28-0   the identifier (11 or 29 bits significant)
//! ```

use bitflags::bitflags;
use embedded_can::{ExtendedId, Id, StandardId};
use libc::canid_t;
use std::fmt;

pub use libc::{
    CAN_EFF_FLAG, CAN_EFF_MASK, CAN_ERR_FLAG, CAN_ERR_MASK, CAN_INV_FILTER, CAN_RTR_FLAG,
    CAN_SFF_MASK,
};

/// An error mask that will cause SocketCAN to report all errors
pub const ERR_MASK_ALL: u32 = CAN_ERR_MASK;

/// An error mask that will cause SocketCAN to silently drop all errors
pub const ERR_MASK_NONE: u32 = 0;

bitflags! {
    /// Bit flags in the composite SocketCAN ID word.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct IdFlags: canid_t {
        /// Indicates frame uses a 29-bit extended ID
        const EFF = CAN_EFF_FLAG;
        /// Indicates a remote request frame.
        const RTR = CAN_RTR_FLAG;
        /// Indicates an error frame.
        const ERR = CAN_ERR_FLAG;
    }
}

/// The kind of a classic CAN frame.
///
/// Exactly one kind applies to a frame. It selects which bits of the ID
/// word are address and which flag bit is set on the wire.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Standard frame format, 11-bit ID.
    #[default]
    Standard,
    /// Extended frame format, 29-bit ID.
    Extended,
    /// Remote transmission request.
    Remote,
    /// Error message frame, reported by the driver.
    Error,
}

impl FrameKind {
    /// Classifies a raw ID word read from the wire.
    ///
    /// The flags are tested in a fixed order and the first one set wins:
    /// EFF, then ERR, then RTR. A word with no flag set is a standard frame.
    pub fn classify(id_word: canid_t) -> Self {
        let flags = IdFlags::from_bits_truncate(id_word);
        if flags.contains(IdFlags::EFF) {
            FrameKind::Extended
        } else if flags.contains(IdFlags::ERR) {
            FrameKind::Error
        } else if flags.contains(IdFlags::RTR) {
            FrameKind::Remote
        } else {
            FrameKind::Standard
        }
    }

    /// The bits of the ID word that carry the identifier for this kind.
    ///
    /// Remote frames use the 29-bit mask whether or not the EFF flag was
    /// present.
    pub fn mask(self) -> canid_t {
        use FrameKind::*;
        match self {
            Standard => CAN_SFF_MASK,
            Extended | Remote => CAN_EFF_MASK,
            Error => CAN_ERR_MASK,
        }
    }

    /// The flag bit that marks this kind on the wire.
    pub fn flags(self) -> IdFlags {
        use FrameKind::*;
        match self {
            Standard => IdFlags::empty(),
            Extended => IdFlags::EFF,
            Remote => IdFlags::RTR,
            Error => IdFlags::ERR,
        }
    }

    /// Builds the wire ID word for `id`: masked to this kind, flag set.
    ///
    /// High bits outside the mask are dropped, not rejected.
    #[inline]
    pub fn id_word(self, id: u32) -> canid_t {
        (id & self.mask()) | self.flags().bits()
    }

    /// Strips an ID word down to the identifier bits of this kind.
    #[inline]
    pub fn strip(self, id_word: canid_t) -> u32 {
        id_word & self.mask()
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use FrameKind::*;
        let s = match *self {
            Standard => "SFF",
            Extended => "EFF",
            Remote => "RTR",
            Error => "ERR",
        };
        f.write_str(s)
    }
}

/// Creates a CAN ID from a raw integer value.
///
/// If the `id` is <= 0x7FF, it's assumed to be a standard ID, otherwise
/// it is created as an Extened ID. If you require an Extended ID <= 0x7FF,
/// create it explicitly.
pub fn id_from_raw(id: u32) -> Option<Id> {
    let id = match id {
        n if n <= CAN_SFF_MASK => StandardId::new(n as u16)?.into(),
        n => ExtendedId::new(n)?.into(),
    };
    Some(id)
}

/// Gets the raw numeric value of an `embedded_can::Id`.
pub fn id_to_raw(id: impl Into<Id>) -> u32 {
    match id.into() {
        Id::Standard(id) => id.as_raw() as u32,
        Id::Extended(id) => id.as_raw(),
    }
}

/////////////////////////////////////////////////////////////////////////////
