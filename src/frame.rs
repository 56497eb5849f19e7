// canbus/src/frame.rs
//
// Implements classic CAN 2.0 frames.
//
// This file is part of the Rust 'canbus' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! CAN bus frames.
//!
//! A [`CanFrame`] is a plain value: an arbitration ID, up to 8 bytes of
//! payload and a [`FrameKind`]. It knows nothing about the wire; the
//! [`codec`](crate::codec) module maps it to and from the 16-byte layout
//! used by the kernel.
//!
//! The kind is always given explicitly when a frame is built. It is never
//! guessed from the size of the ID. On receive, the decoder derives it from
//! the flag bits of the ID word.

use crate::{
    id::{id_from_raw, id_to_raw, FrameKind, CAN_SFF_MASK},
    CanError, CanErrorDecodingFailure, ConstructionError,
};
use embedded_can::{ExtendedId, Frame as EmbeddedFrame, Id, StandardId};
use hex::FromHex;
use itertools::Itertools;
use libc::canid_t;
use std::{fmt, str::FromStr};
use thiserror::Error;

pub use libc::CAN_MAX_DLEN;

/// A classic CAN 2.0 frame with up to 8 bytes of data.
#[derive(Clone, Copy, Default)]
pub struct CanFrame {
    id: u32,
    kind: FrameKind,
    len: u8,
    data: [u8; CAN_MAX_DLEN],
}

impl CanFrame {
    /// Creates a frame of the given kind.
    ///
    /// Fails with [`ConstructionError::TooMuchData`] if `data` is longer
    /// than 8 bytes.
    ///
    /// The `id` is masked to the bits that are significant for `kind`
    /// (11 for a standard frame, 29 for extended and remote frames). An ID
    /// that does not fit is truncated, not rejected, the same way CAN
    /// hardware drops the high bits. Callers that care must range-check the
    /// ID themselves.
    pub fn new(id: u32, data: &[u8], kind: FrameKind) -> Result<Self, ConstructionError> {
        let n = data.len();
        if n > CAN_MAX_DLEN {
            return Err(ConstructionError::TooMuchData);
        }

        let mut frame = Self {
            id: kind.strip(id),
            kind,
            len: n as u8,
            data: [0; CAN_MAX_DLEN],
        };
        frame.data[..n].copy_from_slice(data);
        Ok(frame)
    }

    /// Creates a standard (11-bit ID) data frame.
    pub fn new_standard(id: u32, data: &[u8]) -> Result<Self, ConstructionError> {
        Self::new(id, data, FrameKind::Standard)
    }

    /// Creates an extended (29-bit ID) data frame.
    pub fn new_extended(id: u32, data: &[u8]) -> Result<Self, ConstructionError> {
        Self::new(id, data, FrameKind::Extended)
    }

    /// Creates a remote transmission request frame.
    pub fn new_remote(id: u32, data: &[u8]) -> Result<Self, ConstructionError> {
        Self::new(id, data, FrameKind::Remote)
    }

    /// Creates an error frame.
    ///
    /// Error frames are reported by the driver; an application would
    /// normally only build one to test code that handles them. The `id`
    /// holds the `CAN_ERR_*` class bits.
    pub fn new_error(id: u32, data: &[u8]) -> Result<Self, ConstructionError> {
        Self::new(id, data, FrameKind::Error)
    }

    /// The arbitration ID, without any flag bits.
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The kind of frame.
    #[inline]
    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// The payload. Always 8 bytes or fewer.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// The payload length
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether the frame carries no payload.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if frame uses 29-bit extended ID format.
    pub fn is_extended(&self) -> bool {
        self.kind == FrameKind::Extended
    }

    /// Check if frame is a remote transmission request.
    pub fn is_remote(&self) -> bool {
        self.kind == FrameKind::Remote
    }

    /// Check if frame is an error message
    pub fn is_error(&self) -> bool {
        self.kind == FrameKind::Error
    }

    /// The composite SocketCAN ID word, as it goes on the wire.
    pub fn id_word(&self) -> canid_t {
        self.kind.id_word(self.id)
    }

    /// Decodes the bus error carried by an error frame.
    pub fn error(&self) -> Result<CanError, CanErrorDecodingFailure> {
        CanError::from_frame(self)
    }

    /// Assembles a frame from decoded wire fields.
    ///
    /// The caller guarantees `len <= CAN_MAX_DLEN`.
    pub(crate) fn from_parts(id: u32, kind: FrameKind, data: [u8; CAN_MAX_DLEN], len: usize) -> Self {
        debug_assert!(len <= CAN_MAX_DLEN);
        Self {
            id: kind.strip(id),
            kind,
            len: len as u8,
            data,
        }
    }
}

impl PartialEq for CanFrame {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.kind == other.kind && self.data() == other.data()
    }
}

impl Eq for CanFrame {}

impl fmt::Debug for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CanFrame {{ {}: ", self.kind)?;
        fmt::UpperHex::fmt(self, f)?;
        write!(f, " }}")
    }
}

impl fmt::UpperHex for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{:X}#", self.id)?;
        let mut parts = self.data().iter().map(|v| format!("{:02X}", v));
        write!(f, "{}", parts.join(" "))
    }
}

impl EmbeddedFrame for CanFrame {
    /// Create a new data frame, standard or extended by the `Id` variant.
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        let (id, kind) = match id.into() {
            Id::Standard(id) => (id.as_raw() as u32, FrameKind::Standard),
            Id::Extended(id) => (id.as_raw(), FrameKind::Extended),
        };
        CanFrame::new(id, data, kind).ok()
    }

    /// Create a new remote transmission request frame.
    ///
    /// A remote frame carries no EFF flag on the wire, so its ID reads back
    /// as standard whenever it fits in 11 bits. An extended ID in that range
    /// can't be represented and gives `None`.
    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        let id = id.into();
        if dlc > CAN_MAX_DLEN || id_from_raw(id_to_raw(id)) != Some(id) {
            return None;
        }
        let data = [0u8; CAN_MAX_DLEN];
        CanFrame::new_remote(id_to_raw(id), &data[..dlc]).ok()
    }

    fn is_extended(&self) -> bool {
        match self.kind {
            FrameKind::Standard => false,
            FrameKind::Extended | FrameKind::Error => true,
            FrameKind::Remote => self.id > CAN_SFF_MASK,
        }
    }

    fn is_remote_frame(&self) -> bool {
        self.is_remote()
    }

    /// Return the frame identifier.
    fn id(&self) -> Id {
        let fallback = || Id::Extended(ExtendedId::ZERO);
        match self.kind {
            FrameKind::Standard => StandardId::new(self.id as u16)
                .map(Id::Standard)
                .unwrap_or_else(fallback),
            FrameKind::Extended | FrameKind::Error => ExtendedId::new(self.id)
                .map(Id::Extended)
                .unwrap_or_else(fallback),
            FrameKind::Remote => id_from_raw(self.id).unwrap_or_else(fallback),
        }
    }

    fn dlc(&self) -> usize {
        self.len()
    }

    fn data(&self) -> &[u8] {
        CanFrame::data(self)
    }
}

// ===== Text form =====

/// Error parsing the `<hex-id>#<hex-bytes>` text form of a frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// There must be exactly one '#' between the ID and the data.
    #[error("invalid CAN frame (missing or repeated '#'): {0:?}")]
    MissingSeparator(String),
    /// The ID must be 3 (standard) or 8 (extended) hex digits.
    #[error("invalid CAN frame id (len={0} is neither 3 nor 8)")]
    InvalidIdLength(usize),
    /// The ID is not a hex number.
    #[error("error parsing frame id: {0:?}")]
    InvalidId(String),
    /// The payload is not a sequence of hex byte pairs.
    #[error("invalid CAN frame data: {0:?}")]
    InvalidData(String),
    /// Error creating the frame
    #[error(transparent)]
    ConstructionError(#[from] ConstructionError),
}

impl FromStr for CanFrame {
    type Err = ParseError;

    /// Parses a frame like `123#DEADBEEF`, `1F334455#1122` or `123#R`.
    ///
    /// A 3-digit ID gives a standard frame, an 8-digit ID an extended one.
    /// A payload of `R` gives a remote frame with no data.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id_str, data_str) = match s.split('#').collect_tuple() {
            Some(parts) => parts,
            None => return Err(ParseError::MissingSeparator(s.into())),
        };

        let kind = match id_str.len() {
            3 => FrameKind::Standard,
            8 => FrameKind::Extended,
            n => return Err(ParseError::InvalidIdLength(n)),
        };

        let id = Some(id_str)
            .filter(|s| s.bytes().all(|b| b.is_ascii_hexdigit()))
            .and_then(|s| canid_t::from_str_radix(s, 16).ok())
            .ok_or_else(|| ParseError::InvalidId(id_str.into()))?;

        if data_str.eq_ignore_ascii_case("r") {
            return Ok(CanFrame::new_remote(id, &[])?);
        }

        let data = Vec::from_hex(data_str).map_err(|_| ParseError::InvalidData(data_str.into()))?;
        Ok(CanFrame::new(id, &data, kind)?)
    }
}

/////////////////////////////////////////////////////////////////////////////
