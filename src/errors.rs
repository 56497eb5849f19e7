// canbus/src/errors.rs
//
// Implements errors for the Rust 'canbus' library on Linux.
//
// This file is part of the Rust 'canbus' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Errors.
//!
//! There are three families:
//! - [`ConstructionError`] when a frame can't be built from the parts given.
//! - [`Error`], the crate-level error, which wraps a construction error or
//!   passes an I/O error from the socket through untouched.
//! - [`CanError`], an interpretation of an error frame reported by the
//!   driver, decoded from the error class bits of its ID and its data bytes
//!   (see `linux/can/error.h`).
//!
//! ```text
//! Lost Arbitration   (0x02) => data[0]
//! Controller Problem (0x04) => data[1]
//! Protocol Violation (0x08) => data[2..3]
//! Transceiver Status (0x10) => data[4]
//! ```

use crate::CanFrame;
use std::io;
use thiserror::Error as ThisError;

// ===== ConstructionError =====

/// Error that occurs when creating CAN frames
#[derive(ThisError, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    /// More than 8 bytes of payload data were supplied.
    #[error("data too big")]
    TooMuchData,
}

// ===== Error =====

/// The crate-level error.
///
/// Returned by the operations that build a frame and then put it on a
/// channel, so either step can fail.
#[derive(ThisError, Debug)]
pub enum Error {
    /// The frame could not be constructed.
    #[error(transparent)]
    Construction(#[from] ConstructionError),
    /// An error from the underlying socket, as reported by the OS.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A result type for the crate
pub type Result<T> = std::result::Result<T, Error>;

// ===== CanErrorDecodingFailure =====

/// Error decoding a `CanError` from an error frame.
#[derive(ThisError, Debug, Copy, Clone, PartialEq, Eq)]
pub enum CanErrorDecodingFailure {
    /// The frame is not an error frame.
    #[error("CAN frame is not an error")]
    NotAnError,
    /// The error class bits don't name a known error.
    #[error("unknown error type: {0:#x}")]
    UnknownErrorType(u32),
    /// The error class needs a data byte that the frame doesn't carry.
    #[error("not enough data for byte {0}")]
    NotEnoughData(u8),
}

// ===== CanError =====

/// A CAN bus error reported by the driver in an error frame.
///
/// The detail bytes are kept raw, as the kernel reports them.
#[derive(ThisError, Debug, Copy, Clone, PartialEq, Eq)]
pub enum CanError {
    /// TX timeout (by netdevice driver)
    #[error("transmission timeout")]
    TransmitTimeout,
    /// Arbitration was lost after the given bit (0 if unspecified).
    #[error("arbitration lost after {0} bits")]
    LostArbitration(u8),
    /// Controller problem, with the `CAN_ERR_CRTL_*` status byte.
    #[error("controller problem: {0:#04x}")]
    ControllerProblem(u8),
    /// Protocol violation, with the `CAN_ERR_PROT_*` type and location bytes.
    #[error("protocol violation {vtype:#04x} at {location:#04x}")]
    ProtocolViolation {
        /// The type of protocol violation
        vtype: u8,
        /// The location (field or bit) of the violation
        location: u8,
    },
    /// Transceiver status, with the `CAN_ERR_TRX_*` byte.
    #[error("transceiver error: {0:#04x}")]
    TransceiverError(u8),
    /// No ACK received for current CAN frame.
    #[error("no ack")]
    NoAck,
    /// Bus off (due to too many detected errors)
    #[error("bus off")]
    BusOff,
    /// Bus error (due to too many detected errors)
    #[error("bus error")]
    BusError,
    /// The bus has been restarted
    #[error("restarted")]
    Restarted,
}

impl CanError {
    /// Decodes the error carried by an error frame.
    pub fn from_frame(frame: &CanFrame) -> std::result::Result<Self, CanErrorDecodingFailure> {
        if !frame.is_error() {
            return Err(CanErrorDecodingFailure::NotAnError);
        }

        let byte = |idx: u8| {
            frame
                .data()
                .get(idx as usize)
                .copied()
                .ok_or(CanErrorDecodingFailure::NotEnoughData(idx))
        };

        match frame.id() {
            0x0000_0001 => Ok(CanError::TransmitTimeout),
            0x0000_0002 => Ok(CanError::LostArbitration(byte(0)?)),
            0x0000_0004 => Ok(CanError::ControllerProblem(byte(1)?)),
            0x0000_0008 => Ok(CanError::ProtocolViolation {
                vtype: byte(2)?,
                location: byte(3)?,
            }),
            0x0000_0010 => Ok(CanError::TransceiverError(byte(4)?)),
            0x0000_0020 => Ok(CanError::NoAck),
            0x0000_0040 => Ok(CanError::BusOff),
            0x0000_0080 => Ok(CanError::BusError),
            0x0000_0100 => Ok(CanError::Restarted),
            e => Err(CanErrorDecodingFailure::UnknownErrorType(e)),
        }
    }
}

impl TryFrom<CanFrame> for CanError {
    type Error = CanErrorDecodingFailure;

    fn try_from(frame: CanFrame) -> std::result::Result<Self, Self::Error> {
        CanError::from_frame(&frame)
    }
}

impl embedded_can::Error for CanError {
    fn kind(&self) -> embedded_can::ErrorKind {
        match *self {
            CanError::NoAck => embedded_can::ErrorKind::Acknowledge,
            // CAN_ERR_CRTL_RX_OVERFLOW | CAN_ERR_CRTL_TX_OVERFLOW
            CanError::ControllerProblem(status) if status & 0x03 != 0 => {
                embedded_can::ErrorKind::Overrun
            }
            _ => embedded_can::ErrorKind::Other,
        }
    }
}

/////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_can::Error as _;

    #[test]
    fn test_construction_error_message() {
        assert_eq!("data too big", ConstructionError::TooMuchData.to_string());

        let err = Error::from(ConstructionError::TooMuchData);
        assert_eq!("data too big", err.to_string());
    }

    #[test]
    fn test_io_error_passthrough() {
        let err = Error::from(io::Error::from_raw_os_error(libc::ENETDOWN));
        assert_eq!(
            io::Error::from_raw_os_error(libc::ENETDOWN).to_string(),
            err.to_string()
        );
        assert!(matches!(err, Error::Io(e) if e.raw_os_error() == Some(libc::ENETDOWN)));
    }

    #[test]
    fn test_decode_simple_errors() {
        let frame = CanFrame::new_error(0x0020, &[]).unwrap();
        assert_eq!(Ok(CanError::NoAck), CanError::from_frame(&frame));

        let frame = CanFrame::new_error(0x0040, &[]).unwrap();
        assert_eq!(Ok(CanError::BusOff), CanError::try_from(frame));
    }

    #[test]
    fn test_decode_detail_bytes() {
        let frame = CanFrame::new_error(0x0002, &[7]).unwrap();
        assert_eq!(Ok(CanError::LostArbitration(7)), CanError::from_frame(&frame));

        let frame = CanFrame::new_error(0x0008, &[0, 0, 0x04, 0x03]).unwrap();
        assert_eq!(
            Ok(CanError::ProtocolViolation {
                vtype: 0x04,
                location: 0x03
            }),
            CanError::from_frame(&frame)
        );

        let frame = CanFrame::new_error(0x0004, &[0]).unwrap();
        assert_eq!(
            Err(CanErrorDecodingFailure::NotEnoughData(1)),
            CanError::from_frame(&frame)
        );
    }

    #[test]
    fn test_decode_failures() {
        let frame = CanFrame::new_standard(0x0020, &[]).unwrap();
        assert_eq!(
            Err(CanErrorDecodingFailure::NotAnError),
            CanError::from_frame(&frame)
        );

        let frame = CanFrame::new_error(0x0400, &[]).unwrap();
        assert_eq!(
            Err(CanErrorDecodingFailure::UnknownErrorType(0x0400)),
            CanError::from_frame(&frame)
        );
    }

    #[test]
    fn test_hal_error_kind() {
        assert_eq!(embedded_can::ErrorKind::Acknowledge, CanError::NoAck.kind());
        assert_eq!(
            embedded_can::ErrorKind::Overrun,
            CanError::ControllerProblem(0x01).kind()
        );
        assert_eq!(embedded_can::ErrorKind::Other, CanError::BusOff.kind());
    }
}
