// canbus/src/lib.rs
//
// The main lib file for the Rust 'canbus' library.
//
// This file is part of the Rust 'canbus' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! High-level access to CAN bus sockets on Linux.
//!
//! The Linux kernel supports using CAN-devices through a network-like API
//! (see <https://www.kernel.org/doc/Documentation/networking/can.txt>).
//! This crate binds a raw CAN socket to a named interface, sends and
//! receives classic CAN 2.0 frames on it, and filters received frames by
//! arbitration ID.
//!
//! # An introduction to CAN
//!
//! The CAN bus was originally designed to allow microcontrollers inside a
//! vehicle to communicate over a single shared bus. Messages called
//! *frames* are multicast to all devices on the bus.
//!
//! Every frame consists of an ID and a payload of up to 8 bytes. If two
//! devices attempt to send a frame at the same time, the device with the
//! higher ID will notice the conflict, stop sending and reattempt to sent its
//! frame in the next time slot. This means that the lower the ID, the higher
//! the priority.
//!
//! # Frames and the wire
//!
//! A [`CanFrame`] is an ID, a payload and a [`FrameKind`]: standard
//! (11-bit ID), extended (29-bit ID), remote request, or error. The
//! [`codec`] turns it into the 16-byte unit the kernel exchanges over a
//! raw socket and back. On the way in, the kind is derived from the flag
//! bits of the ID word, and the flag bits never show up in the ID.
//!
//! # Example
//!
//! ```no_run
//! use canbus::{CanFrame, CanSocket, Socket};
//!
//! let sock = CanSocket::open("vcan0")?;
//! let frame = CanFrame::new_standard(0x123, b"data-00")?;
//! sock.write_frame(&frame)?;
//!
//! let frame = sock.read_frame()?;
//! println!("{:X}", frame);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # RawFd
//!
//! Raw access to the underlying file descriptor and construction through
//! one is available through the `AsRawFd`, `AsFd`, `IntoRawFd` and
//! `From<OwnedFd>` implementations.

#![deny(
    missing_docs,
    missing_debug_implementations,
    unstable_features,
    unused_import_braces,
    unused_qualifications
)]

pub mod addr;
pub use addr::CanAddr;

pub mod codec;

pub mod errors;
pub use errors::{
    CanError, CanErrorDecodingFailure, ConstructionError, Error, Result,
};

pub mod filter;
pub use filter::CanFilter;

pub mod frame;
pub use frame::{CanFrame, ParseError};

pub mod id;
pub use id::{FrameKind, IdFlags};

pub mod socket;
pub use socket::{CanSocket, ShouldRetry, Socket, SocketOptions};
