// canbus/src/codec.rs
//
// Implements the SocketCAN wire format for classic CAN frames.
//
// This file is part of the Rust 'canbus' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! The wire codec.
//!
//! A raw CAN socket reads and writes classic frames as fixed 16-byte units,
//! laid out like the kernel's `struct can_frame`:
//!
//! ```text
//! offset  size  field
//!      0     4  ID word (identifier + EFF/RTR/ERR flags), little-endian
//!      4     1  payload length, 0-8
//!      5     3  reserved, zero on send, ignored on receive
//!      8     8  payload, left-justified
//! ```
//!
//! The fields are read and written at these explicit offsets. Nothing here
//! depends on how the compiler lays out a struct in memory.
//!
//! The reader and writer functions work on any [`Read`] / [`Write`], so a
//! socket, a pipe or an in-memory buffer all serve as a channel.

use crate::{
    filter::{apply_filters, CanFilter},
    frame::CAN_MAX_DLEN,
    id::FrameKind,
    CanFrame, ConstructionError, Result,
};
use log::{trace, warn};
use std::io::{self, Read, Write};

/// Size of a classic CAN frame on the wire.
pub const CAN_MTU: usize = 16;

/// Offset of the little-endian ID word.
pub const ID_OFFSET: usize = 0;
/// Offset of the payload length byte.
pub const LEN_OFFSET: usize = 4;
/// Offset of the three reserved bytes.
pub const PAD_OFFSET: usize = 5;
/// Offset of the payload.
pub const DATA_OFFSET: usize = 8;

/// One classic CAN frame in wire form.
pub type WireFrame = [u8; CAN_MTU];

/// Encodes a frame from its raw parts.
///
/// Fails with [`ConstructionError::TooMuchData`] if `data` holds more than
/// 8 bytes. The ID is masked to `kind` and the kind's flag is set; for a
/// standard frame any bits above the low 11 are silently dropped.
pub fn encode_parts(
    id: u32,
    data: &[u8],
    kind: FrameKind,
) -> std::result::Result<WireFrame, ConstructionError> {
    let frame = CanFrame::new(id, data, kind)?;
    Ok(encode(&frame))
}

/// Encodes a frame into its wire form.
pub fn encode(frame: &CanFrame) -> WireFrame {
    let mut buf = [0u8; CAN_MTU];
    let data = frame.data();

    buf[ID_OFFSET..LEN_OFFSET].copy_from_slice(&frame.id_word().to_le_bytes());
    buf[LEN_OFFSET] = data.len() as u8;
    // reserved bytes at PAD_OFFSET stay zero
    buf[DATA_OFFSET..DATA_OFFSET + data.len()].copy_from_slice(data);
    buf
}

/// Decodes a frame from its wire form, without any filtering.
pub fn decode(buf: &WireFrame) -> CanFrame {
    decode_filtered(buf, &[])
}

/// Decodes a frame from its wire form, narrowing the ID by `filters`.
///
/// The kind comes from the flag bits of the ID word (see
/// [`FrameKind::classify`]) and the ID is stripped to that kind's mask
/// before the filters are consulted. A length byte above 8 is capped.
pub fn decode_filtered(buf: &WireFrame, filters: &[CanFilter]) -> CanFrame {
    let mut word = [0u8; 4];
    word.copy_from_slice(&buf[ID_OFFSET..LEN_OFFSET]);
    let id_word = u32::from_le_bytes(word);

    let kind = FrameKind::classify(id_word);
    let id = apply_filters(kind.strip(id_word), filters);

    let mut len = buf[LEN_OFFSET] as usize;
    if len > CAN_MAX_DLEN {
        warn!("CAN frame length {} out of range, capped at {}", len, CAN_MAX_DLEN);
        len = CAN_MAX_DLEN;
    }

    let mut data = [0u8; CAN_MAX_DLEN];
    data[..len].copy_from_slice(&buf[DATA_OFFSET..DATA_OFFSET + len]);

    CanFrame::from_parts(id, kind, data, len)
}

/// Writes one frame to the channel.
///
/// Returns the number of bytes written, which is always [`CAN_MTU`] on
/// success. Errors from the channel are returned as they are.
pub fn write_frame<W: Write>(wr: &mut W, frame: &CanFrame) -> io::Result<usize> {
    let buf = encode(frame);
    wr.write_all(&buf)?;
    trace!("sent {:X}", frame);
    Ok(buf.len())
}

/// Builds a frame from its raw parts and writes it to the channel.
///
/// A payload over 8 bytes fails with
/// [`Error::Construction`](crate::Error::Construction) before anything is
/// written. Errors from the channel come back as
/// [`Error::Io`](crate::Error::Io), unchanged.
pub fn write_parts<W: Write>(wr: &mut W, id: u32, data: &[u8], kind: FrameKind) -> Result<usize> {
    let frame = CanFrame::new(id, data, kind)?;
    Ok(write_frame(wr, &frame)?)
}

/// Reads one frame from the channel.
///
/// Blocks until a whole unit is available. If the channel ends part way,
/// this fails with [`io::ErrorKind::UnexpectedEof`]; nothing is retried.
pub fn read_frame<R: Read>(rd: &mut R, filters: &[CanFilter]) -> io::Result<CanFrame> {
    let mut buf = [0u8; CAN_MTU];
    rd.read_exact(&mut buf)?;
    let frame = decode_filtered(&buf, filters);
    trace!("received {:X}", frame);
    Ok(frame)
}

/////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        id::{CAN_EFF_FLAG, CAN_ERR_FLAG, CAN_INV_FILTER, CAN_RTR_FLAG, CAN_SFF_MASK},
        Error,
    };
    use std::io::Cursor;

    const DATA: &[u8] = &[0, 0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE, 0xDA];

    fn round_trip(frame: &CanFrame) -> CanFrame {
        decode(&encode(frame))
    }

    #[test]
    fn test_layout_matches_kernel() {
        assert_eq!(libc::CAN_MTU, CAN_MTU);
        assert_eq!(CAN_MTU, DATA_OFFSET + CAN_MAX_DLEN);
    }

    #[test]
    fn test_encode_layout() {
        let frame = CanFrame::new_standard(0x123, &[0xDE, 0xAD]).unwrap();
        let buf = encode(&frame);

        assert_eq!(
            [
                0x23, 0x01, 0x00, 0x00, // id
                0x02, // len
                0x00, 0x00, 0x00, // reserved
                0xDE, 0xAD, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00
            ],
            buf
        );
        assert_eq!([0, 0, 0], buf[PAD_OFFSET..DATA_OFFSET]);
    }

    #[test]
    fn test_encode_flags() {
        let frame = CanFrame::new_extended(0x1234_5678, DATA).unwrap();
        let buf = encode(&frame);
        assert_eq!((CAN_EFF_FLAG | 0x1234_5678).to_le_bytes(), buf[..4]);

        let frame = CanFrame::new_remote(0x123, &[]).unwrap();
        let buf = encode(&frame);
        assert_eq!((CAN_RTR_FLAG | 0x123).to_le_bytes(), buf[..4]);
        assert_eq!(0, buf[LEN_OFFSET]);

        let frame = CanFrame::new_error(0x0040, &[]).unwrap();
        let buf = encode(&frame);
        assert_eq!((CAN_ERR_FLAG | 0x0040).to_le_bytes(), buf[..4]);
    }

    #[test]
    fn test_encode_parts() {
        let buf = encode_parts(0x42, &DATA[..4], FrameKind::Standard).unwrap();
        assert_eq!(4, buf[LEN_OFFSET]);
        assert_eq!(&DATA[..4], &buf[DATA_OFFSET..DATA_OFFSET + 4]);

        assert_eq!(
            Err(ConstructionError::TooMuchData),
            encode_parts(0x42, &[0u8; 9], FrameKind::Standard)
        );
    }

    #[test]
    fn test_round_trip_standard() {
        for n in 0..=CAN_MAX_DLEN {
            let frame = CanFrame::new_standard(0x7FF, &DATA[..n]).unwrap();
            let got = round_trip(&frame);
            assert_eq!(frame, got);
            assert_eq!(FrameKind::Standard, got.kind());
            assert_eq!(0x7FF, got.id());
        }
    }

    #[test]
    fn test_round_trip_extended() {
        let frame = CanFrame::new_extended(0x1FFF_FFFF, DATA).unwrap();
        let got = round_trip(&frame);
        assert_eq!(frame, got);
        assert_eq!(FrameKind::Extended, got.kind());

        let frame = CanFrame::new_extended(0x80, &DATA[..3]).unwrap();
        assert_eq!(frame, round_trip(&frame));
    }

    #[test]
    fn test_round_trip_remote_and_error() {
        let frame = CanFrame::new_remote(0x0ABC_DEF0, &[]).unwrap();
        let got = round_trip(&frame);
        assert_eq!(FrameKind::Remote, got.kind());
        assert_eq!(0x0ABC_DEF0, got.id());

        let frame = CanFrame::new_error(0x0004, &[0, 0x04, 0, 0, 0, 0, 0, 0]).unwrap();
        let got = round_trip(&frame);
        assert_eq!(frame, got);
        assert!(got.is_error());
    }

    #[test]
    fn test_standard_masking() {
        let buf = encode_parts(0x1FFF_FFFF, b"abc", FrameKind::Standard).unwrap();
        let got = decode(&buf);
        assert_eq!(0x1FFF_FFFF & CAN_SFF_MASK, got.id());
        assert_eq!(FrameKind::Standard, got.kind());
    }

    #[test]
    fn test_decode_precedence() {
        let mut buf = [0u8; CAN_MTU];
        buf[..4].copy_from_slice(&(CAN_EFF_FLAG | CAN_RTR_FLAG | 0x1234).to_le_bytes());
        assert_eq!(FrameKind::Extended, decode(&buf).kind());

        buf[..4].copy_from_slice(&(CAN_ERR_FLAG | CAN_RTR_FLAG | 0x0020).to_le_bytes());
        let frame = decode(&buf);
        assert_eq!(FrameKind::Error, frame.kind());
        assert_eq!(0x0020, frame.id());
    }

    #[test]
    fn test_decode_ignores_reserved_and_trailing() {
        let mut buf = [0xFFu8; CAN_MTU];
        buf[..4].copy_from_slice(&0x123u32.to_le_bytes());
        buf[LEN_OFFSET] = 2;

        let frame = decode(&buf);
        assert_eq!(0x123, frame.id());
        assert_eq!(&[0xFF, 0xFF], frame.data());
    }

    #[test]
    fn test_decode_caps_length() {
        let mut buf = [0u8; CAN_MTU];
        buf[LEN_OFFSET] = 15;
        assert_eq!(CAN_MAX_DLEN, decode(&buf).len());
    }

    #[test]
    fn test_decode_filtered() {
        let frame = CanFrame::new_standard(0x123, DATA).unwrap();
        let buf = encode(&frame);

        let filters = [CanFilter::new(0x120, 0x7F0)];
        assert_eq!(0x120, decode_filtered(&buf, &filters).id());

        let filters = [CanFilter::new(0x321, CAN_SFF_MASK)];
        assert_eq!(0x123, decode_filtered(&buf, &filters).id());

        let filters = [CanFilter::new(0x123 | CAN_INV_FILTER, CAN_SFF_MASK)];
        assert_eq!(0x123, decode_filtered(&buf, &filters).id());
    }

    #[test]
    fn test_channel_round_trip() {
        let mut chan = Vec::new();
        for i in 0..5u8 {
            let data = format!("data-{:02}", i);
            let frame = CanFrame::new_standard(0x123, data.as_bytes()).unwrap();
            assert_eq!(CAN_MTU, write_frame(&mut chan, &frame).unwrap());
        }
        assert_eq!(5 * CAN_MTU, chan.len());

        let mut rd = Cursor::new(chan);
        for i in 0..5u8 {
            let frame = read_frame(&mut rd, &[]).unwrap();
            assert_eq!(0x123, frame.id());
            assert_eq!(FrameKind::Standard, frame.kind());
            assert_eq!(format!("data-{:02}", i).as_bytes(), frame.data());
        }
    }

    #[test]
    fn test_short_read() {
        let frame = CanFrame::new_standard(0x123, DATA).unwrap();
        let buf = encode(&frame);

        let mut rd = Cursor::new(&buf[..CAN_MTU - 1]);
        let err = read_frame(&mut rd, &[]).unwrap_err();
        assert_eq!(io::ErrorKind::UnexpectedEof, err.kind());

        let mut rd = Cursor::new(Vec::<u8>::new());
        let err = read_frame(&mut rd, &[]).unwrap_err();
        assert_eq!(io::ErrorKind::UnexpectedEof, err.kind());
    }

    #[test]
    fn test_oversized_payload_writes_nothing() {
        let mut chan = Vec::new();
        let res = CanFrame::new_standard(42, &[0u8; CAN_MAX_DLEN + 1])
            .map(|frame| write_frame(&mut chan, &frame));
        assert_eq!(Err(ConstructionError::TooMuchData), res.map(|_| ()));
        assert!(chan.is_empty());
    }

    #[test]
    fn test_write_parts() {
        let mut chan = Vec::new();
        assert_eq!(
            CAN_MTU,
            write_parts(&mut chan, 0x123, b"data-00", FrameKind::Standard).unwrap()
        );

        let frame = read_frame(&mut Cursor::new(&chan), &[]).unwrap();
        assert_eq!(0x123, frame.id());
        assert_eq!(b"data-00", frame.data());

        let mut chan = Vec::new();
        let err = write_parts(&mut chan, 0x123, &[0u8; 9], FrameKind::Standard).unwrap_err();
        assert!(matches!(err, Error::Construction(ConstructionError::TooMuchData)));
        assert!(chan.is_empty());
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from_raw_os_error(libc::ENETDOWN))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_error_passthrough() {
        let frame = CanFrame::new_standard(0x123, DATA).unwrap();
        let err = write_frame(&mut BrokenPipe, &frame).unwrap_err();
        assert_eq!(Some(libc::ENETDOWN), err.raw_os_error());

        let err = write_parts(&mut BrokenPipe, 0x123, DATA, FrameKind::Standard).unwrap_err();
        assert!(matches!(err, Error::Io(e) if e.raw_os_error() == Some(libc::ENETDOWN)));
    }
}
