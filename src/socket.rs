// canbus/src/socket.rs
//
// Implements raw SocketCAN sockets for classic CAN 2.0 frames on Linux.
//
// This file is part of the Rust 'canbus' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Raw CAN sockets.
//!
//! The socket is a thin owner of the OS socket descriptor. Reading and
//! writing go through the [`codec`](crate::codec); nothing is retried, and
//! there are no timeouts other than the ones set on the socket itself.

use crate::{
    codec,
    filter::CanFilter,
    id::{FrameKind, CAN_ERR_MASK},
    CanAddr, CanFrame, Result,
};
use libc::{socklen_t, AF_CAN, EINPROGRESS};
use log::debug;
use std::{
    fmt,
    io::{self, Read, Write},
    mem::{size_of, size_of_val},
    os::{
        raw::{c_int, c_void},
        unix::io::{AsFd, AsRawFd, BorrowedFd, IntoRawFd, OwnedFd, RawFd},
    },
    ptr,
    time::Duration,
};

pub use libc::{
    CAN_RAW, CAN_RAW_ERR_FILTER, CAN_RAW_FILTER, CAN_RAW_JOIN_FILTERS, CAN_RAW_LOOPBACK,
    CAN_RAW_RECV_OWN_MSGS, SOL_CAN_BASE, SOL_CAN_RAW,
};

/// The name reported for a socket that isn't bound to a named interface.
pub const UNBOUND_NAME: &str = "N/A";

/// Check an error return value for timeouts.
///
/// Due to the fact that timeouts are reported as errors, calling `read_frame`
/// on a socket with a timeout that does not receive a frame in time will
/// result in an error being returned. This trait adds a `should_retry` method
/// to `Error` and `Result` to check for this condition.
///
/// The library never retries by itself; this is for the caller to decide.
pub trait ShouldRetry {
    /// Check for timeout
    ///
    /// If `true`, the error is probably due to a timeout.
    fn should_retry(&self) -> bool;
}

impl ShouldRetry for io::Error {
    fn should_retry(&self) -> bool {
        match self.kind() {
            // EAGAIN, EINPROGRESS and EWOULDBLOCK are the three possible codes
            // returned when a timeout occurs. the stdlib already maps EAGAIN
            // and EWOULDBLOCK os WouldBlock
            io::ErrorKind::WouldBlock => true,
            // however, EINPROGRESS is also valid
            io::ErrorKind::Other => {
                matches!(self.raw_os_error(), Some(errno) if errno == EINPROGRESS)
            }
            _ => false,
        }
    }
}

impl<E: fmt::Debug> ShouldRetry for io::Result<E> {
    fn should_retry(&self) -> bool {
        match *self {
            Err(ref e) => e.should_retry(),
            _ => false,
        }
    }
}

// ===== Private local helper functions =====

/// Creates an unbound raw CAN socket.
fn raw_socket() -> io::Result<socket2::Socket> {
    let af_can = socket2::Domain::from(AF_CAN);
    let can_raw = socket2::Protocol::from(CAN_RAW);

    socket2::Socket::new_raw(af_can, socket2::Type::RAW, Some(can_raw))
}

// ===== Common 'Socket' trait =====

/// Common trait for SocketCAN sockets.
///
/// Note that a socket it created by opening it, and then closed by
/// dropping it.
pub trait Socket: AsRawFd {
    /// Open a named CAN device.
    ///
    /// Usually the more common case, opens a socket can device by name, such
    /// as "can0", "vcan0", or "socan0".
    fn open(ifname: &str) -> io::Result<Self>
    where
        Self: Sized;

    /// Open CAN device by interface number.
    ///
    /// Opens a CAN device by kernel interface number.
    fn open_iface(ifindex: u32) -> io::Result<Self>
    where
        Self: Sized,
    {
        let addr = CanAddr::new(ifindex);
        Self::open_addr(&addr)
    }

    /// Open a CAN socket by address.
    fn open_addr(addr: &CanAddr) -> io::Result<Self>
    where
        Self: Sized;

    /// Gets a shared reference to the underlying socket object
    fn as_raw_socket(&self) -> &socket2::Socket;

    /// The filters the socket was configured with, in order.
    fn filters(&self) -> &[CanFilter];

    /// Determines if the socket is currently in nonblocking mode.
    fn nonblocking(&self) -> io::Result<bool> {
        self.as_raw_socket().nonblocking()
    }

    /// Change socket to non-blocking mode or back to blocking mode.
    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        self.as_raw_socket().set_nonblocking(nonblocking)
    }

    /// Gets the read timout on the socket, if any.
    fn read_timeout(&self) -> io::Result<Option<Duration>> {
        self.as_raw_socket().read_timeout()
    }

    /// Sets the read timeout on the socket
    ///
    /// For convenience, the result value can be checked using
    /// `ShouldRetry::should_retry` when a timeout is set.
    ///
    /// If the duration is set to `None` then read calls will block
    /// indefinitely.
    fn set_read_timeout<D>(&self, duration: D) -> io::Result<()>
    where
        D: Into<Option<Duration>>,
    {
        self.as_raw_socket().set_read_timeout(duration.into())
    }

    /// Gets the write timeout on the socket, if any.
    fn write_timeout(&self) -> io::Result<Option<Duration>> {
        self.as_raw_socket().write_timeout()
    }

    /// Sets the write timeout on the socket
    ///
    /// If the duration is set to `None` then write calls will block
    /// indefinitely.
    fn set_write_timeout<D>(&self, duration: D) -> io::Result<()>
    where
        D: Into<Option<Duration>>,
    {
        self.as_raw_socket().set_write_timeout(duration.into())
    }

    /// Blocking read a single can frame.
    ///
    /// The reported ID is narrowed by the first matching filter, if any.
    fn read_frame(&self) -> io::Result<CanFrame> {
        let mut sock = self.as_raw_socket();
        codec::read_frame(&mut sock, self.filters())
    }

    /// Write a single can frame.
    ///
    /// Returns the number of bytes written. Note that this function can
    /// fail with an `EAGAIN` error or similar, which is returned as is.
    fn write_frame(&self, frame: &CanFrame) -> io::Result<usize> {
        let mut sock = self.as_raw_socket();
        codec::write_frame(&mut sock, frame)
    }
}

/// Traits for setting CAN socket options.
///
/// These are blocking calls.
pub trait SocketOptions: AsRawFd {
    /// Sets an option on the socket.
    ///
    /// The libc `setsockopt` function is set to set various options on a socket.
    /// `set_socket_option` offers a somewhat type-safe wrapper that does not
    /// require messing around with `*const c_void`s.
    ///
    /// A proper `std::io::Error` will be returned on failure.
    ///
    /// Note that the `val` parameter must be specified correctly; if an option
    /// expects an integer, it is advisable to pass in a `c_int`, not the default
    /// of `i32`.
    fn set_socket_option<T>(&self, level: c_int, name: c_int, val: &T) -> io::Result<()> {
        let ret = unsafe {
            libc::setsockopt(
                self.as_raw_fd(),
                level,
                name,
                val as *const _ as *const c_void,
                size_of::<T>() as socklen_t,
            )
        };

        match ret {
            0 => Ok(()),
            _ => Err(io::Error::last_os_error()),
        }
    }

    /// Sets a collection of multiple socke options with one call.
    fn set_socket_option_mult<T>(&self, level: c_int, name: c_int, values: &[T]) -> io::Result<()> {
        let ret = if values.is_empty() {
            // can't pass in a ptr to a 0-len slice, pass a null ptr instead
            unsafe { libc::setsockopt(self.as_raw_fd(), level, name, ptr::null(), 0) }
        } else {
            unsafe {
                libc::setsockopt(
                    self.as_raw_fd(),
                    level,
                    name,
                    values.as_ptr().cast(),
                    size_of_val(values) as socklen_t,
                )
            }
        };

        match ret {
            0 => Ok(()),
            _ => Err(io::Error::last_os_error()),
        }
    }

    /// Sets the error mask on the socket.
    ///
    /// By default (`ERR_MASK_NONE`) no error conditions are reported as
    /// special error frames by the socket. Enabling error conditions by
    /// setting `ERR_MASK_ALL` or another non-empty error mask causes the
    /// socket to receive notification about the specified conditions.
    fn set_error_filter(&self, mask: u32) -> io::Result<()> {
        self.set_socket_option(SOL_CAN_RAW, CAN_RAW_ERR_FILTER, &mask)
    }

    /// Sets the error mask on the socket to reject all errors.
    #[inline(always)]
    fn set_error_filter_drop_all(&self) -> io::Result<()> {
        self.set_error_filter(0)
    }

    /// Sets the error mask on the socket to accept all errors.
    #[inline(always)]
    fn set_error_filter_accept_all(&self) -> io::Result<()> {
        self.set_error_filter(CAN_ERR_MASK)
    }

    /// Enable or disable loopback.
    ///
    /// By default, loopback is enabled, causing other applications that open
    /// the same CAN bus to see frames emitted by different applications on
    /// the same system.
    fn set_loopback(&self, enabled: bool) -> io::Result<()> {
        let loopback = c_int::from(enabled);
        self.set_socket_option(SOL_CAN_RAW, CAN_RAW_LOOPBACK, &loopback)
    }

    /// Enable or disable receiving of own frames.
    ///
    /// When loopback is enabled, this settings controls if CAN frames sent
    /// are received back immediately by sender. Default is off.
    fn set_recv_own_msgs(&self, enabled: bool) -> io::Result<()> {
        let recv_own_msgs = c_int::from(enabled);
        self.set_socket_option(SOL_CAN_RAW, CAN_RAW_RECV_OWN_MSGS, &recv_own_msgs)
    }

    /// Enable or disable join filters.
    ///
    /// By default a frame is accepted if it matches any of the filters set
    /// with `set_filters`. If join filters is enabled, a frame has to match
    /// _all_ filters to be accepted.
    fn set_join_filters(&self, enabled: bool) -> io::Result<()> {
        let join_filters = c_int::from(enabled);
        self.set_socket_option(SOL_CAN_RAW, CAN_RAW_JOIN_FILTERS, &join_filters)
    }
}

// ===== CanSocket =====

/// A socket for classic CAN 2.0 devices.
///
/// This provides an interface to read and write classic CAN 2.0 frames to
/// the bus, with up to 8 bytes of data per frame. It wraps a Linux socket
/// descriptor to a Raw SocketCAN socket.
///
/// The socket is automatically closed when the object is dropped. Use
/// [`close`](CanSocket::close) to close it and see any error from the OS.
///
/// Reads and writes take `&self` and can run from different threads at
/// once. Concurrent writes are not serialized against each other.
#[derive(Debug)]
pub struct CanSocket {
    sock: socket2::Socket,
    iface: Option<String>,
    filters: Vec<CanFilter>,
}

impl CanSocket {
    /// Creates a raw CAN socket, not yet bound to an interface.
    pub fn new() -> io::Result<Self> {
        Ok(Self::from(raw_socket()?))
    }

    /// Binds the socket to the named interface, like "can0" or "vcan0".
    ///
    /// Fails if there is no such interface.
    pub fn bind(&mut self, ifname: &str) -> io::Result<()> {
        let addr = CanAddr::from_iface(ifname)?;
        self.sock.bind(&addr.into_sock_addr())?;
        debug!("bound CAN socket to {} (index {})", ifname, addr.ifindex());
        self.iface = Some(ifname.into());
        Ok(())
    }

    /// The name of the interface the socket is bound to.
    ///
    /// This is "N/A" if the socket is unbound, or was bound by index.
    pub fn name(&self) -> &str {
        self.iface.as_deref().unwrap_or(UNBOUND_NAME)
    }

    /// Sets CAN ID filters on the socket.
    ///
    /// CAN packages received by SocketCAN are matched against these filters,
    /// only matching packets are returned by the interface. The list is also
    /// kept on the socket, and the ID of each received frame is narrowed by
    /// the first filter it matches (see
    /// [`apply_filters`](crate::filter::apply_filters)).
    ///
    /// See `CanFilter` for details on how filtering works. By default, all
    /// single filter matching all incoming frames is installed.
    pub fn set_filters<F>(&mut self, filters: &[F]) -> io::Result<()>
    where
        F: Into<CanFilter> + Copy,
    {
        let filters: Vec<CanFilter> = filters.iter().map(|f| (*f).into()).collect();
        self.set_socket_option_mult(SOL_CAN_RAW, CAN_RAW_FILTER, &filters)?;
        debug!("installed {} CAN filter(s) on {}", filters.len(), self.name());
        self.filters = filters;
        Ok(())
    }

    /// Disable reception of CAN frames.
    ///
    /// Sets a completely empty filter; disabling all CAN frame reception.
    pub fn set_filter_drop_all(&mut self) -> io::Result<()> {
        let filters: &[CanFilter] = &[];
        self.set_filters(filters)
    }

    /// Accept all frames, disabling any kind of filtering.
    ///
    /// Replace the current filter with one containing a single rule that
    /// acceps all CAN frames.
    pub fn set_filter_accept_all(&mut self) -> io::Result<()> {
        self.set_filters(&[(0, 0)])
    }

    /// Sends a standard data frame built from `id` and `data`.
    ///
    /// The ID is masked to 11 bits. Fails without writing if `data` holds
    /// more than 8 bytes.
    pub fn send(&self, id: u32, data: &[u8]) -> Result<usize> {
        let mut sock = &self.sock;
        codec::write_parts(&mut sock, id, data, FrameKind::Standard)
    }

    /// Closes the socket, reporting any error from the OS.
    pub fn close(self) -> io::Result<()> {
        let fd = self.sock.into_raw_fd();
        nix::unistd::close(fd)?;
        Ok(())
    }
}

impl Socket for CanSocket {
    /// Opens the socket and binds it to the named interface.
    fn open(ifname: &str) -> io::Result<Self> {
        let mut sock = Self::new()?;
        sock.bind(ifname)?;
        Ok(sock)
    }

    /// Opens the socket by interface index.
    fn open_addr(addr: &CanAddr) -> io::Result<Self> {
        let sock = raw_socket()?;
        sock.bind(&addr.into_sock_addr())?;
        debug!("bound CAN socket to interface index {}", addr.ifindex());
        Ok(Self::from(sock))
    }

    /// Gets a shared reference to the underlying socket object
    fn as_raw_socket(&self) -> &socket2::Socket {
        &self.sock
    }

    fn filters(&self) -> &[CanFilter] {
        &self.filters
    }
}

impl SocketOptions for CanSocket {}

impl From<socket2::Socket> for CanSocket {
    fn from(sock: socket2::Socket) -> Self {
        Self {
            sock,
            iface: None,
            filters: Vec::new(),
        }
    }
}

impl AsRawFd for CanSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.sock.as_raw_fd()
    }
}

impl From<OwnedFd> for CanSocket {
    fn from(fd: OwnedFd) -> Self {
        Self::from(socket2::Socket::from(fd))
    }
}

impl IntoRawFd for CanSocket {
    fn into_raw_fd(self) -> RawFd {
        self.sock.into_raw_fd()
    }
}

impl AsFd for CanSocket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.sock.as_fd()
    }
}

impl Read for CanSocket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.sock.read(buf)
    }
}

impl Write for CanSocket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sock.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sock.flush()
    }
}

/////////////////////////////////////////////////////////////////////////////
