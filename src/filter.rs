// canbus/src/filter.rs
//
// Implements receive-side CAN ID filters.
//
// This file is part of the Rust 'canbus' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! CAN ID filters.
//!
//! Filters do their real work in the kernel: once installed on a socket
//! with [`CanSocket::set_filters`](crate::CanSocket::set_filters), frames
//! that don't pass are never delivered. The socket also keeps a copy of the
//! list, and the decoder uses it to narrow the ID reported for each frame
//! that does arrive, with [`apply_filters`].

use crate::id::CAN_INV_FILTER;
use libc::canid_t;

/// The CAN filter defines which ID's can be accepted on a socket.
///
/// Each filter contains an internal id and mask. Packets are considered to
/// be matched by a filter if `received_id & mask == filter_id & mask` holds
/// true.
///
/// A socket can be given multiple filters, and each one can be inverted
/// ([ref](https://docs.kernel.org/networking/can.html#raw-protocol-sockets-with-can-filters-sock-raw))
#[repr(transparent)]
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub struct CanFilter(libc::can_filter);

impl CanFilter {
    /// Construct a new CAN filter.
    pub fn new(id: canid_t, mask: canid_t) -> Self {
        Self(libc::can_filter {
            can_id: id,
            can_mask: mask,
        })
    }

    /// Construct a new inverted CAN filter.
    ///
    /// The kernel delivers the frames that do _not_ match.
    pub fn new_inverted(id: canid_t, mask: canid_t) -> Self {
        Self::new(id | CAN_INV_FILTER, mask)
    }

    /// The filter ID, including the inversion bit if set.
    #[inline]
    pub fn id(&self) -> canid_t {
        self.0.can_id
    }

    /// The filter mask.
    #[inline]
    pub fn mask(&self) -> canid_t {
        self.0.can_mask
    }

    /// Whether this is an inverted filter.
    #[inline]
    pub fn is_inverted(&self) -> bool {
        self.0.can_id & CAN_INV_FILTER != 0
    }

    /// Whether `id` matches the filter pattern under its mask.
    ///
    /// This is the plain pattern test. The inversion bit only takes part if
    /// the mask covers it.
    #[inline]
    pub fn matches(&self, id: canid_t) -> bool {
        id & self.mask() == self.id() & self.mask()
    }
}

impl From<libc::can_filter> for CanFilter {
    fn from(filt: libc::can_filter) -> Self {
        Self(filt)
    }
}

impl From<(u32, u32)> for CanFilter {
    fn from(filt: (u32, u32)) -> Self {
        CanFilter::new(filt.0, filt.1)
    }
}

impl AsRef<libc::can_filter> for CanFilter {
    fn as_ref(&self) -> &libc::can_filter {
        &self.0
    }
}

/// Narrows a received ID by the first filter it matches.
///
/// The filters are tried in order. For the first one whose pattern matches,
/// the ID is reduced to the bits of that filter's mask. If none match, or
/// the list is empty, the ID comes back unchanged.
pub fn apply_filters(id: canid_t, filters: &[CanFilter]) -> canid_t {
    match filters.iter().find(|f| f.matches(id)) {
        Some(filter) => id & filter.mask(),
        None => id,
    }
}

/////////////////////////////////////////////////////////////////////////////
