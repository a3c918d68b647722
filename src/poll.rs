//! Readiness polling over the host's `poll` primitive.

use crate::error::{Error, Result};
use crate::socket::Socket;
use crate::sys;

bitflags::bitflags! {
    /// Readiness event mask. The bit semantics are those of the host's
    /// readiness primitive; the named flags cover the portable set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PollEvents: i16 {
        const IN = sys::POLLIN;
        const PRI = sys::POLLPRI;
        const OUT = sys::POLLOUT;
        const ERR = sys::POLLERR;
        const HUP = sys::POLLHUP;
        const NVAL = sys::POLLNVAL;
    }
}

/// One polled socket: the descriptor, the requested events and the status
/// reported by the last [`poll`] call.
#[derive(Debug, Clone)]
pub struct PollFd {
    handle: sys::RawSocket,
    events: PollEvents,
    revents: PollEvents,
}

impl PollFd {
    /// Registers interest in `events` on an Open socket.
    pub fn new(socket: &Socket, events: PollEvents) -> Result<PollFd> {
        Ok(PollFd {
            handle: socket.raw_checked()?,
            events,
            revents: PollEvents::empty(),
        })
    }

    /// The status reported by the last [`poll`] call. `ERR`, `HUP` and
    /// `NVAL` may be set even when they were not requested.
    pub fn status(&self) -> PollEvents {
        self.revents
    }

    pub(crate) fn raw(&self) -> sys::RawSocket {
        self.handle
    }

    pub(crate) fn events_bits(&self) -> i16 {
        self.events.bits()
    }

    pub(crate) fn set_status_bits(&mut self, bits: i16) {
        self.revents = PollEvents::from_bits_retain(bits);
    }
}

/// Waits until one of the targets is ready or the timeout elapses.
///
/// `timeout` is in milliseconds; zero polls without blocking and a negative
/// value waits indefinitely. Returns the number of targets with a non-empty
/// status. A timeout is not an error; it returns zero.
pub fn poll(targets: &mut [PollFd], timeout: i32) -> Result<usize> {
    if targets.is_empty() {
        return Err(Error::Invalid);
    }
    sys::poll(targets, timeout)
}
