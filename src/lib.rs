//! Portable low-level UDP and TCP sockets.
//!
//! One address/endpoint model, one socket handle and one error numbering
//! across BSD sockets and Winsock, with bit-exact control over the
//! wire-relevant knobs: port, scope id, TTL, path-MTU discovery mode,
//! linger.
//!
//! The surface follows the underlying socket model closely instead of
//! inventing one: open, configure through uniquely-numbered options, bind,
//! then connect/listen/accept and send/recv, with readiness polling for
//! non-blocking sockets. Platform quirks (reuse-address flag zoos, Linux
//! buffer-size doubling, Winsock's UDP reset peculiarities, divergent error
//! numbering) are normalized behind the portable contract rather than
//! exposed.
//!
//! Name resolution, TLS and event-loop scheduling are deliberately out of
//! scope.
//!
//! The `ipv6` cargo feature (default on) gates INET6 socket support; the
//! pure address types and the codec always handle IPv6 values.

pub mod addr;
pub mod bind;
pub mod error;
pub mod options;
pub mod poll;
pub mod socket;
mod sys;

pub use addr::{Addr, Endpoint, Family, ADDR_STRLEN, ENDPOINT_STRLEN};
pub use error::{Error, Result};
pub use options::{Linger, PmtudMode, SockOpt};
pub use poll::{poll, PollEvents, PollFd};
pub use socket::{Protocol, Shutdown, Socket};
