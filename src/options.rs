use crate::error::{Error, Result};

/// Socket option identifiers.
///
/// Every option has a unique integer across all protocol levels, so no call
/// ever takes a separate "level" argument. A mistyped option cannot land on a
/// same-numbered option of another level; it simply does not exist.
///
/// | Option        | Payload     | Get            | Set         |
/// |---------------|-------------|----------------|-------------|
/// | `NonBlock`    | i32 bool    | no             | all         |
/// | `ReuseAddr`   | i32 bool    | all            | all         |
/// | `SndBuf`      | i32 bytes   | all            | all         |
/// | `RcvBuf`      | i32 bytes   | all            | all         |
/// | `SndTimeo`    | i32 ms      | all            | all         |
/// | `RcvTimeo`    | i32 ms      | all            | all         |
/// | `KeepAlive`   | i32 bool    | stream only    | stream only |
/// | `Linger`      | [`Linger`]  | stream only    | stream only |
/// | `DontLinger`  | i32 bool    | stream only    | stream only |
/// | `Error`       | i32 code    | all            | no          |
/// | `V6Only`      | i32 bool    | INET6 only     | INET6 only  |
/// | `Ttl`         | i32 1..=255 | all            | all         |
/// | `Mtu`         | i32 bytes   | connected only | no          |
/// | `MtuDiscover` | i32 mode    | all            | all         |
/// | `Broadcast`   | i32 bool    | datagram only  | datagram only |
///
/// All i32 payloads are host byte order. `Error` reads the pending
/// asynchronous error of the socket, already translated to a stable
/// [`Error`](crate::Error) code (or 0 when none is pending); it is how the
/// outcome of a non-blocking connect is retrieved after polling for
/// writability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, num_derive::FromPrimitive, num_derive::ToPrimitive)]
#[repr(i32)]
pub enum SockOpt {
    /// Enable/disable non-blocking mode.
    NonBlock = 1,
    /// Controls how bind handles local address/port conflicts.
    ReuseAddr = 2,
    /// Socket buffer size for output.
    SndBuf = 3,
    /// Socket buffer size for input.
    RcvBuf = 4,
    /// Send timeout in milliseconds. Zero means no timeout.
    SndTimeo = 5,
    /// Receive timeout in milliseconds. Zero means no timeout.
    RcvTimeo = 6,
    /// Enable/disable keepalive probing on stream sockets.
    KeepAlive = 7,
    /// Close drain policy, see [`Linger`].
    Linger = 8,
    /// Boolean inverse view of `Linger.enabled`; never alters the stored
    /// seconds.
    DontLinger = 9,
    /// Pending asynchronous error, read-only.
    Error = 10,
    /// Restrict an INET6 socket to IPv6 traffic only (disable dual-stack).
    V6Only = 100,
    /// Unicast time-to-live (IPv4) or hop limit (IPv6).
    Ttl = 101,
    /// Current known path MTU, read-only and only valid once connected.
    Mtu = 102,
    /// Path MTU discovery policy, see [`PmtudMode`].
    MtuDiscover = 103,
    /// Permit datagram broadcast on a UDP socket.
    Broadcast = 104,
}

/// Payload of the [`SockOpt::Linger`] option: whether close waits for unsent
/// data to drain and for how many seconds.
///
/// The wire layout in the option buffer is two host-order `u16` values,
/// `enabled` then `seconds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Linger {
    pub enabled: bool,
    pub seconds: u16,
}

impl Linger {
    /// Payload size in bytes.
    pub const SIZE: usize = 4;

    /// Encodes the option-buffer layout.
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        let enabled = (self.enabled as u16).to_ne_bytes();
        let seconds = self.seconds.to_ne_bytes();
        [enabled[0], enabled[1], seconds[0], seconds[1]]
    }

    /// Decodes the option-buffer layout; the length must match exactly.
    pub fn from_bytes(raw: &[u8]) -> Result<Linger> {
        if raw.len() != Self::SIZE {
            return Err(Error::Invalid);
        }
        Ok(Linger {
            enabled: u16::from_ne_bytes([raw[0], raw[1]]) != 0,
            seconds: u16::from_ne_bytes([raw[2], raw[3]]),
        })
    }
}

/// Path MTU discovery policy, the payload of [`SockOpt::MtuDiscover`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, num_derive::FromPrimitive, num_derive::ToPrimitive)]
#[repr(i32)]
pub enum PmtudMode {
    /// Use per-route or system defaults.
    Unspec = 0,
    /// Always discover: DF set, sends larger than the path MTU fail.
    On = 1,
    /// Never discover: DF clear, fragment above the interface MTU.
    Off = 2,
    /// Probe: DF set but datagrams larger than the path MTU estimate are
    /// still sent unfragmented.
    Probe = 3,
}

/// Decodes the 4-byte host-order i32 payload used by most options. The
/// length must match exactly; oversized payloads are rejected on set.
pub(crate) fn i32_from_payload(raw: &[u8]) -> Result<i32> {
    if raw.len() != 4 {
        return Err(Error::Invalid);
    }
    Ok(i32::from_ne_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

/// Writes a host-order i32 payload. Larger buffers are accepted; the
/// returned count is the bytes actually written.
pub(crate) fn i32_to_payload(out: &mut [u8], value: i32) -> Result<usize> {
    if out.len() < 4 {
        return Err(Error::Invalid);
    }
    out[..4].copy_from_slice(&value.to_ne_bytes());
    Ok(4)
}
