use std::thread;
use std::time::Duration;

use crate::addr::{Endpoint, Family};
use crate::error::{Error, Result};
use crate::options::{self, Linger, PmtudMode, SockOpt};
use crate::sys::{self, ShutdownHow, SockType};

/// Transport protocol of a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, num_derive::FromPrimitive, num_derive::ToPrimitive)]
#[repr(i32)]
pub enum Protocol {
    Udp = 4,
    Tcp = 8,
}

bitflags::bitflags! {
    /// Directions to shut down on a connected socket.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Shutdown: u32 {
        const RECV = 1 << 0;
        const SEND = 1 << 1;
        const BOTH = Self::RECV.bits() | Self::SEND.bits();
    }
}

/// How many times a close that keeps reporting `Again` (a pending linger
/// drain on a non-blocking socket) is retried before giving up.
const LINGER_CLOSE_RETRIES: u32 = 120;

/// A UDP or TCP socket.
///
/// A freshly created handle is in the Closed state: no descriptor, family
/// unspecified. [`Socket::open`] acquires a descriptor, a successful
/// [`Socket::close`] releases it and returns the handle to Closed. Every
/// other operation on a handle that is not Open fails with `Invalid`.
///
/// Distinct handles may be used freely from distinct threads. Operations on
/// one handle are not synchronized by the library; whatever concurrent use
/// the kernel permits on one descriptor (independent send/recv, typically)
/// is what the caller gets.
#[derive(Debug)]
pub struct Socket {
    family: Family,
    proto: Option<Protocol>,
    handle: sys::RawSocket,
}

impl Socket {
    /// Creates a handle in the Closed state.
    pub fn new() -> Socket {
        Socket {
            family: Family::Unspec,
            proto: None,
            handle: sys::CLOSED_SOCKET,
        }
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn protocol(&self) -> Option<Protocol> {
        self.proto
    }

    pub fn is_open(&self) -> bool {
        self.family != Family::Unspec && sys::is_valid(self.handle)
    }

    fn ensure_open(&self) -> Result<sys::RawSocket> {
        if self.family == Family::Unspec || !sys::is_valid(self.handle) {
            return Err(Error::Invalid);
        }
        Ok(self.handle)
    }

    pub(crate) fn raw_checked(&self) -> Result<sys::RawSocket> {
        self.ensure_open()
    }

    /// Acquires an OS socket. The handle must be Closed; the family must be
    /// INET or INET6.
    ///
    /// UDP sockets are opened with checksumming forced on, and on targets
    /// where an ICMP port-unreachable would poison later receives the
    /// condition is disabled up front.
    pub fn open(&mut self, family: Family, proto: Protocol) -> Result<()> {
        if self.family != Family::Unspec || self.handle != sys::CLOSED_SOCKET {
            return Err(Error::Invalid);
        }
        match family {
            Family::Inet => {}
            #[cfg(feature = "ipv6")]
            Family::Inet6 => {}
            _ => return Err(Error::AfNoSupport),
        }

        let handle = sys::open(family, proto)?;
        self.family = family;
        self.proto = Some(proto);
        self.handle = handle;
        log::trace!("opened {:?}/{:?} socket {:?}", family, proto, handle);
        Ok(())
    }

    /// Releases the descriptor and returns the handle to Closed.
    ///
    /// `Again` means a linger drain is pending on a non-blocking socket; the
    /// descriptor is switched to blocking and the close retried with coarse
    /// sleeps until it completes or the retry budget runs out. Any other
    /// error is final: the descriptor must be treated as gone, because the
    /// kernel may have released it already and a retry could close an
    /// unrelated descriptor reused by another thread.
    pub fn close(&mut self) -> Result<()> {
        let handle = self.ensure_open()?;
        match sys::close(handle) {
            Ok(()) => {
                log::trace!("closed socket {:?}", handle);
                self.reset();
                Ok(())
            }
            Err(Error::Again) => {
                let _ = sys::set_nonblocking(handle, false);
                for _ in 0..LINGER_CLOSE_RETRIES {
                    thread::sleep(Duration::from_secs(1));
                    match sys::close(handle) {
                        Ok(()) => {
                            log::trace!("closed socket {:?} after linger drain", handle);
                            self.reset();
                            return Ok(());
                        }
                        Err(Error::Again) => continue,
                        Err(err) => {
                            self.reset();
                            return Err(err);
                        }
                    }
                }
                Err(Error::Again)
            }
            Err(err) => {
                // The kernel may release the descriptor early in a failed
                // close; it must never be touched again, or a reused
                // descriptor from another thread could be closed instead.
                self.reset();
                Err(err)
            }
        }
    }

    fn reset(&mut self) {
        self.family = Family::Unspec;
        self.proto = None;
        self.handle = sys::CLOSED_SOCKET;
    }

    /// Binds the socket to a local endpoint. The endpoint family must match
    /// the socket family. Binding twice fails with `Invalid`.
    pub fn bind(&mut self, local: &Endpoint) -> Result<()> {
        let handle = self.ensure_open()?;
        if local.addr.family() != self.family {
            return Err(Error::AfNoSupport);
        }
        sys::bind(handle, local)?;
        log::trace!("socket {:?} bound to {}", handle, local);
        Ok(())
    }

    /// The local endpoint assigned by bind or by an implicit bind on
    /// connect. A socket that was never bound reports the zero port, which
    /// is not a valid bound endpoint, so `Invalid` is returned for it.
    pub fn local_endpoint(&self) -> Result<Endpoint> {
        let handle = self.ensure_open()?;
        let endpoint = sys::local_endpoint(handle)?;
        if endpoint.port == 0 {
            return Err(Error::Invalid);
        }
        Ok(endpoint)
    }

    /// The peer endpoint set by a successful connect. Fails with `NotConn`
    /// on an unconnected socket.
    pub fn remote_endpoint(&self) -> Result<Endpoint> {
        let handle = self.ensure_open()?;
        sys::remote_endpoint(handle)
    }

    /// Connects to a remote endpoint.
    ///
    /// On UDP this sets the default peer for send/recv; POSIX systems also
    /// filter received datagrams by source, Windows only sets the defaults.
    /// On TCP it starts the handshake; on a non-blocking socket `Again`
    /// means in progress and writability signals completion, with the
    /// outcome readable through the `Error` option.
    pub fn connect(&mut self, remote: &Endpoint) -> Result<()> {
        let handle = self.ensure_open()?;
        if remote.addr.family() != self.family {
            return Err(Error::AfNoSupport);
        }
        sys::connect(handle, remote)
    }

    /// Starts listening for connections on a bound TCP socket. The backlog
    /// is a hint the kernel may clamp; -1 selects the platform maximum.
    /// Non-stream protocols fail with `ProtoNoSupport`.
    pub fn listen(&mut self, backlog: i32) -> Result<()> {
        let handle = self.ensure_open()?;
        let backlog = match backlog {
            -1 => sys::max_backlog(),
            b if b < 0 => return Err(Error::Invalid),
            b => b,
        };
        sys::listen(handle, backlog)
    }

    /// Accepts a pending connection into `client`, which must be a Closed
    /// handle, and returns the peer endpoint.
    ///
    /// If the kernel hands back a peer address that cannot be decoded the
    /// accepted socket is kept (the client handle is Open and usable) and
    /// `AddrNotAvail` reports the missing endpoint.
    pub fn accept(&mut self, client: &mut Socket) -> Result<Endpoint> {
        let handle = self.ensure_open()?;
        if client.family != Family::Unspec || client.handle != sys::CLOSED_SOCKET {
            return Err(Error::Invalid);
        }
        let (accepted, remote) = sys::accept(handle)?;
        client.family = self.family;
        client.proto = self.proto;
        client.handle = accepted;
        log::trace!("socket {:?} accepted {:?} from {:?}", handle, accepted, remote);
        remote.ok_or(Error::AddrNotAvail)
    }

    /// Sends on a connected socket, returning the bytes queued. Datagrams go
    /// out whole or not at all; streams may transfer partially.
    pub fn send(&mut self, buf: &[u8]) -> Result<usize> {
        let handle = self.ensure_open()?;
        if buf.len() > i32::MAX as usize {
            return Err(Error::Invalid);
        }
        sys::send(handle, buf)
    }

    /// Sends a datagram to an explicit destination.
    pub fn send_to(&mut self, buf: &[u8], remote: &Endpoint) -> Result<usize> {
        let handle = self.ensure_open()?;
        if buf.len() > i32::MAX as usize {
            return Err(Error::Invalid);
        }
        if remote.addr.family() != self.family {
            return Err(Error::AfNoSupport);
        }
        sys::send_to(handle, buf, remote)
    }

    /// Receives from a connected socket. A datagram that does not fit the
    /// buffer is discarded and reported as `MsgSize`.
    pub fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        let handle = self.ensure_open()?;
        if buf.is_empty() || buf.len() > i32::MAX as usize {
            return Err(Error::Invalid);
        }
        sys::recv(handle, buf)
    }

    /// Receives a single datagram and its source endpoint. Truncation is
    /// reported as `MsgSize`; a source address the kernel could not produce
    /// in valid form is reported as `AddrNotAvail`.
    pub fn recv_from(&mut self, buf: &mut [u8]) -> Result<(usize, Endpoint)> {
        let handle = self.ensure_open()?;
        if buf.is_empty() || buf.len() > i32::MAX as usize {
            return Err(Error::Invalid);
        }
        sys::recv_from(handle, buf)
    }

    /// Shuts down the given directions of a connected socket. The mask must
    /// name at least one direction.
    pub fn shutdown(&mut self, how: Shutdown) -> Result<()> {
        let handle = self.ensure_open()?;
        let how = if how == Shutdown::BOTH {
            ShutdownHow::Both
        } else if how == Shutdown::RECV {
            ShutdownHow::Recv
        } else if how == Shutdown::SEND {
            ShutdownHow::Send
        } else {
            return Err(Error::Invalid);
        };
        sys::shutdown(handle, how)
    }

    fn require_type(&self, handle: sys::RawSocket, expected: SockType) -> Result<()> {
        if sys::socket_type(handle)? != expected {
            return Err(Error::ProtoNoSupport);
        }
        Ok(())
    }

    /// Sets a socket option. The payload must be exactly the option's size;
    /// values out of range fail with `Invalid` before anything reaches the
    /// OS.
    pub fn setopt(&mut self, opt: SockOpt, value: &[u8]) -> Result<()> {
        let handle = self.ensure_open()?;
        match opt {
            SockOpt::NonBlock => {
                let v = options::i32_from_payload(value)?;
                sys::set_nonblocking(handle, v != 0)
            }
            SockOpt::ReuseAddr => {
                let v = options::i32_from_payload(value)?;
                sys::set_reuse(handle, v != 0)
            }
            SockOpt::SndBuf | SockOpt::RcvBuf => {
                let v = options::i32_from_payload(value)?;
                sys::set_buffer(handle, opt, v)
            }
            SockOpt::SndTimeo | SockOpt::RcvTimeo => {
                let v = options::i32_from_payload(value)?;
                sys::set_timeout(handle, opt, v)
            }
            SockOpt::KeepAlive => {
                let v = options::i32_from_payload(value)?;
                self.require_type(handle, SockType::Stream)?;
                sys::set_keepalive(handle, v != 0)
            }
            SockOpt::Linger => {
                let linger = Linger::from_bytes(value)?;
                self.require_type(handle, SockType::Stream)?;
                sys::set_linger(handle, linger)
            }
            SockOpt::DontLinger => {
                let v = options::i32_from_payload(value)?;
                self.require_type(handle, SockType::Stream)?;
                // Toggle only the enabled flag; the drain timeout that was
                // configured before stays untouched.
                let mut linger = sys::get_linger(handle)?;
                linger.enabled = v == 0;
                sys::set_linger(handle, linger)
            }
            SockOpt::Error => Err(Error::Invalid),
            SockOpt::V6Only => {
                let v = options::i32_from_payload(value)?;
                if self.family != Family::Inet6 {
                    return Err(Error::Invalid);
                }
                sys::set_v6only(handle, v != 0)
            }
            SockOpt::Ttl => {
                let v = options::i32_from_payload(value)?;
                if !(1..=255).contains(&v) {
                    return Err(Error::Invalid);
                }
                sys::set_ttl(handle, self.family, v)
            }
            SockOpt::Mtu => Err(Error::Invalid),
            SockOpt::MtuDiscover => {
                let v = options::i32_from_payload(value)?;
                let mode: PmtudMode =
                    num_traits::FromPrimitive::from_i32(v).ok_or(Error::Invalid)?;
                sys::set_mtu_discover(handle, self.family, mode)
            }
            SockOpt::Broadcast => {
                let v = options::i32_from_payload(value)?;
                self.require_type(handle, SockType::Datagram)?;
                sys::set_broadcast(handle, v != 0)
            }
        }
    }

    /// Reads a socket option into `out`, returning the bytes written. The
    /// buffer may be larger than the payload.
    pub fn getopt(&self, opt: SockOpt, out: &mut [u8]) -> Result<usize> {
        let handle = self.ensure_open()?;
        match opt {
            SockOpt::NonBlock => Err(Error::Invalid),
            SockOpt::ReuseAddr => {
                options::i32_to_payload(out, sys::get_reuse(handle)? as i32)
            }
            SockOpt::SndBuf | SockOpt::RcvBuf => {
                options::i32_to_payload(out, sys::get_buffer(handle, opt)?)
            }
            SockOpt::SndTimeo | SockOpt::RcvTimeo => {
                options::i32_to_payload(out, sys::get_timeout(handle, opt)?)
            }
            SockOpt::KeepAlive => {
                self.require_type(handle, SockType::Stream)?;
                options::i32_to_payload(out, sys::get_keepalive(handle)? as i32)
            }
            SockOpt::Linger => {
                self.require_type(handle, SockType::Stream)?;
                let linger = sys::get_linger(handle)?;
                if out.len() < Linger::SIZE {
                    return Err(Error::Invalid);
                }
                out[..Linger::SIZE].copy_from_slice(&linger.to_bytes());
                Ok(Linger::SIZE)
            }
            SockOpt::DontLinger => {
                self.require_type(handle, SockType::Stream)?;
                let linger = sys::get_linger(handle)?;
                options::i32_to_payload(out, (!linger.enabled) as i32)
            }
            SockOpt::Error => options::i32_to_payload(out, sys::get_pending_error(handle)?),
            SockOpt::V6Only => {
                if self.family != Family::Inet6 {
                    return Err(Error::Invalid);
                }
                options::i32_to_payload(out, sys::get_v6only(handle)? as i32)
            }
            SockOpt::Ttl => options::i32_to_payload(out, sys::get_ttl(handle, self.family)?),
            SockOpt::Mtu => options::i32_to_payload(out, sys::get_mtu(handle, self.family)?),
            SockOpt::MtuDiscover => {
                let mode = sys::get_mtu_discover(handle, self.family)?;
                options::i32_to_payload(out, mode as i32)
            }
            SockOpt::Broadcast => {
                self.require_type(handle, SockType::Datagram)?;
                options::i32_to_payload(out, sys::get_broadcast(handle)? as i32)
            }
        }
    }

    /// Convenience for the common i32-payload options.
    pub fn setopt_i32(&mut self, opt: SockOpt, value: i32) -> Result<()> {
        self.setopt(opt, &value.to_ne_bytes())
    }

    /// Convenience for the common i32-payload options.
    pub fn getopt_i32(&self, opt: SockOpt) -> Result<i32> {
        let mut out = [0u8; 4];
        self.getopt(opt, &mut out)?;
        Ok(i32::from_ne_bytes(out))
    }
}

impl Default for Socket {
    fn default() -> Socket {
        Socket::new()
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        // Best effort; a close error here is final anyway and must not
        // trigger a retry against a possibly reused descriptor.
        if self.is_open() {
            let _ = sys::close(self.handle);
        }
    }
}
