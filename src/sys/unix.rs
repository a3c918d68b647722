//! POSIX backend over BSD sockets.

use std::io;
use std::mem;

use libc::{c_int, c_void, socklen_t};

use super::{ShutdownHow, SockType};
use crate::addr::{Addr, Endpoint, Family};
use crate::error::{Error, Result};
use crate::options::{Linger, PmtudMode, SockOpt};
use crate::socket::Protocol;

pub(crate) type RawSocket = c_int;

/// A zeroed handle marks the closed state. Descriptors 0, 1 and 2 belong to
/// stdio, so a real socket descriptor always starts at 3.
pub(crate) const CLOSED_SOCKET: RawSocket = 0;

pub(crate) fn is_valid(handle: RawSocket) -> bool {
    handle > 2
}

pub(crate) const POLLIN: i16 = libc::POLLIN;
pub(crate) const POLLPRI: i16 = libc::POLLPRI;
pub(crate) const POLLOUT: i16 = libc::POLLOUT;
pub(crate) const POLLERR: i16 = libc::POLLERR;
pub(crate) const POLLHUP: i16 = libc::POLLHUP;
pub(crate) const POLLNVAL: i16 = libc::POLLNVAL;

fn errno() -> i32 {
    io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

pub(crate) fn last_error() -> Error {
    map_os_error(errno())
}

/// Translates a native `errno` value into the portable taxonomy. Codes not
/// listed here become `Default` rather than guessing at a specific meaning.
///
/// `EINPROGRESS` can only come out of `connect(2)` on a non-blocking socket,
/// where it means the same as `EWOULDBLOCK`: poll for completion. `EAGAIN`
/// aliases `EWOULDBLOCK` on every supported target.
pub(crate) fn map_os_error(err: i32) -> Error {
    match err {
        libc::EBADF
        | libc::EFAULT
        | libc::ENAMETOOLONG
        | libc::EINVAL
        | libc::EAFNOSUPPORT
        | libc::EPFNOSUPPORT => Error::Invalid,
        libc::ENOSPC | libc::EDQUOT | libc::EIO => Error::Io,
        libc::ENOMEM => Error::NoMem,
        libc::EINTR => Error::Intr,
        libc::EOPNOTSUPP | libc::ESOCKTNOSUPPORT => Error::NotSup,
        #[cfg(any(
            target_os = "macos",
            target_os = "ios",
            target_os = "solaris",
            target_os = "illumos"
        ))]
        e if e == libc::ENOTSUP => Error::NotSup,
        libc::EPROTOTYPE | libc::EPROTONOSUPPORT | libc::ENOPROTOOPT => Error::ProtoNoSupport,
        libc::EPERM => Error::Perm,
        libc::EACCES => Error::Access,
        libc::EMFILE => Error::MFile,
        libc::EINPROGRESS | libc::EWOULDBLOCK => Error::Again,
        libc::EALREADY => Error::Already,
        libc::ENOTSOCK => Error::NotSocket,
        libc::EMSGSIZE => Error::MsgSize,
        libc::EADDRINUSE => Error::AddrInUse,
        libc::EADDRNOTAVAIL => Error::AddrNotAvail,
        libc::ENETDOWN => Error::NetDown,
        libc::ENETUNREACH => Error::NetUnreach,
        libc::ENETRESET => Error::NetReset,
        libc::ECONNABORTED => Error::ConnAborted,
        libc::ECONNRESET => Error::ConnReset,
        libc::ENOBUFS => Error::NoBufs,
        libc::EISCONN => Error::IsConn,
        libc::EPIPE | libc::ENOTCONN => Error::NotConn,
        libc::ESHUTDOWN => Error::ConnShutdown,
        libc::ETIMEDOUT => Error::ConnTimeout,
        libc::ECONNREFUSED => Error::ConnRefused,
        libc::EHOSTDOWN => Error::HostDown,
        libc::EHOSTUNREACH => Error::HostUnreach,
        _ => Error::Default,
    }
}

fn endpoint_to_sockaddr(ep: &Endpoint) -> Result<(libc::sockaddr_storage, socklen_t)> {
    let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
    match ep.addr.family() {
        Family::Inet => {
            let sin = &mut storage as *mut _ as *mut libc::sockaddr_in;
            unsafe {
                (*sin).sin_family = libc::AF_INET as libc::sa_family_t;
                (*sin).sin_port = ep.port.to_be();
                (*sin).sin_addr.s_addr = u32::from_ne_bytes(ep.addr.ipv4_octets());
            }
            Ok((storage, mem::size_of::<libc::sockaddr_in>() as socklen_t))
        }
        Family::Inet6 => {
            let sin6 = &mut storage as *mut _ as *mut libc::sockaddr_in6;
            unsafe {
                (*sin6).sin6_family = libc::AF_INET6 as libc::sa_family_t;
                (*sin6).sin6_port = ep.port.to_be();
                (*sin6).sin6_flowinfo = ep.addr.flowinfo().to_be();
                (*sin6).sin6_addr.s6_addr = ep.addr.octets();
                (*sin6).sin6_scope_id = ep.addr.scope_id();
            }
            Ok((storage, mem::size_of::<libc::sockaddr_in6>() as socklen_t))
        }
        _ => Err(Error::Invalid),
    }
}

fn endpoint_from_sockaddr(storage: &libc::sockaddr_storage) -> Result<Endpoint> {
    match storage.ss_family as c_int {
        libc::AF_INET => {
            let sin = storage as *const _ as *const libc::sockaddr_in;
            let (port, raw) = unsafe { (u16::from_be((*sin).sin_port), (*sin).sin_addr.s_addr) };
            let [a, b, c, d] = raw.to_ne_bytes();
            Ok(Endpoint::new(Addr::ipv4(a, b, c, d), port))
        }
        libc::AF_INET6 => {
            let sin6 = storage as *const _ as *const libc::sockaddr_in6;
            let ep = unsafe {
                let mut addr: Addr = Addr::from(std::net::Ipv6Addr::from((*sin6).sin6_addr.s6_addr));
                addr = addr.with_flowinfo(u32::from_be((*sin6).sin6_flowinfo));
                Endpoint::new(
                    Addr {
                        scope_id: (*sin6).sin6_scope_id,
                        ..addr
                    },
                    u16::from_be((*sin6).sin6_port),
                )
            };
            Ok(ep)
        }
        _ => Err(Error::AddrNotAvail),
    }
}

fn set_opt<T: Copy>(fd: RawSocket, level: c_int, name: c_int, value: &T) -> Result<()> {
    let rc = unsafe {
        libc::setsockopt(
            fd,
            level,
            name,
            value as *const T as *const c_void,
            mem::size_of::<T>() as socklen_t,
        )
    };
    if rc < 0 {
        return Err(last_error());
    }
    Ok(())
}

fn get_opt<T: Copy>(fd: RawSocket, level: c_int, name: c_int) -> Result<T> {
    let mut value: T = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<T>() as socklen_t;
    let rc = unsafe {
        libc::getsockopt(fd, level, name, &mut value as *mut T as *mut c_void, &mut len)
    };
    if rc < 0 {
        return Err(last_error());
    }
    if len != mem::size_of::<T>() as socklen_t {
        return Err(Error::Sys);
    }
    Ok(value)
}

pub(crate) fn open(family: Family, proto: Protocol) -> Result<RawSocket> {
    let native_family = match family {
        Family::Inet => libc::AF_INET,
        Family::Inet6 => libc::AF_INET6,
        _ => return Err(Error::AfNoSupport),
    };
    let (native_type, native_proto) = match proto {
        Protocol::Udp => (libc::SOCK_DGRAM, libc::IPPROTO_UDP),
        Protocol::Tcp => (libc::SOCK_STREAM, libc::IPPROTO_TCP),
    };

    let fd = unsafe { libc::socket(native_family, native_type, native_proto) };
    if fd < 0 {
        return Err(last_error());
    }

    // UDP checksums must always be computed, even if the system default was
    // changed. Both flags are undocumented and only exist for IPv4.
    if proto == Protocol::Udp && family == Family::Inet {
        #[cfg(any(target_os = "linux", target_os = "android"))]
        {
            const SO_NO_CHECK: c_int = 11;
            let off: c_int = 0;
            if set_opt(fd, libc::SOL_SOCKET, SO_NO_CHECK, &off).is_err()
                && errno() != libc::ENOPROTOOPT
            {
                unsafe { libc::close(fd) };
                return Err(Error::Sys);
            }
        }
        #[cfg(any(target_os = "macos", target_os = "ios"))]
        {
            const UDP_NOCKSUM: c_int = 1;
            let off: c_int = 0;
            if set_opt(fd, libc::IPPROTO_UDP, UDP_NOCKSUM, &off).is_err()
                && errno() != libc::ENOPROTOOPT
            {
                unsafe { libc::close(fd) };
                return Err(Error::Sys);
            }
        }
    }

    Ok(fd)
}

/// One close attempt. Retrying on `Again` is the caller's decision; on any
/// other failure the descriptor must be considered gone, because the kernel
/// may release it early in the close path and a retry could hit an unrelated
/// descriptor reused by another thread.
pub(crate) fn close(fd: RawSocket) -> Result<()> {
    if unsafe { libc::close(fd) } < 0 {
        return Err(last_error());
    }
    Ok(())
}

pub(crate) fn set_nonblocking(fd: RawSocket, on: bool) -> Result<()> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(last_error());
    }
    let flags = if on {
        flags | libc::O_NONBLOCK
    } else {
        flags & !libc::O_NONBLOCK
    };
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags) } < 0 {
        return Err(last_error());
    }
    Ok(())
}

pub(crate) fn bind(fd: RawSocket, local: &Endpoint) -> Result<()> {
    let (storage, len) = endpoint_to_sockaddr(local)?;
    let rc = unsafe { libc::bind(fd, &storage as *const _ as *const libc::sockaddr, len) };
    if rc < 0 {
        return Err(last_error());
    }
    Ok(())
}

pub(crate) fn connect(fd: RawSocket, remote: &Endpoint) -> Result<()> {
    let (storage, len) = endpoint_to_sockaddr(remote)?;
    let rc = unsafe { libc::connect(fd, &storage as *const _ as *const libc::sockaddr, len) };
    if rc < 0 {
        return Err(last_error());
    }
    Ok(())
}

pub(crate) fn max_backlog() -> c_int {
    libc::SOMAXCONN
}

pub(crate) fn listen(fd: RawSocket, backlog: c_int) -> Result<()> {
    if unsafe { libc::listen(fd, backlog) } < 0 {
        // The socket type is derived from the protocol, so an incompatible
        // type here means the protocol cannot listen, not that the operation
        // is generally unsupported.
        let err = errno();
        if err == libc::EOPNOTSUPP {
            return Err(Error::ProtoNoSupport);
        }
        return Err(map_os_error(err));
    }
    Ok(())
}

pub(crate) fn accept(fd: RawSocket) -> Result<(RawSocket, Option<Endpoint>)> {
    let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<libc::sockaddr_storage>() as socklen_t;
    let client = unsafe {
        libc::accept(fd, &mut storage as *mut _ as *mut libc::sockaddr, &mut len)
    };
    if client < 0 {
        let err = errno();
        if err == libc::EOPNOTSUPP {
            return Err(Error::ProtoNoSupport);
        }
        return Err(map_os_error(err));
    }
    Ok((client, endpoint_from_sockaddr(&storage).ok()))
}

pub(crate) fn local_endpoint(fd: RawSocket) -> Result<Endpoint> {
    let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<libc::sockaddr_storage>() as socklen_t;
    let rc = unsafe {
        libc::getsockname(fd, &mut storage as *mut _ as *mut libc::sockaddr, &mut len)
    };
    if rc < 0 {
        return Err(last_error());
    }
    endpoint_from_sockaddr(&storage)
}

pub(crate) fn remote_endpoint(fd: RawSocket) -> Result<Endpoint> {
    let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<libc::sockaddr_storage>() as socklen_t;
    let rc = unsafe {
        libc::getpeername(fd, &mut storage as *mut _ as *mut libc::sockaddr, &mut len)
    };
    if rc < 0 {
        return Err(last_error());
    }
    endpoint_from_sockaddr(&storage)
}

/// `SIGPIPE` must never be raised by a send on a broken stream; the error
/// comes back as a code instead.
#[cfg(any(target_os = "linux", target_os = "android"))]
const SEND_FLAGS: c_int = libc::MSG_NOSIGNAL;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const SEND_FLAGS: c_int = 0;

pub(crate) fn send(fd: RawSocket, buf: &[u8]) -> Result<usize> {
    let n = unsafe { libc::send(fd, buf.as_ptr() as *const c_void, buf.len(), SEND_FLAGS) };
    if n < 0 {
        return Err(last_error());
    }
    Ok(n as usize)
}

pub(crate) fn send_to(fd: RawSocket, buf: &[u8], remote: &Endpoint) -> Result<usize> {
    let (storage, len) = endpoint_to_sockaddr(remote)?;
    let n = unsafe {
        libc::sendto(
            fd,
            buf.as_ptr() as *const c_void,
            buf.len(),
            SEND_FLAGS,
            &storage as *const _ as *const libc::sockaddr,
            len,
        )
    };
    if n < 0 {
        return Err(last_error());
    }
    Ok(n as usize)
}

/// Receives through `recvmsg(2)` so datagram truncation is detectable: some
/// targets report `MSG_TRUNC` while others only reveal the real datagram
/// length, so both signals are checked.
fn recv_msg(fd: RawSocket, buf: &mut [u8]) -> Result<(usize, libc::sockaddr_storage, bool)> {
    let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
    let mut iov = libc::iovec {
        iov_base: buf.as_mut_ptr() as *mut c_void,
        iov_len: buf.len(),
    };
    let mut msg: libc::msghdr = unsafe { mem::zeroed() };
    msg.msg_name = &mut storage as *mut _ as *mut c_void;
    msg.msg_namelen = mem::size_of::<libc::sockaddr_storage>() as socklen_t;
    msg.msg_iov = &mut iov;
    msg.msg_iovlen = 1;

    let n = unsafe { libc::recvmsg(fd, &mut msg, 0) };
    if n < 0 {
        return Err(last_error());
    }
    let truncated = (msg.msg_flags & libc::MSG_TRUNC) != 0 || n as usize > buf.len();
    Ok((n as usize, storage, truncated))
}

pub(crate) fn recv(fd: RawSocket, buf: &mut [u8]) -> Result<usize> {
    let (n, _, truncated) = recv_msg(fd, buf)?;
    if truncated {
        return Err(Error::MsgSize);
    }
    Ok(n)
}

pub(crate) fn recv_from(fd: RawSocket, buf: &mut [u8]) -> Result<(usize, Endpoint)> {
    let (n, storage, truncated) = recv_msg(fd, buf)?;
    if truncated {
        return Err(Error::MsgSize);
    }
    let remote = endpoint_from_sockaddr(&storage).map_err(|_| Error::AddrNotAvail)?;
    Ok((n, remote))
}

pub(crate) fn shutdown(fd: RawSocket, how: ShutdownHow) -> Result<()> {
    let native = match how {
        ShutdownHow::Recv => libc::SHUT_RD,
        ShutdownHow::Send => libc::SHUT_WR,
        ShutdownHow::Both => libc::SHUT_RDWR,
    };
    if unsafe { libc::shutdown(fd, native) } < 0 {
        return Err(last_error());
    }
    Ok(())
}

pub(crate) fn socket_type(fd: RawSocket) -> Result<SockType> {
    let ty: c_int = get_opt(fd, libc::SOL_SOCKET, libc::SO_TYPE)?;
    match ty {
        libc::SOCK_STREAM => Ok(SockType::Stream),
        libc::SOCK_DGRAM => Ok(SockType::Datagram),
        _ => Err(Error::ProtoNoSupport),
    }
}

/// Lowers the single portable reuse flag onto the native flag set of this
/// target so the bind-conflict table holds everywhere.
pub(crate) fn set_reuse(fd: RawSocket, on: bool) -> Result<()> {
    let val: c_int = on as c_int;
    set_opt(fd, libc::SOL_SOCKET, libc::SO_REUSEADDR, &val)?;

    #[cfg(target_os = "freebsd")]
    {
        // Load-balanced port reuse, the modern spelling of SO_REUSEPORT.
        const SO_REUSEPORT_LB: c_int = 0x0001_0000;
        set_opt(fd, libc::SOL_SOCKET, SO_REUSEPORT_LB, &val)?;
    }
    #[cfg(any(
        target_os = "linux",
        target_os = "android",
        target_os = "macos",
        target_os = "ios",
        target_os = "netbsd",
        target_os = "openbsd",
        target_os = "dragonfly"
    ))]
    {
        set_opt(fd, libc::SOL_SOCKET, libc::SO_REUSEPORT, &val)?;
    }
    #[cfg(any(target_os = "solaris", target_os = "illumos"))]
    {
        // Exclusive bind is the inverse of reuse here.
        const SO_EXCLBIND: c_int = 0x1015;
        let excl: c_int = (!on) as c_int;
        set_opt(fd, libc::SOL_SOCKET, SO_EXCLBIND, &excl)?;
    }

    Ok(())
}

pub(crate) fn get_reuse(fd: RawSocket) -> Result<bool> {
    let val: c_int = get_opt(fd, libc::SOL_SOCKET, libc::SO_REUSEADDR)?;
    Ok(val != 0)
}

pub(crate) fn set_buffer(fd: RawSocket, opt: SockOpt, size: i32) -> Result<()> {
    let name = match opt {
        SockOpt::SndBuf => libc::SO_SNDBUF,
        _ => libc::SO_RCVBUF,
    };
    let mut val: c_int = size.max(0);
    // The kernel doubles the requested size to account for bookkeeping
    // overhead; halving first keeps the observable value in line with the
    // other targets. Odd values round down by one.
    if cfg!(any(target_os = "linux", target_os = "android")) {
        val >>= 1;
    }
    // BSD kernels reject zero outright; keeping the system default in place
    // is the closest portable meaning.
    if val == 0
        && cfg!(any(
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd",
            target_os = "netbsd",
            target_os = "openbsd",
            target_os = "dragonfly"
        ))
    {
        return Ok(());
    }
    set_opt(fd, libc::SOL_SOCKET, name, &val)
}

pub(crate) fn get_buffer(fd: RawSocket, opt: SockOpt) -> Result<i32> {
    let name = match opt {
        SockOpt::SndBuf => libc::SO_SNDBUF,
        _ => libc::SO_RCVBUF,
    };
    let val: c_int = get_opt(fd, libc::SOL_SOCKET, name)?;
    Ok(val)
}

pub(crate) fn set_timeout(fd: RawSocket, opt: SockOpt, millis: i32) -> Result<()> {
    let name = match opt {
        SockOpt::SndTimeo => libc::SO_SNDTIMEO,
        _ => libc::SO_RCVTIMEO,
    };
    let millis = millis.max(0);
    let tv = libc::timeval {
        tv_sec: (millis / 1000) as _,
        tv_usec: ((millis % 1000) * 1000) as _,
    };
    set_opt(fd, libc::SOL_SOCKET, name, &tv)
}

pub(crate) fn get_timeout(fd: RawSocket, opt: SockOpt) -> Result<i32> {
    let name = match opt {
        SockOpt::SndTimeo => libc::SO_SNDTIMEO,
        _ => libc::SO_RCVTIMEO,
    };
    let tv: libc::timeval = get_opt(fd, libc::SOL_SOCKET, name)?;
    let millis = (tv.tv_sec as i64) * 1000 + (tv.tv_usec as i64) / 1000;
    Ok(millis.min(i32::MAX as i64) as i32)
}

pub(crate) fn set_keepalive(fd: RawSocket, on: bool) -> Result<()> {
    let val: c_int = on as c_int;
    set_opt(fd, libc::SOL_SOCKET, libc::SO_KEEPALIVE, &val)
}

pub(crate) fn get_keepalive(fd: RawSocket) -> Result<bool> {
    let val: c_int = get_opt(fd, libc::SOL_SOCKET, libc::SO_KEEPALIVE)?;
    Ok(val != 0)
}

pub(crate) fn set_linger(fd: RawSocket, linger: Linger) -> Result<()> {
    let val = libc::linger {
        l_onoff: linger.enabled as c_int,
        l_linger: linger.seconds as c_int,
    };
    set_opt(fd, libc::SOL_SOCKET, libc::SO_LINGER, &val)
}

pub(crate) fn get_linger(fd: RawSocket) -> Result<Linger> {
    let val: libc::linger = get_opt(fd, libc::SOL_SOCKET, libc::SO_LINGER)?;
    Ok(Linger {
        enabled: val.l_onoff != 0,
        seconds: val.l_linger.clamp(0, u16::MAX as c_int) as u16,
    })
}

pub(crate) fn set_v6only(fd: RawSocket, on: bool) -> Result<()> {
    let val: c_int = on as c_int;
    set_opt(fd, libc::IPPROTO_IPV6, libc::IPV6_V6ONLY, &val)
}

pub(crate) fn get_v6only(fd: RawSocket) -> Result<bool> {
    let val: c_int = get_opt(fd, libc::IPPROTO_IPV6, libc::IPV6_V6ONLY)?;
    Ok(val != 0)
}

pub(crate) fn set_ttl(fd: RawSocket, family: Family, ttl: i32) -> Result<()> {
    let val: c_int = ttl;
    match family {
        Family::Inet => set_opt(fd, libc::IPPROTO_IP, libc::IP_TTL, &val),
        // IPV6_HOPLIMIT controls received packets; the outgoing hop limit is
        // IPV6_UNICAST_HOPS.
        Family::Inet6 => set_opt(fd, libc::IPPROTO_IPV6, libc::IPV6_UNICAST_HOPS, &val),
        _ => Err(Error::Invalid),
    }
}

pub(crate) fn get_ttl(fd: RawSocket, family: Family) -> Result<i32> {
    match family {
        Family::Inet => get_opt(fd, libc::IPPROTO_IP, libc::IP_TTL),
        Family::Inet6 => get_opt(fd, libc::IPPROTO_IPV6, libc::IPV6_UNICAST_HOPS),
        _ => Err(Error::Invalid),
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
mod mtu {
    use super::*;

    const IP_MTU: c_int = 14;
    const IPV6_MTU: c_int = 24;

    const PMTUDISC_DONT: c_int = 0;
    const PMTUDISC_WANT: c_int = 1;
    const PMTUDISC_DO: c_int = 2;
    const PMTUDISC_PROBE: c_int = 3;
    const PMTUDISC_INTERFACE: c_int = 4;
    const PMTUDISC_OMIT: c_int = 5;

    pub(crate) fn get_mtu(fd: RawSocket, family: Family) -> Result<i32> {
        match family {
            Family::Inet => get_opt(fd, libc::IPPROTO_IP, IP_MTU),
            Family::Inet6 => get_opt(fd, libc::IPPROTO_IPV6, IPV6_MTU),
            _ => Err(Error::Invalid),
        }
    }

    pub(crate) fn set_mtu_discover(fd: RawSocket, family: Family, mode: PmtudMode) -> Result<()> {
        // Off prefers OMIT: unlike DONT it also ignores the (necessarily
        // spoofed) ICMP fragmentation-needed packets, and unlike INTERFACE
        // it still fragments datagrams above the interface MTU.
        let val: c_int = match mode {
            PmtudMode::Unspec => PMTUDISC_WANT,
            PmtudMode::On => PMTUDISC_DO,
            PmtudMode::Off => PMTUDISC_OMIT,
            PmtudMode::Probe => PMTUDISC_PROBE,
        };
        match family {
            Family::Inet => set_opt(fd, libc::IPPROTO_IP, libc::IP_MTU_DISCOVER, &val),
            Family::Inet6 => set_opt(fd, libc::IPPROTO_IPV6, libc::IPV6_MTU_DISCOVER, &val),
            _ => Err(Error::Invalid),
        }
    }

    pub(crate) fn get_mtu_discover(fd: RawSocket, family: Family) -> Result<PmtudMode> {
        let val: c_int = match family {
            Family::Inet => get_opt(fd, libc::IPPROTO_IP, libc::IP_MTU_DISCOVER)?,
            Family::Inet6 => get_opt(fd, libc::IPPROTO_IPV6, libc::IPV6_MTU_DISCOVER)?,
            _ => return Err(Error::Invalid),
        };
        match val {
            PMTUDISC_WANT => Ok(PmtudMode::Unspec),
            PMTUDISC_DO => Ok(PmtudMode::On),
            PMTUDISC_DONT | PMTUDISC_INTERFACE | PMTUDISC_OMIT => Ok(PmtudMode::Off),
            PMTUDISC_PROBE => Ok(PmtudMode::Probe),
            _ => Err(Error::Sys),
        }
    }
}

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd"
))]
mod mtu {
    use super::*;

    #[cfg(any(target_os = "macos", target_os = "ios"))]
    const IP_DONTFRAG: c_int = 28;
    #[cfg(target_os = "freebsd")]
    const IP_DONTFRAG: c_int = 67;
    const IPV6_DONTFRAG: c_int = 62;

    pub(crate) fn get_mtu(fd: RawSocket, family: Family) -> Result<i32> {
        let _ = (fd, family);
        // No per-socket path MTU readout on these kernels.
        Err(Error::NotSup)
    }

    pub(crate) fn set_mtu_discover(fd: RawSocket, family: Family, mode: PmtudMode) -> Result<()> {
        // Only the don't-fragment bit is controllable; discovery state is
        // kept per route by the kernel.
        let val: c_int = matches!(mode, PmtudMode::On | PmtudMode::Probe) as c_int;
        match family {
            Family::Inet => set_opt(fd, libc::IPPROTO_IP, IP_DONTFRAG, &val),
            Family::Inet6 => set_opt(fd, libc::IPPROTO_IPV6, IPV6_DONTFRAG, &val),
            _ => Err(Error::Invalid),
        }
    }

    pub(crate) fn get_mtu_discover(fd: RawSocket, family: Family) -> Result<PmtudMode> {
        let val: c_int = match family {
            Family::Inet => get_opt(fd, libc::IPPROTO_IP, IP_DONTFRAG)?,
            Family::Inet6 => get_opt(fd, libc::IPPROTO_IPV6, IPV6_DONTFRAG)?,
            _ => return Err(Error::Invalid),
        };
        Ok(if val != 0 { PmtudMode::On } else { PmtudMode::Unspec })
    }
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd"
)))]
mod mtu {
    use super::*;

    pub(crate) fn get_mtu(_fd: RawSocket, _family: Family) -> Result<i32> {
        Err(Error::NotSup)
    }

    pub(crate) fn set_mtu_discover(_fd: RawSocket, _family: Family, _mode: PmtudMode) -> Result<()> {
        Err(Error::NotSup)
    }

    pub(crate) fn get_mtu_discover(_fd: RawSocket, _family: Family) -> Result<PmtudMode> {
        Err(Error::NotSup)
    }
}

pub(crate) use mtu::{get_mtu, get_mtu_discover, set_mtu_discover};

pub(crate) fn set_broadcast(fd: RawSocket, on: bool) -> Result<()> {
    let val: c_int = on as c_int;
    set_opt(fd, libc::SOL_SOCKET, libc::SO_BROADCAST, &val)
}

pub(crate) fn get_broadcast(fd: RawSocket) -> Result<bool> {
    let val: c_int = get_opt(fd, libc::SOL_SOCKET, libc::SO_BROADCAST)?;
    Ok(val != 0)
}

/// Fetches and clears the pending asynchronous error, already translated so
/// the caller sees a stable code (or 0 when the socket is healthy).
pub(crate) fn get_pending_error(fd: RawSocket) -> Result<i32> {
    let val: c_int = get_opt(fd, libc::SOL_SOCKET, libc::SO_ERROR)?;
    if val == 0 {
        return Ok(0);
    }
    Ok(map_os_error(val).code())
}

pub(crate) fn poll(targets: &mut [crate::poll::PollFd], timeout: i32) -> Result<usize> {
    let mut native: Vec<libc::pollfd> = targets
        .iter()
        .map(|t| libc::pollfd {
            fd: t.raw(),
            events: t.events_bits(),
            revents: 0,
        })
        .collect();
    let rc = unsafe { libc::poll(native.as_mut_ptr(), native.len() as libc::nfds_t, timeout) };
    if rc < 0 {
        return Err(last_error());
    }
    for (target, pfd) in targets.iter_mut().zip(&native) {
        target.set_status_bits(pfd.revents);
    }
    Ok(rc as usize)
}
