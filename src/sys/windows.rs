//! Winsock backend.

use std::mem;
use std::sync::Once;

use windows_sys::Win32::Networking::WinSock as ws;

use super::{ShutdownHow, SockType};
use crate::addr::{Addr, Endpoint, Family};
use crate::error::{Error, Result};
use crate::options::{Linger, PmtudMode, SockOpt};
use crate::socket::Protocol;

pub(crate) type RawSocket = ws::SOCKET;

/// A zeroed handle marks the closed state; Winsock never returns 0 for a
/// live socket.
pub(crate) const CLOSED_SOCKET: RawSocket = 0;

pub(crate) fn is_valid(handle: RawSocket) -> bool {
    handle != 0 && handle != ws::INVALID_SOCKET
}

// Winsock readiness bits. POLLIN is the customary RDNORM|RDBAND composite.
pub(crate) const POLLIN: i16 = 0x0100 | 0x0200;
pub(crate) const POLLPRI: i16 = 0x0400;
pub(crate) const POLLOUT: i16 = 0x0010;
pub(crate) const POLLERR: i16 = 0x0001;
pub(crate) const POLLHUP: i16 = 0x0002;
pub(crate) const POLLNVAL: i16 = 0x0004;

// Stable Winsock numbering, kept local so the mapping table below reads like
// the sockets reference.
const WSA_INVALID_HANDLE: i32 = 6;
const WSA_NOT_ENOUGH_MEMORY: i32 = 8;
const WSAEINTR: i32 = 10004;
const WSAEBADF: i32 = 10009;
const WSAEACCES: i32 = 10013;
const WSAEFAULT: i32 = 10014;
const WSAEINVAL: i32 = 10022;
const WSAEMFILE: i32 = 10024;
const WSAEWOULDBLOCK: i32 = 10035;
const WSAEINPROGRESS: i32 = 10036;
const WSAEALREADY: i32 = 10037;
const WSAENOTSOCK: i32 = 10038;
const WSAEMSGSIZE: i32 = 10040;
const WSAEPROTOTYPE: i32 = 10041;
const WSAENOPROTOOPT: i32 = 10042;
const WSAEPROTONOSUPPORT: i32 = 10043;
const WSAESOCKTNOSUPPORT: i32 = 10044;
const WSAEOPNOTSUPP: i32 = 10045;
const WSAEPFNOSUPPORT: i32 = 10046;
const WSAEAFNOSUPPORT: i32 = 10047;
const WSAEADDRINUSE: i32 = 10048;
const WSAEADDRNOTAVAIL: i32 = 10049;
const WSAENETDOWN: i32 = 10050;
const WSAENETUNREACH: i32 = 10051;
const WSAENETRESET: i32 = 10052;
const WSAECONNABORTED: i32 = 10053;
const WSAECONNRESET: i32 = 10054;
const WSAENOBUFS: i32 = 10055;
const WSAEISCONN: i32 = 10056;
const WSAENOTCONN: i32 = 10057;
const WSAESHUTDOWN: i32 = 10058;
const WSAETIMEDOUT: i32 = 10060;
const WSAECONNREFUSED: i32 = 10061;
const WSAEHOSTDOWN: i32 = 10064;
const WSAEHOSTUNREACH: i32 = 10065;
const WSAEPROCLIM: i32 = 10067;
const WSASYSNOTREADY: i32 = 10091;
const WSAVERNOTSUPPORTED: i32 = 10092;
const WSANOTINITIALISED: i32 = 10093;
const WSAEINVALIDPROCTABLE: i32 = 10104;
const WSAEINVALIDPROVIDER: i32 = 10105;
const WSAEPROVIDERFAILEDINIT: i32 = 10106;
const WSASYSCALLFAILURE: i32 = 10107;

const AF_INET: i32 = 2;
const AF_INET6: i32 = 23;
const SOCK_STREAM: i32 = 1;
const SOCK_DGRAM: i32 = 2;
const IPPROTO_IP: i32 = 0;
const IPPROTO_TCP: i32 = 6;
const IPPROTO_UDP: i32 = 17;
const IPPROTO_IPV6: i32 = 41;

const SOL_SOCKET: i32 = 0xffff;
const SO_REUSEADDR: i32 = 0x0004;
const SO_KEEPALIVE: i32 = 0x0008;
const SO_BROADCAST: i32 = 0x0020;
const SO_LINGER: i32 = 0x0080;
const SO_SNDBUF: i32 = 0x1001;
const SO_RCVBUF: i32 = 0x1002;
const SO_SNDTIMEO: i32 = 0x1005;
const SO_RCVTIMEO: i32 = 0x1006;
const SO_ERROR: i32 = 0x1007;
const SO_TYPE: i32 = 0x1008;
const SO_EXCLUSIVEADDRUSE: i32 = !SO_REUSEADDR;

const IP_TTL: i32 = 4;
const IPV6_UNICAST_HOPS: i32 = 4;
const IPV6_V6ONLY: i32 = 27;
const IP_MTU_DISCOVER: i32 = 71;
const IPV6_MTU_DISCOVER: i32 = 71;
const IPV6_MTU: i32 = 72;
const IP_MTU: i32 = 73;

// PMTUD_STATE values shared by IP_MTU_DISCOVER and IPV6_MTU_DISCOVER.
const IP_PMTUDISC_NOT_SET: i32 = 0;
const IP_PMTUDISC_DO: i32 = 1;
const IP_PMTUDISC_DONT: i32 = 2;
const IP_PMTUDISC_PROBE: i32 = 3;

const SD_RECEIVE: i32 = 0;
const SD_SEND: i32 = 1;
const SD_BOTH: i32 = 2;

const SOMAXCONN: i32 = 0x7fffffff;
const FIONBIO: u32 = 0x8004_667e;
const SIO_UDP_CONNRESET: u32 = 0x9800_000c;

static STARTUP: Once = Once::new();

/// Loads the Winsock subsystem once per process before the first descriptor
/// is created. WSAStartup calls are reference counted by the system; the
/// matching cleanup is intentionally left to process teardown so descriptors
/// never outlive the subsystem.
fn startup() {
    STARTUP.call_once(|| unsafe {
        let mut data: ws::WSADATA = mem::zeroed();
        let rc = ws::WSAStartup(0x0202, &mut data);
        if rc != 0 {
            // Leave the failure for the first socket call to report.
            log::error!("winsock startup failed: {}", rc);
        }
    });
}

pub(crate) fn last_error() -> Error {
    map_os_error(unsafe { ws::WSAGetLastError() } as i32)
}

/// Translates a Winsock error into the portable taxonomy.
///
/// `WSAEINPROGRESS` is not POSIX `EINPROGRESS`: it is a Winsock 1.x leftover
/// meaning a blocking call is already outstanding, which is the `Already`
/// meaning. The non-blocking "connect started" condition is reported as
/// `WSAEWOULDBLOCK` and therefore maps to `Again`.
pub(crate) fn map_os_error(err: i32) -> Error {
    match err {
        WSA_INVALID_HANDLE | WSAEBADF | WSAEFAULT | WSAEINVAL | WSAEAFNOSUPPORT
        | WSAEPFNOSUPPORT => Error::Invalid,
        WSASYSCALLFAILURE => Error::Sys,
        WSA_NOT_ENOUGH_MEMORY => Error::NoMem,
        WSAEINTR => Error::Intr,
        WSAEOPNOTSUPP | WSAESOCKTNOSUPPORT => Error::NotSup,
        WSAEPROTOTYPE | WSAEPROTONOSUPPORT | WSAENOPROTOOPT => Error::ProtoNoSupport,
        WSAEACCES => Error::Access,
        WSAEMFILE => Error::MFile,
        WSAEWOULDBLOCK => Error::Again,
        WSAEINPROGRESS | WSAEALREADY => Error::Already,
        WSAENOTSOCK => Error::NotSocket,
        WSAEMSGSIZE => Error::MsgSize,
        WSAEADDRINUSE => Error::AddrInUse,
        WSAEADDRNOTAVAIL => Error::AddrNotAvail,
        WSAENETDOWN => Error::NetDown,
        WSAENETUNREACH => Error::NetUnreach,
        WSAENETRESET => Error::NetReset,
        WSAECONNABORTED => Error::ConnAborted,
        WSAECONNRESET => Error::ConnReset,
        WSAENOBUFS => Error::NoBufs,
        WSAEISCONN => Error::IsConn,
        WSAENOTCONN => Error::NotConn,
        WSAESHUTDOWN => Error::ConnShutdown,
        WSAETIMEDOUT => Error::ConnTimeout,
        WSAECONNREFUSED => Error::ConnRefused,
        WSAEHOSTDOWN => Error::HostDown,
        WSAEHOSTUNREACH => Error::HostUnreach,
        WSAEPROCLIM => Error::ProcLim,
        WSASYSNOTREADY => Error::NotReady,
        WSAVERNOTSUPPORTED | WSANOTINITIALISED => Error::LibAcc,
        WSAEINVALIDPROVIDER | WSAEINVALIDPROCTABLE | WSAEPROVIDERFAILEDINIT => Error::LibBad,
        _ => Error::Default,
    }
}

fn endpoint_to_sockaddr(ep: &Endpoint) -> Result<(ws::SOCKADDR_STORAGE, i32)> {
    let mut storage: ws::SOCKADDR_STORAGE = unsafe { mem::zeroed() };
    match ep.addr.family() {
        Family::Inet => {
            let sin = &mut storage as *mut _ as *mut ws::SOCKADDR_IN;
            unsafe {
                (*sin).sin_family = AF_INET as u16;
                (*sin).sin_port = ep.port.to_be();
                (*sin).sin_addr.S_un.S_addr = u32::from_ne_bytes(ep.addr.ipv4_octets());
            }
            Ok((storage, mem::size_of::<ws::SOCKADDR_IN>() as i32))
        }
        Family::Inet6 => {
            let sin6 = &mut storage as *mut _ as *mut ws::SOCKADDR_IN6;
            unsafe {
                (*sin6).sin6_family = AF_INET6 as u16;
                (*sin6).sin6_port = ep.port.to_be();
                (*sin6).sin6_flowinfo = ep.addr.flowinfo().to_be();
                (*sin6).sin6_addr.u.Byte = ep.addr.octets();
                (*sin6).Anonymous.sin6_scope_id = ep.addr.scope_id();
            }
            Ok((storage, mem::size_of::<ws::SOCKADDR_IN6>() as i32))
        }
        _ => Err(Error::Invalid),
    }
}

fn endpoint_from_sockaddr(storage: &ws::SOCKADDR_STORAGE) -> Result<Endpoint> {
    match storage.ss_family as i32 {
        AF_INET => {
            let sin = storage as *const _ as *const ws::SOCKADDR_IN;
            let (port, raw) = unsafe {
                (
                    u16::from_be((*sin).sin_port),
                    (*sin).sin_addr.S_un.S_addr,
                )
            };
            let [a, b, c, d] = raw.to_ne_bytes();
            Ok(Endpoint::new(Addr::ipv4(a, b, c, d), port))
        }
        AF_INET6 => {
            let sin6 = storage as *const _ as *const ws::SOCKADDR_IN6;
            let ep = unsafe {
                let mut addr = Addr::from(std::net::Ipv6Addr::from((*sin6).sin6_addr.u.Byte));
                addr = addr.with_flowinfo(u32::from_be((*sin6).sin6_flowinfo));
                Endpoint::new(
                    Addr {
                        scope_id: (*sin6).Anonymous.sin6_scope_id,
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

fn set_opt<T: Copy>(fd: RawSocket, level: i32, name: i32, value: &T) -> Result<()> {
    let rc = unsafe {
        ws::setsockopt(
            fd,
            level,
            name,
            value as *const T as *const u8,
            mem::size_of::<T>() as i32,
        )
    };
    if rc == ws::SOCKET_ERROR {
        return Err(last_error());
    }
    Ok(())
}

fn get_opt<T: Copy>(fd: RawSocket, level: i32, name: i32) -> Result<T> {
    let mut value: T = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<T>() as i32;
    let rc = unsafe { ws::getsockopt(fd, level, name, &mut value as *mut T as *mut u8, &mut len) };
    if rc == ws::SOCKET_ERROR {
        return Err(last_error());
    }
    if len != mem::size_of::<T>() as i32 {
        return Err(Error::Sys);
    }
    Ok(value)
}

pub(crate) fn open(family: Family, proto: Protocol) -> Result<RawSocket> {
    startup();

    let native_family = match family {
        Family::Inet => AF_INET,
        Family::Inet6 => AF_INET6,
        _ => return Err(Error::AfNoSupport),
    };
    let (native_type, native_proto) = match proto {
        Protocol::Udp => (SOCK_DGRAM, IPPROTO_UDP),
        Protocol::Tcp => (SOCK_STREAM, IPPROTO_TCP),
    };

    let fd = unsafe { ws::socket(native_family, native_type, native_proto) };
    if fd == ws::INVALID_SOCKET {
        return Err(last_error());
    }

    // An ICMP port-unreachable response to an earlier send would otherwise
    // surface as ConnReset on a later recv of this unconnected UDP socket.
    if proto == Protocol::Udp {
        let mut off: u32 = 0;
        let rc = unsafe { ws::ioctlsocket(fd, SIO_UDP_CONNRESET as i32, &mut off) };
        if rc == ws::SOCKET_ERROR {
            let err = last_error();
            unsafe { ws::closesocket(fd) };
            return Err(err);
        }
    }

    Ok(fd)
}

/// One close attempt; the caller owns the `Again` retry decision.
pub(crate) fn close(fd: RawSocket) -> Result<()> {
    if unsafe { ws::closesocket(fd) } == ws::SOCKET_ERROR {
        return Err(last_error());
    }
    Ok(())
}

pub(crate) fn set_nonblocking(fd: RawSocket, on: bool) -> Result<()> {
    let mut mode: u32 = on as u32;
    if unsafe { ws::ioctlsocket(fd, FIONBIO as i32, &mut mode) } == ws::SOCKET_ERROR {
        return Err(last_error());
    }
    Ok(())
}

pub(crate) fn bind(fd: RawSocket, local: &Endpoint) -> Result<()> {
    let (storage, len) = endpoint_to_sockaddr(local)?;
    let rc = unsafe { ws::bind(fd, &storage as *const _ as *const ws::SOCKADDR, len) };
    if rc == ws::SOCKET_ERROR {
        return Err(last_error());
    }
    Ok(())
}

pub(crate) fn connect(fd: RawSocket, remote: &Endpoint) -> Result<()> {
    let (storage, len) = endpoint_to_sockaddr(remote)?;
    let rc = unsafe { ws::connect(fd, &storage as *const _ as *const ws::SOCKADDR, len) };
    if rc == ws::SOCKET_ERROR {
        return Err(last_error());
    }
    Ok(())
}

pub(crate) fn max_backlog() -> i32 {
    SOMAXCONN
}

pub(crate) fn listen(fd: RawSocket, backlog: i32) -> Result<()> {
    if unsafe { ws::listen(fd, backlog) } == ws::SOCKET_ERROR {
        let err = unsafe { ws::WSAGetLastError() } as i32;
        // Type/protocol mismatch means this protocol cannot listen.
        if err == WSAEOPNOTSUPP {
            return Err(Error::ProtoNoSupport);
        }
        return Err(map_os_error(err));
    }
    Ok(())
}

pub(crate) fn accept(fd: RawSocket) -> Result<(RawSocket, Option<Endpoint>)> {
    let mut storage: ws::SOCKADDR_STORAGE = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<ws::SOCKADDR_STORAGE>() as i32;
    let client =
        unsafe { ws::accept(fd, &mut storage as *mut _ as *mut ws::SOCKADDR, &mut len) };
    if client == ws::INVALID_SOCKET {
        let err = unsafe { ws::WSAGetLastError() } as i32;
        if err == WSAEOPNOTSUPP {
            return Err(Error::ProtoNoSupport);
        }
        return Err(map_os_error(err));
    }
    Ok((client, endpoint_from_sockaddr(&storage).ok()))
}

pub(crate) fn local_endpoint(fd: RawSocket) -> Result<Endpoint> {
    let mut storage: ws::SOCKADDR_STORAGE = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<ws::SOCKADDR_STORAGE>() as i32;
    let rc = unsafe { ws::getsockname(fd, &mut storage as *mut _ as *mut ws::SOCKADDR, &mut len) };
    if rc == ws::SOCKET_ERROR {
        return Err(last_error());
    }
    endpoint_from_sockaddr(&storage)
}

pub(crate) fn remote_endpoint(fd: RawSocket) -> Result<Endpoint> {
    let mut storage: ws::SOCKADDR_STORAGE = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<ws::SOCKADDR_STORAGE>() as i32;
    let rc = unsafe { ws::getpeername(fd, &mut storage as *mut _ as *mut ws::SOCKADDR, &mut len) };
    if rc == ws::SOCKET_ERROR {
        return Err(last_error());
    }
    endpoint_from_sockaddr(&storage)
}

pub(crate) fn send(fd: RawSocket, buf: &[u8]) -> Result<usize> {
    let n = unsafe { ws::send(fd, buf.as_ptr(), buf.len() as i32, 0) };
    if n == ws::SOCKET_ERROR {
        return Err(last_error());
    }
    Ok(n as usize)
}

pub(crate) fn send_to(fd: RawSocket, buf: &[u8], remote: &Endpoint) -> Result<usize> {
    let (storage, len) = endpoint_to_sockaddr(remote)?;
    let n = unsafe {
        ws::sendto(
            fd,
            buf.as_ptr(),
            buf.len() as i32,
            0,
            &storage as *const _ as *const ws::SOCKADDR,
            len,
        )
    };
    if n == ws::SOCKET_ERROR {
        return Err(last_error());
    }
    Ok(n as usize)
}

pub(crate) fn recv(fd: RawSocket, buf: &mut [u8]) -> Result<usize> {
    // A datagram larger than the buffer fails with WSAEMSGSIZE on its own.
    let n = unsafe { ws::recv(fd, buf.as_mut_ptr(), buf.len() as i32, 0) };
    if n == ws::SOCKET_ERROR {
        return Err(last_error());
    }
    Ok(n as usize)
}

pub(crate) fn recv_from(fd: RawSocket, buf: &mut [u8]) -> Result<(usize, Endpoint)> {
    let mut storage: ws::SOCKADDR_STORAGE = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<ws::SOCKADDR_STORAGE>() as i32;
    let n = unsafe {
        ws::recvfrom(
            fd,
            buf.as_mut_ptr(),
            buf.len() as i32,
            0,
            &mut storage as *mut _ as *mut ws::SOCKADDR,
            &mut len,
        )
    };
    if n == ws::SOCKET_ERROR {
        return Err(last_error());
    }
    let remote = endpoint_from_sockaddr(&storage).map_err(|_| Error::AddrNotAvail)?;
    Ok((n as usize, remote))
}

pub(crate) fn shutdown(fd: RawSocket, how: ShutdownHow) -> Result<()> {
    let native = match how {
        ShutdownHow::Recv => SD_RECEIVE,
        ShutdownHow::Send => SD_SEND,
        ShutdownHow::Both => SD_BOTH,
    };
    if unsafe { ws::shutdown(fd, native) } == ws::SOCKET_ERROR {
        return Err(last_error());
    }
    Ok(())
}

pub(crate) fn socket_type(fd: RawSocket) -> Result<SockType> {
    let ty: i32 = get_opt(fd, SOL_SOCKET, SO_TYPE)?;
    match ty {
        SOCK_STREAM => Ok(SockType::Stream),
        SOCK_DGRAM => Ok(SockType::Datagram),
        _ => Err(Error::ProtoNoSupport),
    }
}

/// Lowers the portable reuse flag. Exclusive use and address reuse are
/// mutually exclusive on this target, so the flag being turned off is always
/// written first.
pub(crate) fn set_reuse(fd: RawSocket, on: bool) -> Result<()> {
    let reuse: i32 = on as i32;
    let exclusive: i32 = (!on) as i32;
    if on {
        set_opt(fd, SOL_SOCKET, SO_EXCLUSIVEADDRUSE, &exclusive)?;
        set_opt(fd, SOL_SOCKET, SO_REUSEADDR, &reuse)
    } else {
        set_opt(fd, SOL_SOCKET, SO_REUSEADDR, &reuse)?;
        set_opt(fd, SOL_SOCKET, SO_EXCLUSIVEADDRUSE, &exclusive)
    }
}

pub(crate) fn get_reuse(fd: RawSocket) -> Result<bool> {
    let val: i32 = get_opt(fd, SOL_SOCKET, SO_REUSEADDR)?;
    Ok(val != 0)
}

pub(crate) fn set_buffer(fd: RawSocket, opt: SockOpt, size: i32) -> Result<()> {
    let name = match opt {
        SockOpt::SndBuf => SO_SNDBUF,
        _ => SO_RCVBUF,
    };
    // Zero is valid here and disables the buffer entirely.
    let val: i32 = size.max(0);
    set_opt(fd, SOL_SOCKET, name, &val)
}

pub(crate) fn get_buffer(fd: RawSocket, opt: SockOpt) -> Result<i32> {
    let name = match opt {
        SockOpt::SndBuf => SO_SNDBUF,
        _ => SO_RCVBUF,
    };
    get_opt(fd, SOL_SOCKET, name)
}

pub(crate) fn set_timeout(fd: RawSocket, opt: SockOpt, millis: i32) -> Result<()> {
    let name = match opt {
        SockOpt::SndTimeo => SO_SNDTIMEO,
        _ => SO_RCVTIMEO,
    };
    let val: u32 = millis.max(0) as u32;
    set_opt(fd, SOL_SOCKET, name, &val)
}

pub(crate) fn get_timeout(fd: RawSocket, opt: SockOpt) -> Result<i32> {
    let name = match opt {
        SockOpt::SndTimeo => SO_SNDTIMEO,
        _ => SO_RCVTIMEO,
    };
    let val: u32 = get_opt(fd, SOL_SOCKET, name)?;
    Ok(val.min(i32::MAX as u32) as i32)
}

pub(crate) fn set_keepalive(fd: RawSocket, on: bool) -> Result<()> {
    let val: i32 = on as i32;
    set_opt(fd, SOL_SOCKET, SO_KEEPALIVE, &val)
}

pub(crate) fn get_keepalive(fd: RawSocket) -> Result<bool> {
    let val: i32 = get_opt(fd, SOL_SOCKET, SO_KEEPALIVE)?;
    Ok(val != 0)
}

pub(crate) fn set_linger(fd: RawSocket, linger: Linger) -> Result<()> {
    let val = ws::LINGER {
        l_onoff: linger.enabled as u16,
        l_linger: linger.seconds,
    };
    set_opt(fd, SOL_SOCKET, SO_LINGER, &val)
}

pub(crate) fn get_linger(fd: RawSocket) -> Result<Linger> {
    let val: ws::LINGER = get_opt(fd, SOL_SOCKET, SO_LINGER)?;
    Ok(Linger {
        enabled: val.l_onoff != 0,
        seconds: val.l_linger,
    })
}

pub(crate) fn set_v6only(fd: RawSocket, on: bool) -> Result<()> {
    let val: i32 = on as i32;
    set_opt(fd, IPPROTO_IPV6, IPV6_V6ONLY, &val)
}

pub(crate) fn get_v6only(fd: RawSocket) -> Result<bool> {
    let val: i32 = get_opt(fd, IPPROTO_IPV6, IPV6_V6ONLY)?;
    Ok(val != 0)
}

pub(crate) fn set_ttl(fd: RawSocket, family: Family, ttl: i32) -> Result<()> {
    match family {
        Family::Inet => set_opt(fd, IPPROTO_IP, IP_TTL, &ttl),
        Family::Inet6 => set_opt(fd, IPPROTO_IPV6, IPV6_UNICAST_HOPS, &ttl),
        _ => Err(Error::Invalid),
    }
}

pub(crate) fn get_ttl(fd: RawSocket, family: Family) -> Result<i32> {
    match family {
        Family::Inet => get_opt(fd, IPPROTO_IP, IP_TTL),
        Family::Inet6 => get_opt(fd, IPPROTO_IPV6, IPV6_UNICAST_HOPS),
        _ => Err(Error::Invalid),
    }
}

pub(crate) fn get_mtu(fd: RawSocket, family: Family) -> Result<i32> {
    match family {
        Family::Inet => get_opt(fd, IPPROTO_IP, IP_MTU),
        Family::Inet6 => get_opt(fd, IPPROTO_IPV6, IPV6_MTU),
        _ => Err(Error::Invalid),
    }
}

pub(crate) fn set_mtu_discover(fd: RawSocket, family: Family, mode: PmtudMode) -> Result<()> {
    let val: i32 = match mode {
        PmtudMode::Unspec => IP_PMTUDISC_NOT_SET,
        PmtudMode::On => IP_PMTUDISC_DO,
        PmtudMode::Off => IP_PMTUDISC_DONT,
        PmtudMode::Probe => IP_PMTUDISC_PROBE,
    };
    match family {
        Family::Inet => set_opt(fd, IPPROTO_IP, IP_MTU_DISCOVER, &val),
        Family::Inet6 => set_opt(fd, IPPROTO_IPV6, IPV6_MTU_DISCOVER, &val),
        _ => Err(Error::Invalid),
    }
}

pub(crate) fn get_mtu_discover(fd: RawSocket, family: Family) -> Result<PmtudMode> {
    let val: i32 = match family {
        Family::Inet => get_opt(fd, IPPROTO_IP, IP_MTU_DISCOVER)?,
        Family::Inet6 => get_opt(fd, IPPROTO_IPV6, IPV6_MTU_DISCOVER)?,
        _ => return Err(Error::Invalid),
    };
    match val {
        IP_PMTUDISC_NOT_SET => Ok(PmtudMode::Unspec),
        IP_PMTUDISC_DO => Ok(PmtudMode::On),
        IP_PMTUDISC_DONT => Ok(PmtudMode::Off),
        IP_PMTUDISC_PROBE => Ok(PmtudMode::Probe),
        _ => Err(Error::Sys),
    }
}

pub(crate) fn set_broadcast(fd: RawSocket, on: bool) -> Result<()> {
    let val: i32 = on as i32;
    set_opt(fd, SOL_SOCKET, SO_BROADCAST, &val)
}

pub(crate) fn get_broadcast(fd: RawSocket) -> Result<bool> {
    let val: i32 = get_opt(fd, SOL_SOCKET, SO_BROADCAST)?;
    Ok(val != 0)
}

pub(crate) fn get_pending_error(fd: RawSocket) -> Result<i32> {
    let val: i32 = get_opt(fd, SOL_SOCKET, SO_ERROR)?;
    if val == 0 {
        return Ok(0);
    }
    Ok(map_os_error(val).code())
}

pub(crate) fn poll(targets: &mut [crate::poll::PollFd], timeout: i32) -> Result<usize> {
    let mut native: Vec<ws::WSAPOLLFD> = targets
        .iter()
        .map(|t| ws::WSAPOLLFD {
            fd: t.raw(),
            events: t.events_bits(),
            revents: 0,
        })
        .collect();
    let rc = unsafe { ws::WSAPoll(native.as_mut_ptr(), native.len() as u32, timeout) };
    if rc == ws::SOCKET_ERROR {
        return Err(last_error());
    }
    for (target, pfd) in targets.iter_mut().zip(&native) {
        target.set_status_bits(pfd.revents);
    }
    Ok(rc as usize)
}
