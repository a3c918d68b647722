use std::fmt;

/// Result alias used by every fallible operation in this crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Portable error codes.
///
/// Each variant carries a stable negative integer that is part of the public
/// contract: `Error::code()` and `Error::from_code()` round-trip the exact
/// values, and the numbering never changes between releases. Success is not a
/// variant; it is the `Ok` arm of [`Result`] and corresponds to code 0.
///
/// Native error codes reported by the operating system are translated into
/// exactly one of these values by the platform backend. Codes the backend
/// does not recognize become [`Error::Default`], never a misleading specific
/// variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, num_derive::FromPrimitive, num_derive::ToPrimitive)]
#[repr(i32)]
pub enum Error {
    /// Unspecified error.
    Default = -1,
    /// Internal system error.
    Sys = -2,
    /// Operation is not permitted.
    Perm = -3,
    /// Operation is not implemented.
    NotImpl = -4,
    /// Operation interrupted.
    Intr = -5,
    /// I/O error.
    Io = -6,
    /// Not enough memory.
    NoMem = -7,
    /// Access denied.
    Access = -8,
    /// Invalid argument.
    Invalid = -9,
    /// Underlying system or device not ready.
    NotReady = -10,
    /// Data not found.
    NotFound = -11,
    /// Operation could not be completed immediately or resource temporarily
    /// unavailable.
    Again = -12,
    /// Operation already performed.
    Already = -13,
    /// Operation is already in progress.
    InProgress = -14,
    /// Operation attempted with an invalid socket descriptor.
    NotSocket = -15,
    /// Message too large.
    MsgSize = -16,
    /// Operation is not supported.
    NotSup = -17,
    /// Not enough buffer space or queue is full.
    NoBufs = -18,
    /// Address family not supported.
    AfNoSupport = -19,
    /// Protocol not supported.
    ProtoNoSupport = -20,
    // -21 is unassigned in the stable numbering.
    /// Address already in use.
    AddrInUse = -22,
    /// Address is not available or cannot be assigned.
    AddrNotAvail = -23,
    /// Network is down.
    NetDown = -24,
    /// Network is unreachable.
    NetUnreach = -25,
    /// Network reset possibly due to keepalive timeout.
    NetReset = -26,
    /// Socket is not connected.
    NotConn = -27,
    /// Socket is already connected.
    IsConn = -28,
    /// Connection aborted (closed locally).
    ConnAborted = -29,
    /// Connection reset by peer (closed remotely).
    ConnReset = -30,
    /// Connection is shutdown and cannot send.
    ConnShutdown = -31,
    /// Connection timeout.
    ConnTimeout = -32,
    /// Connection refused.
    ConnRefused = -33,
    /// Host is down.
    HostDown = -34,
    /// No route to host.
    HostUnreach = -35,
    /// Too many processes or tasks.
    ProcLim = -36,
    /// Too many files.
    MFile = -37,
    /// Cannot access a needed shared library.
    LibAcc = -38,
    /// Accessing a corrupted shared library.
    LibBad = -39,
}

impl Error {
    /// The stable integer code of this error.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Looks up the error for a stable integer code. Returns `None` for 0
    /// (success) and for unassigned codes.
    pub fn from_code(code: i32) -> Option<Error> {
        num_traits::FromPrimitive::from_i32(code)
    }

    /// Short identifier, e.g. `"EADDRINUSE"`.
    pub fn name(self) -> &'static str {
        match self {
            Error::Default => "EDEFAULT",
            Error::Sys => "ESYS",
            Error::Perm => "EPERM",
            Error::NotImpl => "ENOTIMPL",
            Error::Intr => "EINTR",
            Error::Io => "EIO",
            Error::NoMem => "ENOMEM",
            Error::Access => "EACCES",
            Error::Invalid => "EINVAL",
            Error::NotReady => "ENOTREADY",
            Error::NotFound => "ENOTFOUND",
            Error::Again => "EAGAIN",
            Error::Already => "EALREADY",
            Error::InProgress => "EINPROGRESS",
            Error::NotSocket => "ENOTSOCK",
            Error::MsgSize => "EMSGSIZE",
            Error::NotSup => "ENOTSUP",
            Error::NoBufs => "ENOBUFS",
            Error::AfNoSupport => "EAFNOSUPPORT",
            Error::ProtoNoSupport => "EPROTONOSUPPORT",
            Error::AddrInUse => "EADDRINUSE",
            Error::AddrNotAvail => "EADDRNOTAVAIL",
            Error::NetDown => "ENETDOWN",
            Error::NetUnreach => "ENETUNREACH",
            Error::NetReset => "ENETRESET",
            Error::NotConn => "ENOTCONN",
            Error::IsConn => "EISCONN",
            Error::ConnAborted => "ECONNABORTED",
            Error::ConnReset => "ECONNRESET",
            Error::ConnShutdown => "ECONNSHUTDOWN",
            Error::ConnTimeout => "ECONNTIMEOUT",
            Error::ConnRefused => "ECONNREFUSED",
            Error::HostDown => "EHOSTDOWN",
            Error::HostUnreach => "EHOSTUNREACH",
            Error::ProcLim => "EPROCLIM",
            Error::MFile => "EMFILE",
            Error::LibAcc => "ELIBACC",
            Error::LibBad => "ELIBBAD",
        }
    }

    /// Human readable description.
    pub fn description(self) -> &'static str {
        match self {
            Error::Default => "Unspecified error",
            Error::Sys => "Internal system error",
            Error::Perm => "Operation is not permitted",
            Error::NotImpl => "Operation is not implemented",
            Error::Intr => "Operation interrupted",
            Error::Io => "I/O error",
            Error::NoMem => "Not enough memory",
            Error::Access => "Access denied",
            Error::Invalid => "Invalid argument",
            Error::NotReady => "Underlying system or device not ready",
            Error::NotFound => "Data not found",
            Error::Again => {
                "Operation could not be completed immediately or resource temporarily unavailable"
            }
            Error::Already => "Operation already performed",
            Error::InProgress => "Operation is already in progress",
            Error::NotSocket => "Operation attempted with an invalid socket descriptor",
            Error::MsgSize => "Message too large",
            Error::NotSup => "Operation is not supported",
            Error::NoBufs => "Not enough buffer space or queue is full",
            Error::AfNoSupport => "Address family not supported",
            Error::ProtoNoSupport => "Protocol not supported",
            Error::AddrInUse => "Address already in use",
            Error::AddrNotAvail => "Address is not available/cannot be assigned",
            Error::NetDown => "Network is down",
            Error::NetUnreach => "Network is unreachable",
            Error::NetReset => "Network reset possibly due to keepalive timeout",
            Error::NotConn => "Socket is not connected",
            Error::IsConn => "Socket is already connected",
            Error::ConnAborted => "Connection aborted (closed locally)",
            Error::ConnReset => "Connection reset by peer (closed remotely)",
            Error::ConnShutdown => "Connection is shutdown and cannot send",
            Error::ConnTimeout => "Connection timeout",
            Error::ConnRefused => "Connection refused",
            Error::HostDown => "Host is down",
            Error::HostUnreach => "No route to host",
            Error::ProcLim => "Too many processes or tasks",
            Error::MFile => "Too many files",
            Error::LibAcc => "Cannot access a needed shared library",
            Error::LibBad => "Accessing a corrupted shared library",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.name())
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        // Prefer the native code so the full mapping tables apply; the kind
        // bridge only catches synthesized errors with no OS code attached.
        if let Some(raw) = err.raw_os_error() {
            return crate::sys::map_os_error(raw);
        }
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Error::Access,
            std::io::ErrorKind::AddrInUse => Error::AddrInUse,
            std::io::ErrorKind::AddrNotAvailable => Error::AddrNotAvail,
            std::io::ErrorKind::ConnectionAborted => Error::ConnAborted,
            std::io::ErrorKind::ConnectionRefused => Error::ConnRefused,
            std::io::ErrorKind::ConnectionReset => Error::ConnReset,
            std::io::ErrorKind::Interrupted => Error::Intr,
            std::io::ErrorKind::InvalidInput => Error::Invalid,
            std::io::ErrorKind::NotConnected => Error::NotConn,
            std::io::ErrorKind::OutOfMemory => Error::NoMem,
            std::io::ErrorKind::TimedOut => Error::ConnTimeout,
            std::io::ErrorKind::WouldBlock => Error::Again,
            _ => Error::Default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(Error::Default.code(), -1);
        assert_eq!(Error::ProtoNoSupport.code(), -20);
        assert_eq!(Error::AddrInUse.code(), -22);
        assert_eq!(Error::LibBad.code(), -39);
    }

    #[test]
    fn code_round_trip() {
        for code in -64..0 {
            if let Some(err) = Error::from_code(code) {
                assert_eq!(err.code(), code);
            }
        }
        // 0 is success, -21 was never assigned.
        assert_eq!(Error::from_code(0), None);
        assert_eq!(Error::from_code(-21), None);
        assert_eq!(Error::from_code(-40), None);
    }

    #[test]
    fn rendering_is_static() {
        assert_eq!(Error::AddrInUse.name(), "EADDRINUSE");
        assert_eq!(Error::AddrInUse.description(), "Address already in use");
        assert_eq!(
            Error::AddrInUse.to_string(),
            "Address already in use (EADDRINUSE)"
        );
    }
}
