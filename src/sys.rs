//! Platform backend selection. Exactly one backend is compiled in; both
//! export the same surface so the rest of the crate stays platform-neutral.

/// Socket type as reported by the kernel, used to scope options that only
/// apply to one transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SockType {
    Stream,
    Datagram,
}

/// Direction argument of a shutdown request after flag validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShutdownHow {
    Recv,
    Send,
    Both,
}

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub(crate) use unix::*;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub(crate) use windows::*;
