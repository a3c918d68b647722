//! Drives the bind-conflict decision table against the live kernel: every
//! same-family row is bound for real on loopback and the observed outcome is
//! compared with the tabulated one for this platform.

use clarinet::bind::{expected_outcome, AddrKind, BindOutcome, BindSide};
use clarinet::{Addr, Endpoint, Error, Family, Protocol, SockOpt, Socket};

#[derive(Clone, Copy)]
struct Request {
    family: Family,
    kind: AddrKind,
    v6only: bool,
    reuse: bool,
}

impl Request {
    fn side(self) -> BindSide {
        BindSide {
            family: self.family,
            kind: self.kind,
            v6only: self.v6only,
            reuse: self.reuse,
        }
    }

    fn addr(self) -> Addr {
        match (self.family, self.kind) {
            (Family::Inet, AddrKind::Wildcard) => Addr::ANY_IPV4,
            (Family::Inet, AddrKind::Specific) => Addr::LOOPBACK_IPV4,
            (Family::Inet6, AddrKind::Wildcard) => Addr::ANY_IPV6,
            (Family::Inet6, AddrKind::Specific) => Addr::LOOPBACK_IPV6,
            _ => unreachable!(),
        }
    }

    /// Opens a UDP socket configured for this request and binds it to
    /// `port` (0 picks an ephemeral port).
    fn bind(self, port: u16) -> Result<Socket, Error> {
        let mut socket = Socket::new();
        socket.open(self.family, Protocol::Udp)?;
        if self.family == Family::Inet6 {
            socket.setopt_i32(SockOpt::V6Only, self.v6only as i32)?;
        }
        if self.reuse {
            socket.setopt_i32(SockOpt::ReuseAddr, 1)?;
        }
        socket.bind(&Endpoint::new(self.addr(), port))?;
        Ok(socket)
    }
}

fn observed(result: Result<Socket, Error>) -> BindOutcome {
    match result {
        Ok(_) => BindOutcome::Allowed,
        Err(Error::AddrInUse) => BindOutcome::AddrInUse,
        Err(err) => panic!("unexpected bind failure: {}", err),
    }
}

fn check_pair(first: Request, second: Request) {
    let holder = first.bind(0).expect("first bind must succeed");
    let port = holder.local_endpoint().unwrap().port;
    let outcome = observed(second.bind(port));
    let expected = expected_outcome(first.side(), second.side())
        .expect("pair must be tabulated");
    assert_eq!(
        outcome, expected,
        "first {:?}/{:?} reuse={} vs second {:?}/{:?} reuse={} on port {}",
        first.family, first.kind, first.reuse, second.family, second.kind, second.reuse, port
    );
}

fn same_family_matrix(family: Family, v6only: bool) {
    let kinds = [AddrKind::Wildcard, AddrKind::Specific];
    for &first_kind in &kinds {
        for &second_kind in &kinds {
            for &first_reuse in &[false, true] {
                for &second_reuse in &[false, true] {
                    check_pair(
                        Request {
                            family,
                            kind: first_kind,
                            v6only,
                            reuse: first_reuse,
                        },
                        Request {
                            family,
                            kind: second_kind,
                            v6only,
                            reuse: second_reuse,
                        },
                    );
                }
            }
        }
    }
}

fn ipv6_available() -> bool {
    let mut probe = Socket::new();
    if probe.open(Family::Inet6, Protocol::Udp).is_err() {
        return false;
    }
    probe
        .bind(&Endpoint::new(Addr::LOOPBACK_IPV6, 0))
        .is_ok()
}

#[test]
fn ipv4_rows_match_the_kernel() {
    same_family_matrix(Family::Inet, false);
}

#[test]
fn ipv6_only_rows_match_the_kernel() {
    if !ipv6_available() {
        return;
    }
    same_family_matrix(Family::Inet6, true);
}

#[test]
fn ipv6_only_never_occupies_ipv4() {
    if !ipv6_available() {
        return;
    }
    for &kind in &[AddrKind::Wildcard, AddrKind::Specific] {
        for &reuse in &[false, true] {
            check_pair(
                Request {
                    family: Family::Inet6,
                    kind,
                    v6only: true,
                    reuse,
                },
                Request {
                    family: Family::Inet,
                    kind: AddrKind::Wildcard,
                    v6only: false,
                    reuse: false,
                },
            );
        }
    }
}

#[test]
fn dual_stack_wildcard_occupies_ipv4() {
    if !ipv6_available() {
        return;
    }
    // A dual-stack wildcard without reuse blocks the IPv4 wildcard.
    check_pair(
        Request {
            family: Family::Inet6,
            kind: AddrKind::Wildcard,
            v6only: false,
            reuse: false,
        },
        Request {
            family: Family::Inet,
            kind: AddrKind::Wildcard,
            v6only: false,
            reuse: false,
        },
    );
    // A specific dual-stack address does not.
    check_pair(
        Request {
            family: Family::Inet6,
            kind: AddrKind::Specific,
            v6only: false,
            reuse: false,
        },
        Request {
            family: Family::Inet,
            kind: AddrKind::Wildcard,
            v6only: false,
            reuse: false,
        },
    );
}
