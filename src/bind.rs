//! Bind-conflict resolution policy.
//!
//! Whether two sockets may bind the same port is decided by the kernel, but
//! the outcome is fully determined by the address specificity, the IPv6-only
//! mode and the reuse-address flag of both sockets once the reuse option is
//! lowered to the per-platform flag set. The complete decision table is kept
//! here as data so the platform matrix stays auditable, and so tests can
//! assert the live kernel against it row by row.

use crate::addr::Family;

/// Address specificity of a bind request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrKind {
    /// The all-zeros address of the family; occupies every local address.
    Wildcard,
    /// Any non-wildcard unicast address.
    Specific,
}

/// Bind outcome for a (first socket, second socket) pair on one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    /// The second bind succeeds.
    Allowed,
    /// The second bind fails with `AddrInUse`.
    AddrInUse,
}

/// Platform group the outcome is differentiated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Linux,
    Bsd,
    Windows,
    Solaris,
}

/// One side of a conflict: the address family and specificity a socket binds
/// with, its IPv6-only mode and its reuse-address flag. `v6only` is only
/// meaningful for `Inet6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindSide {
    pub family: Family,
    pub kind: AddrKind,
    pub v6only: bool,
    pub reuse: bool,
}

/// A row of the decision table: the uniform outcome plus per-platform
/// overrides.
#[derive(Debug, Clone, Copy)]
pub struct BindRule {
    pub first: BindSide,
    pub second: BindSide,
    pub outcome: BindOutcome,
    pub except: &'static [(Target, BindOutcome)],
}

const fn v4(kind: AddrKind, reuse: bool) -> BindSide {
    BindSide { family: Family::Inet, kind, v6only: false, reuse }
}

const fn v6(kind: AddrKind, v6only: bool, reuse: bool) -> BindSide {
    BindSide { family: Family::Inet6, kind, v6only, reuse }
}

use AddrKind::{Specific as S, Wildcard as W};
use BindOutcome::{AddrInUse as INUSE, Allowed as OK};

const UNIFORM: &[(Target, BindOutcome)] = &[];
const BSD_OK: &[(Target, BindOutcome)] = &[(Target::Bsd, OK)];
const WIN_OK: &[(Target, BindOutcome)] = &[(Target::Windows, OK)];
const LINUX_INUSE: &[(Target, BindOutcome)] = &[(Target::Linux, INUSE)];

const fn rule(
    first: BindSide,
    second: BindSide,
    outcome: BindOutcome,
    except: &'static [(Target, BindOutcome)],
) -> BindRule {
    BindRule { first, second, outcome, except }
}

/// The normative table. Row order follows the four 16-row same-family and
/// cross-family blocks: IPv4/IPv4, IPv6-only/IPv6-only, IPv6-only vs IPv4
/// both ways, then dual-stack IPv6 vs IPv4 both ways.
pub static BIND_RULES: [BindRule; 96] = [
    // IPv4 vs IPv4.
    rule(v4(W, false), v4(W, false), INUSE, UNIFORM),
    rule(v4(W, false), v4(S, false), INUSE, UNIFORM),
    rule(v4(S, false), v4(W, false), INUSE, UNIFORM),
    rule(v4(S, false), v4(S, false), INUSE, UNIFORM),
    rule(v4(W, false), v4(W, true), INUSE, UNIFORM),
    rule(v4(W, false), v4(S, true), INUSE, BSD_OK),
    rule(v4(S, false), v4(W, true), OK, LINUX_INUSE),
    rule(v4(S, false), v4(S, true), INUSE, UNIFORM),
    rule(v4(W, true), v4(W, false), INUSE, UNIFORM),
    rule(v4(W, true), v4(S, false), INUSE, WIN_OK),
    rule(v4(S, true), v4(W, false), INUSE, UNIFORM),
    rule(v4(S, true), v4(S, false), INUSE, UNIFORM),
    rule(v4(W, true), v4(W, true), OK, UNIFORM),
    rule(v4(W, true), v4(S, true), OK, UNIFORM),
    rule(v4(S, true), v4(W, true), OK, UNIFORM),
    rule(v4(S, true), v4(S, true), OK, UNIFORM),
    // IPv6 (v6only) vs IPv6 (v6only); same shape as the IPv4 block.
    rule(v6(W, true, false), v6(W, true, false), INUSE, UNIFORM),
    rule(v6(W, true, false), v6(S, true, false), INUSE, UNIFORM),
    rule(v6(S, true, false), v6(W, true, false), INUSE, UNIFORM),
    rule(v6(S, true, false), v6(S, true, false), INUSE, UNIFORM),
    rule(v6(W, true, false), v6(W, true, true), INUSE, UNIFORM),
    rule(v6(W, true, false), v6(S, true, true), INUSE, BSD_OK),
    rule(v6(S, true, false), v6(W, true, true), OK, LINUX_INUSE),
    rule(v6(S, true, false), v6(S, true, true), INUSE, UNIFORM),
    rule(v6(W, true, true), v6(W, true, false), INUSE, UNIFORM),
    rule(v6(W, true, true), v6(S, true, false), INUSE, WIN_OK),
    rule(v6(S, true, true), v6(W, true, false), INUSE, UNIFORM),
    rule(v6(S, true, true), v6(S, true, false), INUSE, UNIFORM),
    rule(v6(W, true, true), v6(W, true, true), OK, UNIFORM),
    rule(v6(W, true, true), v6(S, true, true), OK, UNIFORM),
    rule(v6(S, true, true), v6(W, true, true), OK, UNIFORM),
    rule(v6(S, true, true), v6(S, true, true), OK, UNIFORM),
    // IPv6 (v6only) vs IPv4: the IPv6 socket never occupies the IPv4 space.
    rule(v6(W, true, false), v4(W, false), OK, UNIFORM),
    rule(v6(W, true, false), v4(S, false), OK, UNIFORM),
    rule(v6(S, true, false), v4(W, false), OK, UNIFORM),
    rule(v6(S, true, false), v4(S, false), OK, UNIFORM),
    rule(v6(W, true, false), v4(W, true), OK, UNIFORM),
    rule(v6(W, true, false), v4(S, true), OK, UNIFORM),
    rule(v6(S, true, false), v4(W, true), OK, UNIFORM),
    rule(v6(S, true, false), v4(S, true), OK, UNIFORM),
    rule(v6(W, true, true), v4(W, false), OK, UNIFORM),
    rule(v6(W, true, true), v4(S, false), OK, UNIFORM),
    rule(v6(S, true, true), v4(W, false), OK, UNIFORM),
    rule(v6(S, true, true), v4(S, false), OK, UNIFORM),
    rule(v6(W, true, true), v4(W, true), OK, UNIFORM),
    rule(v6(W, true, true), v4(S, true), OK, UNIFORM),
    rule(v6(S, true, true), v4(W, true), OK, UNIFORM),
    rule(v6(S, true, true), v4(S, true), OK, UNIFORM),
    // IPv4 vs IPv6 (v6only): symmetric, always allowed.
    rule(v4(W, false), v6(W, true, false), OK, UNIFORM),
    rule(v4(W, false), v6(S, true, false), OK, UNIFORM),
    rule(v4(S, false), v6(W, true, false), OK, UNIFORM),
    rule(v4(S, false), v6(S, true, false), OK, UNIFORM),
    rule(v4(W, false), v6(W, true, true), OK, UNIFORM),
    rule(v4(W, false), v6(S, true, true), OK, UNIFORM),
    rule(v4(S, false), v6(W, true, true), OK, UNIFORM),
    rule(v4(S, false), v6(S, true, true), OK, UNIFORM),
    rule(v4(W, true), v6(W, true, false), OK, UNIFORM),
    rule(v4(W, true), v6(S, true, false), OK, UNIFORM),
    rule(v4(S, true), v6(W, true, false), OK, UNIFORM),
    rule(v4(S, true), v6(S, true, false), OK, UNIFORM),
    rule(v4(W, true), v6(W, true, true), OK, UNIFORM),
    rule(v4(W, true), v6(S, true, true), OK, UNIFORM),
    rule(v4(S, true), v6(W, true, true), OK, UNIFORM),
    rule(v4(S, true), v6(S, true, true), OK, UNIFORM),
    // Dual-stack IPv6 vs IPv4: the dual wildcard occupies both spaces,
    // specific IPv6 addresses do not.
    rule(v6(W, false, false), v4(W, false), INUSE, UNIFORM),
    rule(v6(W, false, false), v4(S, false), INUSE, UNIFORM),
    rule(v6(S, false, false), v4(W, false), OK, UNIFORM),
    rule(v6(S, false, false), v4(S, false), OK, UNIFORM),
    rule(v6(W, false, false), v4(W, true), INUSE, UNIFORM),
    rule(v6(W, false, false), v4(S, true), INUSE, BSD_OK),
    rule(v6(S, false, false), v4(W, true), OK, UNIFORM),
    rule(v6(S, false, false), v4(S, true), OK, UNIFORM),
    rule(v6(W, false, true), v4(W, false), INUSE, WIN_OK),
    rule(v6(W, false, true), v4(S, false), INUSE, WIN_OK),
    rule(v6(S, false, true), v4(W, false), OK, UNIFORM),
    rule(v6(S, false, true), v4(S, false), OK, UNIFORM),
    rule(v6(W, false, true), v4(W, true), OK, UNIFORM),
    rule(v6(W, false, true), v4(S, true), OK, UNIFORM),
    rule(v6(S, false, true), v4(W, true), OK, UNIFORM),
    rule(v6(S, false, true), v4(S, true), OK, UNIFORM),
    // IPv4 vs dual-stack IPv6.
    rule(v4(W, false), v6(W, false, false), INUSE, BSD_OK),
    rule(v4(W, false), v6(S, false, false), OK, UNIFORM),
    rule(v4(S, false), v6(W, false, false), INUSE, UNIFORM),
    rule(v4(S, false), v6(S, false, false), OK, UNIFORM),
    rule(v4(W, false), v6(W, false, true), OK, LINUX_INUSE),
    rule(v4(W, false), v6(S, false, true), OK, UNIFORM),
    rule(v4(S, false), v6(W, false, true), OK, LINUX_INUSE),
    rule(v4(S, false), v6(S, false, true), OK, UNIFORM),
    rule(v4(W, true), v6(W, false, false), INUSE, BSD_OK),
    rule(v4(W, true), v6(S, false, false), OK, UNIFORM),
    rule(v4(S, true), v6(W, false, false), INUSE, UNIFORM),
    rule(v4(S, true), v6(S, false, false), OK, UNIFORM),
    rule(v4(W, true), v6(W, false, true), OK, UNIFORM),
    rule(v4(W, true), v6(S, false, true), OK, UNIFORM),
    rule(v4(S, true), v6(W, false, true), OK, UNIFORM),
    rule(v4(S, true), v6(S, false, true), OK, UNIFORM),
];

/// The platform group this build belongs to.
pub fn current_target() -> Target {
    if cfg!(windows) {
        Target::Windows
    } else if cfg!(any(
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd",
        target_os = "dragonfly"
    )) {
        Target::Bsd
    } else if cfg!(any(target_os = "solaris", target_os = "illumos")) {
        Target::Solaris
    } else {
        Target::Linux
    }
}

fn normalize(mut side: BindSide) -> BindSide {
    // IPv6-only is meaningless on an IPv4 socket.
    if side.family == Family::Inet {
        side.v6only = false;
    }
    side
}

/// Resolves the table for an explicit platform group. Returns `None` when
/// either side is not an IP family.
pub fn expected_outcome_on(target: Target, first: BindSide, second: BindSide) -> Option<BindOutcome> {
    let first = normalize(first);
    let second = normalize(second);
    let row = BIND_RULES
        .iter()
        .find(|rule| rule.first == first && rule.second == second)?;
    let overridden = row
        .except
        .iter()
        .find(|(t, _)| *t == target)
        .map(|&(_, outcome)| outcome);
    Some(overridden.unwrap_or(row.outcome))
}

/// Resolves the table for the running platform: the outcome of binding
/// `second` while `first` already holds the same port.
pub fn expected_outcome(first: BindSide, second: BindSide) -> Option<BindOutcome> {
    expected_outcome_on(current_target(), first, second)
}
