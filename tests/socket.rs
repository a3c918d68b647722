//! Live-socket tests over the loopback interface.

use clarinet::bind::{expected_outcome, AddrKind, BindOutcome, BindSide};
use clarinet::{
    Addr, Endpoint, Error, Family, Linger, PollEvents, PollFd, Protocol, Shutdown, SockOpt,
    Socket,
};

fn udp4() -> Socket {
    let mut socket = Socket::new();
    socket.open(Family::Inet, Protocol::Udp).unwrap();
    socket
}

fn tcp4() -> Socket {
    let mut socket = Socket::new();
    socket.open(Family::Inet, Protocol::Tcp).unwrap();
    socket
}

/// Binds to an ephemeral loopback port and returns the assigned endpoint.
fn bind_loopback(socket: &mut Socket) -> Endpoint {
    socket
        .bind(&Endpoint::new(Addr::LOOPBACK_IPV4, 0))
        .unwrap();
    socket.local_endpoint().unwrap()
}

fn side(kind: AddrKind, reuse: bool) -> BindSide {
    BindSide {
        family: Family::Inet,
        kind,
        v6only: false,
        reuse,
    }
}

fn outcome(result: clarinet::Result<()>) -> BindOutcome {
    match result {
        Ok(()) => BindOutcome::Allowed,
        Err(Error::AddrInUse) => BindOutcome::AddrInUse,
        Err(err) => panic!("unexpected bind result: {}", err),
    }
}

#[test]
fn udp_echo_round_trip_over_loopback() {
    let mut receiver = udp4();
    let receiver_ep = bind_loopback(&mut receiver);

    let mut sender = udp4();
    let sender_ep = bind_loopback(&mut sender);

    let payload = [0xaa, 0xbb, 0xcc, 0xdd];
    assert_eq!(sender.send_to(&payload, &receiver_ep).unwrap(), 4);

    let mut buf = [0u8; 64];
    let (len, from) = receiver.recv_from(&mut buf).unwrap();
    assert_eq!(len, 4);
    assert_eq!(&buf[..4], &payload);
    assert_eq!(from, sender_ep);

    receiver.close().unwrap();
    sender.close().unwrap();
}

#[test]
fn tcp_listen_connect_accept_handshake() {
    let mut server = tcp4();
    let server_ep = bind_loopback(&mut server);
    server.listen(1).unwrap();

    let mut client = tcp4();
    client.connect(&server_ep).unwrap();
    let client_ep = client.local_endpoint().unwrap();

    let mut accepted = Socket::new();
    let peer = server.accept(&mut accepted).unwrap();
    assert_eq!(peer, client_ep);
    assert_eq!(accepted.local_endpoint().unwrap(), server_ep);
    assert_eq!(accepted.remote_endpoint().unwrap(), client_ep);
    assert_eq!(client.remote_endpoint().unwrap(), server_ep);

    accepted.close().unwrap();
    client.close().unwrap();
    server.close().unwrap();
}

#[test]
fn tcp_data_flows_both_ways() {
    let mut server = tcp4();
    let server_ep = bind_loopback(&mut server);
    server.listen(1).unwrap();

    let mut client = tcp4();
    client.connect(&server_ep).unwrap();
    let mut accepted = Socket::new();
    server.accept(&mut accepted).unwrap();

    assert_eq!(client.send(b"ping").unwrap(), 4);
    let mut buf = [0u8; 16];
    assert_eq!(accepted.recv(&mut buf).unwrap(), 4);
    assert_eq!(&buf[..4], b"ping");

    assert_eq!(accepted.send(b"pong").unwrap(), 4);
    assert_eq!(client.recv(&mut buf).unwrap(), 4);
    assert_eq!(&buf[..4], b"pong");
}

#[test]
fn bind_conflict_without_reuse() {
    let mut first = udp4();
    let first_ep = bind_loopback(&mut first);

    // A wildcard bind over an existing specific address on the same port.
    let mut second = udp4();
    let result = second.bind(&Endpoint::new(Addr::ANY_IPV4, first_ep.port));
    assert_eq!(
        outcome(result),
        expected_outcome(
            side(AddrKind::Specific, false),
            side(AddrKind::Wildcard, false)
        )
        .unwrap()
    );
    assert_eq!(
        expected_outcome(
            side(AddrKind::Specific, false),
            side(AddrKind::Wildcard, false)
        ),
        Some(BindOutcome::AddrInUse)
    );
}

#[test]
fn bind_conflict_with_reuse_on_both() {
    let mut first = udp4();
    first.setopt_i32(SockOpt::ReuseAddr, 1).unwrap();
    let first_ep = bind_loopback(&mut first);

    let mut second = udp4();
    second.setopt_i32(SockOpt::ReuseAddr, 1).unwrap();
    let result = second.bind(&Endpoint::new(Addr::ANY_IPV4, first_ep.port));
    assert_eq!(
        outcome(result),
        expected_outcome(
            side(AddrKind::Specific, true),
            side(AddrKind::Wildcard, true)
        )
        .unwrap()
    );
    assert_eq!(
        expected_outcome(
            side(AddrKind::Specific, true),
            side(AddrKind::Wildcard, true)
        ),
        Some(BindOutcome::Allowed)
    );
}

#[test]
fn ipv6_only_socket_leaves_ipv4_port_free() {
    let mut v6 = Socket::new();
    if v6.open(Family::Inet6, Protocol::Udp).is_err() {
        // No IPv6 support on this host.
        return;
    }
    v6.setopt_i32(SockOpt::V6Only, 1).unwrap();
    v6.bind(&Endpoint::new(Addr::ANY_IPV6, 0)).unwrap();
    let port = v6.local_endpoint().unwrap().port;

    let mut v4 = udp4();
    v4.bind(&Endpoint::new(Addr::ANY_IPV4, port)).unwrap();
}

#[test]
fn shutdown_both_is_idempotent() {
    let mut server = tcp4();
    let server_ep = bind_loopback(&mut server);
    server.listen(1).unwrap();

    let mut client = tcp4();
    client.connect(&server_ep).unwrap();
    let mut accepted = Socket::new();
    server.accept(&mut accepted).unwrap();

    accepted.shutdown(Shutdown::BOTH).unwrap();
    assert_eq!(accepted.shutdown(Shutdown::BOTH), Err(Error::NotConn));

    // The peer observes an orderly shutdown: zero bytes.
    let mut buf = [0u8; 8];
    assert_eq!(client.recv(&mut buf).unwrap(), 0);
}

#[test]
fn shutdown_rejects_empty_mask() {
    let mut socket = tcp4();
    assert_eq!(socket.shutdown(Shutdown::empty()), Err(Error::Invalid));
}

#[test]
fn udp_connect_sets_default_peer() {
    let mut receiver = udp4();
    let receiver_ep = bind_loopback(&mut receiver);

    let mut sender = udp4();
    sender.connect(&receiver_ep).unwrap();
    assert_eq!(sender.remote_endpoint().unwrap(), receiver_ep);
    // Connect performed an implicit local bind.
    let sender_ep = sender.local_endpoint().unwrap();
    assert_ne!(sender_ep.port, 0);

    assert_eq!(sender.send(b"hi").unwrap(), 2);
    let mut buf = [0u8; 8];
    let (len, from) = receiver.recv_from(&mut buf).unwrap();
    assert_eq!(len, 2);
    assert_eq!(from, sender_ep);
}

#[test]
fn unconnected_queries_fail() {
    let socket = udp4();
    assert_eq!(socket.remote_endpoint(), Err(Error::NotConn));
    // Unbound means no local endpoint yet either.
    assert_eq!(socket.local_endpoint(), Err(Error::Invalid));
}

#[test]
fn double_bind_is_invalid() {
    let mut socket = udp4();
    let ep = bind_loopback(&mut socket);
    assert_eq!(socket.bind(&ep), Err(Error::Invalid));
}

#[test]
fn bind_family_mismatch() {
    let mut socket = udp4();
    assert_eq!(
        socket.bind(&Endpoint::new(Addr::LOOPBACK_IPV6, 0)),
        Err(Error::AfNoSupport)
    );
}

#[test]
fn listen_on_udp_is_not_supported() {
    let mut socket = udp4();
    bind_loopback(&mut socket);
    assert_eq!(socket.listen(1), Err(Error::ProtoNoSupport));
}

#[test]
fn connect_to_dead_port_is_refused() {
    // Allocate a port, then free it again so nothing is listening there.
    let mut placeholder = tcp4();
    let dead_ep = bind_loopback(&mut placeholder);
    placeholder.close().unwrap();

    let mut client = tcp4();
    assert_eq!(client.connect(&dead_ep), Err(Error::ConnRefused));
}

#[test]
fn nonblocking_recv_reports_again() {
    let mut socket = udp4();
    bind_loopback(&mut socket);
    socket.setopt_i32(SockOpt::NonBlock, 1).unwrap();
    let mut buf = [0u8; 8];
    assert_eq!(socket.recv_from(&mut buf), Err(Error::Again));
}

#[test]
fn oversized_datagram_is_discarded_with_msgsize() {
    let mut receiver = udp4();
    let receiver_ep = bind_loopback(&mut receiver);

    let mut sender = udp4();
    sender.send_to(&[7u8; 16], &receiver_ep).unwrap();

    let mut small = [0u8; 4];
    assert_eq!(receiver.recv_from(&mut small), Err(Error::MsgSize));
}

#[test]
fn zero_length_datagram_is_legal() {
    let mut receiver = udp4();
    let receiver_ep = bind_loopback(&mut receiver);

    let mut sender = udp4();
    let sender_ep = bind_loopback(&mut sender);
    assert_eq!(sender.send_to(&[], &receiver_ep).unwrap(), 0);

    let mut buf = [0u8; 8];
    let (len, from) = receiver.recv_from(&mut buf).unwrap();
    assert_eq!(len, 0);
    assert_eq!(from, sender_ep);
}

#[test]
fn accept_requires_closed_client_handle() {
    let mut server = tcp4();
    bind_loopback(&mut server);
    server.listen(1).unwrap();

    let mut not_closed = udp4();
    assert_eq!(server.accept(&mut not_closed), Err(Error::Invalid));
}

#[test]
fn poll_reports_readability_and_writability() {
    let mut receiver = udp4();
    let receiver_ep = bind_loopback(&mut receiver);

    // A bound UDP socket is immediately writable but not readable.
    let mut fds = vec![PollFd::new(&receiver, PollEvents::IN | PollEvents::OUT).unwrap()];
    let ready = clarinet::poll(&mut fds, 0).unwrap();
    assert_eq!(ready, 1);
    assert!(fds[0].status().contains(PollEvents::OUT));
    assert!(!fds[0].status().contains(PollEvents::IN));

    let mut sender = udp4();
    sender.send_to(b"x", &receiver_ep).unwrap();

    let mut fds = vec![PollFd::new(&receiver, PollEvents::IN).unwrap()];
    let ready = clarinet::poll(&mut fds, 5000).unwrap();
    assert_eq!(ready, 1);
    assert!(fds[0].status().contains(PollEvents::IN));
}

#[test]
fn ttl_bounds_are_enforced() {
    let mut socket = udp4();
    assert_eq!(socket.setopt_i32(SockOpt::Ttl, 0), Err(Error::Invalid));
    assert_eq!(socket.setopt_i32(SockOpt::Ttl, 256), Err(Error::Invalid));
    socket.setopt_i32(SockOpt::Ttl, 1).unwrap();
    assert_eq!(socket.getopt_i32(SockOpt::Ttl).unwrap(), 1);
    socket.setopt_i32(SockOpt::Ttl, 255).unwrap();
    assert_eq!(socket.getopt_i32(SockOpt::Ttl).unwrap(), 255);
}

#[test]
fn buffer_sizes_round_trip() {
    let mut socket = udp4();
    socket.setopt_i32(SockOpt::SndBuf, 8192).unwrap();
    socket.setopt_i32(SockOpt::RcvBuf, 8192).unwrap();
    // The halving on Linux cancels against the kernel's doubling, so the
    // observable value matches the request everywhere (modulo kernel
    // minimums, which 8192 is above).
    assert_eq!(socket.getopt_i32(SockOpt::SndBuf).unwrap(), 8192);
    assert_eq!(socket.getopt_i32(SockOpt::RcvBuf).unwrap(), 8192);
}

#[test]
fn timeouts_round_trip_in_millis() {
    let mut socket = udp4();
    socket.setopt_i32(SockOpt::RcvTimeo, 1500).unwrap();
    assert_eq!(socket.getopt_i32(SockOpt::RcvTimeo).unwrap(), 1500);
    socket.setopt_i32(SockOpt::SndTimeo, 0).unwrap();
    assert_eq!(socket.getopt_i32(SockOpt::SndTimeo).unwrap(), 0);
}

#[test]
fn linger_views_share_state() {
    let mut socket = tcp4();
    let linger = Linger {
        enabled: true,
        seconds: 5,
    };
    socket.setopt(SockOpt::Linger, &linger.to_bytes()).unwrap();

    let mut raw = [0u8; 8];
    assert_eq!(socket.getopt(SockOpt::Linger, &mut raw).unwrap(), 4);
    assert_eq!(Linger::from_bytes(&raw[..4]).unwrap(), linger);

    // DontLinger flips only the enabled flag; the seconds survive.
    assert_eq!(socket.getopt_i32(SockOpt::DontLinger).unwrap(), 0);
    socket.setopt_i32(SockOpt::DontLinger, 1).unwrap();
    assert_eq!(socket.getopt_i32(SockOpt::DontLinger).unwrap(), 1);
    let mut raw = [0u8; 4];
    socket.getopt(SockOpt::Linger, &mut raw).unwrap();
    let after = Linger::from_bytes(&raw).unwrap();
    assert!(!after.enabled);
    assert_eq!(after.seconds, 5);
}

#[test]
fn stream_options_rejected_on_datagram_sockets() {
    let mut udp = udp4();
    assert_eq!(
        udp.setopt_i32(SockOpt::KeepAlive, 1),
        Err(Error::ProtoNoSupport)
    );
    assert_eq!(
        udp.setopt_i32(SockOpt::DontLinger, 1),
        Err(Error::ProtoNoSupport)
    );
    let mut tcp = tcp4();
    assert_eq!(
        tcp.setopt_i32(SockOpt::Broadcast, 1),
        Err(Error::ProtoNoSupport)
    );
}

#[test]
fn keepalive_round_trip_on_stream() {
    let mut socket = tcp4();
    socket.setopt_i32(SockOpt::KeepAlive, 1).unwrap();
    assert_eq!(socket.getopt_i32(SockOpt::KeepAlive).unwrap(), 1);
    socket.setopt_i32(SockOpt::KeepAlive, 0).unwrap();
    assert_eq!(socket.getopt_i32(SockOpt::KeepAlive).unwrap(), 0);
}

#[test]
fn broadcast_round_trip_on_datagram() {
    let mut socket = udp4();
    socket.setopt_i32(SockOpt::Broadcast, 1).unwrap();
    assert_eq!(socket.getopt_i32(SockOpt::Broadcast).unwrap(), 1);
}

#[test]
fn reuse_round_trip() {
    let mut socket = udp4();
    assert_eq!(socket.getopt_i32(SockOpt::ReuseAddr).unwrap(), 0);
    socket.setopt_i32(SockOpt::ReuseAddr, 1).unwrap();
    assert_eq!(socket.getopt_i32(SockOpt::ReuseAddr).unwrap(), 1);
}

#[test]
fn mtu_is_read_only_and_needs_a_connection() {
    let mut socket = udp4();
    assert_eq!(socket.setopt_i32(SockOpt::Mtu, 1500), Err(Error::Invalid));
    #[cfg(target_os = "linux")]
    {
        assert_eq!(socket.getopt_i32(SockOpt::Mtu), Err(Error::NotConn));
        let mut peer = udp4();
        let peer_ep = bind_loopback(&mut peer);
        socket.connect(&peer_ep).unwrap();
        assert!(socket.getopt_i32(SockOpt::Mtu).unwrap() > 0);
    }
}

#[cfg(target_os = "linux")]
#[test]
fn mtu_discover_modes_round_trip() {
    let mut socket = udp4();
    for (mode, expect) in [(1, 1), (2, 2), (3, 3), (0, 0)] {
        socket.setopt_i32(SockOpt::MtuDiscover, mode).unwrap();
        assert_eq!(socket.getopt_i32(SockOpt::MtuDiscover).unwrap(), expect);
    }
    assert_eq!(
        socket.setopt_i32(SockOpt::MtuDiscover, 4),
        Err(Error::Invalid)
    );
}

#[test]
fn nonblock_is_write_only() {
    let socket = udp4();
    assert_eq!(socket.getopt_i32(SockOpt::NonBlock), Err(Error::Invalid));
}

#[test]
fn pending_error_is_clear_on_a_healthy_socket() {
    let socket = udp4();
    assert_eq!(socket.getopt_i32(SockOpt::Error).unwrap(), 0);
}

#[test]
fn v6only_is_inet6_specific() {
    let mut v4 = udp4();
    assert_eq!(v4.setopt_i32(SockOpt::V6Only, 1), Err(Error::Invalid));
    assert_eq!(v4.getopt_i32(SockOpt::V6Only), Err(Error::Invalid));

    let mut v6 = Socket::new();
    if v6.open(Family::Inet6, Protocol::Udp).is_err() {
        return;
    }
    v6.setopt_i32(SockOpt::V6Only, 1).unwrap();
    assert_eq!(v6.getopt_i32(SockOpt::V6Only).unwrap(), 1);
}

#[test]
fn oversized_option_buffer_is_accepted_on_get_only() {
    let mut socket = udp4();
    socket.setopt_i32(SockOpt::Ttl, 64).unwrap();
    let mut big = [0u8; 16];
    assert_eq!(socket.getopt(SockOpt::Ttl, &mut big).unwrap(), 4);
    assert_eq!(i32::from_ne_bytes([big[0], big[1], big[2], big[3]]), 64);
    // Set requires the exact payload size.
    assert_eq!(socket.setopt(SockOpt::Ttl, &big), Err(Error::Invalid));
    let mut small = [0u8; 2];
    assert_eq!(socket.getopt(SockOpt::Ttl, &mut small), Err(Error::Invalid));
}
