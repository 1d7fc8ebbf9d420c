//! End-to-end tests: a driver thread talking to an emulated echo peer.

use std::{
    collections::HashSet,
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{bounded, Sender, TryRecvError};
use ringmux_core::config::Config;
use ringmux_host::{emulator, Client, Driver, PeerEndpoint, PendingRequest};
use ringmux_protocol::{
    packet::{Packet, PacketKind, CONNECT_ACCEPTED, CONNECT_UNKNOWN_SERVICE},
    ring::ComArea,
};
use ringmux_stream::{Command, Completion, Status};

const TIMEOUT: Duration = Duration::from_secs(5);

/// Echoes Data back on streams opened to "echo" and answers EOS with EOS.
fn spawn_echo_peer(mut peer: PeerEndpoint) -> (Sender<()>, JoinHandle<()>) {
    let (stop, stopped) = bounded::<()>(0);
    let handle = thread::spawn(move || {
        let mut open = HashSet::new();
        loop {
            if let Err(TryRecvError::Disconnected) = stopped.try_recv() {
                return;
            }
            let packet = match peer.recv_timeout(Duration::from_millis(10)).unwrap() {
                Some(packet) => packet,
                None => continue,
            };
            let stream_id = packet.stream_id();
            let reply = match packet.kind() {
                PacketKind::Connect if packet.payload() == b"echo" => {
                    open.insert(stream_id);
                    Some(Packet::connect_response(stream_id, CONNECT_ACCEPTED))
                }
                PacketKind::Connect => Some(Packet::connect_response(stream_id, CONNECT_UNKNOWN_SERVICE)),
                PacketKind::Data if open.contains(&stream_id) => {
                    Some(Packet::data(stream_id, packet.payload()).unwrap())
                }
                PacketKind::Eos if open.remove(&stream_id) => Some(Packet::eos(stream_id)),
                PacketKind::Reset => {
                    open.remove(&stream_id);
                    None
                }
                _ => None,
            };
            if let Some(reply) = reply {
                peer.send_timeout(&reply, TIMEOUT).unwrap();
            }
        }
    });
    (stop, handle)
}

fn start(config: Config) -> (Driver, Sender<()>, JoinHandle<()>) {
    let area = ComArea::new();
    let (registers, interrupts, peer) = emulator::attach(&area).unwrap();
    let driver = Driver::start(config, &area, registers, interrupts).unwrap();
    let (stop, peer_thread) = spawn_echo_peer(peer);
    (driver, stop, peer_thread)
}

fn finish(pending: PendingRequest) -> Completion {
    pending.wait_timeout(TIMEOUT).unwrap().expect("request did not complete in time")
}

fn call(client: &Client, socket_id: u8, command: Command) -> Completion {
    finish(client.submit(socket_id, command).unwrap())
}

#[test]
fn test_echo_round_trip() {
    let (driver, stop, peer_thread) = start(Config::default());
    let client = driver.client();

    assert_eq!(call(&client, 0, Command::Connect { service: b"echo".to_vec() }).status, Status::Ok);

    let written = call(&client, 0, Command::Write { data: b"hello".to_vec() });
    assert_eq!(written.status, Status::Ok);
    assert_eq!(written.length, 5);

    let read = call(&client, 0, Command::Read { capacity: 64 });
    assert_eq!(read.status, Status::Ok);
    assert_eq!(read.data, b"hello");

    assert_eq!(call(&client, 0, Command::Eos).status, Status::Ok);
    assert_eq!(call(&client, 0, Command::Read { capacity: 64 }).status, Status::ReadEos);

    // Both directions ended, so the local id is free again.
    assert_eq!(call(&client, 0, Command::Connect { service: b"echo".to_vec() }).status, Status::Ok);
    assert_eq!(call(&client, 0, Command::Reset).status, Status::ResetOk);

    drop(client);
    let device = driver.shutdown().unwrap();
    assert!(device.statistics().packets_sent >= 5);
    assert!(device.statistics().packets_received >= 4);

    drop(stop);
    peer_thread.join().unwrap();
}

#[test]
fn test_unknown_service_is_rejected() {
    let (driver, stop, peer_thread) = start(Config::default());
    let client = driver.client();

    let completion = call(&client, 3, Command::Connect { service: b"nothing-here".to_vec() });
    assert_eq!(completion.status, Status::ConnectUnknownService);
    assert_eq!(call(&client, 3, Command::Read { capacity: 1 }).status, Status::ReadReset);

    drop(client);
    let device = driver.shutdown().unwrap();
    assert!(device.sockets().is_empty());

    drop(stop);
    peer_thread.join().unwrap();
}

#[test]
fn test_clients_share_the_ring() {
    let (driver, stop, peer_thread) = start(Config::default());

    let workers: Vec<_> = (0..4u8)
        .map(|n| {
            let client = driver.client();
            thread::spawn(move || {
                assert_eq!(call(&client, 0, Command::Connect { service: b"echo".to_vec() }).status, Status::Ok);
                for round in 0..20u8 {
                    let data = vec![n.wrapping_mul(31).wrapping_add(round); 40 + round as usize * 5];
                    let written = call(&client, 0, Command::Write { data: data.clone() });
                    assert_eq!(written.status, Status::Ok);
                    let read = call(&client, 0, Command::Read { capacity: 255 });
                    assert_eq!(read.status, Status::Ok);
                    assert_eq!(read.data, data);
                }
                assert_eq!(call(&client, 0, Command::Eos).status, Status::Ok);
                assert_eq!(call(&client, 0, Command::Read { capacity: 1 }).status, Status::ReadEos);
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    let device = driver.shutdown().unwrap();
    assert!(device.sockets().is_empty());
    assert_eq!(device.statistics().protocol_violations, 0);

    drop(stop);
    peer_thread.join().unwrap();
}

#[test]
fn test_pipelined_writes_queue_behind_a_full_ring() {
    let (driver, stop, peer_thread) = start(Config::default());
    let client = driver.client();
    assert_eq!(call(&client, 0, Command::Connect { service: b"echo".to_vec() }).status, Status::Ok);

    // One write in flight at a time; each echo comes back in order.
    for n in 0..10u8 {
        let pending = client.submit(0, Command::Write { data: vec![n; 200] }).unwrap();
        assert_eq!(finish(pending).status, Status::Ok);
        let read = call(&client, 0, Command::Read { capacity: 200 });
        assert_eq!(read.data, vec![n; 200]);
    }

    drop(client);
    driver.shutdown().unwrap();
    drop(stop);
    peer_thread.join().unwrap();
}

#[test]
fn test_bounded_request_queue() {
    let mut config = Config::default();
    config.request_queue_size = Some(1);
    config.worker_name = String::from("bounded-worker");
    let (driver, stop, peer_thread) = start(config);
    assert!(driver.is_running());

    let client = driver.client();
    assert_ne!(client.owner(), driver.client().owner());
    assert_eq!(call(&client, 0, Command::Connect { service: b"echo".to_vec() }).status, Status::Ok);
    assert_eq!(call(&client, 0, Command::Reset).status, Status::ResetOk);

    drop(client);
    driver.shutdown().unwrap();
    drop(stop);
    peer_thread.join().unwrap();
}

#[test]
fn test_second_driver_on_same_area_fails() {
    let area = ComArea::new();
    let (registers, interrupts, _peer) = emulator::attach(&area).unwrap();
    let driver = Driver::start(Config::default(), &area, registers.clone(), interrupts).unwrap();

    let (_line, more_interrupts) = ringmux_host::interrupt::channel();
    let second = Driver::start(Config::default(), &area, registers, more_interrupts);
    assert!(matches!(second, Err(ringmux_core::error::ErrorKind::EndpointClaimed)));

    driver.shutdown().unwrap();
}
