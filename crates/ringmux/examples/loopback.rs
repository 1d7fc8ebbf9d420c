//! Echo over an emulated link.
//!
//! A peer thread plays the co-processor and answers the "echo" service; the main thread
//! connects, sends a few lines and prints what comes back.
//!
//! Run:
//! - cargo run -p ringmux --example loopback

use std::{thread, time::Duration};

use ringmux::prelude::*;

fn run_peer(mut peer: PeerEndpoint) {
    loop {
        let packet = match peer.recv_timeout(Duration::from_millis(100)) {
            Ok(Some(packet)) => packet,
            Ok(None) => continue,
            Err(err) => {
                println!("[peer] bad packet: {}", err);
                continue;
            }
        };

        let stream_id = packet.stream_id();
        let reply = match packet.kind() {
            PacketKind::Connect => {
                let accepted = packet.payload() == b"echo";
                println!("[peer] connect stream={} accepted={}", stream_id, accepted);
                Some(Packet::connect_response(stream_id, if accepted { 0 } else { 1 }))
            }
            PacketKind::Data => Packet::data(stream_id, packet.payload()).ok(),
            PacketKind::Eos => {
                println!("[peer] eos stream={}", stream_id);
                Some(Packet::eos(stream_id))
            }
            PacketKind::Reset => {
                println!("[peer] reset stream={}", stream_id);
                None
            }
            PacketKind::ConnectResponse => None,
        };

        if let Some(reply) = reply {
            if let Err(err) = peer.send_timeout(&reply, Duration::from_secs(1)) {
                println!("[peer] could not answer: {}", err);
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let area = ComArea::new();
    let (registers, interrupts, peer) = emulator::attach(&area)?;
    let driver = Driver::start(Config::default(), &area, registers, interrupts)?;
    thread::spawn(move || run_peer(peer));

    let client = driver.client();
    let connected = client.connect(0, b"echo")?;
    println!("connect: {:?}", connected.status);
    if connected.status != Status::Ok {
        return Ok(());
    }

    for line in ["hello", "over", "the ring"] {
        client.write(0, line.as_bytes())?;
        let echo = client.read(0, 252)?;
        println!("echo: {:?} {:?}", echo.status, String::from_utf8_lossy(&echo.data));
    }

    println!("eos: {:?}", client.eos(0)?.status);
    println!("read after eos: {:?}", client.read(0, 252)?.status);

    drop(client);
    let device = driver.shutdown()?;
    println!("statistics: {:?}", device.statistics());
    Ok(())
}
