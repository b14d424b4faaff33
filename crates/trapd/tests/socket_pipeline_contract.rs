//! Pipeline Contract Test: Socket To Database
//!
//! This test drives the real UDP listener, the protocol decoder and the
//! SQLite sink together, the way the daemon wires them.
//!
//! Constraints verified:
//! - A v2c notification sent to the bound socket becomes exactly one row
//! - The row carries the sender's address, the interface and the status
//! - The engine still shuts down cleanly after live traffic

#![cfg(all(feature = "udp", feature = "sqlite"))]

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use trapd_core::config::ListenerConfig;
use trapd_core::{AdminStatus, EngineEvent, ProtocolDecoder, TrapConfig, TrapEngine};
use trapd_sink_sqlite::SqliteTrapSink;
use trapd_source_udp::UdpTrapSource;

const COMMUNITY: &str = "lab";

fn tlv(tag: u8, contents: &[u8]) -> Vec<u8> {
    let mut out = vec![tag, contents.len() as u8];
    out.extend_from_slice(contents);
    out
}

/// OID with every arc below 128
fn oid(dotted: &str) -> Vec<u8> {
    let arcs: Vec<u8> = dotted.split('.').map(|a| a.parse().unwrap()).collect();
    let mut contents = vec![arcs[0] * 40 + arcs[1]];
    contents.extend_from_slice(&arcs[2..]);
    tlv(0x06, &contents)
}

fn varbind(name: &str, value: Vec<u8>) -> Vec<u8> {
    let mut contents = oid(name);
    contents.extend(value);
    tlv(0x30, &contents)
}

/// linkUp for ifIndex 12 with ifDescr "Gi0/1" and ifAdminStatus up(1)
fn link_up_trap() -> Vec<u8> {
    let mut list = varbind("1.3.6.1.2.1.1.3.0", tlv(0x43, &[0x12, 0x34]));
    list.extend(varbind("1.3.6.1.6.3.1.1.4.1.0", oid("1.3.6.1.6.3.1.1.5.4")));
    list.extend(varbind("1.3.6.1.2.1.2.2.1.2.12", tlv(0x04, b"Gi0/1")));
    list.extend(varbind("1.3.6.1.2.1.2.2.1.7.12", tlv(0x02, &[1])));

    let mut pdu = tlv(0x02, &[7]);
    pdu.extend(tlv(0x02, &[0]));
    pdu.extend(tlv(0x02, &[0]));
    pdu.extend(tlv(0x30, &list));

    let mut message = tlv(0x02, &[1]);
    message.extend(tlv(0x04, COMMUNITY.as_bytes()));
    message.extend(tlv(0xa7, &pdu));
    tlv(0x30, &message)
}

fn free_port() -> SocketAddr {
    let reserved = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    reserved.local_addr().unwrap()
}

async fn wait_for_event(
    rx: &mut mpsc::Receiver<EngineEvent>,
    pred: impl Fn(&EngineEvent) -> bool,
) -> EngineEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.expect("engine event channel open");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("engine event within 5 seconds")
}

#[tokio::test]
async fn datagram_on_socket_is_stored_in_database() {
    let bind_addr = free_port();
    let sink = SqliteTrapSink::open_in_memory().expect("in-memory database opens");
    let config = TrapConfig::new()
        .with_community(COMMUNITY)
        .with_listener(ListenerConfig::Socket { bind_addr });

    let (engine, mut events) = TrapEngine::new(
        Box::new(UdpTrapSource::from_config(&config).unwrap()),
        Box::new(ProtocolDecoder::new(COMMUNITY)),
        Box::new(sink.clone()),
        &config,
    )
    .expect("engine construction succeeds");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move { engine.run_with_shutdown(shutdown_rx).await });

    wait_for_event(&mut events, |e| matches!(e, EngineEvent::Started { .. })).await;

    let device = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    device.send_to(&link_up_trap(), bind_addr).await.unwrap();

    let persisted =
        wait_for_event(&mut events, |e| matches!(e, EngineEvent::TrapPersisted { .. })).await;
    let EngineEvent::TrapPersisted { event } = persisted else {
        unreachable!()
    };
    assert_eq!(event.host, "127.0.0.1");

    assert_eq!(sink.count().unwrap(), 1);
    let rows = sink.recent(10).unwrap();
    assert_eq!(rows[0].host, "127.0.0.1");
    assert_eq!(rows[0].interface, "Gi0/1");
    assert_eq!(rows[0].status, AdminStatus::Up);
    assert_eq!(rows[0].timestamp, event.timestamp);

    shutdown_tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("engine stops within 5 seconds")
        .unwrap();
    assert!(result.is_ok(), "clean shutdown: {:?}", result);
}
