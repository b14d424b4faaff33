//! Test doubles and common utilities for pipeline contract tests
//!
//! This module provides minimal test doubles that drive the engine without
//! sockets, subprocesses or a database.

#![allow(dead_code)]

use trapd_core::config::{SinkConfig, TrapConfig};
use trapd_core::engine::EngineEvent;
use trapd_core::error::{Error, Result};
use trapd_core::event::TrapEvent;
use trapd_core::traits::{InboundStream, InboundUnit, TrapSink, TrapSource};
use chrono::{Local, TimeZone};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// Community configured in every test pipeline
pub const COMMUNITY: &str = "lab";

/// A TrapSource whose units are pushed by the test
///
/// The stream ends once every sender returned by [`ScriptedTrapSource::new`]
/// has been dropped, which is how tests simulate a dead transport.
pub struct ScriptedTrapSource {
    rx: std::sync::Mutex<Option<mpsc::UnboundedReceiver<InboundUnit>>>,
}

impl ScriptedTrapSource {
    pub fn new() -> (Self, mpsc::UnboundedSender<InboundUnit>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let source = Self {
            rx: std::sync::Mutex::new(Some(rx)),
        };
        (source, tx)
    }
}

#[async_trait::async_trait]
impl TrapSource for ScriptedTrapSource {
    async fn open(&self) -> Result<InboundStream> {
        let rx = self
            .rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| Error::transport("scripted source already opened"))?;
        Ok(Box::pin(tokio_stream::wrappers::UnboundedReceiverStream::new(rx)))
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// A TrapSource that cannot acquire its transport
pub struct UnavailableTrapSource;

#[async_trait::async_trait]
impl TrapSource for UnavailableTrapSource {
    async fn open(&self) -> Result<InboundStream> {
        Err(Error::transport("permission denied binding 0.0.0.0:162"))
    }

    fn source_name(&self) -> &'static str {
        "unavailable"
    }
}

/// A TrapSink that records every call and can be told to fail
pub struct RecordingSink {
    events: Arc<std::sync::Mutex<Vec<TrapEvent>>>,
    insert_call_count: Arc<AtomicUsize>,
    flush_call_count: Arc<AtomicUsize>,
    fail_inserts: Arc<AtomicBool>,
    fail_flush: Arc<AtomicBool>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            events: Arc::new(std::sync::Mutex::new(Vec::new())),
            insert_call_count: Arc::new(AtomicUsize::new(0)),
            flush_call_count: Arc::new(AtomicUsize::new(0)),
            fail_inserts: Arc::new(AtomicBool::new(false)),
            fail_flush: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a new RecordingSink that shares state with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            events: Arc::clone(&other.events),
            insert_call_count: Arc::clone(&other.insert_call_count),
            flush_call_count: Arc::clone(&other.flush_call_count),
            fail_inserts: Arc::clone(&other.fail_inserts),
            fail_flush: Arc::clone(&other.fail_flush),
        }
    }

    /// Events successfully stored, in order
    pub fn events(&self) -> Vec<TrapEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Get the number of times insert_trap() was called
    pub fn insert_call_count(&self) -> usize {
        self.insert_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times flush() was called
    pub fn flush_call_count(&self) -> usize {
        self.flush_call_count.load(Ordering::SeqCst)
    }

    /// Make subsequent inserts fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.fail_inserts.store(failing, Ordering::SeqCst);
    }

    /// Make flush() fail
    pub fn set_flush_failing(&self, failing: bool) {
        self.fail_flush.store(failing, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl TrapSink for RecordingSink {
    async fn insert_trap(&self, event: &TrapEvent) -> Result<()> {
        self.insert_call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(Error::sink("database is locked"));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.flush_call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_flush.load(Ordering::SeqCst) {
            return Err(Error::sink("disk I/O error"));
        }
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "recording"
    }
}

/// Helper to create a minimal TrapConfig for testing
pub fn minimal_config() -> TrapConfig {
    let mut config = TrapConfig::new().with_community(COMMUNITY);
    config.sink = SinkConfig::Memory;
    config.engine.event_channel_capacity = 100;
    config
}

/// Wait for the next engine event matching `pred`, skipping others
pub async fn wait_for_event(
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

/// Whether an event marks the end of processing for one unit
pub fn is_unit_outcome(event: &EngineEvent) -> bool {
    matches!(
        event,
        EngineEvent::TrapDiscarded { .. }
            | EngineEvent::DecodeFailed { .. }
            | EngineEvent::TrapIncomplete { .. }
            | EngineEvent::TrapPersisted { .. }
            | EngineEvent::PersistFailed { .. }
    )
}

// ── BER trap builder ────────────────────────────────────────────────────────

pub const IF_DESCR_12: &str = "1.3.6.1.2.1.2.2.1.2.12";
pub const IF_ADMIN_STATUS_12: &str = "1.3.6.1.2.1.2.2.1.7.12";

/// Value of a variable binding to encode
pub enum Value<'a> {
    Int(i64),
    Text(&'a str),
    TimeTicks(u32),
    Oid(&'a str),
}

fn tlv(tag: u8, contents: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    match contents.len() {
        n if n < 0x80 => out.push(n as u8),
        n if n <= 0xff => out.extend([0x81, n as u8]),
        n => out.extend([0x82, (n >> 8) as u8, n as u8]),
    }
    out.extend_from_slice(contents);
    out
}

fn integer(v: i64) -> Vec<u8> {
    let bytes = v.to_be_bytes();
    let mut start = 0;
    while start < 7 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xff && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    tlv(0x02, &bytes[start..])
}

fn oid(dotted: &str) -> Vec<u8> {
    let arcs: Vec<u64> = dotted.split('.').map(|a| a.parse().unwrap()).collect();
    let mut contents = vec![(arcs[0] * 40 + arcs[1]) as u8];
    for &arc in &arcs[2..] {
        let mut chunk = vec![(arc & 0x7f) as u8];
        let mut rest = arc >> 7;
        while rest > 0 {
            chunk.push(((rest & 0x7f) as u8) | 0x80);
            rest >>= 7;
        }
        chunk.reverse();
        contents.extend(chunk);
    }
    tlv(0x06, &contents)
}

fn encode_value(value: &Value<'_>) -> Vec<u8> {
    match value {
        Value::Int(v) => integer(*v),
        Value::Text(s) => tlv(0x04, s.as_bytes()),
        Value::TimeTicks(t) => {
            let mut encoded = integer(*t as i64);
            encoded[0] = 0x43;
            encoded
        }
        Value::Oid(o) => oid(o),
    }
}

/// Encode an SNMPv2c SNMPv2-Trap message
pub fn v2c_trap(community: &str, varbinds: &[(&str, Value<'_>)]) -> Vec<u8> {
    let list: Vec<u8> = varbinds
        .iter()
        .flat_map(|(name, value)| {
            let mut contents = oid(name);
            contents.extend(encode_value(value));
            tlv(0x30, &contents)
        })
        .collect();

    let mut pdu = integer(7);
    pdu.extend(integer(0));
    pdu.extend(integer(0));
    pdu.extend(tlv(0x30, &list));

    let mut message = integer(1);
    message.extend(tlv(0x04, community.as_bytes()));
    message.extend(tlv(0xa7, &pdu));
    tlv(0x30, &message)
}

/// linkDown/linkUp style trap for ifIndex 12
pub fn link_trap(community: &str, descr: Option<&str>, admin_status: Option<i64>) -> Vec<u8> {
    let mut varbinds = vec![
        ("1.3.6.1.2.1.1.3.0", Value::TimeTicks(4660)),
        ("1.3.6.1.6.3.1.1.4.1.0", Value::Oid("1.3.6.1.6.3.1.1.5.3")),
    ];
    if let Some(descr) = descr {
        varbinds.push((IF_DESCR_12, Value::Text(descr)));
    }
    if let Some(status) = admin_status {
        varbinds.push((IF_ADMIN_STATUS_12, Value::Int(status)));
    }
    v2c_trap(community, &varbinds)
}

/// Source address used for every test datagram
pub fn device_addr() -> SocketAddr {
    SocketAddr::from(([10, 0, 0, 1], 50162))
}

/// Datagram unit with a fixed receive time
pub fn datagram(payload: Vec<u8>) -> InboundUnit {
    InboundUnit::Datagram {
        payload,
        source: device_addr(),
        received_at: Local.with_ymd_and_hms(2025, 1, 9, 12, 0, 0).unwrap(),
    }
}
