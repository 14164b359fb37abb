// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Publisher end-to-end: configure, start, pulse cycles, stop, against a
// recording sink and an in-memory PV store.

#![allow(clippy::float_cmp)]
#![allow(clippy::approx_constant)]

mod common;

use bld::config::{
    BLD_LOGICAL_ID, FIDUCIAL_INVALID, FIDUCIAL_NOT_SET, FIDUCIAL_UNTRACKED, HEADER_BYTES,
    LEADING_BYTES,
};
use bld::wire::{parse_packet, DoubleArray, PacketEncoder, PayloadRegistry};
use bld::{
    Error, ErrorKind, MemoryPvStore, Publisher, PublisherConfig, PublisherRegistry, Timestamp,
    TriggerChain,
};
use common::{doubles, RecordingFactory};
use std::sync::Arc;

const SCALAR_ID: u32 = 50;
const SCALAR_TYPE: u32 = 13;

fn scalar_registry() -> Arc<PayloadRegistry> {
    let registry = PayloadRegistry::with_builtins();
    assert!(registry.register(SCALAR_ID, SCALAR_TYPE, 8, Arc::new(DoubleArray)));
    Arc::new(registry)
}

fn scalar_config() -> PublisherConfig {
    PublisherConfig::builder("239.255.0.1", 50000)
        .max_payload(32)
        .source(SCALAR_ID, SCALAR_TYPE)
        .fiducial_pv("EVR:FID")
        .pv("pv1")
        .build()
}

fn scalar_publisher() -> (Publisher<RecordingFactory>, RecordingFactory) {
    let factory = RecordingFactory::new();
    let publisher = Publisher::new(0, factory.clone(), PacketEncoder::new(scalar_registry()));
    (publisher, factory)
}

fn flnk(pvs: &MemoryPvStore, record: &str) -> String {
    pvs.read_forward_link(record).expect("record should exist")
}

#[test]
fn test_single_scalar_pulse() {
    let (mut publisher, factory) = scalar_publisher();
    let pvs = MemoryPvStore::new();
    pvs.set_double("pv1", 3.14);

    publisher
        .configure(scalar_config())
        .expect("configure should succeed");
    publisher.start(&pvs).expect("start should succeed");
    let opened = factory.opened();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].destination.to_string(), "239.255.0.1:50000");
    assert_eq!(opened[0].max_datagram, 32 + HEADER_BYTES);

    let stamp = Timestamp::new(1_000_000, 0x0A00_0005);
    pvs.set_fiducial("EVR:FID", 5, stamp);
    publisher.prepare_cycle(&pvs).expect("prepare should succeed");
    publisher.send_cycle(&pvs).expect("send should succeed");

    let sent = factory.sent();
    assert_eq!(sent.len(), 1);
    let datagram = &sent[0];
    assert_eq!(datagram.len(), 68);

    let (header, payload) = parse_packet(datagram).expect("packet should parse");
    assert_eq!(header.fiducial_id, 5);
    assert_eq!(header.timestamp, stamp);
    assert_eq!(header.damage(), 0);
    assert_eq!(header.physical_id(), SCALAR_ID);
    assert_eq!(header.data_type(), SCALAR_TYPE);
    assert_eq!(header.extent_size() as usize, 68 - LEADING_BYTES);
    assert_eq!(header.section1.logical_id, BLD_LOGICAL_ID);
    assert!(header.is_mirrored());
    assert_eq!(doubles(payload), [3.14]);

    // Raw little-endian layout of the leading fields.
    assert_eq!(&datagram[0..4], &0x0A00_0005u32.to_le_bytes());
    assert_eq!(&datagram[4..8], &1_000_000u32.to_le_bytes());
    assert_eq!(&datagram[8..12], &[0u8; 4]);
    assert_eq!(&datagram[12..16], &5u32.to_le_bytes());
    assert_eq!(&datagram[20..40], &datagram[40..60]);
}

#[test]
fn test_duplicate_fiducial_sends_nothing() {
    let (mut publisher, factory) = scalar_publisher();
    let pvs = MemoryPvStore::new();
    pvs.set_double("pv1", 1.0);
    publisher
        .configure(scalar_config())
        .expect("configure should succeed");
    publisher.start(&pvs).expect("start should succeed");

    pvs.set_fiducial("EVR:FID", 5, Timestamp::default());
    publisher.prepare_cycle(&pvs).expect("prepare should succeed");
    publisher.send_cycle(&pvs).expect("first pulse is sent");

    publisher.prepare_cycle(&pvs).expect("prepare should succeed");
    let err = publisher.send_cycle(&pvs).expect_err("same fiducial");
    assert!(matches!(err, Error::DuplicateFiducial(5)));
    assert_eq!(err.kind(), ErrorKind::Sequence);
    assert_eq!(factory.sent().len(), 1);

    pvs.set_fiducial("EVR:FID", 8, Timestamp::default());
    publisher.prepare_cycle(&pvs).expect("prepare should succeed");
    publisher.send_cycle(&pvs).expect("next pulse is sent");
    assert_eq!(factory.sent().len(), 2);

    let stats = publisher.stats();
    assert_eq!(stats.sent, 2);
    assert_eq!(stats.duplicates, 1);
}

#[test]
fn test_out_of_range_fiducials_send_nothing() {
    let (mut publisher, factory) = scalar_publisher();
    let pvs = MemoryPvStore::new();
    pvs.set_double("pv1", 2.0);
    publisher
        .configure(scalar_config())
        .expect("configure should succeed");
    publisher.start(&pvs).expect("start should succeed");

    for fiducial in [FIDUCIAL_UNTRACKED, FIDUCIAL_INVALID, FIDUCIAL_NOT_SET] {
        pvs.set_fiducial("EVR:FID", fiducial, Timestamp::new(1, fiducial));
        let prepared = publisher.prepare_cycle(&pvs);
        assert!(prepared.is_err(), "fiducial {:#x} accepted", fiducial);
        let err = publisher
            .send_cycle(&pvs)
            .expect_err("rejected fiducial must not be sent");
        assert_eq!(err.kind(), ErrorKind::Sequence);
        assert!(factory.sent().is_empty(), "fiducial {:#x} was sent", fiducial);
        assert!(publisher.is_started());
    }
    assert_eq!(publisher.stats().invalid_fiducials, 3);

    // The same rejected id twice in a row is still rejected.
    pvs.set_fiducial("EVR:FID", FIDUCIAL_UNTRACKED, Timestamp::default());
    assert!(publisher.prepare_cycle(&pvs).is_err());
    assert!(publisher.send_cycle(&pvs).is_err());
    assert!(factory.sent().is_empty());

    pvs.set_fiducial("EVR:FID", 12, Timestamp::default());
    publisher.prepare_cycle(&pvs).expect("prepare should succeed");
    publisher.send_cycle(&pvs).expect("valid pulse is sent");
    assert_eq!(factory.sent().len(), 1);
}

#[test]
fn test_stop_never_started() {
    let (mut publisher, _) = scalar_publisher();
    let pvs = MemoryPvStore::new();
    let err = publisher.stop(&pvs).expect_err("nothing to stop");
    assert!(matches!(err, Error::NotStarted));
    assert_eq!(err.status_code(), 1);
    assert!(matches!(
        publisher.send_cycle(&pvs),
        Err(Error::NotStarted)
    ));
    assert!(matches!(
        publisher.prepare_cycle(&pvs),
        Err(Error::NotStarted)
    ));
}

#[test]
fn test_hooks_spliced_and_restored() {
    let (mut publisher, _) = scalar_publisher();
    let pvs = MemoryPvStore::new();
    pvs.set_double("pv1", 1.0);
    pvs.define_record("EVR:PRE", "0");
    pvs.define_record("EVR:POST", "DOWNSTREAM");
    pvs.define_record("BLD:PREP", "");
    pvs.define_record("BLD:SEND", "");

    let mut cfg = scalar_config();
    cfg.pre_trigger = Some("EVR:PRE".into());
    cfg.post_trigger = Some("EVR:POST".into());
    publisher.configure(cfg).expect("configure should succeed");
    publisher.set_pre_hook("BLD:PREP").expect("hook while stopped");
    publisher.set_post_hook("BLD:SEND").expect("hook while stopped");

    publisher.start(&pvs).expect("start should succeed");
    assert_eq!(flnk(&pvs, "EVR:PRE"), "BLD:PREP");
    assert_eq!(flnk(&pvs, "BLD:PREP"), "");
    assert_eq!(flnk(&pvs, "EVR:POST"), "BLD:SEND");
    assert_eq!(flnk(&pvs, "BLD:SEND"), "DOWNSTREAM");

    publisher.stop(&pvs).expect("stop should succeed");
    assert_eq!(flnk(&pvs, "EVR:PRE"), "");
    assert_eq!(flnk(&pvs, "EVR:POST"), "DOWNSTREAM");
    assert_eq!(flnk(&pvs, "BLD:SEND"), "");
    assert!(publisher.links().is_empty());
}

#[test]
fn test_drop_while_started_leaves_links_spliced() {
    let (mut publisher, _) = scalar_publisher();
    let pvs = MemoryPvStore::new();
    pvs.set_double("pv1", 1.0);
    pvs.define_record("EVR:POST", "DOWNSTREAM");
    pvs.define_record("BLD:SEND", "");

    let mut cfg = scalar_config();
    cfg.post_trigger = Some("EVR:POST".into());
    publisher.configure(cfg).expect("configure should succeed");
    publisher.set_post_hook("BLD:SEND").expect("hook while stopped");
    publisher.start(&pvs).expect("start should succeed");
    assert_eq!(publisher.links()[0].trigger(), "EVR:POST");

    drop(publisher);
    assert_eq!(flnk(&pvs, "EVR:POST"), "BLD:SEND");
    assert_eq!(flnk(&pvs, "BLD:SEND"), "DOWNSTREAM");
}

#[test]
fn test_failed_open_leaves_publisher_stopped() {
    let mut publisher = Publisher::new(
        0,
        RecordingFactory::failing(),
        PacketEncoder::new(scalar_registry()),
    );
    let pvs = MemoryPvStore::new();
    pvs.define_record("EVR:POST", "NEXT");
    pvs.define_record("BLD:SEND", "");

    let mut cfg = scalar_config();
    cfg.post_trigger = Some("EVR:POST".into());
    publisher.configure(cfg).expect("configure should succeed");
    publisher.set_post_hook("BLD:SEND").expect("hook while stopped");

    let err = publisher.start(&pvs).expect_err("socket refused");
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.os_error_code(), Some(24));
    assert!(!publisher.is_started());
    assert_eq!(flnk(&pvs, "EVR:POST"), "NEXT");
}

#[test]
fn test_reconfigure_after_stop() {
    let (mut publisher, factory) = scalar_publisher();
    let pvs = MemoryPvStore::new();
    pvs.set_double("pv1", 1.0);
    publisher
        .configure(scalar_config())
        .expect("configure should succeed");
    publisher.start(&pvs).expect("start should succeed");
    publisher.stop(&pvs).expect("stop should succeed");

    let mut cfg = scalar_config();
    cfg.port = 50001;
    publisher.configure(cfg).expect("stopped publisher accepts config");
    publisher.start(&pvs).expect("restart should succeed");

    // Fiducial history is reset by start.
    pvs.set_fiducial("EVR:FID", 5, Timestamp::default());
    publisher.prepare_cycle(&pvs).expect("prepare should succeed");
    publisher.send_cycle(&pvs).expect("send should succeed");

    let opened = factory.opened();
    assert_eq!(opened.len(), 2);
    assert_eq!(opened[1].destination.port(), 50001);
}

#[test]
fn test_invalid_config_rejected_without_side_effects() {
    let (mut publisher, _) = scalar_publisher();
    publisher
        .configure(scalar_config())
        .expect("configure should succeed");

    let mut bad = scalar_config();
    bad.max_payload = 4;
    let err = publisher.configure(bad).expect_err("payload larger than max");
    assert!(matches!(err, Error::PayloadTooLarge { len: 8, max: 4 }));
    assert_eq!(
        publisher.config().map(|c| c.max_payload),
        Some(32),
        "previous configuration kept"
    );
}

#[test]
fn test_registry_routes_by_instance() {
    let factory = RecordingFactory::new();
    let registry = PublisherRegistry::with_factory(4, factory.clone(), scalar_registry());
    let pvs = MemoryPvStore::new();
    pvs.set_double("pv1", 2.0);

    for id in [1, 3] {
        let mut cfg = scalar_config();
        cfg.port = 50000 + id as u16;
        cfg.fiducial_pv = None;
        let mut publisher = registry.get(id).expect("in range");
        publisher.configure(cfg).expect("configure should succeed");
        publisher.start(&pvs).expect("start should succeed");
    }
    for id in [1, 3] {
        registry
            .with_instance(id, |p| {
                p.prepare_cycle(&pvs)?;
                p.send_cycle(&pvs)
            })
            .expect("in range")
            .expect("cycle should succeed");
    }
    assert_eq!(factory.sent().len(), 2);
    assert!(matches!(
        registry.get(4),
        Err(Error::InstanceOutOfRange(4))
    ));

    assert!(registry.stop_all(&pvs).is_empty());
    let started = registry
        .with_instance(1, |p| p.is_started())
        .expect("in range");
    assert!(!started);
}
