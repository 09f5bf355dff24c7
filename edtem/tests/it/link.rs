use std::{
    net::{IpAddr, Ipv4Addr},
    sync::Arc,
    time::{Duration, Instant},
};

use bytes::BytesMut;
use edtem::{Controller, Disposition, DropReason, FlowTable, Hook, Link, PacerOptions, PolicyStore};
use futures::StreamExt;
use pnet::packet::{
    ethernet::{EtherTypes, MutableEthernetPacket},
    ip::IpNextHeaderProtocols,
    ipv4::{self, Ipv4Packet, MutableIpv4Packet},
    MutablePacket,
};

const ETH_HDR: usize = 14;

/// A 1000-byte UDP frame from `source`, tagged with `seq` in its payload.
fn frame(source: Ipv4Addr, seq: u8, ecn: u8) -> BytesMut {
    let mut buf = vec![0u8; 1000];
    let mut eth = MutableEthernetPacket::new(&mut buf).unwrap();
    eth.set_ethertype(EtherTypes::Ipv4);

    let mut ip = MutableIpv4Packet::new(eth.payload_mut()).unwrap();
    ip.set_version(4);
    ip.set_header_length(5);
    ip.set_total_length((1000 - ETH_HDR) as u16);
    ip.set_ttl(64);
    ip.set_ecn(ecn);
    ip.set_next_level_protocol(IpNextHeaderProtocols::Udp);
    ip.set_source(source);
    ip.set_destination(Ipv4Addr::new(10, 0, 0, 254));
    ip.payload_mut()[0] = seq;
    let checksum = ipv4::checksum(&ip.to_immutable());
    ip.set_checksum(checksum);

    BytesMut::from(&buf[..])
}

fn seq(frame: &[u8]) -> u8 {
    frame[ETH_HDR + 20]
}

fn link() -> (Link, Controller) {
    let policies = Arc::new(PolicyStore::new());
    let hook = Hook::new(Arc::clone(&policies), Arc::new(FlowTable::new()));
    (Link::new(hook), Controller::new(policies))
}

#[tokio::test]
async fn frames_leave_in_order_at_link_rate() {
    let _ = tracing_subscriber::fmt::try_init();

    let (mut link, controller) = link();
    let source = Ipv4Addr::new(10, 0, 0, 1);
    // 1000-byte frames at 100 kbps are 10ms apart.
    controller.set_bandwidth("10.0.0.1/32".parse().unwrap(), 100).unwrap();

    let start = Instant::now();
    for seq in 0..3 {
        assert!(!link.enqueue(frame(source, seq, 0)).is_drop());
    }
    assert_eq!(link.len(), 3);

    let mut order = Vec::new();
    while let Some(frame) = link.next().await {
        order.push(seq(&frame));
    }

    assert_eq!(order, vec![0, 1, 2]);
    assert!(start.elapsed() >= Duration::from_millis(19), "left too early: {:?}", start.elapsed());
    assert!(link.is_empty());
}

#[tokio::test]
async fn overdue_frame_leaves_before_a_later_immediate_one() {
    let (mut link, controller) = link();
    let source = Ipv4Addr::new(10, 0, 0, 1);
    controller.set_bandwidth("10.0.0.1/32".parse().unwrap(), 100).unwrap();

    assert_eq!(link.enqueue(frame(source, 0, 0)), Disposition::Forward);
    assert!(link.enqueue(frame(source, 1, 0)).departure_ns().is_some());

    // Frame 1 becomes due while nobody polls; frame 2 then finds the flow idle.
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(link.enqueue(frame(source, 2, 0)), Disposition::Forward);

    let order: Vec<u8> = link.by_ref().map(|frame| seq(&frame)).collect().await;
    assert_eq!(order, vec![0, 1, 2]);
}

#[tokio::test]
async fn overflowing_frames_are_not_queued() {
    let policies = Arc::new(PolicyStore::new());
    let options = PacerOptions::default()
        .with_ecn_horizon(Duration::from_micros(500))
        .with_time_horizon(Duration::from_micros(1_500));
    let hook = Hook::new(Arc::clone(&policies), Arc::new(FlowTable::new())).with_options(options);
    let mut link = Link::new(hook);
    Controller::new(policies).set_bandwidth("10.0.0.4/32".parse().unwrap(), 1_000).unwrap();

    // 1000-byte frames at 1000 kbps are 1ms apart: the third would wait 2ms.
    let source = Ipv4Addr::new(10, 0, 0, 4);
    assert_eq!(link.enqueue(frame(source, 0, 0b10)), Disposition::Forward);
    assert!(link.enqueue(frame(source, 1, 0b10)).departure_ns().is_some());
    assert_eq!(
        link.enqueue(frame(source, 2, 0b10)),
        Disposition::Drop(DropReason::QueueOverflow)
    );
    assert_eq!(link.len(), 2);

    let out: Vec<BytesMut> = link.by_ref().collect().await;
    let ecn: Vec<u8> =
        out.iter().map(|frame| Ipv4Packet::new(&frame[ETH_HDR..]).unwrap().get_ecn()).collect();
    assert_eq!(ecn, vec![0b10, 0b11]);

    let stats = link.hook().stats().snapshot();
    assert_eq!((stats.ecn_marked, stats.dropped_overflow), (1, 1));
}

#[tokio::test]
async fn blocked_source_is_dropped_and_others_pass() {
    let (mut link, controller) = link();
    let blocked = Ipv4Addr::new(10, 0, 0, 2);
    let unmanaged = Ipv4Addr::new(10, 0, 9, 9);
    controller.block_link("10.0.0.2/32".parse().unwrap()).unwrap();

    assert_eq!(link.enqueue(frame(blocked, 0, 0)), Disposition::Drop(DropReason::LinkDown));
    assert_eq!(link.enqueue(frame(unmanaged, 1, 0)), Disposition::Forward);

    let out = tokio::time::timeout(Duration::from_secs(1), link.next()).await.unwrap().unwrap();
    assert_eq!(seq(&out), 1);
    assert!(link.next().await.is_none());

    let stats = link.hook().stats().snapshot();
    assert_eq!((stats.dropped_link_down, stats.passthrough), (1, 1));
    assert!(link.hook().flows().get(IpAddr::V4(unmanaged)).is_none());
}

#[tokio::test]
async fn congested_frames_carry_ce() {
    let policies = Arc::new(PolicyStore::new());
    let hook = Hook::new(Arc::clone(&policies), Arc::new(FlowTable::new()))
        .with_options(PacerOptions::default().with_ecn_horizon(Duration::from_micros(500)));
    let mut link = Link::new(hook);
    Controller::new(policies).set_bandwidth("10.0.0.3/32".parse().unwrap(), 1_000).unwrap();

    let source = Ipv4Addr::new(10, 0, 0, 3);
    link.enqueue(frame(source, 0, 0b10));
    link.enqueue(frame(source, 1, 0b10));

    let first = link.next().await.unwrap();
    let second = link.next().await.unwrap();

    let first_ip = Ipv4Packet::new(&first[ETH_HDR..]).unwrap();
    let second_ip = Ipv4Packet::new(&second[ETH_HDR..]).unwrap();
    assert_eq!(first_ip.get_ecn(), 0b10);
    assert_eq!(second_ip.get_ecn(), 0b11);
    assert_eq!(second_ip.get_checksum(), ipv4::checksum(&second_ip));
}
