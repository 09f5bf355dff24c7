use std::{
    net::{IpAddr, Ipv4Addr},
    sync::Arc,
    thread,
};

use edtem_common::ManualClock;
use edtem_hook::{Hook, PacketMeta};
use edtem_maps::{FlowTable, Policy, PolicyStore};
use edtem_wire::{Classification, Protocol};

const THREADS: u32 = 8;
const PACKETS: u64 = 1_000;

fn shared_hook() -> Arc<Hook<ManualClock>> {
    Arc::new(
        Hook::new(Arc::new(PolicyStore::new()), Arc::new(FlowTable::new()))
            .with_clock(ManualClock::new(0)),
    )
}

#[test]
fn distinct_sources_do_not_interfere() {
    let _ = tracing_subscriber::fmt::try_init();
    let hook = shared_hook();

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let hook = Arc::clone(&hook);
            let source = IpAddr::V4(Ipv4Addr::new(10, 1, 0, t as u8));
            hook.policies().insert(source, Policy::new(1000, 0)).unwrap();

            thread::spawn(move || {
                let class = Classification { source, protocol: Protocol::UDP };
                (0..PACKETS)
                    .map(|_| hook.process(class, &mut PacketMeta::new(1000)).departure_ns())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        let departures = handle.join().unwrap();
        assert_eq!(departures[0], None);
        for (i, departure) in departures.iter().enumerate().skip(1) {
            assert_eq!(*departure, Some(i as u64 * 1_000_000));
        }
    }

    assert_eq!(hook.stats().packets(), u64::from(THREADS) * PACKETS);
}

#[test]
fn contended_source_is_never_over_paced() {
    let hook = shared_hook();
    let source = IpAddr::V4(Ipv4Addr::new(10, 2, 0, 1));
    hook.policies().insert(source, Policy::new(1_000_000, 0)).unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let hook = Arc::clone(&hook);
            thread::spawn(move || {
                let class = Classification { source, protocol: Protocol::TCP };
                for _ in 0..PACKETS {
                    assert!(!hook.process(class, &mut PacketMeta::new(1000)).is_drop());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // Racing packets may share a slot, so the clock can only end up at or below the exact
    // schedule, never beyond it.
    let total = u64::from(THREADS) * PACKETS;
    let last = hook.flows().get(source).unwrap();
    assert!(last <= (total - 1) * 1_000, "clock ran ahead: {last}");
    assert!(last > 0);
}
