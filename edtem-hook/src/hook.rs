use std::sync::Arc;

use edtem_common::{Clock, MonotonicClock};
use edtem_maps::{FlowTable, PolicyStore};
use edtem_wire::{Classification, Classifier, EthernetClassifier};
use tracing::trace;

use crate::{latency, Disposition, HookStats, Pacer, PacerOptions, PacketMeta};

/// Entry point invoked once per packet.
///
/// The hook is shared by reference between all threads that see packets; it holds no per-call
/// state and every call runs to completion without blocking on other packets.
///
/// # Example
///
/// ```
/// use std::{net::IpAddr, sync::Arc};
///
/// use edtem_common::ManualClock;
/// use edtem_hook::{Disposition, Hook, PacketMeta};
/// use edtem_maps::{FlowTable, Policy, PolicyStore};
/// use edtem_wire::{Classification, Protocol};
///
/// let policies = Arc::new(PolicyStore::new());
/// let source: IpAddr = "10.0.0.1".parse().unwrap();
/// policies.insert(source, Policy::new(1000, 500)).unwrap();
///
/// let hook = Hook::new(policies, Arc::new(FlowTable::new())).with_clock(ManualClock::new(1));
/// let class = Classification { source, protocol: Protocol::UDP };
///
/// let mut meta = PacketMeta::new(1000);
/// assert_eq!(hook.process(class, &mut meta), Disposition::ForwardAt(500_001));
/// ```
#[derive(Debug)]
pub struct Hook<C = MonotonicClock, P = EthernetClassifier> {
    policies: Arc<PolicyStore>,
    pacer: Pacer,
    clock: C,
    classifier: P,
    stats: Arc<HookStats>,
}

impl Hook {
    /// Creates a hook on the monotonic clock, classifying Ethernet frames.
    pub fn new(policies: Arc<PolicyStore>, flows: Arc<FlowTable>) -> Self {
        Self {
            policies,
            pacer: Pacer::new(flows),
            clock: MonotonicClock::new(),
            classifier: EthernetClassifier,
            stats: Arc::new(HookStats::default()),
        }
    }
}

impl<C, P> Hook<C, P> {
    /// Replaces the pacing thresholds. Flow state is kept.
    pub fn with_options(self, options: PacerOptions) -> Self {
        let pacer = Pacer::with_options(Arc::clone(self.pacer.flows()), options);
        Self { pacer, ..self }
    }

    /// Replaces the clock. Departure times are expressed in this clock's domain.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Hook<C2, P> {
        Hook {
            policies: self.policies,
            pacer: self.pacer,
            clock,
            classifier: self.classifier,
            stats: self.stats,
        }
    }

    /// Replaces the frame classifier.
    pub fn with_classifier<P2: Classifier>(self, classifier: P2) -> Hook<C, P2> {
        Hook {
            policies: self.policies,
            pacer: self.pacer,
            clock: self.clock,
            classifier,
            stats: self.stats,
        }
    }

    /// The policy table consulted per packet.
    pub fn policies(&self) -> &Arc<PolicyStore> {
        &self.policies
    }

    /// The per-source flow state.
    pub fn flows(&self) -> &Arc<FlowTable> {
        self.pacer.flows()
    }

    /// Packet counters.
    pub fn stats(&self) -> &Arc<HookStats> {
        &self.stats
    }

    /// The clock departure times are measured against.
    pub fn clock(&self) -> &C {
        &self.clock
    }
}

impl<C: Clock, P: Classifier> Hook<C, P> {
    /// Classifies `frame` and decides its fate. `meta` must describe the same packet.
    pub fn process_frame(&self, frame: &[u8], meta: &mut PacketMeta) -> Disposition {
        match self.classifier.classify(frame) {
            Some(class) => self.process(class, meta),
            None => {
                self.stats.increment_packets();
                self.passthrough(meta)
            }
        }
    }

    /// Decides the fate of an already classified packet.
    pub fn process(&self, class: Classification, meta: &mut PacketMeta) -> Disposition {
        self.stats.increment_packets();

        if !class.protocol.is_tracked() {
            return self.passthrough(meta);
        }

        let Some(policy) = self.policies.lookup(class.source) else {
            return self.passthrough(meta);
        };

        let now = self.clock.now_ns();
        match self.pacer.pace(meta, class.source, policy, now) {
            Ok(departure) => self.stats.record_departure(departure),
            Err(reason) => {
                trace!(source = %class.source, %reason, "dropping packet");
                self.stats.record_drop(reason);
                return Disposition::Drop(reason);
            }
        }

        if meta.congestion_experienced {
            self.stats.increment_ecn_marked();
        }

        latency::inject_delay(meta, policy.delay_us, now);
        Disposition::from_meta(meta)
    }

    fn passthrough(&self, meta: &PacketMeta) -> Disposition {
        self.stats.increment_passthrough();
        Disposition::from_meta(meta)
    }
}
