use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use bytes::BytesMut;
use edtem_common::{Clock, MonotonicClock};
use edtem_hook::{Disposition, Hook, PacketMeta};
use edtem_wire::{set_ecn_ce, Classifier, EthernetClassifier};
use futures::Stream;
use tokio::time::{sleep_until, Instant, Sleep};
use tracing::trace;

/// A queued frame. Ordered by departure, then by arrival.
#[derive(Debug)]
struct Scheduled {
    departure: Instant,
    seq: u64,
    frame: BytesMut,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.departure, self.seq).cmp(&(other.departure, other.seq))
    }
}

/// Egress side of an emulated link.
///
/// Frames pushed with [`Link::enqueue`] go through the [`Hook`] and are then held until their
/// departure time. The link is a [`Stream`] of frames in departure order, frames with equal
/// departure times leaving in the order they were enqueued. It yields `None` once nothing is
/// queued; enqueuing more frames makes it productive again.
///
/// Departure times are converted to timer deadlines against the hook's clock at enqueue time, so
/// the clock should track real time (the default [`MonotonicClock`] does).
#[derive(Debug)]
pub struct Link<C = MonotonicClock, P = EthernetClassifier> {
    hook: Hook<C, P>,
    queue: BinaryHeap<Reverse<Scheduled>>,
    /// Arrival counter
    seq: u64,
    /// Timer armed for the head of the queue, created on first use
    timer: Option<Pin<Box<Sleep>>>,
}

impl<C: Clock, P: Classifier> Link<C, P> {
    /// Creates an empty link behind `hook`.
    pub fn new(hook: Hook<C, P>) -> Self {
        Self { hook, queue: BinaryHeap::new(), seq: 0, timer: None }
    }

    /// The hook every frame goes through.
    pub fn hook(&self) -> &Hook<C, P> {
        &self.hook
    }

    /// Runs `frame` through the hook and queues it unless it is dropped.
    pub fn enqueue(&mut self, mut frame: BytesMut) -> Disposition {
        let mut meta = PacketMeta::new(frame.len() as u32);
        let disposition = self.hook.process_frame(&frame, &mut meta);

        let now = Instant::now();
        let departure = match disposition {
            Disposition::Forward => now,
            Disposition::ForwardAt(departure_ns) => {
                let wait = departure_ns.saturating_sub(self.hook.clock().now_ns());
                now + Duration::from_nanos(wait)
            }
            Disposition::Drop(reason) => {
                trace!(%reason, len = meta.len, "frame dropped");
                return disposition;
            }
        };

        if meta.congestion_experienced && !set_ecn_ce(&mut frame) {
            trace!("congestion experienced on a not-ECT frame");
        }

        let seq = self.seq;
        self.seq += 1;
        self.queue.push(Reverse(Scheduled { departure, seq, frame }));

        disposition
    }

    /// Number of frames waiting to leave.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether no frame is waiting.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<C, P> Stream for Link<C, P>
where
    C: Clock + Unpin,
    P: Classifier + Unpin,
{
    type Item = BytesMut;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            let Some(Reverse(head)) = this.queue.peek() else {
                return Poll::Ready(None);
            };
            let departure = head.departure;

            if departure <= Instant::now() {
                return Poll::Ready(this.queue.pop().map(|Reverse(scheduled)| scheduled.frame));
            }

            let timer = this.timer.get_or_insert_with(|| Box::pin(sleep_until(departure)));
            timer.as_mut().reset(departure);
            if timer.as_mut().poll(cx).is_pending() {
                return Poll::Pending;
            }
        }
    }
}
