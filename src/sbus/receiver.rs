//! # S.bus Frame Synchronizer
//!
//! Reconstructs frame boundaries from an unframed byte stream and feeds
//! complete frames through the channel decoder.
//!
//! S.bus carries no per-frame delimiter beyond the two sentinel bytes, so
//! framing is recovered from inter-byte silence: the minimum frame spacing
//! is 7 ms, while 25 bytes at 100,000 bps take about 2 ms to transmit. Any
//! gap of more than 3 ms therefore means the partial frame is dead and the
//! next byte starts a new one.

use tokio::sync::watch;
use tracing::{debug, trace};

use super::decoder::{decode_frame, DecodedFrame};
use super::protocol::*;
use crate::clock::MonotonicClock;
use crate::serial::byte_source::SbusByteSource;

/// Inter-byte gap that restarts frame accumulation, in microseconds
pub const SBUS_RESYNC_GAP_US: u64 = 3_000;

/// Window after a decoded frame during which the link counts as live, in microseconds
pub const SBUS_LINK_TIMEOUT_US: u64 = 200_000;

/// S.bus receiver: frame synchronizer state plus the report publisher.
///
/// Owns all mutable decoder state, so independent receivers can coexist and
/// tests can drive one deterministically through mock byte sources and
/// clocks.
pub struct SbusReceiver<S, C> {
    source: S,
    clock: C,

    /// Scratch buffer the current frame is assembled in
    frame: [u8; SBUS_FRAME_SIZE],
    /// Bytes of `frame` filled so far
    partial_frame_count: usize,

    /// Timestamp of the most recent received byte
    last_rx_time: u64,
    /// Timestamp of the most recent successfully decoded frame
    last_frame_time: Option<u64>,

    frames_decoded: u64,
    frame_drops: u64,

    /// Consumer capacity; caps the published channel count
    max_channels: usize,

    report_tx: watch::Sender<RcReport>,
}

impl<S, C> SbusReceiver<S, C>
where
    S: SbusByteSource,
    C: MonotonicClock,
{
    /// Create a receiver reading from `source` against `clock`
    ///
    /// # Arguments
    ///
    /// * `source` - Already-opened, already-configured byte stream
    /// * `clock` - Monotonic microsecond clock
    /// * `max_channels` - Consumer capacity; published channel count never exceeds `min(max_channels, 18)`
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sbus_bridge::clock::StdClock;
    /// use sbus_bridge::sbus::receiver::SbusReceiver;
    /// use sbus_bridge::serial::SbusSerial;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let serial = SbusSerial::open()?;
    ///     let mut receiver = SbusReceiver::new(serial.into_source(), StdClock::new(), 18);
    ///
    ///     let link_up = receiver.poll().await;
    ///     # let _ = link_up;
    ///     Ok(())
    /// }
    /// ```
    pub fn new(source: S, clock: C, max_channels: usize) -> Self {
        let last_rx_time = clock.now();
        let (report_tx, _) = watch::channel(RcReport::default());

        Self {
            source,
            clock,
            frame: [0; SBUS_FRAME_SIZE],
            partial_frame_count: 0,
            last_rx_time,
            last_frame_time: None,
            frames_decoded: 0,
            frame_drops: 0,
            max_channels,
            report_tx,
        }
    }

    /// Subscribe to published channel reports.
    ///
    /// Each decoded frame replaces the whole snapshot at once; the watch
    /// channel's change notification serves as the report-due signal.
    pub fn subscribe(&self) -> watch::Receiver<RcReport> {
        self.report_tx.subscribe()
    }

    /// Frames discarded due to timing resyncs or bad sentinels.
    ///
    /// Monotonically increasing; never reset by the receiver.
    pub fn frame_drops(&self) -> u64 {
        self.frame_drops
    }

    /// Frames successfully decoded into channel reports
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    /// Service one I/O opportunity.
    ///
    /// Call whenever bytes may be available. Reads at most the remaining
    /// space of the frame in progress, decodes when the buffer reaches 25
    /// bytes, and publishes the result. An empty or failed read returns
    /// early and changes nothing but the resync bookkeeping.
    ///
    /// # Returns
    ///
    /// * `bool` - True iff a frame was successfully decoded within the
    ///   last 200 ms, independent of whether this call produced data
    pub async fn poll(&mut self) -> bool {
        let now = self.clock.now();

        // A gap this long means bytes were lost or a new frame has begun;
        // appending to the old buffer would corrupt decoding.
        if now.saturating_sub(self.last_rx_time) > SBUS_RESYNC_GAP_US && self.partial_frame_count > 0 {
            trace!(
                partial = self.partial_frame_count,
                "inter-frame gap exceeded, dropping partial frame"
            );
            self.frame_drops += 1;
            self.partial_frame_count = 0;
        }

        // Fetch bytes, but no more than we need to complete the current
        // frame, so one read can never span two frames.
        let read = self.source.read(&mut self.frame[self.partial_frame_count..]).await;

        let count = match read {
            Ok(count) if count > 0 => count,
            // No data yet, or a transient read failure; try again next call
            _ => return self.link_up(now),
        };

        self.last_rx_time = now;
        self.partial_frame_count += count;

        if self.partial_frame_count < SBUS_FRAME_SIZE {
            return self.link_up(now);
        }

        match decode_frame(&self.frame, self.max_channels) {
            Ok(DecodedFrame::Channels { values, count }) => {
                self.last_frame_time = Some(now);
                self.frames_decoded += 1;

                self.report_tx.send_replace(RcReport {
                    channels: values,
                    channel_count: count,
                    timestamp_us: now,
                    failsafe: false,
                });
            }
            Ok(DecodedFrame::Failsafe) => {
                // Actively announce signal loss; the liveness flag degrades
                // on its own since last_frame_time stays put.
                debug!("failsafe frame received, publishing zero channels");

                self.report_tx.send_replace(RcReport {
                    channels: [0; SBUS_MAX_CHANNELS],
                    channel_count: 0,
                    timestamp_us: now,
                    failsafe: true,
                });
            }
            Err(e) => {
                debug!("dropping frame: {}", e);
                self.frame_drops += 1;
            }
        }

        // The buffer is always consumed whole
        self.partial_frame_count = 0;

        self.link_up(now)
    }

    fn link_up(&self, now: u64) -> bool {
        self.last_frame_time
            .map_or(false, |t| now.saturating_sub(t) < SBUS_LINK_TIMEOUT_US)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::mocks::MockClock;
    use crate::sbus::testutil::build_frame;
    use crate::serial::byte_source::mocks::MockByteSource;
    use std::io;

    fn receiver(max_channels: usize) -> (SbusReceiver<MockByteSource, MockClock>, MockByteSource, MockClock) {
        let source = MockByteSource::new();
        let clock = MockClock::new();
        let rx = SbusReceiver::new(source.clone(), clock.clone(), max_channels);
        (rx, source, clock)
    }

    fn centered_frame() -> [u8; SBUS_FRAME_SIZE] {
        build_frame(&[1024; SBUS_PROPORTIONAL_CHANNELS], 0)
    }

    #[tokio::test]
    async fn test_poll_decodes_complete_frame() {
        let (mut rx, source, clock) = receiver(18);
        let mut reports = rx.subscribe();

        clock.set(10_000);
        source.push_bytes(&centered_frame());

        assert!(rx.poll().await);
        assert_eq!(rx.frames_decoded(), 1);
        assert_eq!(rx.frame_drops(), 0);

        assert!(reports.has_changed().unwrap());
        let report = *reports.borrow_and_update();
        assert_eq!(report.channel_count, 18);
        assert_eq!(report.timestamp_us, 10_000);
        assert!(!report.failsafe);
        assert_eq!(report.channels[0], 1510);
        assert_eq!(report.channels[15], 1510);
        assert_eq!(report.channels[16], 998);
    }

    #[tokio::test]
    async fn test_poll_assembles_frame_across_reads() {
        let (mut rx, source, clock) = receiver(18);
        let frame = centered_frame();

        clock.set(1_000);
        source.push_bytes(&frame[..10]);
        assert!(!rx.poll().await);
        assert_eq!(rx.frames_decoded(), 0);

        clock.set(2_000);
        source.push_bytes(&frame[10..]);
        assert!(rx.poll().await);
        assert_eq!(rx.frames_decoded(), 1);
        assert_eq!(rx.frame_drops(), 0);
    }

    #[tokio::test]
    async fn test_read_never_spans_two_frames() {
        let (mut rx, source, clock) = receiver(18);

        // Two back-to-back frames queued as one chunk
        let mut stream = Vec::new();
        stream.extend_from_slice(&centered_frame());
        stream.extend_from_slice(&build_frame(&[0; SBUS_PROPORTIONAL_CHANNELS], 0));
        source.push_bytes(&stream);

        clock.set(1_000);
        assert!(rx.poll().await);
        assert_eq!(rx.frames_decoded(), 1);

        clock.set(2_000);
        assert!(rx.poll().await);
        assert_eq!(rx.frames_decoded(), 2);
        assert_eq!(rx.frame_drops(), 0);
    }

    #[tokio::test]
    async fn test_gap_discards_partial_frame() {
        let (mut rx, source, clock) = receiver(18);
        let frame = centered_frame();

        clock.set(1_000);
        source.push_bytes(&frame[..10]);
        assert!(!rx.poll().await);

        // 4 ms of silence, then a fresh complete frame
        clock.set(5_001);
        source.push_bytes(&frame);
        assert!(rx.poll().await);

        assert_eq!(rx.frame_drops(), 1);
        assert_eq!(rx.frames_decoded(), 1);
    }

    #[tokio::test]
    async fn test_gap_at_exactly_threshold_keeps_partial() {
        let (mut rx, source, clock) = receiver(18);
        let frame = centered_frame();

        clock.set(1_000);
        source.push_bytes(&frame[..10]);
        assert!(!rx.poll().await);

        // Exactly 3 ms is not yet a resync
        clock.set(4_000);
        source.push_bytes(&frame[10..]);
        assert!(rx.poll().await);

        assert_eq!(rx.frame_drops(), 0);
        assert_eq!(rx.frames_decoded(), 1);
    }

    #[tokio::test]
    async fn test_empty_read_changes_nothing() {
        let (mut rx, _source, clock) = receiver(18);

        clock.set(1_000);
        assert!(!rx.poll().await);
        assert_eq!(rx.frames_decoded(), 0);
        assert_eq!(rx.frame_drops(), 0);
    }

    #[tokio::test]
    async fn test_read_errors_are_ignored() {
        let (mut rx, source, clock) = receiver(18);

        clock.set(1_000);
        source.push_error(io::ErrorKind::BrokenPipe);
        assert!(!rx.poll().await);
        assert_eq!(rx.frame_drops(), 0);

        // The stream recovers on the next call
        source.push_bytes(&centered_frame());
        clock.set(2_000);
        assert!(rx.poll().await);
        assert_eq!(rx.frames_decoded(), 1);
    }

    #[tokio::test]
    async fn test_bad_sentinel_drops_frame_and_keeps_output() {
        let (mut rx, source, clock) = receiver(18);
        let mut reports = rx.subscribe();

        clock.set(1_000);
        source.push_bytes(&centered_frame());
        assert!(rx.poll().await);
        let published = *reports.borrow_and_update();

        let mut corrupt = centered_frame();
        corrupt[0] = 0xAA;
        clock.set(2_000);
        source.push_bytes(&corrupt);
        rx.poll().await;

        assert_eq!(rx.frame_drops(), 1);
        // Previously published output is untouched
        assert!(!reports.has_changed().unwrap());
        assert_eq!(*reports.borrow(), published);
    }

    #[tokio::test]
    async fn test_failsafe_publishes_zero_channels() {
        let (mut rx, source, clock) = receiver(18);
        let mut reports = rx.subscribe();

        clock.set(1_000);
        source.push_bytes(&build_frame(
            &[1024; SBUS_PROPORTIONAL_CHANNELS],
            SBUS_FLAG_SIGNAL_LOST | SBUS_FLAG_FAILSAFE,
        ));

        // Failsafe never counts as a good frame for liveness
        assert!(!rx.poll().await);
        assert_eq!(rx.frames_decoded(), 0);
        assert_eq!(rx.frame_drops(), 0);

        let report = *reports.borrow_and_update();
        assert_eq!(report.channel_count, 0);
        assert!(report.failsafe);
    }

    #[tokio::test]
    async fn test_liveness_window() {
        let (mut rx, source, clock) = receiver(18);

        clock.set(10_000);
        source.push_bytes(&centered_frame());
        assert!(rx.poll().await);

        // Still live just inside the window, with no new data
        clock.set(10_000 + SBUS_LINK_TIMEOUT_US - 1);
        assert!(rx.poll().await);

        // Stale at the boundary
        clock.set(10_000 + SBUS_LINK_TIMEOUT_US);
        assert!(!rx.poll().await);

        // A fresh frame brings the link back
        clock.advance(1_000);
        source.push_bytes(&centered_frame());
        assert!(rx.poll().await);
    }

    #[tokio::test]
    async fn test_link_down_before_first_frame() {
        let (mut rx, _source, clock) = receiver(18);

        // Whatever the clock reads, no decode yet means no link
        clock.set(50);
        assert!(!rx.poll().await);
    }

    #[tokio::test]
    async fn test_channel_capacity_limits_report() {
        let (mut rx, source, clock) = receiver(8);
        let mut reports = rx.subscribe();

        clock.set(1_000);
        source.push_bytes(&centered_frame());
        assert!(rx.poll().await);

        let report = *reports.borrow_and_update();
        assert_eq!(report.channel_count, 8);
    }

    #[tokio::test]
    async fn test_new_frame_overwrites_previous_report() {
        let (mut rx, source, clock) = receiver(18);
        let mut reports = rx.subscribe();

        clock.set(1_000);
        source.push_bytes(&build_frame(&[0; SBUS_PROPORTIONAL_CHANNELS], 0));
        rx.poll().await;

        clock.set(15_000);
        source.push_bytes(&centered_frame());
        rx.poll().await;

        let report = *reports.borrow_and_update();
        assert_eq!(report.channels[0], 1510);
        assert_eq!(report.timestamp_us, 15_000);
        assert_eq!(rx.frames_decoded(), 2);
    }
}
