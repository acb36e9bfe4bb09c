//! Sample streamer.
//!
//! This module contains the [`Streamer`], which polls the sample FIFO, drains
//! it in bursts of [`BURST_WORDS`] words, and sends each burst as a
//! [`StreamFrame`] to the destination given by the [`StreamConfig`].

use crate::{
    config::StreamConfig,
    fifo::SampleFifo,
    frame::{FrameCounter, StreamFrame, BURST_WORDS},
    mmio::RegisterAccess,
    sink::FrameSink,
};
use anyhow::{Context, Result};
use std::time::Duration;

/// Streamer state.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum State {
    /// Streaming is disabled.
    Idle,
    /// Waiting for the FIFO to hold a full burst.
    Polling,
    /// Reading a burst from the FIFO into a frame.
    Draining,
    /// Sending a frame.
    Transmitting,
}

/// Outcome of one streamer cycle.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Cycle {
    /// Streaming is disabled; nothing was done.
    Idle,
    /// The FIFO held fewer words than a burst.
    Waiting {
        /// FIFO occupancy read in this cycle.
        occupancy: usize,
    },
    /// A frame was sent.
    Sent {
        /// Counter of the frame that was sent.
        counter: u16,
    },
}

/// Sample streamer.
///
/// The streamer owns the sample FIFO and the network sink. It only reads the
/// [`StreamConfig`], once per cycle.
#[derive(Debug)]
pub struct Streamer<R, S> {
    fifo: SampleFifo<R>,
    sink: S,
    config: StreamConfig,
    counter: FrameCounter,
    frame: StreamFrame,
    state: State,
    poll_interval: Duration,
    idle_interval: Duration,
}

impl<R: RegisterAccess, S: FrameSink> Streamer<R, S> {
    /// Creates a new streamer.
    ///
    /// The frame counter starts at zero. The streamer spins while polling the
    /// FIFO, and sleeps 1 ms between cycles while streaming is disabled. See
    /// [`Streamer::with_intervals`].
    pub fn new(fifo: SampleFifo<R>, sink: S, config: StreamConfig) -> Streamer<R, S> {
        Streamer {
            fifo,
            sink,
            config,
            counter: FrameCounter::default(),
            frame: StreamFrame::new(),
            state: State::Idle,
            poll_interval: Duration::ZERO,
            idle_interval: Duration::from_millis(1),
        }
    }

    /// Sets the backoff intervals of the streamer loop.
    ///
    /// `poll_interval` is the time to sleep after finding the FIFO without a
    /// full burst. If zero, the loop spins. `idle_interval` is the time to
    /// sleep between cycles while streaming is disabled. Neither changes what
    /// is sent; they only trade CPU usage for latency.
    pub fn with_intervals(mut self, poll_interval: Duration, idle_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.idle_interval = idle_interval;
        self
    }

    /// Sets the value of the frame counter for the next frame.
    pub fn with_counter(mut self, counter: u16) -> Self {
        self.counter = FrameCounter::new(counter);
        self
    }

    /// Returns the counter that the next frame will carry.
    pub fn counter(&self) -> u16 {
        self.counter.value()
    }

    /// Returns the current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Runs one cycle of the streamer.
    ///
    /// If streaming is enabled and the FIFO holds at least a burst, exactly
    /// one burst is drained and sent. Otherwise the FIFO is not touched
    /// beyond reading its occupancy.
    ///
    /// A send failure is returned as an error. The burst that failed to send
    /// is lost, and the frame counter is not advanced.
    pub fn cycle(&mut self) -> Result<Cycle> {
        let Some(destination) = self.config.stream_target() else {
            self.transition(State::Idle);
            return Ok(Cycle::Idle);
        };
        self.transition(State::Polling);

        let occupancy = self.fifo.occupancy();
        if occupancy < BURST_WORDS {
            return Ok(Cycle::Waiting { occupancy });
        }

        self.transition(State::Draining);
        let counter = self.counter.value();
        self.frame.set_counter(counter);
        for n in 0..BURST_WORDS {
            let word = self.fifo.pop();
            self.frame.set_word(n, word);
        }

        self.transition(State::Transmitting);
        let sent = self
            .sink
            .send(&self.frame, destination)
            .with_context(|| format!("failed to send frame {counter} to {destination}"));
        self.transition(State::Polling);
        sent?;
        self.counter.advance();
        tracing::trace!(counter, %destination, occupancy, "sent frame");
        Ok(Cycle::Sent { counter })
    }

    /// Runs the streamer.
    ///
    /// This function only returns if there is an error, which happens when a
    /// frame cannot be sent. It blocks the calling thread, so it should be
    /// run in a dedicated thread.
    #[tracing::instrument(name = "streamer", skip_all)]
    pub fn run(mut self) -> Result<()> {
        tracing::info!(
            destination = %self.config.destination(),
            poll_interval = ?self.poll_interval,
            idle_interval = ?self.idle_interval,
            "streamer started"
        );
        loop {
            match self.cycle()? {
                Cycle::Idle => std::thread::sleep(self.idle_interval),
                Cycle::Waiting { .. } => {
                    if self.poll_interval.is_zero() {
                        std::hint::spin_loop();
                    } else {
                        std::thread::sleep(self.poll_interval);
                    }
                }
                Cycle::Sent { .. } => (),
            }
        }
    }

    fn transition(&mut self, state: State) {
        if state == self.state {
            return;
        }
        match (self.state, state) {
            (State::Idle, _) => tracing::info!("streaming enabled"),
            (_, State::Idle) => tracing::info!("streaming disabled"),
            (from, to) => tracing::trace!(?from, ?to, "streamer state"),
        }
        self.state = state;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mmio::sim::SimFifo;
    use std::net::{Ipv4Addr, SocketAddr};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, Default)]
    struct RecordingSink(Arc<Mutex<Vec<(SocketAddr, StreamFrame)>>>);

    impl RecordingSink {
        fn frames(&self) -> Vec<(SocketAddr, StreamFrame)> {
            self.0.lock().unwrap().clone()
        }
    }

    impl FrameSink for RecordingSink {
        fn send(&mut self, frame: &StreamFrame, destination: SocketAddr) -> Result<()> {
            self.0.lock().unwrap().push((destination, frame.clone()));
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct CountingSink(usize);

    impl FrameSink for CountingSink {
        fn send(&mut self, _: &StreamFrame, _: SocketAddr) -> Result<()> {
            self.0 += 1;
            Ok(())
        }
    }

    #[derive(Debug)]
    struct FailingSink;

    impl FrameSink for FailingSink {
        fn send(&mut self, _: &StreamFrame, _: SocketAddr) -> Result<()> {
            anyhow::bail!("network unreachable")
        }
    }

    fn streamer(
        words: impl IntoIterator<Item = u32>,
    ) -> (Streamer<SimFifo, RecordingSink>, SimFifo, RecordingSink, StreamConfig) {
        let fifo = SimFifo::with_words(words);
        let sink = RecordingSink::default();
        let config = StreamConfig::new(Ipv4Addr::new(192, 168, 1, 50));
        let streamer = Streamer::new(SampleFifo::new(fifo.clone()), sink.clone(), config.clone());
        (streamer, fifo, sink, config)
    }

    #[test]
    fn partial_burst_is_not_drained() {
        let (mut streamer, fifo, sink, _) = streamer(0..255);
        assert_eq!(streamer.cycle().unwrap(), Cycle::Waiting { occupancy: 255 });
        assert_eq!(streamer.state(), State::Polling);
        assert_eq!(fifo.len(), 255);
        assert!(sink.frames().is_empty());
    }

    #[test]
    fn full_burst_is_drained() {
        let (mut streamer, fifo, sink, _) = streamer(0..300);
        assert_eq!(streamer.cycle().unwrap(), Cycle::Sent { counter: 0 });
        assert_eq!(fifo.len(), 300 - 256);
        let frames = sink.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].0, "192.168.1.50:25344".parse().unwrap());
        assert!(frames[0].1.words().eq(0..256));
        // the rest is not enough for another burst
        assert_eq!(streamer.cycle().unwrap(), Cycle::Waiting { occupancy: 44 });
        assert_eq!(streamer.counter(), 1);
    }

    #[test]
    fn exactly_one_burst_per_cycle() {
        let (mut streamer, fifo, sink, _) = streamer(0..1024);
        assert_eq!(streamer.cycle().unwrap(), Cycle::Sent { counter: 0 });
        assert_eq!(fifo.len(), 768);
        assert_eq!(sink.frames().len(), 1);
    }

    #[test]
    fn two_frames_end_to_end() {
        let words: Vec<u32> = (0..512u32).map(|n| n.wrapping_mul(0x0101_0101) ^ 0xa5a5).collect();
        let (streamer, _, sink, _) = streamer(words.iter().copied());
        let mut streamer = streamer.with_counter(0xffff);
        let mut sent = Vec::new();
        loop {
            match streamer.cycle().unwrap() {
                Cycle::Sent { counter } => sent.push(counter),
                Cycle::Waiting { occupancy } => {
                    assert_eq!(occupancy, 0);
                    break;
                }
                Cycle::Idle => panic!("streaming should be enabled"),
            }
        }
        assert_eq!(sent, vec![0xffff, 0]);
        let frames = sink.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].1.counter(), 0xffff);
        assert_eq!(frames[1].1.counter(), 0);
        assert!(frames[0].1.words().eq(words[..256].iter().copied()));
        assert!(frames[1].1.words().eq(words[256..].iter().copied()));
        for (_, frame) in &frames {
            assert_eq!(frame.as_bytes().len(), 1026);
        }
    }

    #[test]
    fn disabled_streaming_leaves_fifo() {
        let (mut streamer, fifo, sink, config) = streamer(0..512);
        config.set_streaming(false);
        assert_eq!(streamer.cycle().unwrap(), Cycle::Idle);
        assert_eq!(streamer.state(), State::Idle);
        assert_eq!(fifo.len(), 512);
        config.set_streaming(true);
        assert_eq!(streamer.cycle().unwrap(), Cycle::Sent { counter: 0 });
        assert_eq!(fifo.len(), 256);
        assert_eq!(sink.frames().len(), 1);
    }

    #[test]
    fn destination_change_applies_to_next_frame() {
        let (mut streamer, _, sink, config) = streamer(0..512);
        streamer.cycle().unwrap();
        config.set_destination(Ipv4Addr::new(10, 1, 2, 3));
        streamer.cycle().unwrap();
        let frames = sink.frames();
        assert_eq!(frames[0].0, "192.168.1.50:25344".parse().unwrap());
        assert_eq!(frames[1].0, "10.1.2.3:25344".parse().unwrap());
    }

    #[test]
    fn send_failure_is_fatal_and_keeps_counter() {
        let fifo = SimFifo::with_words(0..512);
        let config = StreamConfig::new(Ipv4Addr::LOCALHOST);
        let mut streamer =
            Streamer::new(SampleFifo::new(fifo.clone()), FailingSink, config).with_counter(7);
        let err = streamer.cycle().unwrap_err();
        assert!(format!("{err:#}").contains("network unreachable"));
        assert_eq!(streamer.counter(), 7);
        // the burst has been consumed anyway
        assert_eq!(fifo.len(), 256);
    }

    #[test]
    fn counter_wraps_after_65536_frames() {
        let fifo = SimFifo::default();
        let config = StreamConfig::new(Ipv4Addr::LOCALHOST);
        let sink = CountingSink::default();
        let mut streamer =
            Streamer::new(SampleFifo::new(fifo.clone()), sink, config).with_counter(100);
        for _ in 0..65536 {
            fifo.push(0..256);
            assert!(matches!(streamer.cycle().unwrap(), Cycle::Sent { .. }));
        }
        assert_eq!(streamer.counter(), 100);
        assert_eq!(streamer.sink.0, 65536);
    }

    #[test]
    fn concurrent_destination_changes() {
        let a = Ipv4Addr::new(10, 0, 0, 1);
        let b = Ipv4Addr::new(172, 31, 255, 254);
        let (mut streamer, fifo, sink, config) = streamer(std::iter::empty());
        config.set_destination(a);
        let writer = std::thread::spawn(move || {
            for n in 0..20_000 {
                config.set_destination(if n % 2 == 0 { b } else { a });
            }
        });
        for _ in 0..2_000 {
            fifo.push(0..256);
            streamer.cycle().unwrap();
        }
        writer.join().unwrap();
        let valid: [SocketAddr; 2] = [(a, 25344).into(), (b, 25344).into()];
        let frames = sink.frames();
        assert_eq!(frames.len(), 2_000);
        for (destination, _) in frames {
            assert!(valid.contains(&destination), "spliced destination {destination}");
        }
    }
}
