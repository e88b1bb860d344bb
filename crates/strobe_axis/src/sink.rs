//! Sink monitor: samples accepted words, rebuilds frames, paces `tready`.

use std::cell::RefCell;
use std::rc::Rc;

use strobe_sim::{JoinHandle, Signal};
use tokio::sync::{mpsc, Mutex};

use crate::bus::AxisBus;
use crate::error::AxisError;
use crate::frame::{AxisFrame, ReceivedFrame};
use crate::pause::PauseSequence;

type Reception = Result<ReceivedFrame, AxisError>;

/// Observes the receiving side of a bus and owns its `tready`.
///
/// Readiness for each cycle comes from the attached [`PauseSequence`]
/// (`true` withholds it); with no sequence attached the sink is always
/// ready. During reset `tready` is held low and any partial frame is
/// discarded.
pub struct AxisSink {
    bus: AxisBus,
    frames: Mutex<mpsc::UnboundedReceiver<Reception>>,
    pause: Rc<RefCell<Option<PauseSequence>>>,
    task: JoinHandle<()>,
}

impl AxisSink {
    /// Spawns the monitor task on the bus clock's kernel.
    pub fn new(bus: AxisBus) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let pause = Rc::new(RefCell::new(None));
        let kernel = bus.clock.kernel().clone();
        let task = kernel.spawn(monitor(bus.clone(), tx, pause.clone()));
        Self {
            bus,
            frames: Mutex::new(rx),
            pause,
            task,
        }
    }

    /// Waits for the next complete frame.
    ///
    /// A word accepted with unknown data or `tlast`, or with tags that differ
    /// from the frame's first word, is returned as
    /// [`AxisError::ProtocolViolation`].
    pub async fn recv(&self) -> Result<ReceivedFrame, AxisError> {
        let mut frames = self.frames.lock().await;
        frames
            .recv()
            .await
            .unwrap_or(Err(AxisError::Closed("sink monitor")))
    }

    /// Attaches a pause sequence, rewound to its start.
    pub fn set_pause(&self, mut pause: PauseSequence) {
        pause.restart();
        *self.pause.borrow_mut() = Some(pause);
    }

    /// Detaches the pause sequence; the sink is ready every cycle.
    pub fn clear_pause(&self) {
        *self.pause.borrow_mut() = None;
    }

    /// Returns the monitored bus.
    pub fn bus(&self) -> &AxisBus {
        &self.bus
    }
}

impl Drop for AxisSink {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Words of the frame being received.
struct Partial {
    data: Vec<u8>,
    tdest: u64,
    tuser: u64,
    beats: usize,
}

async fn monitor(
    bus: AxisBus,
    frames: mpsc::UnboundedSender<Reception>,
    pause: Rc<RefCell<Option<PauseSequence>>>,
) {
    let kernel = bus.clock.kernel().clone();
    let mut partial: Option<Partial> = None;
    let mut cycle: u64 = 0;
    bus.tready.set_bool(false);

    loop {
        bus.clock.rising_edge().await;
        cycle += 1;

        if bus.in_reset() {
            if partial.take().is_some() {
                tracing::warn!(bus = bus.name(), cycle, "reset asserted mid-frame, partial frame discarded");
            }
            bus.tready.set_bool(false);
            continue;
        }

        if bus.tvalid.is_high() && bus.tready.is_high() {
            match sample(&bus, cycle, partial.take()) {
                Ok(Sampled::Continue(p)) => partial = Some(p),
                Ok(Sampled::Complete(p)) => {
                    let received = ReceivedFrame {
                        frame: AxisFrame::with_tags(p.data, p.tdest, p.tuser),
                        beats: p.beats,
                        last_at: kernel.now(),
                    };
                    tracing::debug!(
                        bus = bus.name(),
                        len = received.frame.tdata.len(),
                        beats = received.beats,
                        "frame received"
                    );
                    let _ = frames.send(Ok(received));
                }
                Err(violation) => {
                    tracing::error!(bus = bus.name(), %violation, "protocol violation");
                    let _ = frames.send(Err(violation));
                }
            }
        }

        let paused = pause
            .borrow_mut()
            .as_mut()
            .and_then(|seq| seq.next())
            .unwrap_or(false);
        bus.tready.set_bool(!paused);
    }
}

enum Sampled {
    Continue(Partial),
    Complete(Partial),
}

/// Folds one accepted word into the frame being received.
fn sample(bus: &AxisBus, cycle: u64, partial: Option<Partial>) -> Result<Sampled, AxisError> {
    let violation = |signal: &Signal, reason: String| AxisError::ProtocolViolation {
        signal: signal.name(),
        cycle,
        reason,
    };

    let word = bus.tdata.value();
    let bytes = word.to_bytes().ok_or_else(|| {
        violation(&bus.tdata, format!("accepted word has unknown bits: {word}"))
    })?;
    let last = bus.tlast.logic().to_bool().ok_or_else(|| {
        violation(&bus.tlast, format!("tlast is {} on an accepted word", bus.tlast.logic()))
    })?;
    let read_tag = |tag: &Option<Signal>| -> Result<u64, AxisError> {
        match tag {
            Some(signal) => signal
                .to_u64()
                .ok_or_else(|| violation(signal, format!("tag is {}", signal.value()))),
            None => Ok(0),
        }
    };
    let tdest = read_tag(&bus.tdest)?;
    let tuser = read_tag(&bus.tuser)?;

    let mut partial = match partial {
        Some(p) => {
            if p.tdest != tdest {
                if let Some(signal) = &bus.tdest {
                    return Err(violation(
                        signal,
                        format!("tdest changed mid-frame from {} to {tdest}", p.tdest),
                    ));
                }
            }
            if p.tuser != tuser {
                if let Some(signal) = &bus.tuser {
                    return Err(violation(
                        signal,
                        format!("tuser changed mid-frame from {} to {tuser}", p.tuser),
                    ));
                }
            }
            p
        }
        None => Partial {
            data: Vec::new(),
            tdest,
            tuser,
            beats: 0,
        },
    };

    partial.data.extend_from_slice(&bytes);
    partial.beats += 1;
    tracing::trace!(bus = bus.name(), beat = partial.beats, last, "word sampled");
    Ok(if last {
        Sampled::Complete(partial)
    } else {
        Sampled::Continue(partial)
    })
}
