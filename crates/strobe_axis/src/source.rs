//! Source driver: presents queued frames on a bus one word per cycle.

use std::cell::Cell;
use std::rc::Rc;

use strobe_common::LogicVec;
use strobe_sim::{JoinHandle, SimTime};
use tokio::sync::{mpsc, oneshot};

use crate::bus::AxisBus;
use crate::error::AxisError;
use crate::frame::AxisFrame;

/// Drives the outbound signals of one bus: `tdata`, `tvalid`, `tlast`, and
/// the tags.
///
/// Every rising clock edge the driver first checks whether the word it
/// presented was accepted (`tvalid` and `tready` both high), then presents
/// the next word or deasserts `tvalid`. A word is held until accepted.
/// Asserting reset drops the frame in flight and everything queued.
pub struct AxisSource {
    bus: AxisBus,
    queue: mpsc::UnboundedSender<AxisFrame>,
    outstanding: Rc<Cell<usize>>,
    task: JoinHandle<()>,
}

impl AxisSource {
    /// Spawns the driver task on the bus clock's kernel.
    pub fn new(bus: AxisBus) -> Self {
        let (queue, rx) = mpsc::unbounded_channel();
        let outstanding = Rc::new(Cell::new(0));
        let kernel = bus.clock.kernel().clone();
        let task = kernel.spawn(drive(bus.clone(), rx, outstanding.clone()));
        Self {
            bus,
            queue,
            outstanding,
            task,
        }
    }

    /// Queues a frame. Tags are masked to the bus's tag widths.
    ///
    /// Await the frame's [`completion`](AxisFrame::completion) to learn when
    /// its final word was accepted.
    pub fn send(&self, mut frame: AxisFrame) -> Result<(), AxisError> {
        if frame.tdata.is_empty() {
            return Err(AxisError::EmptyFrame);
        }
        frame.mask_tags(self.bus.dest_bits(), self.bus.user_bits());
        tracing::debug!(
            bus = self.bus.name(),
            len = frame.tdata.len(),
            words = frame.word_count(self.bus.width()),
            tdest = frame.tdest,
            tuser = frame.tuser,
            "frame queued"
        );
        self.queue
            .send(frame)
            .map_err(|_| AxisError::Closed("source driver"))?;
        self.outstanding.set(self.outstanding.get() + 1);
        Ok(())
    }

    /// True when nothing is queued or in flight.
    pub fn is_idle(&self) -> bool {
        self.outstanding.get() == 0
    }

    /// Returns the driven bus.
    pub fn bus(&self) -> &AxisBus {
        &self.bus
    }
}

impl Drop for AxisSource {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// The frame currently being presented.
struct ActiveFrame {
    words: Vec<Vec<u8>>,
    index: usize,
    tdest: u64,
    tuser: u64,
    done: Option<oneshot::Sender<SimTime>>,
}

impl ActiveFrame {
    fn new(mut frame: AxisFrame, width: u32) -> Self {
        Self {
            words: frame.words(width).collect(),
            index: 0,
            tdest: frame.tdest,
            tuser: frame.tuser,
            done: frame.take_completion(),
        }
    }

    fn is_last(&self) -> bool {
        self.index + 1 == self.words.len()
    }
}

async fn drive(
    bus: AxisBus,
    mut queue: mpsc::UnboundedReceiver<AxisFrame>,
    outstanding: Rc<Cell<usize>>,
) {
    let kernel = bus.clock.kernel().clone();
    let mut active: Option<ActiveFrame> = None;
    let mut presented = false;
    bus.tvalid.set_bool(false);
    bus.tlast.set_bool(false);

    loop {
        bus.clock.rising_edge().await;

        if bus.in_reset() {
            let mut dropped = usize::from(active.take().is_some());
            while queue.try_recv().is_ok() {
                dropped += 1;
            }
            if dropped > 0 {
                tracing::warn!(bus = bus.name(), dropped, "reset asserted, dropping queued frames");
                outstanding.set(outstanding.get().saturating_sub(dropped));
            }
            presented = false;
            bus.tvalid.set_bool(false);
            bus.tlast.set_bool(false);
            continue;
        }

        if presented && bus.tready.is_high() {
            if let Some(frame) = active.as_mut() {
                tracing::trace!(bus = bus.name(), beat = frame.index, "word accepted");
                let finished = frame.is_last();
                frame.index += 1;
                if finished {
                    let now = kernel.now();
                    if let Some(done) = active.take().and_then(|f| f.done) {
                        let _ = done.send(now);
                    }
                    outstanding.set(outstanding.get().saturating_sub(1));
                    tracing::debug!(bus = bus.name(), at = %now, "frame sent");
                }
            }
        }

        if active.is_none() {
            if let Ok(frame) = queue.try_recv() {
                active = Some(ActiveFrame::new(frame, bus.width()));
            }
        }

        match &active {
            Some(frame) => {
                bus.tdata.set(LogicVec::from_bytes(&frame.words[frame.index]));
                bus.tlast.set_bool(frame.is_last());
                if let Some(tdest) = &bus.tdest {
                    tdest.set_u64(frame.tdest);
                }
                if let Some(tuser) = &bus.tuser {
                    tuser.set_u64(frame.tuser);
                }
                bus.tvalid.set_bool(true);
                presented = true;
            }
            None => {
                bus.tvalid.set_bool(false);
                bus.tlast.set_bool(false);
                presented = false;
            }
        }
    }
}
