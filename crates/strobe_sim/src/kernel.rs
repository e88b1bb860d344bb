//! Simulation kernel with event queue, delta-cycle loop, and task scheduler.
//!
//! [`SimKernel`] owns every signal and every spawned task. Time only moves in
//! [`advance`](SimKernel::run_until_complete): the kernel pops all events of
//! the earliest pending time point, applies signal writes, fires timers and
//! edge waiters, then polls the woken tasks. Writes made while tasks run are
//! scheduled one delta later, so every task woken at the same point reads
//! the same pre-write values.

use std::cell::{Cell, RefCell};
use std::cmp::{Ordering, Reverse};
use std::collections::hash_map::Entry;
use std::collections::{BinaryHeap, HashMap};
use std::future::Future;
use std::mem;
use std::rc::{Rc, Weak};
use std::sync::{Arc, PoisonError};
use std::task::{Context, Waker};

use strobe_common::{Logic, LogicVec};
use tokio::sync::oneshot;

use crate::error::SimError;
use crate::signal::Signal;
use crate::task::{JoinHandle, ReadyQueue, Task, TaskWaker};
use crate::time::SimTime;
use crate::trigger::{check_edge, Edge, EdgeShared, EdgeTrigger, Timer};
use crate::value::{SimSignalId, SimSignalState};
use crate::waveform::WaveformRecorder;

/// Maximum delta cycles per time step before the kernel reports a zero-time loop.
pub const DEFAULT_MAX_DELTA: u32 = 10_000;

/// What happens when an event's time point is reached.
enum EventKind {
    /// A signal takes a new value.
    Write { signal: SimSignalId, value: LogicVec },
    /// A suspended task is woken.
    Wake(Waker),
}

/// An event scheduled in the simulation event queue.
struct SimEvent {
    time: SimTime,
    /// Insertion order; later writes to one signal in one delta win.
    seq: u64,
    kind: EventKind,
}

impl PartialEq for SimEvent {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for SimEvent {}

impl PartialOrd for SimEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time.cmp(&other.time).then(self.seq.cmp(&other.seq))
    }
}

/// One signal watched by a pending [`EdgeTrigger`].
struct EdgeWaiter {
    signal: SimSignalId,
    edge: Edge,
    index: usize,
    shared: Weak<EdgeShared>,
}

/// Lifecycle of a task slot. Slots are never reused.
enum Slot {
    Idle(Task),
    Running,
    /// Aborted while being polled; dropped once the poll returns.
    Aborted,
    Done,
}

struct KernelState {
    now: SimTime,
    events: BinaryHeap<Reverse<SimEvent>>,
    next_seq: u64,
    signals: Vec<SimSignalState>,
    names: HashMap<String, SimSignalId>,
    edge_waiters: Vec<EdgeWaiter>,
    /// Writer task and value of each write targeting the next delta.
    pending_writers: HashMap<SimSignalId, (Option<usize>, LogicVec)>,
    recorder: Option<Box<dyn WaveformRecorder>>,
    /// Signals with a raw index below this are known to the recorder.
    recorded_count: usize,
    time_limit: Option<u64>,
    max_delta_per_step: u32,
    step_deltas: u32,
    total_deltas: u64,
    failure: Option<SimError>,
}

impl KernelState {
    fn push_event(&mut self, time: SimTime, kind: EventKind) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(Reverse(SimEvent { time, seq, kind }));
    }

    fn set_failure(&mut self, error: SimError) {
        if self.failure.is_none() {
            self.failure = Some(error);
        }
    }
}

struct KernelInner {
    state: RefCell<KernelState>,
    tasks: RefCell<Vec<Slot>>,
    ready: ReadyQueue,
    current_task: Cell<Option<usize>>,
}

/// The simulation kernel: signals, event queue, and cooperative executor.
///
/// `SimKernel` is a cheap reference-counted handle; clones share one
/// simulation. Everything runs on the calling thread.
#[derive(Clone)]
pub struct SimKernel {
    inner: Rc<KernelInner>,
}

impl Default for SimKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl SimKernel {
    /// Creates an empty kernel at time zero with no time limit.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(KernelInner {
                state: RefCell::new(KernelState {
                    now: SimTime::zero(),
                    events: BinaryHeap::new(),
                    next_seq: 0,
                    signals: Vec::new(),
                    names: HashMap::new(),
                    edge_waiters: Vec::new(),
                    pending_writers: HashMap::new(),
                    recorder: None,
                    recorded_count: 0,
                    time_limit: None,
                    max_delta_per_step: DEFAULT_MAX_DELTA,
                    step_deltas: 0,
                    total_deltas: 0,
                    failure: None,
                }),
                tasks: RefCell::new(Vec::new()),
                ready: ReadyQueue::default(),
                current_task: Cell::new(None),
            }),
        }
    }

    /// Sets the simulation time limit in femtoseconds.
    ///
    /// The run fails with [`SimError::TimeLimitExceeded`] if the next event
    /// lies beyond the limit.
    pub fn set_time_limit(&self, limit_fs: u64) {
        self.inner.state.borrow_mut().time_limit = Some(limit_fs);
    }

    /// Sets the maximum number of delta cycles per time step.
    pub fn set_max_delta(&self, max: u32) {
        self.inner.state.borrow_mut().max_delta_per_step = max;
    }

    /// Attaches a waveform recorder.
    ///
    /// Every signal declared so far is registered and its current value
    /// dumped. Signals declared afterwards are not recorded.
    pub fn set_recorder(&self, mut recorder: Box<dyn WaveformRecorder>) -> Result<(), SimError> {
        let mut guard = self.inner.state.borrow_mut();
        let st = &mut *guard;
        recorder.begin_scope("strobe")?;
        for (index, signal) in st.signals.iter().enumerate() {
            recorder.register_signal(
                SimSignalId::from_raw(index as u32),
                &signal.name,
                signal.width,
            )?;
        }
        recorder.end_scope()?;
        for (index, signal) in st.signals.iter().enumerate() {
            recorder.record_change(st.now.fs, SimSignalId::from_raw(index as u32), &signal.value)?;
        }
        st.recorded_count = st.signals.len();
        st.recorder = Some(recorder);
        Ok(())
    }

    /// Returns the current simulation time.
    pub fn now(&self) -> SimTime {
        self.inner.state.borrow().now
    }

    /// Returns the total number of delta cycles executed.
    pub fn total_deltas(&self) -> u64 {
        self.inner.state.borrow().total_deltas
    }

    /// Declares a signal, or returns the existing one with the same name.
    ///
    /// New signals start as all-X.
    pub fn signal(&self, name: &str, width: u32) -> Result<Signal, SimError> {
        let mut st = self.inner.state.borrow_mut();
        if let Some(&id) = st.names.get(name) {
            let existing = st.signals[id.as_raw() as usize].width;
            if existing != width {
                return Err(SimError::InvalidSignalRef {
                    reason: format!(
                        "signal '{name}' already declared with width {existing}, requested {width}"
                    ),
                });
            }
            return Ok(Signal::new(id, width, self.clone()));
        }
        if width == 0 {
            return Err(SimError::InvalidSignalRef {
                reason: format!("signal '{name}' must be at least one bit wide"),
            });
        }
        let id = SimSignalId::from_raw(st.signals.len() as u32);
        st.signals
            .push(SimSignalState::new_unknown(name.to_string(), width));
        st.names.insert(name.to_string(), id);
        Ok(Signal::new(id, width, self.clone()))
    }

    /// Looks up a declared signal by name.
    pub fn find_signal(&self, name: &str) -> Option<Signal> {
        let st = self.inner.state.borrow();
        let id = *st.names.get(name)?;
        let width = st.signals[id.as_raw() as usize].width;
        Some(Signal::new(id, width, self.clone()))
    }

    /// Returns the number of declared signals.
    pub fn signal_count(&self) -> usize {
        self.inner.state.borrow().signals.len()
    }

    pub(crate) fn signal_value(&self, id: SimSignalId) -> LogicVec {
        let st = self.inner.state.borrow();
        st.signals
            .get(id.as_raw() as usize)
            .map_or_else(|| LogicVec::new(0), |s| s.value.clone())
    }

    pub(crate) fn signal_bit0(&self, id: SimSignalId) -> Logic {
        let st = self.inner.state.borrow();
        st.signals
            .get(id.as_raw() as usize)
            .map_or(Logic::X, |s| s.value.bit0())
    }

    pub(crate) fn signal_name(&self, id: SimSignalId) -> String {
        let st = self.inner.state.borrow();
        st.signals
            .get(id.as_raw() as usize)
            .map_or_else(|| format!("#{}", id.as_raw()), |s| s.name.clone())
    }

    /// Schedules a write one delta cycle from now.
    ///
    /// Two different tasks writing different values to the same signal in the
    /// same delta fail the run with [`SimError::MultipleDrivers`].
    pub(crate) fn schedule_write(&self, signal: SimSignalId, value: LogicVec) {
        let writer = self.inner.current_task.get();
        let mut guard = self.inner.state.borrow_mut();
        let st = &mut *guard;
        let Some(state) = st.signals.get(signal.as_raw() as usize) else {
            return;
        };
        let value = if value.width() == state.width {
            value
        } else {
            value.resized(state.width)
        };
        if let Some((other, pending)) = st.pending_writers.get(&signal) {
            if *other != writer && *pending != value {
                let error = SimError::MultipleDrivers {
                    signal: state.name.clone(),
                    time_fs: st.now.fs,
                };
                st.set_failure(error);
            }
        }
        st.pending_writers.insert(signal, (writer, value.clone()));
        let time = st.now.next_delta();
        st.push_event(time, EventKind::Write { signal, value });
    }

    pub(crate) fn schedule_wake(&self, time: SimTime, waker: Waker) {
        self.inner
            .state
            .borrow_mut()
            .push_event(time, EventKind::Wake(waker));
    }

    pub(crate) fn register_edges(&self, watches: &[(SimSignalId, Edge)], shared: Weak<EdgeShared>) {
        let mut st = self.inner.state.borrow_mut();
        for (index, &(signal, edge)) in watches.iter().enumerate() {
            st.edge_waiters.push(EdgeWaiter {
                signal,
                edge,
                index,
                shared: shared.clone(),
            });
        }
    }

    /// Returns a future that completes `duration_fs` femtoseconds from when
    /// it is first polled.
    pub fn timer(&self, duration_fs: u64) -> Timer {
        Timer::new(self.clone(), duration_fs)
    }

    /// Returns a future that completes on the first matching edge of any
    /// watched signal, yielding the index of the watch that fired.
    pub fn first_edge(&self, watches: &[(&Signal, Edge)]) -> EdgeTrigger {
        let watches = watches
            .iter()
            .map(|(signal, edge)| (signal.id(), *edge))
            .collect();
        EdgeTrigger::new(self.clone(), watches)
    }

    /// Records a failed check. The run stops at the next scheduling point.
    ///
    /// Only the first failure is kept.
    pub fn fail(&self, message: impl Into<String>) {
        let mut st = self.inner.state.borrow_mut();
        let error = SimError::AssertionFailed {
            time_fs: st.now.fs,
            message: message.into(),
        };
        tracing::debug!(%error, "simulation failure recorded");
        st.set_failure(error);
    }

    fn take_failure(&self) -> Option<SimError> {
        self.inner.state.borrow_mut().failure.take()
    }

    /// Spawns a task. It first runs at the current scheduling point.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        let (tx, rx) = oneshot::channel();
        let mut tasks = self.inner.tasks.borrow_mut();
        let id = tasks.len();
        let waker = Arc::new(TaskWaker::new(id, self.inner.ready.clone()));
        waker.schedule();
        tasks.push(Slot::Idle(Task {
            future: Box::pin(async move {
                let _ = tx.send(future.await);
            }),
            waker,
        }));
        drop(tasks);
        JoinHandle::new(rx, id, self.clone())
    }

    pub(crate) fn abort_task(&self, id: usize) {
        let dropped = {
            let mut tasks = self.inner.tasks.borrow_mut();
            match tasks.get_mut(id) {
                Some(slot @ Slot::Running) => {
                    *slot = Slot::Aborted;
                    None
                }
                Some(slot @ Slot::Idle(_)) => Some(mem::replace(slot, Slot::Done)),
                _ => None,
            }
        };
        drop(dropped);
    }

    pub(crate) fn task_finished(&self, id: usize) -> bool {
        let tasks = self.inner.tasks.borrow();
        matches!(tasks.get(id), None | Some(Slot::Done))
    }

    /// Drops every task and pending event.
    ///
    /// Tasks hold signal handles, which hold the kernel, so this is what
    /// breaks the reference cycle once a run is over.
    pub fn shutdown(&self) {
        let slots: Vec<Slot> = {
            let mut tasks = self.inner.tasks.borrow_mut();
            tasks
                .iter_mut()
                .map(|slot| mem::replace(slot, Slot::Done))
                .collect()
        };
        self.inner
            .ready
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        let (events, waiters) = {
            let mut st = self.inner.state.borrow_mut();
            (mem::take(&mut st.events), mem::take(&mut st.edge_waiters))
        };
        drop(events);
        drop(waiters);
        drop(slots);
    }

    /// Runs the simulation until `future` completes and returns its output.
    ///
    /// Fails on the first recorded failure, on the time limit, when every
    /// task is blocked with nothing scheduled, or when a time step exceeds
    /// the delta limit. Other spawned tasks are left suspended.
    pub fn run_until_complete<F>(&self, future: F) -> Result<F::Output, SimError>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        let mut main = self.spawn(future);
        let outcome = loop {
            self.run_ready();
            if let Some(error) = self.take_failure() {
                break Err(error);
            }
            match main.try_take() {
                Ok(Some(value)) => break Ok(value),
                Ok(None) => {}
                Err(error) => break Err(error),
            }
            if let Err(error) = self.advance() {
                break Err(error);
            }
        };
        let finalized = self.finalize_recorder();
        let value = outcome?;
        finalized?;
        Ok(value)
    }

    fn finalize_recorder(&self) -> Result<(), SimError> {
        let recorder = self.inner.state.borrow_mut().recorder.take();
        match recorder {
            Some(mut recorder) => recorder.finalize(),
            None => Ok(()),
        }
    }

    /// Polls every ready task until none is left.
    fn run_ready(&self) {
        loop {
            if self.inner.state.borrow().failure.is_some() {
                return;
            }
            let next = self
                .inner
                .ready
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            let Some(id) = next else {
                return;
            };
            let slot = {
                let mut tasks = self.inner.tasks.borrow_mut();
                match tasks.get_mut(id) {
                    Some(slot @ Slot::Idle(_)) => mem::replace(slot, Slot::Running),
                    _ => continue,
                }
            };
            let Slot::Idle(mut task) = slot else {
                continue;
            };

            task.waker.clear_queued();
            let waker = Waker::from(task.waker.clone());
            let mut cx = Context::from_waker(&waker);
            self.inner.current_task.set(Some(id));
            let pending = task.future.as_mut().poll(&mut cx).is_pending();
            self.inner.current_task.set(None);

            let finished = {
                let mut tasks = self.inner.tasks.borrow_mut();
                match tasks.get_mut(id) {
                    Some(slot @ Slot::Running) if pending => {
                        *slot = Slot::Idle(task);
                        None
                    }
                    Some(slot) => {
                        *slot = Slot::Done;
                        Some(task)
                    }
                    None => Some(task),
                }
            };
            drop(finished);
        }
    }

    /// Moves to the next scheduled time point and applies its events.
    fn advance(&self) -> Result<(), SimError> {
        let mut wakers = Vec::new();
        {
            let mut guard = self.inner.state.borrow_mut();
            let st = &mut *guard;
            let next = match st.events.peek() {
                Some(Reverse(event)) => event.time,
                None => return Err(SimError::Stalled { time_fs: st.now.fs }),
            };
            if let Some(limit) = st.time_limit {
                if next.fs > limit {
                    return Err(SimError::TimeLimitExceeded { limit_fs: limit });
                }
            }
            if next.fs == st.now.fs {
                st.step_deltas += 1;
                if st.step_deltas > st.max_delta_per_step {
                    return Err(SimError::DeltaCycleLimit {
                        fs: next.fs,
                        max_deltas: st.max_delta_per_step,
                    });
                }
            } else {
                st.step_deltas = 0;
            }
            st.now = next;
            st.total_deltas += 1;
            st.pending_writers.clear();

            // Value of each touched signal at the start of this delta.
            let mut before: HashMap<SimSignalId, LogicVec> = HashMap::new();
            let mut touched = Vec::new();
            while st
                .events
                .peek()
                .is_some_and(|Reverse(event)| event.time == next)
            {
                let Some(Reverse(event)) = st.events.pop() else {
                    break;
                };
                match event.kind {
                    EventKind::Wake(waker) => wakers.push(waker),
                    EventKind::Write { signal, value } => {
                        let Some(state) = st.signals.get_mut(signal.as_raw() as usize) else {
                            continue;
                        };
                        if let Entry::Vacant(slot) = before.entry(signal) {
                            slot.insert(state.value.clone());
                            touched.push(signal);
                        }
                        state.value = value;
                    }
                }
            }

            let changed: Vec<(SimSignalId, Logic, Logic)> = touched
                .into_iter()
                .filter_map(|id| {
                    let prev = before.get(&id)?;
                    let curr = &st.signals[id.as_raw() as usize].value;
                    (curr != prev).then(|| (id, prev.bit0(), curr.bit0()))
                })
                .collect();

            if let Some(recorder) = st.recorder.as_mut() {
                for &(id, _, _) in &changed {
                    if (id.as_raw() as usize) < st.recorded_count {
                        recorder.record_change(
                            next.fs,
                            id,
                            &st.signals[id.as_raw() as usize].value,
                        )?;
                    }
                }
            }

            if !changed.is_empty() {
                st.edge_waiters.retain(|waiter| {
                    let Some(shared) = waiter.shared.upgrade() else {
                        return false;
                    };
                    if shared.fired.get().is_some() {
                        return false;
                    }
                    let hit = changed.iter().any(|&(id, prev, curr)| {
                        id == waiter.signal && check_edge(prev, curr, waiter.edge)
                    });
                    if hit {
                        shared.fired.set(Some(waiter.index));
                        wakers.push(shared.waker.borrow().clone());
                    }
                    !hit
                });
            }
        }
        for waker in wakers {
            waker.wake();
        }
        Ok(())
    }
}
