//! Task bookkeeping for the cooperative scheduler.
//!
//! A task is a boxed `!Send` future owned by the kernel. Waking a task pushes
//! its slot index onto a shared ready queue; the kernel drains that queue
//! between time steps. Completion values travel back through a oneshot
//! channel so a [`JoinHandle`] can be awaited from another task or polled
//! from outside the scheduler.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll, Wake};

use tokio::sync::oneshot;

use crate::error::SimError;
use crate::kernel::SimKernel;

/// Shared queue of task slots that are ready to be polled.
pub(crate) type ReadyQueue = Arc<Mutex<VecDeque<usize>>>;

/// Waker for a single task slot.
///
/// `queued` deduplicates wakeups so a task woken by several events in one
/// delta is polled once.
pub(crate) struct TaskWaker {
    pub(crate) id: usize,
    pub(crate) queued: AtomicBool,
    pub(crate) ready: ReadyQueue,
}

impl TaskWaker {
    pub(crate) fn new(id: usize, ready: ReadyQueue) -> Self {
        Self {
            id,
            queued: AtomicBool::new(false),
            ready,
        }
    }

    /// Pushes the task onto the ready queue unless it is already there.
    pub(crate) fn schedule(&self) {
        if !self.queued.swap(true, Ordering::AcqRel) {
            self.ready
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(self.id);
        }
    }
}

impl TaskWaker {
    /// Marks the task as dequeued; wakeups from now on queue it again.
    pub(crate) fn clear_queued(&self) {
        self.queued.store(false, Ordering::Release);
    }
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.schedule();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.schedule();
    }
}

/// A spawned future plus the waker that reschedules it.
pub(crate) struct Task {
    pub(crate) future: Pin<Box<dyn Future<Output = ()>>>,
    pub(crate) waker: Arc<TaskWaker>,
}

/// Handle to a spawned task's output.
///
/// Awaiting the handle yields the task's return value, or
/// [`SimError::TaskCancelled`] if the task was aborted or the kernel shut
/// down first. Dropping the handle detaches the task; it keeps running.
pub struct JoinHandle<T> {
    rx: oneshot::Receiver<T>,
    id: usize,
    kernel: SimKernel,
}

impl<T> JoinHandle<T> {
    pub(crate) fn new(rx: oneshot::Receiver<T>, id: usize, kernel: SimKernel) -> Self {
        Self { rx, id, kernel }
    }

    /// Returns the output if the task already finished.
    ///
    /// `Ok(None)` means the task is still running.
    pub fn try_take(&mut self) -> Result<Option<T>, SimError> {
        match self.rx.try_recv() {
            Ok(value) => Ok(Some(value)),
            Err(oneshot::error::TryRecvError::Empty) => Ok(None),
            Err(oneshot::error::TryRecvError::Closed) => Err(SimError::TaskCancelled),
        }
    }

    /// Stops the task. Its future is dropped at the next scheduling point.
    pub fn abort(&self) {
        self.kernel.abort_task(self.id);
    }

    /// Returns true once the task has produced its output or been dropped.
    pub fn is_finished(&self) -> bool {
        self.kernel.task_finished(self.id)
    }
}

impl<T> Future for JoinHandle<T> {
    type Output = Result<T, SimError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(value)) => Poll::Ready(Ok(value)),
            Poll::Ready(Err(_)) => Poll::Ready(Err(SimError::TaskCancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waker_deduplicates_wakeups() {
        let ready: ReadyQueue = Arc::default();
        let waker = Arc::new(TaskWaker::new(3, ready.clone()));
        waker.wake_by_ref();
        waker.wake_by_ref();
        assert_eq!(ready.lock().unwrap().len(), 1);

        waker.queued.store(false, Ordering::Release);
        waker.wake();
        let queue = ready.lock().unwrap();
        assert_eq!(queue.iter().copied().collect::<Vec<_>>(), vec![3, 3]);
    }
}
