//! Awaitable simulation triggers: timers and signal edges.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use serde::{Deserialize, Serialize};
use strobe_common::Logic;

use crate::kernel::SimKernel;
use crate::time::SimTime;
use crate::value::SimSignalId;

/// Signal transition kind a trigger waits for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    /// Transition toward `1`.
    Rising,
    /// Transition toward `0`.
    Falling,
    /// Either of the above.
    Any,
}

/// Checks a bit transition against an edge kind using IEEE 1364 rules.
///
/// A posedge is `0->1`, `0->X/Z` or `X/Z->1`; a negedge is the mirror image.
/// `X<->Z` counts as neither.
pub fn check_edge(prev: Logic, curr: Logic, edge: Edge) -> bool {
    use Logic::*;
    let rising = matches!(
        (prev, curr),
        (Zero, One) | (Zero, X) | (Zero, Z) | (X, One) | (Z, One)
    );
    let falling = matches!(
        (prev, curr),
        (One, Zero) | (One, X) | (One, Z) | (X, Zero) | (Z, Zero)
    );
    match edge {
        Edge::Rising => rising,
        Edge::Falling => falling,
        Edge::Any => rising || falling,
    }
}

/// Completes once simulated time has advanced by a fixed duration.
///
/// A zero duration completes in the next delta cycle.
pub struct Timer {
    kernel: SimKernel,
    duration_fs: u64,
    deadline: Option<SimTime>,
}

impl Timer {
    pub(crate) fn new(kernel: SimKernel, duration_fs: u64) -> Self {
        Self {
            kernel,
            duration_fs,
            deadline: None,
        }
    }
}

impl Future for Timer {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let now = self.kernel.now();
        match self.deadline {
            Some(deadline) if now >= deadline => Poll::Ready(()),
            Some(_) => Poll::Pending,
            None => {
                let deadline = now.after(self.duration_fs);
                self.deadline = Some(deadline);
                self.kernel.schedule_wake(deadline, cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

/// State shared between an [`EdgeTrigger`] and the kernel's waiter list.
pub(crate) struct EdgeShared {
    pub(crate) fired: Cell<Option<usize>>,
    pub(crate) waker: RefCell<Waker>,
}

/// Completes on the first matching edge among one or more watched signals.
///
/// The output is the index of the watch that fired. Only edges that happen
/// after the first poll are seen.
pub struct EdgeTrigger {
    kernel: SimKernel,
    watches: Vec<(SimSignalId, Edge)>,
    shared: Option<Rc<EdgeShared>>,
}

impl EdgeTrigger {
    pub(crate) fn new(kernel: SimKernel, watches: Vec<(SimSignalId, Edge)>) -> Self {
        Self {
            kernel,
            watches,
            shared: None,
        }
    }
}

impl Future for EdgeTrigger {
    type Output = usize;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<usize> {
        if let Some(shared) = &self.shared {
            if let Some(index) = shared.fired.get() {
                return Poll::Ready(index);
            }
            if !shared.waker.borrow().will_wake(cx.waker()) {
                *shared.waker.borrow_mut() = cx.waker().clone();
            }
            return Poll::Pending;
        }

        let shared = Rc::new(EdgeShared {
            fired: Cell::new(None),
            waker: RefCell::new(cx.waker().clone()),
        });
        self.kernel.register_edges(&self.watches, Rc::downgrade(&shared));
        self.shared = Some(shared);
        Poll::Pending
    }
}
