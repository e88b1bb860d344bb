//! Free-running 50% duty-cycle clock driver.

use std::cell::Cell;
use std::rc::Rc;

use crate::error::SimError;
use crate::signal::Signal;
use crate::task::JoinHandle;

/// Toggles a 1-bit signal with a fixed period.
///
/// The first half period is high, so the first rising edge happens right
/// after [`start`](Clock::start).
pub struct Clock {
    signal: Signal,
    period_fs: u64,
    running: Rc<Cell<bool>>,
}

impl Clock {
    /// Creates a clock for `signal`. The period must be even and non-zero.
    pub fn new(signal: Signal, period_fs: u64) -> Result<Self, SimError> {
        if period_fs == 0 || period_fs % 2 != 0 {
            return Err(SimError::InvalidClockPeriod { period_fs });
        }
        Ok(Self {
            signal,
            period_fs,
            running: Rc::new(Cell::new(false)),
        })
    }

    /// Returns the clock period in femtoseconds.
    pub fn period_fs(&self) -> u64 {
        self.period_fs
    }

    /// Returns the driven signal.
    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    /// Returns true while the toggling task is active.
    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Spawns the toggling task.
    pub fn start(&self) -> JoinHandle<()> {
        self.running.set(true);
        let signal = self.signal.clone();
        let running = self.running.clone();
        let half = self.period_fs / 2;
        let kernel = signal.kernel().clone();
        tracing::debug!(signal = %signal.name(), period_fs = self.period_fs, "clock started");
        kernel.clone().spawn(async move {
            while running.get() {
                signal.set_bool(true);
                kernel.timer(half).await;
                signal.set_bool(false);
                kernel.timer(half).await;
            }
        })
    }

    /// Stops toggling after the current period. The signal is left low.
    pub fn stop(&self) {
        self.running.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::SimKernel;
    use crate::time::FS_PER_NS;
    use strobe_common::Logic;

    #[test]
    fn rejects_odd_or_zero_period() {
        let kernel = SimKernel::new();
        let clk = kernel.signal("clk", 1).unwrap();
        assert!(matches!(
            Clock::new(clk.clone(), 0),
            Err(SimError::InvalidClockPeriod { period_fs: 0 })
        ));
        assert!(Clock::new(clk.clone(), 3).is_err());
        assert!(Clock::new(clk, 2 * FS_PER_NS).is_ok());
    }

    #[test]
    fn rising_edges_are_one_period_apart() {
        let kernel = SimKernel::new();
        let clk = kernel.signal("clk", 1).unwrap();
        let clock = Clock::new(clk.clone(), 2 * FS_PER_NS).unwrap();
        clock.start();
        let k = kernel.clone();
        let times = kernel
            .run_until_complete(async move {
                let mut times = Vec::new();
                for _ in 0..3 {
                    clk.rising_edge().await;
                    times.push(k.now().fs);
                }
                times
            })
            .unwrap();
        kernel.shutdown();
        assert_eq!(times, vec![0, 2 * FS_PER_NS, 4 * FS_PER_NS]);
    }

    #[test]
    fn stop_leaves_signal_low() {
        let kernel = SimKernel::new();
        let clk = kernel.signal("clk", 1).unwrap();
        let clock = Rc::new(Clock::new(clk.clone(), 2 * FS_PER_NS).unwrap());
        let handle = clock.start();
        let c = clock.clone();
        let k = kernel.clone();
        let level = kernel
            .run_until_complete(async move {
                k.timer(3 * FS_PER_NS).await;
                c.stop();
                handle.await.unwrap();
                k.timer(10 * FS_PER_NS).await;
                clk.logic()
            })
            .unwrap();
        assert_eq!(level, Logic::Zero);
        assert!(!clock.is_running());
    }
}
