//! Clock and reset sequencing per clock domain.

use std::cell::Cell;
use std::future::Future;

use strobe_config::DomainConfig;
use strobe_dut::DomainPorts;
use strobe_sim::{Clock, FormatFs, SimError, Signal};

/// A clock/reset pair the harness drives.
///
/// The clock is started at most once and then runs until the simulation
/// ends. The reset is active-low and pulsed for a fixed hold time.
pub struct ClockDomain {
    name: String,
    clock: Clock,
    reset: Signal,
    reset_hold_fs: u64,
    started: Cell<bool>,
}

impl ClockDomain {
    /// Binds a configured domain to the device's clock and reset ports.
    pub fn new(ports: &DomainPorts, config: &DomainConfig) -> Result<Self, SimError> {
        Ok(Self {
            name: config.name.clone(),
            clock: Clock::new(ports.clock.clone(), config.period_fs)?,
            reset: ports.reset.clone(),
            reset_hold_fs: config.reset_hold_fs,
            started: Cell::new(false),
        })
    }

    /// Returns the domain name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the clock signal.
    pub fn clock(&self) -> &Signal {
        self.clock.signal()
    }

    /// Returns the active-low reset signal.
    pub fn reset_signal(&self) -> &Signal {
        &self.reset
    }

    /// Returns the clock period in femtoseconds.
    pub fn period_fs(&self) -> u64 {
        self.clock.period_fs()
    }

    /// Returns the reset pulse length in femtoseconds.
    pub fn reset_hold_fs(&self) -> u64 {
        self.reset_hold_fs
    }

    /// True once [`start`](Self::start) has run.
    pub fn is_started(&self) -> bool {
        self.started.get()
    }

    /// Starts the clock. Later calls log a warning and do nothing.
    pub fn start(&self) {
        if self.started.replace(true) {
            tracing::warn!(domain = %self.name, "clock already started");
            return;
        }
        tracing::debug!(domain = %self.name, period = %FormatFs(self.period_fs()), "starting clock");
        self.clock.start();
    }

    /// Holds the clock low without ever starting it.
    pub fn freeze(&self) {
        if self.started.get() {
            tracing::warn!(domain = %self.name, "cannot freeze a running clock");
            return;
        }
        self.clock().set_bool(false);
    }

    /// Asserts reset and leaves it asserted.
    pub fn hold_reset(&self) {
        self.reset.set_bool(false);
    }

    /// Pulses reset low for the hold time, then releases it.
    ///
    /// The returned future owns what it needs, so it can be spawned.
    pub fn reset(&self) -> impl Future<Output = ()> + 'static {
        let reset = self.reset.clone();
        let hold = self.reset_hold_fs;
        let name = self.name.clone();
        async move {
            reset.set_bool(false);
            reset.kernel().timer(hold).await;
            reset.set_bool(true);
            tracing::debug!(domain = %name, hold = %FormatFs(hold), "reset released");
        }
    }
}

/// Pulses every domain's reset concurrently and waits for the longest.
pub async fn reset_all(domains: &[ClockDomain]) {
    let Some(first) = domains.first() else {
        return;
    };
    let kernel = first.reset.kernel().clone();
    let pulses: Vec<_> = domains.iter().map(|d| kernel.spawn(d.reset())).collect();
    for pulse in pulses {
        if let Err(error) = pulse.await {
            tracing::warn!(%error, "reset pulse did not complete");
        }
    }
    // Let the release land before any stimulus follows.
    kernel.timer(0).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use strobe_dut::{DeviceParams, DutPorts};
    use strobe_sim::{SimKernel, SimTime, FS_PER_NS};

    fn domains(kernel: &SimKernel, holds_ns: &[u64]) -> Vec<ClockDomain> {
        let names: Vec<String> = ["s_axis", "m_axis"][..holds_ns.len()]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let params = DeviceParams {
            domains: names.clone(),
            ..DeviceParams::default()
        };
        let ports = DutPorts::declare(kernel, &params).unwrap();
        ports
            .domains
            .iter()
            .zip(holds_ns)
            .map(|(p, hold)| {
                let config = DomainConfig {
                    name: p.name.clone(),
                    period_fs: 2 * FS_PER_NS,
                    reset_hold_fs: hold * FS_PER_NS,
                };
                ClockDomain::new(p, &config).unwrap()
            })
            .collect()
    }

    #[test]
    fn start_is_idempotent() {
        let kernel = SimKernel::new();
        let doms = domains(&kernel, &[5]);
        doms[0].start();
        doms[0].start();
        assert!(doms[0].is_started());
        let clk = doms[0].clock().clone();
        let k = kernel.clone();
        let now = kernel
            .run_until_complete(async move {
                clk.rising_edges(3).await;
                k.now()
            })
            .unwrap();
        assert_eq!(now.fs, 4 * FS_PER_NS);
        kernel.shutdown();
    }

    #[test]
    fn reset_all_waits_for_the_longest_pulse() {
        let kernel = SimKernel::new();
        let doms = std::rc::Rc::new(domains(&kernel, &[5, 9]));
        for d in doms.iter() {
            d.start();
        }
        let d = doms.clone();
        let k = kernel.clone();
        let (at, levels) = kernel
            .run_until_complete(async move {
                reset_all(&d).await;
                let levels: Vec<bool> = d.iter().map(|d| d.reset_signal().is_high()).collect();
                (k.now(), levels)
            })
            .unwrap();
        assert!(at > SimTime::from_ns(9));
        assert!(at < SimTime::from_ns(10));
        assert_eq!(levels, vec![true, true]);
        kernel.shutdown();
    }

    #[test]
    fn frozen_clock_never_edges() {
        let kernel = SimKernel::new();
        let doms = domains(&kernel, &[5]);
        doms[0].freeze();
        doms[0].hold_reset();
        let clk = doms[0].clock().clone();
        let k = kernel.clone();
        let low = kernel
            .run_until_complete(async move {
                k.timer(20 * FS_PER_NS).await;
                clk.logic().is_low()
            })
            .unwrap();
        assert!(low);
        kernel.shutdown();
    }
}
