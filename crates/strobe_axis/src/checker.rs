//! Handshake rule checker for one bus.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use strobe_common::LogicVec;
use strobe_sim::{JoinHandle, Signal};

use crate::bus::AxisBus;
use crate::error::AxisError;

/// A rule broken on a bus, with the signal and cycle that broke it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// Offending signal.
    pub signal: String,
    /// Active clock edge count since the checker started.
    pub cycle: u64,
    /// What was observed.
    pub reason: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "protocol violation on '{}' at cycle {}: {}",
            self.signal, self.cycle, self.reason
        )
    }
}

impl From<Violation> for AxisError {
    fn from(v: Violation) -> Self {
        AxisError::ProtocolViolation {
            signal: v.signal,
            cycle: v.cycle,
            reason: v.reason,
        }
    }
}

/// Watches a bus from the side and fails the simulation on the first
/// handshake violation.
///
/// On every rising edge out of reset, `tvalid` and `tready` must be known,
/// and a word that was presented but not accepted on the previous edge must
/// still be presented with the same data, `tlast`, and tags.
pub struct ProtocolChecker {
    bus: AxisBus,
    violations: Rc<RefCell<Vec<Violation>>>,
    task: JoinHandle<()>,
}

impl ProtocolChecker {
    /// Spawns the checker task on the bus clock's kernel.
    pub fn new(bus: AxisBus) -> Self {
        let violations = Rc::new(RefCell::new(Vec::new()));
        let kernel = bus.clock.kernel().clone();
        let task = kernel.spawn(watch(bus.clone(), violations.clone()));
        Self {
            bus,
            violations,
            task,
        }
    }

    /// Returns every violation seen so far.
    pub fn violations(&self) -> Vec<Violation> {
        self.violations.borrow().clone()
    }

    /// True if no rule has been broken.
    pub fn is_clean(&self) -> bool {
        self.violations.borrow().is_empty()
    }

    /// Returns the checked bus.
    pub fn bus(&self) -> &AxisBus {
        &self.bus
    }
}

impl Drop for ProtocolChecker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// The outbound values of a presented word.
#[derive(PartialEq)]
struct Presented {
    tdata: LogicVec,
    tlast: LogicVec,
    tdest: Option<LogicVec>,
    tuser: Option<LogicVec>,
}

impl Presented {
    fn sample(bus: &AxisBus) -> Self {
        Self {
            tdata: bus.tdata.value(),
            tlast: bus.tlast.value(),
            tdest: bus.tdest.as_ref().map(Signal::value),
            tuser: bus.tuser.as_ref().map(Signal::value),
        }
    }

    /// Names the first signal that differs, with both values.
    fn changed<'a>(&self, now: &Self, bus: &'a AxisBus) -> Option<(&'a Signal, String)> {
        let pairs = [
            (Some(&bus.tdata), Some(&self.tdata), Some(&now.tdata)),
            (Some(&bus.tlast), Some(&self.tlast), Some(&now.tlast)),
            (bus.tdest.as_ref(), self.tdest.as_ref(), now.tdest.as_ref()),
            (bus.tuser.as_ref(), self.tuser.as_ref(), now.tuser.as_ref()),
        ];
        pairs.into_iter().find_map(|(signal, before, after)| {
            let signal = signal?;
            let (before, after) = (before?, after?);
            (before != after).then(|| {
                (
                    signal,
                    format!("changed from {before} to {after} while the word was stalled"),
                )
            })
        })
    }
}

async fn watch(bus: AxisBus, violations: Rc<RefCell<Vec<Violation>>>) {
    let kernel = bus.clock.kernel().clone();
    let mut stalled: Option<Presented> = None;
    let mut cycle: u64 = 0;

    let report = |signal: &Signal, cycle: u64, reason: String| {
        let violation = Violation {
            signal: signal.name(),
            cycle,
            reason,
        };
        tracing::error!(bus = bus.name(), %violation, "handshake rule broken");
        kernel.fail(violation.to_string());
        violations.borrow_mut().push(violation);
    };

    loop {
        bus.clock.rising_edge().await;
        cycle += 1;

        if bus.in_reset() {
            stalled = None;
            continue;
        }

        let valid = bus.tvalid.logic();
        let ready = bus.tready.logic();
        if !valid.is_known() {
            report(&bus.tvalid, cycle, format!("tvalid is {valid} out of reset"));
            stalled = None;
            continue;
        }
        if !ready.is_known() {
            report(&bus.tready, cycle, format!("tready is {ready} out of reset"));
            stalled = None;
            continue;
        }

        let current = valid.is_high().then(|| Presented::sample(&bus));
        if let Some(before) = stalled.take() {
            match &current {
                None => report(
                    &bus.tvalid,
                    cycle,
                    "tvalid dropped before the presented word was accepted".to_string(),
                ),
                Some(now) => {
                    if let Some((signal, reason)) = before.changed(now, &bus) {
                        report(signal, cycle, reason);
                    }
                }
            }
        }

        if !ready.is_high() {
            stalled = current;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strobe_sim::{Clock, SimError, SimKernel, FS_PER_NS};

    fn bus(kernel: &SimKernel) -> AxisBus {
        let clk = kernel.signal("aclk", 1).unwrap();
        let rst = kernel.signal("arstn", 1).unwrap();
        kernel.signal("s_axis_tdata", 8).unwrap();
        kernel.signal("s_axis_tvalid", 1).unwrap();
        kernel.signal("s_axis_tready", 1).unwrap();
        kernel.signal("s_axis_tlast", 1).unwrap();
        AxisBus::from_prefix(kernel, "s_axis", &clk, &rst).unwrap()
    }

    /// Drives `steps` as (tvalid, tdata, tready) for consecutive cycles.
    fn drive(kernel: &SimKernel, bus: &AxisBus, steps: Vec<(bool, u64, bool)>) -> Result<(), SimError> {
        Clock::new(bus.clock.clone(), 2 * FS_PER_NS).unwrap().start();
        let b = bus.clone();
        kernel.run_until_complete(async move {
            b.reset.set_bool(true);
            b.tlast.set_bool(false);
            for (valid, data, ready) in steps {
                b.tvalid.set_bool(valid);
                b.tdata.set_u64(data);
                b.tready.set_bool(ready);
                b.clock.rising_edge().await;
            }
            b.clock.rising_edges(2).await;
        })
    }

    #[test]
    fn held_word_passes() {
        let kernel = SimKernel::new();
        let bus = bus(&kernel);
        let checker = ProtocolChecker::new(bus.clone());
        let steps = vec![(true, 7, false), (true, 7, false), (true, 7, true), (false, 0, true)];
        drive(&kernel, &bus, steps).unwrap();
        assert!(checker.is_clean());
        kernel.shutdown();
    }

    #[test]
    fn changed_data_while_stalled_fails() {
        let kernel = SimKernel::new();
        let bus = bus(&kernel);
        let checker = ProtocolChecker::new(bus.clone());
        let steps = vec![(true, 7, false), (true, 8, true), (false, 0, true)];
        let err = drive(&kernel, &bus, steps).unwrap_err();
        assert!(matches!(err, SimError::AssertionFailed { ref message, .. } if message.contains("s_axis_tdata")));
        assert_eq!(checker.violations().len(), 1);
        kernel.shutdown();
    }

    #[test]
    fn dropped_valid_fails() {
        let kernel = SimKernel::new();
        let bus = bus(&kernel);
        let checker = ProtocolChecker::new(bus.clone());
        let steps = vec![(true, 3, false), (false, 3, true), (false, 0, true)];
        assert!(drive(&kernel, &bus, steps).is_err());
        let violations = checker.violations();
        assert_eq!(violations[0].signal, "s_axis_tvalid");
        kernel.shutdown();
    }

    #[test]
    fn unknown_ready_fails() {
        let kernel = SimKernel::new();
        let bus = bus(&kernel);
        let checker = ProtocolChecker::new(bus.clone());
        Clock::new(bus.clock.clone(), 2 * FS_PER_NS).unwrap().start();
        let b = bus.clone();
        let result = kernel.run_until_complete(async move {
            b.reset.set_bool(true);
            b.tvalid.set_bool(false);
            b.clock.rising_edges(3).await;
        });
        assert!(result.is_err());
        assert_eq!(checker.violations()[0].signal, "s_axis_tready");
        kernel.shutdown();
    }

    #[test]
    fn violation_converts_to_axis_error() {
        let v = Violation {
            signal: "m_axis_tvalid".into(),
            cycle: 4,
            reason: "tvalid is X out of reset".into(),
        };
        let text = v.to_string();
        assert_eq!(AxisError::from(v).to_string(), text);
    }
}
