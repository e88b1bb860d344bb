//! The device trait and the per-side processes the models are built from.

use strobe_axis::AxisBus;
use strobe_sim::{Edge, JoinHandle, Signal};

use crate::buffer::LaneBuffer;
use crate::error::DutError;
use crate::params::DeviceParams;
use crate::ports::{DomainPorts, DutPorts};

/// A behavioural model of the device under test.
///
/// Models see the harness only through [`DutPorts`]: they sample the inbound
/// bus and drive the outbound one on their clock edges, and react to reset
/// assertion without waiting for a clock.
pub trait Device {
    /// Short model name for logs and reports.
    fn name(&self) -> &'static str;

    /// Parameters the model was elaborated with.
    fn params(&self) -> &DeviceParams;

    /// Spawns the model's processes on the kernel that owns `ports`.
    fn attach(&self, ports: &DutPorts) -> Result<Vec<JoinHandle<()>>, DutError>;
}

/// Waits for a rising clock edge or an asynchronous reset assertion.
///
/// Returns true while reset is asserted.
pub(crate) async fn next_event(domain: &DomainPorts) -> bool {
    domain
        .clock
        .kernel()
        .first_edge(&[(&domain.clock, Edge::Rising), (&domain.reset, Edge::Falling)])
        .await;
    !domain.reset.is_high()
}

/// Logs reset entry and exit once per transition.
pub(crate) fn note_reset(domain: &DomainPorts, was: &mut bool, now: bool) {
    if *was != now {
        if now {
            tracing::debug!(domain = %domain.name, "device in reset");
        } else {
            tracing::debug!(domain = %domain.name, "device out of reset");
        }
        *was = now;
    }
}

fn read_tag(tag: &Option<Signal>) -> u64 {
    tag.as_ref().and_then(Signal::to_u64).unwrap_or(0)
}

/// Stores the inbound word if it was accepted on this edge.
pub(crate) fn accept_input(bus: &AxisBus, buf: &mut LaneBuffer) {
    if !(bus.tvalid.is_high() && bus.tready.is_high()) {
        return;
    }
    let word = bus.tdata.value();
    let Some(bytes) = word.to_bytes() else {
        tracing::warn!(bus = bus.name(), %word, "accepted word has unknown bits, dropped");
        return;
    };
    buf.push_word(
        &bytes,
        bus.tlast.is_high(),
        read_tag(&bus.tdest),
        read_tag(&bus.tuser),
    );
}

/// Frees the presented output word if the receiver took it on this edge.
pub(crate) fn retire_output(bus: &AxisBus, buf: &mut LaneBuffer, presented: &mut Option<usize>) {
    if let Some(lanes) = presented.take() {
        if bus.tready.is_high() {
            buf.pop(lanes);
            if buf.is_empty() {
                tracing::trace!(bus = bus.name(), "buffer drained");
            }
        }
    }
}

pub(crate) fn drive_input(bus: &AxisBus, buf: &LaneBuffer) {
    bus.tready.set_bool(buf.can_accept());
}

/// Presents the head word, or idles the bus with `tdata` undefined.
pub(crate) fn drive_output(
    bus: &AxisBus,
    buf: &LaneBuffer,
    presented: &mut Option<usize>,
    data_count: Option<&Signal>,
) {
    match buf.head_word() {
        Some(word) => {
            bus.tdata.set_bytes(&word.bytes);
            bus.tlast.set_bool(word.last);
            if let Some(tdest) = &bus.tdest {
                tdest.set_u64(word.tdest);
            }
            if let Some(tuser) = &bus.tuser {
                tuser.set_u64(word.tuser);
            }
            bus.tvalid.set_bool(true);
            *presented = Some(word.lanes);
        }
        None => {
            idle_output(bus);
            *presented = None;
        }
    }
    if let Some(count) = data_count {
        count.set_u64(buf.occupancy());
    }
}

pub(crate) fn idle_input(bus: &AxisBus) {
    bus.tready.set_bool(false);
}

pub(crate) fn idle_output(bus: &AxisBus) {
    bus.tvalid.set_bool(false);
    bus.tlast.set_bool(false);
    bus.tdata.set_unknown();
    for tag in [&bus.tdest, &bus.tuser].into_iter().flatten() {
        tag.set_unknown();
    }
}

/// One process serving both buses on a shared clock.
///
/// Per edge the output side retires before the input side stores, so a
/// word freed this edge makes room for the word arriving on it.
pub(crate) async fn run_shared(
    domain: DomainPorts,
    s_axis: AxisBus,
    m_axis: AxisBus,
    mut buf: LaneBuffer,
    data_count: Option<Signal>,
) {
    let mut presented = None;
    let mut in_reset = false;
    loop {
        let reset = next_event(&domain).await;
        note_reset(&domain, &mut in_reset, reset);
        if reset {
            buf.clear();
            presented = None;
            idle_input(&s_axis);
            idle_output(&m_axis);
            if let Some(count) = &data_count {
                count.set_u64(0);
            }
            continue;
        }
        retire_output(&m_axis, &mut buf, &mut presented);
        accept_input(&s_axis, &mut buf);
        drive_output(&m_axis, &buf, &mut presented, data_count.as_ref());
        drive_input(&s_axis, &buf);
    }
}
