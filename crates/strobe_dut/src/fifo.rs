//! Width-converting FIFO with tags, occupancy, and optional dual clocks.

use std::cell::RefCell;
use std::rc::Rc;

use strobe_axis::AxisBus;
use strobe_sim::{JoinHandle, Signal};

use crate::buffer::LaneBuffer;
use crate::error::DutError;
use crate::model::{
    accept_input, drive_input, drive_output, idle_input, idle_output, next_event, note_reset,
    retire_output, run_shared, Device,
};
use crate::params::DeviceParams;
use crate::ports::{DomainPorts, DutPorts};

/// Buffers `depth` input words and re-emits them at the output width.
///
/// With two clock domains the input side runs on the first and the output
/// side, including `data_count`, on the second. Asserting either reset
/// empties the buffer.
#[derive(Debug, Clone)]
pub struct StreamFifo {
    params: DeviceParams,
}

impl StreamFifo {
    /// Checks that `params` carry a depth.
    pub fn new(params: DeviceParams) -> Result<Self, DutError> {
        params.validate()?;
        if params.depth.is_none() {
            return Err(DutError::InvalidParams("the fifo needs a depth".into()));
        }
        Ok(Self { params })
    }

    fn buffer(&self) -> LaneBuffer {
        LaneBuffer::new(
            self.params.capacity_bytes(),
            self.params.in_width,
            self.params.out_width,
        )
    }
}

impl Device for StreamFifo {
    fn name(&self) -> &'static str {
        "fifo"
    }

    fn params(&self) -> &DeviceParams {
        &self.params
    }

    fn attach(&self, ports: &DutPorts) -> Result<Vec<JoinHandle<()>>, DutError> {
        let input = ports.input_domain().clone();
        let kernel = input.clock.kernel().clone();
        tracing::debug!(
            depth = self.params.depth,
            in_width = self.params.in_width,
            out_width = self.params.out_width,
            dual_clock = self.params.is_dual_clock(),
            "fifo attached"
        );
        if !self.params.is_dual_clock() {
            return Ok(vec![kernel.spawn(run_shared(
                input,
                ports.s_axis.clone(),
                ports.m_axis.clone(),
                self.buffer(),
                ports.data_count.clone(),
            ))]);
        }
        let buf = Rc::new(RefCell::new(self.buffer()));
        Ok(vec![
            kernel.spawn(run_write_side(input, ports.s_axis.clone(), buf.clone())),
            kernel.spawn(run_read_side(
                ports.output_domain().clone(),
                ports.m_axis.clone(),
                buf,
                ports.data_count.clone(),
            )),
        ])
    }
}

async fn run_write_side(domain: DomainPorts, s_axis: AxisBus, buf: Rc<RefCell<LaneBuffer>>) {
    let mut in_reset = false;
    loop {
        let reset = next_event(&domain).await;
        note_reset(&domain, &mut in_reset, reset);
        let mut buf = buf.borrow_mut();
        if reset {
            buf.clear();
            idle_input(&s_axis);
            continue;
        }
        accept_input(&s_axis, &mut buf);
        drive_input(&s_axis, &buf);
    }
}

async fn run_read_side(
    domain: DomainPorts,
    m_axis: AxisBus,
    buf: Rc<RefCell<LaneBuffer>>,
    data_count: Option<Signal>,
) {
    let mut presented = None;
    let mut in_reset = false;
    loop {
        let reset = next_event(&domain).await;
        note_reset(&domain, &mut in_reset, reset);
        let mut buf = buf.borrow_mut();
        if reset {
            buf.clear();
            presented = None;
            idle_output(&m_axis);
            if let Some(count) = &data_count {
                count.set_u64(0);
            }
            continue;
        }
        retire_output(&m_axis, &mut buf, &mut presented);
        drive_output(&m_axis, &buf, &mut presented, data_count.as_ref());
    }
}
