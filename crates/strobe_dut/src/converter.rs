//! Single-clock data width converter.

use strobe_sim::JoinHandle;

use crate::buffer::LaneBuffer;
use crate::error::DutError;
use crate::model::{run_shared, Device};
use crate::params::DeviceParams;
use crate::ports::DutPorts;

/// Resizes a stream between two integer-related widths on one clock.
///
/// Holds two words of the wider width; carries no tags and no occupancy
/// output.
#[derive(Debug, Clone)]
pub struct WidthConverter {
    params: DeviceParams,
}

impl WidthConverter {
    /// Checks that `params` describe a plain single-clock converter.
    pub fn new(params: DeviceParams) -> Result<Self, DutError> {
        params.validate()?;
        let unsupported = [
            (params.depth.is_some(), "a buffer depth"),
            (params.has_tags(), "tag fields"),
            (params.occupancy, "an occupancy output"),
            (params.is_dual_clock(), "a second clock domain"),
        ];
        if let Some((_, what)) = unsupported.iter().find(|(set, _)| *set) {
            return Err(DutError::InvalidParams(format!(
                "the width converter does not have {what}"
            )));
        }
        Ok(Self { params })
    }
}

impl Device for WidthConverter {
    fn name(&self) -> &'static str {
        "converter"
    }

    fn params(&self) -> &DeviceParams {
        &self.params
    }

    fn attach(&self, ports: &DutPorts) -> Result<Vec<JoinHandle<()>>, DutError> {
        let domain = ports.input_domain().clone();
        let kernel = domain.clock.kernel().clone();
        let buf = LaneBuffer::new(
            self.params.capacity_bytes(),
            self.params.in_width,
            self.params.out_width,
        );
        tracing::debug!(
            in_width = self.params.in_width,
            out_width = self.params.out_width,
            "width converter attached"
        );
        Ok(vec![kernel.spawn(run_shared(
            domain,
            ports.s_axis.clone(),
            ports.m_axis.clone(),
            buf,
            None,
        ))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strobe_sim::{Clock, SimKernel, FS_PER_NS};

    fn converter(in_width: u32, out_width: u32) -> (SimKernel, DutPorts) {
        let kernel = SimKernel::new();
        let params = DeviceParams {
            in_width,
            out_width,
            ..DeviceParams::default()
        };
        let ports = DutPorts::declare(&kernel, &params).unwrap();
        WidthConverter::new(params).unwrap().attach(&ports).unwrap();
        (kernel, ports)
    }

    #[test]
    fn rejects_fifo_features() {
        let tagged = DeviceParams {
            dest_bits: 2,
            ..DeviceParams::default()
        };
        assert!(WidthConverter::new(tagged).is_err());
        let deep = DeviceParams {
            depth: Some(4),
            ..DeviceParams::default()
        };
        assert!(WidthConverter::new(deep).is_err());
    }

    #[test]
    fn ready_after_reset_release() {
        let (kernel, ports) = converter(4, 1);
        Clock::new(ports.input_domain().clock.clone(), 2 * FS_PER_NS)
            .unwrap()
            .start();
        let p = ports.clone();
        let k = kernel.clone();
        let (during, after) = kernel
            .run_until_complete(async move {
                let rst = &p.input_domain().reset;
                rst.set_bool(false);
                k.timer(5 * FS_PER_NS).await;
                let during = p.s_axis.tready.logic();
                rst.set_bool(true);
                p.s_axis.clock.rising_edges(2).await;
                (during, p.s_axis.tready.logic())
            })
            .unwrap();
        assert!(during.is_low());
        assert!(after.is_high());
        kernel.shutdown();
    }

    #[test]
    fn downsizes_a_word() {
        let (kernel, ports) = converter(2, 1);
        Clock::new(ports.input_domain().clock.clone(), 2 * FS_PER_NS)
            .unwrap()
            .start();
        let p = ports.clone();
        let k = kernel.clone();
        let bytes = kernel
            .run_until_complete(async move {
                let (s, m) = (&p.s_axis, &p.m_axis);
                p.input_domain().reset.set_bool(false);
                k.timer(5 * FS_PER_NS).await;
                p.input_domain().reset.set_bool(true);
                m.tready.set_bool(true);
                s.clock.rising_edge().await;
                s.tdata.set_bytes(&[0xaa, 0xbb]);
                s.tlast.set_bool(true);
                s.tvalid.set_bool(true);
                s.clock.rising_edge().await;
                s.tvalid.set_bool(false);
                let mut seen = Vec::new();
                while seen.len() < 2 {
                    s.clock.rising_edge().await;
                    if m.tvalid.is_high() {
                        seen.push((m.tdata.to_u64(), m.tlast.is_high()));
                    }
                }
                seen
            })
            .unwrap();
        assert_eq!(bytes, vec![(Some(0xaa), false), (Some(0xbb), true)]);
        kernel.shutdown();
    }
}
