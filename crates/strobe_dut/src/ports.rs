//! The device's signal boundary.

use strobe_axis::AxisBus;
use strobe_sim::{SimKernel, Signal};

use crate::error::DutError;
use crate::params::DeviceParams;

/// Clock and active-low reset of one domain.
#[derive(Clone, Debug)]
pub struct DomainPorts {
    /// Domain name.
    pub name: String,
    /// Clock input.
    pub clock: Signal,
    /// Active-low reset input.
    pub reset: Signal,
}

/// Every port of the device, bound into bus handles.
#[derive(Clone, Debug)]
pub struct DutPorts {
    /// Clock domains, input side first.
    pub domains: Vec<DomainPorts>,
    /// Inbound bus, driven by the harness.
    pub s_axis: AxisBus,
    /// Outbound bus, driven by the device.
    pub m_axis: AxisBus,
    /// Occupancy count, if the device exposes one.
    pub data_count: Option<Signal>,
}

impl DutPorts {
    /// Declares the device's signals on `kernel` and binds them.
    ///
    /// A single domain is named `aclk`/`arstn`; with two, each pair is
    /// prefixed by its domain name (`s_axis_aclk`, `m_axis_arstn`).
    pub fn declare(kernel: &SimKernel, params: &DeviceParams) -> Result<Self, DutError> {
        params.validate()?;

        let domains = if params.is_dual_clock() {
            params
                .domains
                .iter()
                .map(|name| declare_domain(kernel, name, &format!("{name}_")))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            vec![declare_domain(kernel, &params.domains[0], "")?]
        };

        declare_bus(kernel, "s_axis", params.in_width, params)?;
        declare_bus(kernel, "m_axis", params.out_width, params)?;
        let data_count = if params.occupancy {
            Some(kernel.signal("data_count", params.count_bits())?)
        } else {
            None
        };

        let input = &domains[0];
        let output = &domains[domains.len() - 1];
        let s_axis = AxisBus::from_prefix(kernel, "s_axis", &input.clock, &input.reset)?;
        let m_axis = AxisBus::from_prefix(kernel, "m_axis", &output.clock, &output.reset)?;
        tracing::debug!(
            in_width = params.in_width,
            out_width = params.out_width,
            domains = domains.len(),
            signals = kernel.signal_count(),
            "device ports declared"
        );
        Ok(Self {
            domains,
            s_axis,
            m_axis,
            data_count,
        })
    }

    /// Returns the input-side domain.
    pub fn input_domain(&self) -> &DomainPorts {
        &self.domains[0]
    }

    /// Returns the output-side domain, the same as the input side for a
    /// single-clock device.
    pub fn output_domain(&self) -> &DomainPorts {
        &self.domains[self.domains.len() - 1]
    }
}

fn declare_domain(kernel: &SimKernel, name: &str, prefix: &str) -> Result<DomainPorts, DutError> {
    Ok(DomainPorts {
        name: name.to_string(),
        clock: kernel.signal(&format!("{prefix}aclk"), 1)?,
        reset: kernel.signal(&format!("{prefix}arstn"), 1)?,
    })
}

fn declare_bus(kernel: &SimKernel, prefix: &str, width: u32, params: &DeviceParams) -> Result<(), DutError> {
    kernel.signal(&format!("{prefix}_tdata"), width * 8)?;
    for name in ["tvalid", "tready", "tlast"] {
        kernel.signal(&format!("{prefix}_{name}"), 1)?;
    }
    if params.dest_bits > 0 {
        kernel.signal(&format!("{prefix}_tdest"), params.dest_bits)?;
    }
    if params.user_bits > 0 {
        kernel.signal(&format!("{prefix}_tuser"), params.user_bits)?;
    }
    Ok(())
}
