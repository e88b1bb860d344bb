//! Assembly of one simulation: device, clock domains, and stream components.

use std::cell::RefCell;
use std::future::Future;
use std::path::Path;
use std::rc::Rc;

use strobe_axis::{AxisSink, AxisSource, ProtocolChecker, Violation};
use strobe_config::{prepare_config, DeviceModel, StrobeConfig};
use strobe_dut::{Device, DeviceParams, DutError, DutPorts, StreamFifo, WidthConverter};
use strobe_sim::{SimError, SimKernel, Signal, VcdRecorder};

use crate::domain::{reset_all, ClockDomain};
use crate::error::ScenarioError;

/// Converts the device section of a configuration into model parameters.
pub fn device_params(config: &StrobeConfig) -> DeviceParams {
    let device = &config.device;
    DeviceParams {
        in_width: device.in_width,
        out_width: device.out_width,
        depth: device.depth,
        dest_bits: device.dest_bits,
        user_bits: device.user_bits,
        occupancy: device.occupancy,
        domains: config.domains.iter().map(|d| d.name.clone()).collect(),
    }
}

/// One freshly elaborated device with its clocks, plus the stream
/// components a scenario attaches on demand.
///
/// A testbench runs a single scenario. The source driver and sink monitor
/// are created the first time they are asked for, each with a protocol
/// checker on its bus, so scenarios that drive the bus signals themselves
/// never attach a competing driver.
pub struct Testbench {
    kernel: SimKernel,
    config: StrobeConfig,
    params: DeviceParams,
    ports: DutPorts,
    domains: Vec<ClockDomain>,
    device: Box<dyn Device>,
    source: RefCell<Option<Rc<AxisSource>>>,
    sink: RefCell<Option<Rc<AxisSink>>>,
    checkers: RefCell<Vec<ProtocolChecker>>,
}

impl Testbench {
    /// Validates `config`, declares the device ports, and attaches the
    /// configured model. No clock runs and no reset is applied yet.
    pub fn new(config: &StrobeConfig) -> Result<Rc<Self>, ScenarioError> {
        let config = prepare_config(config.clone())?;
        let params = device_params(&config);
        let device: Box<dyn Device> = match config.device.model {
            DeviceModel::Converter => Box::new(WidthConverter::new(params.clone())?),
            DeviceModel::Fifo => Box::new(StreamFifo::new(params.clone())?),
        };
        Self::assemble(config, params, device)
    }

    /// Like [`new`](Self::new), but attaches `device` instead of the
    /// configured model.
    ///
    /// The device must have been elaborated with the parameters `config`
    /// describes, since the ports are declared from the configuration.
    pub fn with_device(config: &StrobeConfig, device: Box<dyn Device>) -> Result<Rc<Self>, ScenarioError> {
        let config = prepare_config(config.clone())?;
        let params = device_params(&config);
        if device.params() != &params {
            return Err(DutError::InvalidParams(format!(
                "model '{}' was built for {:?}, configuration describes {:?}",
                device.name(),
                device.params(),
                params
            ))
            .into());
        }
        Self::assemble(config, params, device)
    }

    fn assemble(
        config: StrobeConfig,
        params: DeviceParams,
        device: Box<dyn Device>,
    ) -> Result<Rc<Self>, ScenarioError> {
        let kernel = SimKernel::new();
        kernel.set_time_limit(config.harness.watchdog_fs);

        let ports = DutPorts::declare(&kernel, &params)?;
        device.attach(&ports)?;

        let domains = ports
            .domains
            .iter()
            .zip(&config.domains)
            .map(|(ports, config)| ClockDomain::new(ports, config))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            model = device.name(),
            in_width = params.in_width,
            out_width = params.out_width,
            domains = domains.len(),
            "testbench assembled"
        );
        Ok(Rc::new(Self {
            kernel,
            config,
            params,
            ports,
            domains,
            device,
            source: RefCell::new(None),
            sink: RefCell::new(None),
            checkers: RefCell::new(Vec::new()),
        }))
    }

    /// Returns the simulation kernel.
    pub fn kernel(&self) -> &SimKernel {
        &self.kernel
    }

    /// Returns the validated configuration.
    pub fn config(&self) -> &StrobeConfig {
        &self.config
    }

    /// Returns the device parameters.
    pub fn params(&self) -> &DeviceParams {
        &self.params
    }

    /// Returns the device's ports.
    pub fn ports(&self) -> &DutPorts {
        &self.ports
    }

    /// Returns the clock domains, input side first.
    pub fn domains(&self) -> &[ClockDomain] {
        &self.domains
    }

    /// Returns the device model name.
    pub fn device_name(&self) -> &'static str {
        self.device.name()
    }

    /// Returns the clock the inbound bus is sampled on.
    pub fn input_clock(&self) -> &Signal {
        &self.ports.s_axis.clock
    }

    /// Returns the clock the outbound bus is sampled on.
    pub fn output_clock(&self) -> &Signal {
        &self.ports.m_axis.clock
    }

    /// Starts every domain's clock.
    pub fn start_clocks(&self) {
        for domain in &self.domains {
            domain.start();
        }
    }

    /// Pulses every domain's reset concurrently and waits for release.
    pub async fn reset(&self) {
        reset_all(&self.domains).await;
    }

    /// Records every device signal to a VCD file at `path`.
    pub fn record_waveform(&self, path: &Path) -> Result<(), ScenarioError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(SimError::from)?;
        }
        let recorder = VcdRecorder::create(path)?;
        self.kernel.set_recorder(Box::new(recorder))?;
        tracing::debug!(path = %path.display(), "recording waveform");
        Ok(())
    }

    /// Returns the source driver on `s_axis`, attaching it on first use.
    pub fn source(&self) -> Rc<AxisSource> {
        self.source
            .borrow_mut()
            .get_or_insert_with(|| {
                self.checkers
                    .borrow_mut()
                    .push(ProtocolChecker::new(self.ports.s_axis.clone()));
                Rc::new(AxisSource::new(self.ports.s_axis.clone()))
            })
            .clone()
    }

    /// Returns the sink monitor on `m_axis`, attaching it on first use.
    pub fn sink(&self) -> Rc<AxisSink> {
        self.sink
            .borrow_mut()
            .get_or_insert_with(|| {
                self.checkers
                    .borrow_mut()
                    .push(ProtocolChecker::new(self.ports.m_axis.clone()));
                Rc::new(AxisSink::new(self.ports.m_axis.clone()))
            })
            .clone()
    }

    /// Every handshake violation the checkers have seen.
    pub fn violations(&self) -> Vec<Violation> {
        self.checkers
            .borrow()
            .iter()
            .flat_map(ProtocolChecker::violations)
            .collect()
    }

    /// Runs `scenario` to completion under the watchdog, then tears the
    /// simulation down.
    ///
    /// A checker failure is reported as a protocol violation, a watchdog
    /// expiry as a liveness failure.
    pub fn run<T, F, Fut>(self: &Rc<Self>, scenario: F) -> Result<T, ScenarioError>
    where
        F: FnOnce(Rc<Testbench>) -> Fut,
        Fut: Future<Output = Result<T, ScenarioError>> + 'static,
        T: 'static,
    {
        let outcome = self.kernel.run_until_complete(scenario(self.clone()));
        let violation = self.violations().into_iter().next();
        self.kernel.shutdown();
        match outcome {
            Ok(result) => result,
            Err(error @ SimError::AssertionFailed { .. }) => match violation {
                Some(violation) => Err(strobe_axis::AxisError::from(violation).into()),
                None => Err(ScenarioError::Simulation(error)),
            },
            Err(error) => Err(ScenarioError::from_run(error)),
        }
    }
}

impl Drop for Testbench {
    fn drop(&mut self) {
        self.kernel.shutdown();
    }
}
