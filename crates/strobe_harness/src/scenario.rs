//! The scenario suite run against every device configuration.

use std::fmt;
use std::rc::Rc;

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use strobe_axis::{tag_mask, AxisFrame, PauseSequence};
use strobe_config::ConfigError;
use strobe_dut::DeviceParams;

use crate::compare::{expect_frame_eq, expect_framing, expect_held, expect_signal, expect_within};
use crate::error::ScenarioError;
use crate::testbench::Testbench;

/// Clock edges allowed for a flow-control signal to settle.
const SETTLE_CYCLES: u32 = 8;

/// Input clock periods a blocked signal is watched for.
const HOLD_CYCLES: u64 = 64;

/// One test case of the suite.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// Frames spanning the wider bus, one repeated byte value each.
    WidthConversion,
    /// One wide word per frame with tags cycling through their ranges.
    TaggedSingleWord,
    /// Fill the buffer while the sink stalls, then drain it.
    FullEmpty,
    /// One large frame against a seeded random readiness pattern.
    RandomBackpressure,
    /// Reset held with clocks running.
    HeldInReset,
    /// Reset held with clocks never started.
    ClockAbsent,
}

impl Scenario {
    /// Every scenario in run order.
    pub const ALL: [Scenario; 6] = [
        Scenario::WidthConversion,
        Scenario::TaggedSingleWord,
        Scenario::FullEmpty,
        Scenario::RandomBackpressure,
        Scenario::HeldInReset,
        Scenario::ClockAbsent,
    ];

    /// Identifier used on the command line and in reports.
    pub fn name(self) -> &'static str {
        match self {
            Scenario::WidthConversion => "width_conversion",
            Scenario::TaggedSingleWord => "tagged_single_word",
            Scenario::FullEmpty => "full_empty",
            Scenario::RandomBackpressure => "random_backpressure",
            Scenario::HeldInReset => "held_in_reset",
            Scenario::ClockAbsent => "clock_absent",
        }
    }

    /// One-line summary for `strobe list`.
    pub fn description(self) -> &'static str {
        match self {
            Scenario::WidthConversion => "roundtrip of frames spanning the wider bus width",
            Scenario::TaggedSingleWord => "single-word frames with cycling tdest/tuser tags",
            Scenario::FullEmpty => "fill the buffer under a stalled sink, then drain it",
            Scenario::RandomBackpressure => "one large frame under seeded random backpressure",
            Scenario::HeldInReset => "input stays not ready while reset is held",
            Scenario::ClockAbsent => "input stays not ready with reset held and no clock",
        }
    }

    /// Looks a scenario up by [`name`](Self::name).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Checks that the device has what this scenario exercises.
    ///
    /// The error explains why the scenario is skipped.
    pub fn requires(self, params: &DeviceParams) -> Result<(), String> {
        match self {
            Scenario::TaggedSingleWord if !params.has_tags() => {
                Err("device carries no tdest/tuser tags".to_string())
            }
            Scenario::FullEmpty if !params.occupancy || params.depth.is_none() => {
                Err("device has no occupancy output".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Runs the scenario on a fresh testbench and returns the number of
    /// frames checked.
    pub fn run(self, tb: &Rc<Testbench>) -> Result<u32, ScenarioError> {
        self.run_traced(tb).map(|(checked, _)| checked)
    }

    /// Like [`run`](Self::run), also returning the phases passed through.
    pub(crate) fn run_traced(self, tb: &Rc<Testbench>) -> Result<(u32, Vec<Phase>), ScenarioError> {
        tb.run(move |tb| async move {
            let mut phases = PhaseTracker::new(self);
            let checked = match self {
                Scenario::WidthConversion => width_conversion(&tb, &mut phases).await?,
                Scenario::TaggedSingleWord => tagged_single_word(&tb, &mut phases).await?,
                Scenario::FullEmpty => full_empty(&tb, &mut phases).await?,
                Scenario::RandomBackpressure => random_backpressure(&tb, &mut phases).await?,
                Scenario::HeldInReset => held_in_reset(&tb, &mut phases).await?,
                Scenario::ClockAbsent => clock_absent(&tb, &mut phases).await?,
            };
            phases.enter(Phase::Idle);
            Ok((checked, phases.history().to_vec()))
        })
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Step of a scenario's fixed sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Nothing applied yet, or finished.
    Idle,
    /// Clocks running.
    ClockStarted,
    /// Reset pulsed or held.
    Reset,
    /// Stimulus being presented.
    Driving,
    /// Waiting on the sink.
    Receiving,
    /// Watching flow control stay deasserted.
    AssertingBlocked,
    /// Every check passed.
    Verified,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::ClockStarted => "clock started",
            Phase::Reset => "reset",
            Phase::Driving => "driving",
            Phase::Receiving => "receiving",
            Phase::AssertingBlocked => "asserting blocked",
            Phase::Verified => "verified",
        };
        f.write_str(name)
    }
}

/// Logs phase transitions of one scenario.
#[derive(Debug)]
pub struct PhaseTracker {
    scenario: Scenario,
    phase: Phase,
    history: Vec<Phase>,
}

impl PhaseTracker {
    /// Starts in [`Phase::Idle`].
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            phase: Phase::Idle,
            history: vec![Phase::Idle],
        }
    }

    /// Moves to `phase`. Repeating the current phase is not logged.
    pub fn enter(&mut self, phase: Phase) {
        if phase == self.phase {
            return;
        }
        // Per-frame phases would flood the info level.
        match phase {
            Phase::Driving | Phase::Receiving => {
                tracing::debug!(scenario = %self.scenario, from = %self.phase, to = %phase, "phase")
            }
            _ => tracing::info!(scenario = %self.scenario, from = %self.phase, to = %phase, "phase"),
        }
        self.phase = phase;
        self.history.push(phase);
    }

    /// Returns the current phase.
    pub fn current(&self) -> Phase {
        self.phase
    }

    /// Every phase entered so far, in order.
    pub fn history(&self) -> &[Phase] {
        &self.history
    }
}

async fn start_and_reset(tb: &Testbench, phases: &mut PhaseTracker) -> Result<(), ScenarioError> {
    tb.start_clocks();
    phases.enter(Phase::ClockStarted);
    tb.reset().await;
    phases.enter(Phase::Reset);
    expect_within(&tb.ports().s_axis.tready, tb.input_clock(), SETTLE_CYCLES, "1", |v| {
        v == Some(1)
    })
    .await?;
    Ok(())
}

/// Sends `frame`, waits for its last input word and the reconstructed
/// frame, and compares both ends.
async fn transfer(
    tb: &Testbench,
    phases: &mut PhaseTracker,
    context: &str,
    mut frame: AxisFrame,
) -> Result<(), ScenarioError> {
    let params = tb.params();
    frame.mask_tags(params.dest_bits, params.user_bits);
    let sent = frame.clone();
    let completion = frame.completion();
    phases.enter(Phase::Driving);
    tb.source().send(frame)?;
    completion.wait().await?;
    phases.enter(Phase::Receiving);
    let received = tb.sink().recv().await?;
    expect_frame_eq(context, &sent, &received.frame)?;
    expect_framing(context, &sent, &received, params.out_width)?;
    Ok(())
}

async fn width_conversion(tb: &Testbench, phases: &mut PhaseTracker) -> Result<u32, ScenarioError> {
    tb.source();
    tb.sink();
    start_and_reset(tb, phases).await?;

    let wide = tb.params().wide_width() as usize;
    let frames = tb.config().harness.frames;
    for index in 0..frames {
        let frame = AxisFrame::new(vec![(index % 256) as u8; wide]);
        transfer(tb, phases, &format!("frame {index}"), frame).await?;
        expect_within(&tb.ports().s_axis.tready, tb.input_clock(), SETTLE_CYCLES, "1", |v| {
            v == Some(1)
        })
        .await?;
    }
    phases.enter(Phase::Verified);
    Ok(frames)
}

async fn tagged_single_word(tb: &Testbench, phases: &mut PhaseTracker) -> Result<u32, ScenarioError> {
    tb.source();
    tb.sink();
    start_and_reset(tb, phases).await?;

    let params = tb.params();
    let wide = params.wide_width() as usize;
    let (dest_mask, user_mask) = (tag_mask(params.dest_bits), tag_mask(params.user_bits));
    let frames = tb.config().harness.frames;
    for index in 0..frames {
        let value = u64::from(index);
        let frame = AxisFrame::with_tags(
            vec![(index % 256) as u8; wide],
            value & dest_mask,
            (value + 1) & user_mask,
        );
        transfer(tb, phases, &format!("frame {index}"), frame).await?;
        expect_within(&tb.ports().s_axis.tready, tb.input_clock(), SETTLE_CYCLES, "1", |v| {
            v == Some(1)
        })
        .await?;
    }
    phases.enter(Phase::Verified);
    Ok(frames)
}

async fn full_empty(tb: &Testbench, phases: &mut PhaseTracker) -> Result<u32, ScenarioError> {
    let source = tb.source();
    let sink = tb.sink();
    start_and_reset(tb, phases).await?;

    let params = tb.params();
    let ports = tb.ports();
    let (Some(depth), Some(data_count)) = (params.depth, ports.data_count.as_ref()) else {
        return Err(ConfigError::ValidationError(
            "full_empty needs device.depth and device.occupancy = true".to_string(),
        )
        .into());
    };
    let depth = u64::from(depth);
    let (s_tready, m_tready) = (&ports.s_axis.tready, &ports.m_axis.tready);
    let (in_clock, out_clock) = (tb.input_clock(), tb.output_clock());
    let hold_fs = HOLD_CYCLES * tb.domains()[0].period_fs();

    let rounds = tb.config().harness.fill_cycles;
    for round in 0..rounds {
        let context = format!("fill {round}");
        sink.set_pause(PauseSequence::always());
        expect_within(m_tready, out_clock, SETTLE_CYCLES, "0", |v| v == Some(0)).await?;

        let data: Vec<u8> = (0..params.capacity_bytes())
            .map(|i| (i as u32).wrapping_mul(7).wrapping_add(round) as u8)
            .collect();
        let sent = AxisFrame::new(data);
        let mut frame = sent.clone();
        let completion = frame.completion();
        phases.enter(Phase::Driving);
        source.send(frame)?;
        completion.wait().await?;

        phases.enter(Phase::AssertingBlocked);
        expect_within(data_count, out_clock, SETTLE_CYCLES, &depth.to_string(), |v| {
            v == Some(depth)
        })
        .await?;
        expect_within(s_tready, in_clock, SETTLE_CYCLES, "0", |v| v == Some(0)).await?;
        expect_held(s_tready, 0, hold_fs).await?;
        tracing::debug!(round, depth, "buffer full, input blocked");

        sink.clear_pause();
        phases.enter(Phase::Receiving);
        expect_within(data_count, out_clock, SETTLE_CYCLES, &format!("below {depth}"), |v| {
            v.is_some_and(|count| count < depth)
        })
        .await?;
        let received = sink.recv().await?;
        expect_frame_eq(&context, &sent, &received.frame)?;
        expect_framing(&context, &sent, &received, params.out_width)?;
        expect_within(s_tready, in_clock, SETTLE_CYCLES, "1", |v| v == Some(1)).await?;
    }
    phases.enter(Phase::Verified);
    Ok(rounds)
}

async fn random_backpressure(tb: &Testbench, phases: &mut PhaseTracker) -> Result<u32, ScenarioError> {
    let sink = tb.sink();
    tb.source();
    start_and_reset(tb, phases).await?;

    let params = tb.params();
    let harness = &tb.config().harness;
    let mut rng = ChaCha8Rng::seed_from_u64(harness.seed);
    let mut data = vec![0u8; harness.backpressure_words as usize * params.wide_width() as usize];
    rng.fill_bytes(&mut data);
    let frame = AxisFrame::with_tags(
        data,
        rng.gen::<u64>() & tag_mask(params.dest_bits),
        rng.gen::<u64>() & tag_mask(params.user_bits),
    );
    tracing::debug!(seed = harness.seed, len = frame.tdata.len(), "random backpressure frame");

    sink.set_pause(PauseSequence::random(harness.seed));
    transfer(tb, phases, "backpressure frame", frame).await?;
    sink.clear_pause();

    expect_within(&tb.ports().s_axis.tready, tb.input_clock(), SETTLE_CYCLES, "1", |v| {
        v == Some(1)
    })
    .await?;
    phases.enter(Phase::Verified);
    Ok(1)
}

async fn held_in_reset(tb: &Testbench, phases: &mut PhaseTracker) -> Result<u32, ScenarioError> {
    let ports = tb.ports();
    ports.m_axis.tready.set_bool(false);
    // Reset is written before the clock task first runs, so no edge reaches
    // the device out of reset.
    tb.start_clocks();
    phases.enter(Phase::ClockStarted);
    for domain in tb.domains() {
        domain.hold_reset();
    }
    phases.enter(Phase::Reset);

    let input = &tb.domains()[0];
    tb.kernel().timer(input.reset_hold_fs()).await;
    phases.enter(Phase::AssertingBlocked);
    expect_held(&ports.s_axis.tready, 0, HOLD_CYCLES * input.period_fs()).await?;
    phases.enter(Phase::Verified);
    Ok(0)
}

async fn clock_absent(tb: &Testbench, phases: &mut PhaseTracker) -> Result<u32, ScenarioError> {
    let ports = tb.ports();
    for domain in tb.domains() {
        domain.freeze();
        domain.hold_reset();
    }
    ports.m_axis.tready.set_bool(false);
    phases.enter(Phase::Reset);

    let input = &tb.domains()[0];
    tb.kernel().timer(input.reset_hold_fs()).await;
    phases.enter(Phase::AssertingBlocked);
    expect_signal(&ports.s_axis.tready, 0)?;
    // No edges to count; the window is plain simulated time.
    expect_held(&ports.s_axis.tready, 0, HOLD_CYCLES * input.period_fs()).await?;
    phases.enter(Phase::Verified);
    Ok(0)
}
