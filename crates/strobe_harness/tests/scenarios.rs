use proptest::prelude::*;
use strobe_config::{load_config_from_str, DeviceModel, DomainConfig, StrobeConfig};
use strobe_harness::{
    run_scenario, run_scenarios, Scenario, ScenarioFilter, ScenarioReport, Status, Summary,
};
use strobe_sim::FS_PER_NS;

fn small(mut config: StrobeConfig) -> StrobeConfig {
    config.harness.frames = 6;
    config.harness.backpressure_words = 48;
    config.harness.fill_cycles = 2;
    config
}

fn converter(in_width: u32, out_width: u32) -> StrobeConfig {
    let mut config = StrobeConfig::default();
    config.device.in_width = in_width;
    config.device.out_width = out_width;
    small(config)
}

fn fifo(in_width: u32, out_width: u32, depth: u32) -> StrobeConfig {
    let mut config = converter(in_width, out_width);
    config.device.model = DeviceModel::Fifo;
    config.device.depth = Some(depth);
    config.device.dest_bits = 4;
    config.device.user_bits = 8;
    config.device.occupancy = true;
    config
}

fn dual_clock(mut config: StrobeConfig, in_period_ns: u64, out_period_ns: u64) -> StrobeConfig {
    config.domains = vec![
        DomainConfig {
            name: "s_axis".into(),
            period_fs: in_period_ns * FS_PER_NS,
            ..DomainConfig::default()
        },
        DomainConfig {
            name: "m_axis".into(),
            period_fs: out_period_ns * FS_PER_NS,
            reset_hold_fs: 7 * FS_PER_NS,
        },
    ];
    config
}

fn assert_all_pass(reports: &[ScenarioReport]) {
    for report in reports {
        assert_ne!(report.status, Status::Failed, "{report}");
    }
}

#[test]
fn converter_upsizes() {
    let reports = run_scenarios(&converter(1, 4), &ScenarioFilter::default()).unwrap();
    assert_all_pass(&reports);
    let summary = Summary::of(&reports);
    assert_eq!(summary.passed, 4);
    assert_eq!(summary.skipped, 2);
}

#[test]
fn converter_downsizes() {
    assert_all_pass(&run_scenarios(&converter(4, 1), &ScenarioFilter::default()).unwrap());
}

#[test]
fn converter_passes_through_equal_widths() {
    assert_all_pass(&run_scenarios(&converter(2, 2), &ScenarioFilter::default()).unwrap());
}

#[test]
fn fifo_runs_every_scenario() {
    let reports = run_scenarios(&fifo(2, 8, 16), &ScenarioFilter::default()).unwrap();
    assert_all_pass(&reports);
    assert_eq!(Summary::of(&reports).passed, Scenario::ALL.len());
}

#[test]
fn dual_clock_fifo_runs_every_scenario() {
    let config = dual_clock(fifo(4, 1, 8), 2, 6);
    let reports = run_scenarios(&config, &ScenarioFilter::default()).unwrap();
    assert_all_pass(&reports);
    assert_eq!(Summary::of(&reports).passed, Scenario::ALL.len());
}

#[test]
fn frame_counts_are_reported() {
    let config = fifo(2, 8, 16);
    let report = run_scenario(&config, Scenario::TaggedSingleWord);
    assert_eq!(report.status, Status::Passed, "{report}");
    assert_eq!(report.frames_checked, 6);
    assert!(report.end_time_fs > 0);

    let report = run_scenario(&config, Scenario::FullEmpty);
    assert_eq!(report.frames_checked, 2, "{report}");
}

#[test]
fn short_watchdog_is_a_liveness_failure() {
    let mut config = converter(1, 4);
    config.harness.watchdog_fs = 20 * FS_PER_NS;
    let report = run_scenario(&config, Scenario::RandomBackpressure);
    assert_eq!(report.status, Status::Failed);
    assert_eq!(report.error_kind.as_deref(), Some("liveness"));
    assert!(report.message.unwrap().contains("'watchdog'"));
}

#[test]
fn waveform_files_are_written_per_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = converter(2, 4);
    config.harness.waveform = Some(dir.path().join("waves").join("run.vcd"));
    let reports = run_scenarios(&config, &ScenarioFilter::named("held_in_reset")).unwrap();
    assert_all_pass(&reports);
    let vcd = std::fs::read_to_string(dir.path().join("waves/run_held_in_reset.vcd")).unwrap();
    assert!(vcd.contains("s_axis_tready"));
}

#[test]
fn reports_serialize_to_json() {
    let config = load_config_from_str(
        r#"
[device]
in_width = 1
out_width = 2

[harness]
frames = 3
backpressure_words = 8
"#,
    )
    .unwrap();
    let reports = run_scenarios(&config, &ScenarioFilter::default()).unwrap();
    let json = serde_json::to_value(&reports).unwrap();
    let first = &json[0];
    assert_eq!(first["scenario"], "width_conversion");
    assert_eq!(first["status"], "passed");
    assert_eq!(first["frames_checked"], 3);
    assert!(first.get("error_kind").is_none());

    let skipped = json
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["scenario"] == "full_empty")
        .unwrap();
    assert_eq!(skipped["status"], "skipped");
    assert_eq!(skipped["message"], "device has no occupancy output");
}

fn width_pair() -> impl Strategy<Value = (u32, u32)> {
    (prop::sample::select(vec![1u32, 2, 4]), prop::sample::select(vec![1u32, 2, 4]))
        .prop_map(|(narrow, ratio)| (narrow, narrow * ratio))
        .prop_flat_map(|(narrow, wide)| prop::sample::select(vec![(narrow, wide), (wide, narrow)]))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn roundtrip_holds_for_any_ratio((in_width, out_width) in width_pair(), depth_words in 1u32..4) {
        let wide = in_width.max(out_width);
        let mut config = fifo(in_width, out_width, depth_words * wide);
        config.harness.frames = 3;
        let report = run_scenario(&config, Scenario::WidthConversion);
        prop_assert_eq!(report.status, Status::Passed, "{}", report);
    }

    #[test]
    fn pacing_never_changes_the_result(seed in any::<u64>()) {
        let mut config = fifo(1, 4, 8);
        config.harness.seed = seed;
        config.harness.backpressure_words = 16;
        let report = run_scenario(&config, Scenario::RandomBackpressure);
        prop_assert_eq!(report.status, Status::Passed, "{}", report);
    }
}
