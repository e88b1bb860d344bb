//! Checks comparing expected and observed frames and signal states.

use strobe_axis::{AxisFrame, ReceivedFrame};
use strobe_sim::{FormatFs, Signal};

use crate::error::ScenarioError;

/// Compares a received frame against the one sent, bytes first, then tags.
pub fn expect_frame_eq(context: &str, sent: &AxisFrame, received: &AxisFrame) -> Result<(), ScenarioError> {
    if sent.tdata != received.tdata {
        let at = sent
            .tdata
            .iter()
            .zip(&received.tdata)
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| sent.tdata.len().min(received.tdata.len()));
        return Err(ScenarioError::DataIntegrity {
            context: format!("{context} tdata (first difference at byte {at})"),
            expected: excerpt(&sent.tdata, at),
            observed: excerpt(&received.tdata, at),
        });
    }
    for (field, expected, observed) in [
        ("tdest", sent.tdest, received.tdest),
        ("tuser", sent.tuser, received.tuser),
    ] {
        if expected != observed {
            return Err(ScenarioError::DataIntegrity {
                context: format!("{context} {field}"),
                expected: format!("{expected:#x}"),
                observed: format!("{observed:#x}"),
            });
        }
    }
    Ok(())
}

/// Checks that the received frame took one bus word per `width` bytes of
/// the sent frame.
///
/// The sink closes a frame on `tlast`, so a matching beat count means the
/// marker fired once, on the final word.
pub fn expect_framing(
    context: &str,
    sent: &AxisFrame,
    received: &ReceivedFrame,
    width: u32,
) -> Result<(), ScenarioError> {
    let expected = sent.word_count(width);
    if received.beats != expected {
        return Err(ScenarioError::DataIntegrity {
            context: format!("{context} framing"),
            expected: format!("tlast on word {expected}"),
            observed: format!("tlast on word {}", received.beats),
        });
    }
    Ok(())
}

/// Up to eight bytes in hex starting at `at`, with the total length.
fn excerpt(bytes: &[u8], at: usize) -> String {
    let shown: Vec<String> = bytes
        .iter()
        .skip(at)
        .take(8)
        .map(|b| format!("{b:02x}"))
        .collect();
    format!("[{}] of {} bytes", shown.join(" "), bytes.len())
}

fn describe(signal: &Signal) -> String {
    match signal.to_u64() {
        Some(value) => value.to_string(),
        None => signal.value().to_string(),
    }
}

/// Checks a signal's current value.
pub fn expect_signal(signal: &Signal, expected: u64) -> Result<(), ScenarioError> {
    if signal.to_u64() == Some(expected) {
        return Ok(());
    }
    Err(ScenarioError::Liveness {
        signal: signal.name(),
        expected: expected.to_string(),
        observed: describe(signal),
        window: format!("at {}", signal.kernel().now()),
    })
}

/// Waits up to `cycles` rising edges of `clock` for `signal` to satisfy
/// `condition`, checking the current value first.
///
/// Returns the number of edges waited.
pub async fn expect_within(
    signal: &Signal,
    clock: &Signal,
    cycles: u32,
    expected: &str,
    condition: impl Fn(Option<u64>) -> bool,
) -> Result<u32, ScenarioError> {
    if condition(signal.to_u64()) {
        return Ok(0);
    }
    for waited in 1..=cycles {
        clock.rising_edge().await;
        if condition(signal.to_u64()) {
            return Ok(waited);
        }
    }
    Err(ScenarioError::Liveness {
        signal: signal.name(),
        expected: expected.to_string(),
        observed: describe(signal),
        window: format!("within {cycles} cycles of '{}'", clock.name()),
    })
}

/// Checks that `signal` equals `expected` now and does not change for
/// `window_fs`, with or without clock edges.
pub async fn expect_held(signal: &Signal, expected: u64, window_fs: u64) -> Result<(), ScenarioError> {
    expect_signal(signal, expected)?;
    let kernel = signal.kernel().clone();
    let watched = signal.clone();
    let mut watcher = kernel.spawn(async move {
        watched.any_edge().await;
        (watched.kernel().now(), describe(&watched))
    });
    kernel.timer(window_fs).await;
    match watcher.try_take() {
        Ok(Some((at, observed))) => Err(ScenarioError::Liveness {
            signal: signal.name(),
            expected: format!("{expected} throughout"),
            observed: format!("{observed} at {at}"),
            window: format!("for {}", FormatFs(window_fs)),
        }),
        Ok(None) => {
            watcher.abort();
            Ok(())
        }
        Err(error) => Err(ScenarioError::Simulation(error)),
    }
}
