//! Waveform recording for simulation runs.
//!
//! The [`WaveformRecorder`] trait abstracts waveform output. [`VcdRecorder`]
//! writes the IEEE 1364 Value Change Dump format, viewable in GTKWave or
//! Surfer. The kernel registers every declared signal when a recorder is
//! attached and reports each committed value change.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use strobe_common::{Logic, LogicVec};

use crate::error::SimError;
use crate::value::SimSignalId;

/// Sink for committed signal changes.
pub trait WaveformRecorder {
    /// Declares a signal in the current scope.
    fn register_signal(&mut self, id: SimSignalId, name: &str, width: u32) -> Result<(), SimError>;

    /// Opens a new scope (hierarchy level).
    fn begin_scope(&mut self, name: &str) -> Result<(), SimError>;

    /// Closes the current scope.
    fn end_scope(&mut self) -> Result<(), SimError>;

    /// Records a value change at the given time in femtoseconds.
    fn record_change(
        &mut self,
        time_fs: u64,
        id: SimSignalId,
        value: &LogicVec,
    ) -> Result<(), SimError>;

    /// Flushes buffered output and writes any trailer.
    fn finalize(&mut self) -> Result<(), SimError>;
}

/// VCD recorder. Identifier codes are printable ASCII starting at `!`.
pub struct VcdRecorder<W: Write> {
    writer: W,
    codes: HashMap<SimSignalId, (String, u32)>,
    next_code: u32,
    header_written: bool,
    current_time: Option<u64>,
}

impl VcdRecorder<BufWriter<File>> {
    /// Creates a recorder writing to a new file at `path`.
    pub fn create(path: &Path) -> Result<Self, SimError> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> VcdRecorder<W> {
    /// Creates a recorder writing to the given output.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            codes: HashMap::new(),
            next_code: 0,
            header_written: false,
            current_time: None,
        }
    }

    /// Consumes the recorder and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn ensure_header(&mut self) -> Result<(), SimError> {
        if self.header_written {
            return Ok(());
        }
        self.header_written = true;
        writeln!(self.writer, "$version")?;
        writeln!(self.writer, "  strobe stream harness")?;
        writeln!(self.writer, "$end")?;
        writeln!(self.writer, "$timescale")?;
        writeln!(self.writer, "  1fs")?;
        writeln!(self.writer, "$end")?;
        Ok(())
    }

    /// Maps a sequential index to a VCD identifier code.
    ///
    /// Indices past 93 spill into multi-character codes.
    fn make_id_code(index: u32) -> String {
        let mut code = String::new();
        let mut idx = index;
        loop {
            code.push((b'!' + (idx % 94) as u8) as char);
            idx /= 94;
            if idx == 0 {
                break;
            }
            idx -= 1;
        }
        code
    }

    fn format_value(value: &LogicVec, width: u32) -> String {
        let bit = |l: Logic| match l {
            Logic::Zero => '0',
            Logic::One => '1',
            Logic::X => 'x',
            Logic::Z => 'z',
        };
        if width == 1 {
            bit(value.bit0()).to_string()
        } else {
            let mut s = String::with_capacity(width as usize + 1);
            s.push('b');
            for i in (0..width.min(value.width())).rev() {
                s.push(bit(value.get(i)));
            }
            s
        }
    }
}

impl<W: Write> WaveformRecorder for VcdRecorder<W> {
    fn register_signal(&mut self, id: SimSignalId, name: &str, width: u32) -> Result<(), SimError> {
        self.ensure_header()?;
        let code = Self::make_id_code(self.next_code);
        self.next_code += 1;
        writeln!(self.writer, "$var wire {width} {code} {name} $end")?;
        self.codes.insert(id, (code, width));
        Ok(())
    }

    fn begin_scope(&mut self, name: &str) -> Result<(), SimError> {
        self.ensure_header()?;
        writeln!(self.writer, "$scope module {name} $end")?;
        Ok(())
    }

    fn end_scope(&mut self) -> Result<(), SimError> {
        writeln!(self.writer, "$upscope $end")?;
        Ok(())
    }

    fn record_change(
        &mut self,
        time_fs: u64,
        id: SimSignalId,
        value: &LogicVec,
    ) -> Result<(), SimError> {
        self.ensure_header()?;
        if self.current_time != Some(time_fs) {
            if self.current_time.is_none() {
                writeln!(self.writer, "$enddefinitions $end")?;
                writeln!(self.writer, "$dumpvars")?;
            }
            writeln!(self.writer, "#{time_fs}")?;
            self.current_time = Some(time_fs);
        }

        let (code, width) = self
            .codes
            .get(&id)
            .ok_or_else(|| SimError::InvalidSignalRef {
                reason: format!("unregistered VCD signal {}", id.as_raw()),
            })?;
        let text = Self::format_value(value, *width);
        if *width == 1 {
            writeln!(self.writer, "{text}{code}")?;
        } else {
            writeln!(self.writer, "{text} {code}")?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SimError> {
        if self.current_time.is_none() {
            self.ensure_header()?;
            writeln!(self.writer, "$enddefinitions $end")?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
