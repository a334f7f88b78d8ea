use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use crate::report::{MonthOutcome, Reporter, Snapshot, Summary};

/// One NDJSON line of run output.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Frame<'a> {
    Snapshot(&'a Snapshot),
    Month(&'a MonthOutcome),
    Summary(&'a Summary),
}

impl Frame<'_> {
    pub fn to_ndjson(&self) -> serde_json::Result<String> {
        let mut json = serde_json::to_string(self)?;
        json.push('\n');
        Ok(json)
    }
}

/// Reporter that streams frames to a writer, one JSON object per line.
pub struct NdjsonReporter<W: Write> {
    writer: W,
    include_months: bool,
}

impl<W: Write> NdjsonReporter<W> {
    /// With `include_months`, every monthly outcome is written in addition to
    /// snapshots and the summary.
    pub fn new(writer: W, include_months: bool) -> Self {
        Self {
            writer,
            include_months,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_frame(&mut self, frame: Frame<'_>) -> Result<()> {
        let line = frame.to_ndjson()?;
        self.writer.write_all(line.as_bytes())?;
        Ok(())
    }
}

impl<W: Write> Reporter for NdjsonReporter<W> {
    fn snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.write_frame(Frame::Snapshot(snapshot))
    }

    fn month(&mut self, outcome: &MonthOutcome) -> Result<()> {
        if self.include_months {
            self.write_frame(Frame::Month(outcome))?;
        }
        Ok(())
    }

    fn summary(&mut self, summary: &Summary) -> Result<()> {
        self.write_frame(Frame::Summary(summary))?;
        self.writer.flush()?;
        Ok(())
    }
}
