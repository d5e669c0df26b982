//! Console output of tag events.

use crate::config::OutputFormat;
use bac_rfid_proto::{DecodeFailure, TagEvent};
use bac_rfid_subscriber::{EventSink, SinkClosed};
use serde::Serialize;
use std::io::{self, Write};

/// Writes tag events to a terminal or pipe.
///
/// Decode failures are already logged by the manager; they are only written
/// here in JSON mode so downstream tools see them.
pub struct ConsoleSink<W> {
    format: OutputFormat,
    out: W,
}

impl ConsoleSink<io::Stdout> {
    /// Sink writing to stdout.
    #[must_use]
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(format, io::stdout())
    }
}

impl<W: Write> ConsoleSink<W> {
    /// Sink writing to `out`.
    pub fn new(format: OutputFormat, out: W) -> Self {
        Self { format, out }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }

    fn write_json<T: Serialize>(&mut self, value: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, value)?;
        writeln!(self.out)
    }

    fn finish(&mut self, written: io::Result<()>) -> Result<(), SinkClosed> {
        written.and_then(|()| self.out.flush()).map_err(|err| {
            tracing::error!(error = %err, "Failed to write to console");
            SinkClosed
        })
    }
}

impl<W: Write + Send + 'static> EventSink for ConsoleSink<W> {
    fn on_event(&mut self, event: TagEvent) -> Result<(), SinkClosed> {
        let written = match self.format {
            OutputFormat::Text => writeln!(self.out, "{event}"),
            OutputFormat::Json => self.write_json(&event),
        };
        self.finish(written)
    }

    fn on_decode_failure(&mut self, failure: DecodeFailure) -> Result<(), SinkClosed> {
        match self.format {
            OutputFormat::Text => Ok(()),
            OutputFormat::Json => {
                let written = self.write_json(&failure);
                self.finish(written)
            }
        }
    }
}
