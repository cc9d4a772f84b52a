//! JSON-lines feeds
//!
//! One JSON object per input line. A line with a `signal` field is a control
//! signal; any other line is a collaborator observation. Lines that are not
//! UTF-8 or do not parse are skipped with a warning. End of input ends the
//! feed.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::io::BufRead;
use tracing::warn;

use crate::{CaptureError, ControlSignal, FaceEvent, FaceFeed, FaceObservation, ObjectFeed, ObjectObservation};

/// Line reader shared by both feeds
struct LineReader<R> {
    reader: R,
    buf: Vec<u8>,
    line_no: u64,
}

impl<R: BufRead> LineReader<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_no: 0,
        }
    }

    /// Next non-empty line accepted by `parse`
    fn next<T>(
        &mut self,
        parse: impl Fn(&str) -> Result<T, serde_json::Error>,
    ) -> Result<T, CaptureError> {
        loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
                return Err(CaptureError::EndOfStream);
            }
            self.line_no += 1;

            let line = match std::str::from_utf8(&self.buf) {
                Ok(line) => line.trim(),
                Err(e) => {
                    warn!("Skipping input line {}: {}", self.line_no, e);
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }
            match parse(line) {
                Ok(item) => return Ok(item),
                Err(e) => warn!("Skipping input line {}: {}", self.line_no, e),
            }
        }
    }
}

fn parse_face_line(line: &str) -> Result<FaceEvent, serde_json::Error> {
    let value: Value = serde_json::from_str(line)?;
    if let Some(signal) = value.get("signal") {
        return ControlSignal::deserialize(signal).map(FaceEvent::Signal);
    }
    FaceObservation::deserialize(value).map(FaceEvent::Frame)
}

fn parse_line<T: DeserializeOwned>(line: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(line)
}

/// Face feed reading observations and signals from JSON lines
pub struct JsonLinesFaceFeed<R> {
    lines: LineReader<R>,
}

impl<R: BufRead> JsonLinesFaceFeed<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: LineReader::new(reader),
        }
    }
}

impl<R: BufRead> FaceFeed for JsonLinesFaceFeed<R> {
    fn next_event(&mut self) -> Result<FaceEvent, CaptureError> {
        self.lines.next(parse_face_line)
    }
}

/// Object feed reading observations from JSON lines
pub struct JsonLinesObjectFeed<R> {
    lines: LineReader<R>,
}

impl<R: BufRead> JsonLinesObjectFeed<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: LineReader::new(reader),
        }
    }
}

impl<R: BufRead> ObjectFeed for JsonLinesObjectFeed<R> {
    fn next_observation(&mut self) -> Result<ObjectObservation, CaptureError> {
        self.lines.next(parse_line::<ObjectObservation>)
    }
}
