//! Line-oriented decoders and encoders used by the `zgrab` binary.

use std::io::{BufRead, Write};
use std::sync::Arc;

use log::{debug, warn};

use super::types::{Decoder, Encoder};
use crate::encoding::grab::Grab;
use crate::encoding::registry::EventTypeRegistry;
use crate::error_handling::types::ProcessingError;
use crate::scanner::target::ScanTarget;

/// Reads one target per line: `host` or `host,domain`.
///
/// Blank lines and lines starting with `#` are skipped.
pub struct TargetDecoder<R> {
    reader: R,
    line: String,
    line_no: usize,
}

impl<R: BufRead> TargetDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Decoder for TargetDecoder<R> {
    type Item = ScanTarget;

    fn decode_next(&mut self) -> Result<Option<ScanTarget>, ProcessingError> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                debug!("target input exhausted after {} line(s)", self.line_no);
                return Ok(None);
            }
            self.line_no += 1;

            let line = self.line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match ScanTarget::parse(line) {
                Some(target) => return Ok(Some(target)),
                None => warn!("skipping malformed target on line {}: {:?}", self.line_no, line),
            }
        }
    }
}

/// Writes one JSON document per line, flushing after each record.
pub struct GrabEncoder<W> {
    writer: W,
}

impl<W: Write + Send + 'static> GrabEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write + Send + 'static> Encoder for GrabEncoder<W> {
    type Item = Grab;

    fn encode(&mut self, grab: Grab) -> Result<(), ProcessingError> {
        let json = grab.to_json()?;
        self.writer.write_all(json.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Reads back grabs written by [`GrabEncoder`].
pub struct GrabDecoder<R> {
    reader: R,
    registry: Arc<EventTypeRegistry>,
    line: String,
}

impl<R: BufRead> GrabDecoder<R> {
    pub fn new(reader: R, registry: Arc<EventTypeRegistry>) -> Self {
        Self {
            reader,
            registry,
            line: String::new(),
        }
    }
}

impl<R: BufRead> Decoder for GrabDecoder<R> {
    type Item = Grab;

    fn decode_next(&mut self) -> Result<Option<Grab>, ProcessingError> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            let line = self.line.trim();
            if line.is_empty() {
                continue;
            }
            return Ok(Some(Grab::from_json(line, &self.registry)?));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::connect::ConnectEvent;
    use crate::encoding::event::{ConnectionEvent, EventError};
    use crate::error_handling::types::CodecError;
    use chrono::{TimeZone, Utc};
    use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};

    #[test]
    fn targets_skip_comments_and_blank_lines() {
        let input = "# scan list\n1.2.3.4\n\n  5.6.7.8 , example.com \n,\n";
        let mut decoder = TargetDecoder::new(Cursor::new(input));

        let first = decoder.decode_next().unwrap().unwrap();
        assert_eq!(first, ScanTarget::new("1.2.3.4", None));
        let second = decoder.decode_next().unwrap().unwrap();
        assert_eq!(second, ScanTarget::new("5.6.7.8", Some("example.com".to_string())));
        assert!(decoder.decode_next().unwrap().is_none());
    }

    #[test]
    fn grabs_round_trip_through_a_file() {
        let registry = Arc::new(EventTypeRegistry::with_defaults().unwrap());
        let mut grab = Grab::new("1.2.3.4", None, Utc.timestamp_opt(1_600_000_000, 0).unwrap());
        grab.push_event(ConnectionEvent::failed(
            ConnectEvent,
            EventError::new("connection refused"),
        ));

        let mut file = tempfile::tempfile().unwrap();
        {
            let mut encoder = GrabEncoder::new(file.try_clone().unwrap());
            encoder.encode(grab.clone()).unwrap();
            encoder.encode(grab.clone()).unwrap();
        }

        file.seek(SeekFrom::Start(0)).unwrap();
        let mut text = String::new();
        file.read_to_string(&mut text).unwrap();
        assert_eq!(text.lines().count(), 2);

        file.seek(SeekFrom::Start(0)).unwrap();
        let mut decoder = GrabDecoder::new(BufReader::new(file), registry);
        assert_eq!(decoder.decode_next().unwrap(), Some(grab.clone()));
        assert_eq!(decoder.decode_next().unwrap(), Some(grab));
        assert_eq!(decoder.decode_next().unwrap(), None);
    }

    #[test]
    fn undecodable_grab_is_a_codec_error() {
        let registry = Arc::new(EventTypeRegistry::new());
        let input = "{\"host\":\"h\",\"time\":\"2023-01-01T00:00:00Z\",\"log\":[{\"type\":\"connect\",\"data\":null}]}\n";
        let mut decoder = GrabDecoder::new(Cursor::new(input), registry);
        assert!(matches!(
            decoder.decode_next(),
            Err(ProcessingError::Codec(CodecError::UnknownEventType(_)))
        ));
    }
}
