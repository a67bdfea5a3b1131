use crc16::{State, ARC};
use log::{debug, warn};
use super::cosem_parser::parse_cosem_objects;
use super::structs::{P1Header, P1Telegram};
use super::DsmrError;

/// Largest telegram we accept, real meters stay well below 2 KiB
pub const MAX_TELEGRAM_SIZE: usize = 8192;

/// Checksummed telegram split into its content lines
#[derive(Debug, Clone, PartialEq)]
pub struct TelegramFrame {
    pub header: P1Header,
    pub lines: Vec<String>,
    pub checksum: u16,
}

/// Decodes one complete telegram into its objects.
///
/// Frame problems (no header, no trailer, checksum mismatch) fail the whole
/// telegram. Value problems only drop the affected line and are reported in
/// `P1Telegram::line_errors`.
pub fn decode(raw: &[u8]) -> Result<P1Telegram, DsmrError> {
    let frame = decode_frame(raw)?;
    let (objects, line_errors) = parse_cosem_objects(&frame.lines);
    for e in &line_errors {
        warn!("Dropping line of telegram from {}: {}", frame.header.identification, e);
    }

    Ok(P1Telegram {
        header: frame.header,
        objects,
        line_errors,
        checksum: frame.checksum,
    })
}

pub fn calculate_crc(data: &[u8]) -> u16 {
    let mut state = State::<ARC>::new();
    state.update(data);
    state.get()
}

pub fn decode_frame(raw: &[u8]) -> Result<TelegramFrame, DsmrError> {
    let start = raw.iter()
        .position(|b| !b.is_ascii_whitespace())
        .ok_or_else(|| DsmrError::Framing("empty telegram".to_string()))?;

    if raw[start] != b'/' {
        return Err(DsmrError::Framing("telegram does not start with '/'".to_string()));
    }

    /* The trailer is the first line starting with '!' */
    let bang = raw[start..].windows(2)
        .position(|w| w == b"\n!")
        .map(|pos| start + pos + 1)
        .ok_or_else(|| DsmrError::Framing("missing end of telegram".to_string()))?;

    let expected = parse_checksum_field(&raw[bang + 1..])?;
    let computed = calculate_crc(&raw[start..=bang]);
    if expected != computed {
        return Err(DsmrError::Checksum { expected, computed });
    }

    let text = std::str::from_utf8(&raw[start..bang])
        .map_err(|_| DsmrError::Framing("telegram is not valid text".to_string()))?;

    let mut lines = text.split('\n').map(|l| l.trim_end_matches('\r'));
    let header = parse_header(lines.next().unwrap_or_default())?;

    let mut content: Vec<String> = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match content.last_mut() {
            /* DSMR 3 gas profiles wrap their value onto the next line */
            Some(previous) if line.starts_with('(') => previous.push_str(line),
            _ => content.push(line.to_string()),
        }
    }

    debug!("Telegram from {} with {} lines, crc {:04X}", header.identification, content.len(), computed);
    Ok(TelegramFrame { header, lines: content, checksum: computed })
}

fn parse_checksum_field(trailer: &[u8]) -> Result<u16, DsmrError> {
    let digits = trailer.get(..4)
        .filter(|d| d.iter().all(|b| b.is_ascii_hexdigit()))
        .ok_or_else(|| DsmrError::Framing("checksum is not four hex digits".to_string()))?;

    if !trailer[4..].iter().all(|b| b.is_ascii_whitespace()) {
        return Err(DsmrError::Framing("unexpected data after checksum".to_string()));
    }

    let digits = std::str::from_utf8(digits)
        .map_err(|_| DsmrError::Framing("checksum is not four hex digits".to_string()))?;
    u16::from_str_radix(digits, 16)
        .map_err(|_| DsmrError::Framing("checksum is not four hex digits".to_string()))
}

/// `/XXXZ Ident`: three letter manufacturer flag followed by the meter model
pub fn parse_header(line: &str) -> Result<P1Header, DsmrError> {
    let content = line.trim().strip_prefix('/')
        .ok_or_else(|| DsmrError::Framing("missing identification line".to_string()))?;

    let manufacturer = content.get(..3)
        .filter(|m| m.chars().all(|c| c.is_ascii_alphabetic()))
        .ok_or_else(|| DsmrError::Framing(format!("invalid identification line '{line}'")))?;

    Ok(P1Header {
        manufacturer: manufacturer.to_string(),
        identification: content.to_string(),
    })
}

/// Reassembles telegrams from arbitrary chunks of a byte stream.
#[derive(Debug, Default)]
pub struct TelegramBuffer {
    buffer: Vec<u8>,
}

impl TelegramBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Appends `chunk` and returns every telegram completed by it.
    /// Incomplete or oversized frames are returned as framing errors.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<Vec<u8>, DsmrError>> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        loop {
            match self.buffer.iter().position(|b| *b == b'/') {
                None => {
                    if !self.buffer.is_empty() {
                        debug!("Discarding {} bytes outside of a telegram", self.buffer.len());
                    }
                    self.buffer.clear();
                    break;
                }
                Some(0) => {}
                Some(index) => {
                    debug!("Discarding {} bytes before start of telegram", index);
                    self.buffer.drain(..index);
                }
            }

            let bang = self.buffer.windows(2).position(|w| w == b"\n!").map(|p| p + 1);
            let restart = self.buffer.windows(2).position(|w| w == b"\n/").map(|p| p + 1);

            /* A new header before the trailer means the previous telegram was cut off */
            if let Some(restart) = restart {
                if bang.map_or(true, |bang| restart < bang) {
                    self.buffer.drain(..restart);
                    frames.push(Err(DsmrError::Framing("incomplete telegram".to_string())));
                    continue;
                }
            }

            let Some(bang) = bang else {
                if self.buffer.len() > MAX_TELEGRAM_SIZE {
                    self.buffer.clear();
                    frames.push(Err(DsmrError::Framing("telegram exceeds maximum size".to_string())));
                }
                break;
            };

            /* The trailer line ends the frame, with or without a checksum */
            let line_end = self.buffer[bang..].iter()
                .position(|b| *b == b'\n')
                .map(|p| bang + p + 1);

            let end = match line_end {
                Some(end) => end,
                None if self.buffer.len() >= bang + 5 => {
                    let mut end = bang + 5;
                    while end < self.buffer.len() && self.buffer[end] == b'\r' {
                        end += 1;
                    }
                    end
                }
                None => break,
            };

            let frame: Vec<u8> = self.buffer.drain(..end).collect();
            if frame.len() > MAX_TELEGRAM_SIZE {
                frames.push(Err(DsmrError::Framing("telegram exceeds maximum size".to_string())));
            } else {
                frames.push(Ok(frame));
            }
        }

        frames
    }
}
