//! Vorbis header reading.
//!
//! Reads the identification, comment and setup packets through the Ogg
//! container and classifies failures into decode result codes before libvorbis
//! sees the stream.

use std::io::{self, Read};

use ogg::OggReadError;
use oggbridge_core::{DecodeResultCode, StreamInfo};

use crate::container::StreamPackets;

const IDENTIFICATION: u8 = 1;
const COMMENT: u8 = 3;
const SETUP: u8 = 5;
const MAGIC: &[u8; 6] = b"vorbis";
const IDENTIFICATION_LEN: usize = 30;

#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    #[error("input is empty")]
    Empty,

    #[error("input is not an Ogg bitstream")]
    NotOgg,

    #[error("failed to read the first Ogg page: {0}")]
    FirstPage(OggReadError),

    #[error("first page does not carry a complete header packet")]
    NoHeaderPacket,

    #[error("stream does not contain Vorbis audio")]
    NotVorbis,

    #[error("corrupt secondary header: {0}")]
    CorruptSecondary(String),

    #[error("stream ended before the Vorbis headers were complete")]
    PrematureEof,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl HeaderError {
    pub const fn code(&self) -> DecodeResultCode {
        match self {
            Self::NotOgg => DecodeResultCode::InvalidBitstream,
            Self::FirstPage(_) => DecodeResultCode::FirstPageReadError,
            Self::NoHeaderPacket => DecodeResultCode::HeaderPacketReadError,
            Self::NotVorbis => DecodeResultCode::NotVorbisHeader,
            Self::CorruptSecondary(_) => DecodeResultCode::CorruptSecondaryHeader,
            Self::Empty | Self::PrematureEof | Self::Io(_) => DecodeResultCode::PrematureEof,
        }
    }
}

/// Parsed Vorbis header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VorbisHeaders {
    /// Serial number of the logical stream the headers came from.
    pub serial: u32,
    pub channels: u8,
    pub sample_rate: u32,
    /// Nominal bitrate from the identification header; 0 or negative when unset.
    pub nominal_bitrate: i32,
    pub vendor: String,
    /// User comments, `KEY=value`.
    pub comments: Vec<String>,
}

impl VorbisHeaders {
    pub fn stream_info(&self, duration_seconds: i64) -> StreamInfo {
        StreamInfo::new(
            self.sample_rate,
            u16::from(self.channels),
            self.vendor.clone(),
            duration_seconds,
        )
    }
}

/// Read and validate the three Vorbis header packets.
///
/// The identification packet must be complete on the first page. Any
/// failure after it is reported as a secondary-header problem, or as a
/// premature end when the input simply runs out.
pub fn read_headers<R: Read>(packets: &mut StreamPackets<R>) -> Result<VorbisHeaders, HeaderError> {
    match packets.read_page() {
        Ok(true) => {}
        Ok(false) => return Err(HeaderError::Empty),
        Err(OggReadError::NoCapturePatternFound) => return Err(HeaderError::NotOgg),
        Err(OggReadError::ReadError(e)) if e.kind() != io::ErrorKind::UnexpectedEof => {
            return Err(HeaderError::Io(e));
        }
        Err(e) => return Err(HeaderError::FirstPage(e)),
    }

    let identification = packets.take_ready().ok_or(HeaderError::NoHeaderPacket)?;
    let (channels, sample_rate, nominal_bitrate) =
        parse_identification(&identification.data).ok_or(HeaderError::NotVorbis)?;
    let serial = packets.serial().unwrap_or_default();

    let comment = secondary_packet(packets)?;
    let (vendor, comments) = parse_comment(&comment)?;

    let setup = secondary_packet(packets)?;
    if !is_header(&setup, SETUP) {
        return Err(HeaderError::CorruptSecondary("missing setup header".into()));
    }

    Ok(VorbisHeaders {
        serial,
        channels,
        sample_rate,
        nominal_bitrate,
        vendor,
        comments,
    })
}

fn secondary_packet<R: Read>(packets: &mut StreamPackets<R>) -> Result<Vec<u8>, HeaderError> {
    match packets.next_packet() {
        Ok(Some(packet)) => Ok(packet.data),
        Ok(None) => Err(HeaderError::PrematureEof),
        Err(OggReadError::ReadError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
            Err(HeaderError::PrematureEof)
        }
        Err(OggReadError::ReadError(e)) => Err(HeaderError::Io(e)),
        Err(e) => Err(HeaderError::CorruptSecondary(e.to_string())),
    }
}

fn is_header(packet: &[u8], kind: u8) -> bool {
    packet.len() >= 1 + MAGIC.len() && packet[0] == kind && &packet[1..=MAGIC.len()] == MAGIC
}

fn parse_identification(packet: &[u8]) -> Option<(u8, u32, i32)> {
    if !is_header(packet, IDENTIFICATION) || packet.len() < IDENTIFICATION_LEN {
        return None;
    }
    let version = le_u32(packet, 7);
    let channels = packet[11];
    let sample_rate = le_u32(packet, 12);
    let framing = packet[29] & 1;
    if version != 0 || channels == 0 || sample_rate == 0 || framing == 0 {
        return None;
    }
    let nominal = i32::from_le_bytes([packet[20], packet[21], packet[22], packet[23]]);
    Some((channels, sample_rate, nominal))
}

fn parse_comment(packet: &[u8]) -> Result<(String, Vec<String>), HeaderError> {
    let corrupt = |what: &str| HeaderError::CorruptSecondary(what.to_string());
    if !is_header(packet, COMMENT) {
        return Err(corrupt("missing comment header"));
    }

    let mut cursor = 1 + MAGIC.len();
    let vendor = read_string(packet, &mut cursor).ok_or_else(|| corrupt("truncated vendor string"))?;
    let count = read_u32(packet, &mut cursor).ok_or_else(|| corrupt("truncated comment count"))?;

    let mut comments = Vec::new();
    for _ in 0..count {
        comments.push(read_string(packet, &mut cursor).ok_or_else(|| corrupt("truncated comment"))?);
    }
    Ok((vendor, comments))
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn read_u32(packet: &[u8], cursor: &mut usize) -> Option<u32> {
    let bytes = packet.get(*cursor..*cursor + 4)?;
    *cursor += 4;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_string(packet: &[u8], cursor: &mut usize) -> Option<String> {
    let len = usize::try_from(read_u32(packet, cursor)?).ok()?;
    let bytes = packet.get(*cursor..cursor.checked_add(len)?)?;
    *cursor += len;
    Some(String::from_utf8_lossy(bytes).into_owned())
}
