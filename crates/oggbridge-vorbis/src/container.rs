//! Ogg container access on top of the `ogg` crate.
//!
//! Header probing reads whole pages from a byte stream without reading
//! ahead, so everything consumed can be replayed into libvorbis afterwards.
//! Duration lookup scans the tail of a seekable file for the last granule
//! position of the stream.

use std::io::{self, Read, Seek, SeekFrom};

use ogg::reading::{BasePacketReader, PacketReader, PageParser};
use ogg::{OggReadError, Packet};

pub const CAPTURE_PATTERN: &[u8; 4] = b"OggS";

const PAGE_HEADER_LEN: usize = 27;

/// Largest possible page: fixed header, 255 lacing values, 255 × 255 body bytes.
pub const MAX_PAGE_LEN: u64 = (PAGE_HEADER_LEN + 255 + 255 * 255) as u64;

/// Read until `buf` is full or the input ends. Returns the bytes read.
fn read_up_to(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Packets of the first logical stream in an unseekable byte stream.
///
/// Pages of other streams are read but their packets are dropped.
pub struct StreamPackets<R> {
    inner: R,
    packets: BasePacketReader,
    serial: Option<u32>,
}

impl<R: Read> StreamPackets<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            packets: BasePacketReader::new(),
            serial: None,
        }
    }

    /// Read one page and queue its packets. `false` at a clean end of input.
    pub fn read_page(&mut self) -> Result<bool, OggReadError> {
        let mut header = [0_u8; PAGE_HEADER_LEN];
        let n = read_up_to(&mut self.inner, &mut header).map_err(OggReadError::ReadError)?;
        if n == 0 {
            return Ok(false);
        }
        if n < PAGE_HEADER_LEN {
            let seen = n.min(CAPTURE_PATTERN.len());
            if header[..seen] != CAPTURE_PATTERN[..seen] {
                return Err(OggReadError::NoCapturePatternFound);
            }
            return Err(OggReadError::ReadError(io::ErrorKind::UnexpectedEof.into()));
        }

        let (mut parser, segments_len) = PageParser::new(header)?;
        let mut segments = vec![0_u8; segments_len];
        self.inner
            .read_exact(&mut segments)
            .map_err(OggReadError::ReadError)?;
        let body_len = parser.parse_segments(segments);
        let mut body = vec![0_u8; body_len];
        self.inner.read_exact(&mut body).map_err(OggReadError::ReadError)?;

        self.packets.push_page(parser.parse_packet_data(body)?)?;
        Ok(true)
    }

    /// Serial number of the tracked stream, once one of its packets has been seen.
    pub const fn serial(&self) -> Option<u32> {
        self.serial
    }

    /// A packet completed by the pages already read, if any.
    pub fn take_ready(&mut self) -> Option<Packet> {
        while let Some(packet) = self.packets.read_packet() {
            let serial = *self.serial.get_or_insert(packet.stream_serial());
            if packet.stream_serial() == serial {
                return Some(packet);
            }
        }
        None
    }

    /// Next packet, reading pages as needed. `None` at end of input.
    pub fn next_packet(&mut self) -> Result<Option<Packet>, OggReadError> {
        loop {
            if let Some(packet) = self.take_ready() {
                return Ok(Some(packet));
            }
            if !self.read_page()? {
                return Ok(None);
            }
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Granule position of the last packet of `serial` near the end of `file`.
///
/// The stream position is left at an unspecified offset.
pub fn last_granule_position<F: Read + Seek>(mut file: F, serial: u32) -> io::Result<Option<u64>> {
    let len = file.seek(SeekFrom::End(0))?;
    file.seek(SeekFrom::Start(len.saturating_sub(MAX_PAGE_LEN)))?;

    let mut packets = PacketReader::new(file);
    let mut last = None;
    loop {
        match packets.read_packet() {
            Ok(Some(packet)) => {
                if packet.stream_serial() == serial {
                    last = Some(packet.absgp_page());
                }
            }
            Ok(None) | Err(OggReadError::ReadError(_)) => break,
            Err(e) => tracing::debug!(%e, "Skipping unreadable page near end of file"),
        }
    }
    Ok(last)
}
