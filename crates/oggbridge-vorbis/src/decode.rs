//! Decode drive calls.
//!
//! Both entry points read the headers themselves (so failures map onto the
//! decode result codes), announce the stream through `start`, then hand the
//! bytes to libvorbis and push interleaved PCM back through the feed.

use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::Path;

use oggbridge_core::{
    BridgeError, DecodeFeed, DecodeResultCode, ElapsedClock, FeedReader, SeekTracker, StreamInfo,
    pcm,
};
use vorbis_rs::VorbisDecoder;

use crate::error::EngineError;
use crate::container::{self, StreamPackets};
use crate::header::{self, HeaderError, VorbisHeaders};

/// Reader that keeps a copy of every byte read through it.
pub struct CaptureReader<R> {
    inner: R,
    captured: Vec<u8>,
}

impl<R> CaptureReader<R> {
    pub const fn new(inner: R) -> Self {
        Self {
            inner,
            captured: Vec::new(),
        }
    }

    pub fn into_parts(self) -> (R, Vec<u8>) {
        (self.inner, self.captured)
    }
}

impl<R: Read> Read for CaptureReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.captured.extend_from_slice(&buf[..n]);
        Ok(n)
    }
}

/// Decoded audio position plus the pending seek window.
struct Playhead {
    channels: u16,
    clock: ElapsedClock,
    skip_until: u64,
    pcm: Vec<i16>,
}

impl Playhead {
    fn new(info: &StreamInfo) -> Self {
        Self {
            channels: info.channels,
            clock: ElapsedClock::new(info.sample_rate),
            skip_until: 0,
            pcm: Vec::with_capacity(pcm::OUTPUT_BUFFER_SAMPLES),
        }
    }

    /// Discard decoded audio up to `seconds`. Returns `false` for a target
    /// behind the current position, which an unseekable input cannot honour.
    fn skip_to(&mut self, seconds: u64) -> bool {
        let target = self.clock.frames_for_seconds(seconds);
        if target < self.clock.frames() {
            return false;
        }
        self.skip_until = target;
        true
    }

    /// Restart from the beginning of the stream, discarding up to `seconds`.
    fn rewind_to(&mut self, seconds: u64) {
        self.clock.set_frames(0);
        self.skip_until = self.clock.frames_for_seconds(seconds);
    }

    /// Push one decoded block to the feed. Returns `false` when the feed ends the session.
    ///
    /// A block that is discarded still passes an empty write to the feed, so
    /// pause and stop take effect in the middle of a long skip.
    fn deliver(&mut self, planes: &[&[f32]], feed: &dyn DecodeFeed) -> bool {
        let frames = planes.first().map_or(0, |p| p.len());
        let mut offset = 0;

        let behind = self.skip_until.saturating_sub(self.clock.frames());
        if behind > 0 {
            if !feed.write_output(&[]) {
                return false;
            }
            let skipped = usize::try_from(behind).map_or(frames, |b| b.min(frames));
            self.clock.advance(skipped as u64);
            offset = skipped;
        }

        let chunk = pcm::frames_per_chunk(self.channels);
        while offset < frames {
            let n = chunk.min(frames - offset);
            pcm::interleave_into(planes, offset, n, &mut self.pcm);
            if !feed.write_output(&self.pcm) {
                return false;
            }
            offset += n;
            self.clock.advance(n as u64);
        }

        if let Some(seconds) = self.clock.take_change() {
            feed.report_elapsed_seconds(seconds);
        }
        true
    }
}

/// `start(streamInfo)` outcome that ends the drive call early.
fn announce(feed: &dyn DecodeFeed, info: &StreamInfo) -> Option<DecodeResultCode> {
    match feed.start(info) {
        Ok(()) => None,
        Err(BridgeError::SessionStopped) => Some(DecodeResultCode::Success),
        Err(e) => {
            tracing::warn!(%e, "Feed rejected stream");
            Some(DecodeResultCode::StartRejected)
        }
    }
}

// ── Stream ─────────────────────────────────────────────────────────

pub fn decode_stream(feed: &dyn DecodeFeed) -> DecodeResultCode {
    let code = run_stream(feed);
    feed.stop();
    code
}

fn run_stream(feed: &dyn DecodeFeed) -> DecodeResultCode {
    feed.start_reading_header();

    let mut packets = StreamPackets::new(CaptureReader::new(FeedReader::new(feed)));
    let headers = match header::read_headers(&mut packets) {
        Ok(headers) => headers,
        Err(HeaderError::Empty) => {
            tracing::debug!("Empty input, nothing to decode");
            return DecodeResultCode::Success;
        }
        Err(e) => {
            tracing::warn!(%e, "Stream header check failed");
            return e.code();
        }
    };

    // Stream length is unknown until the last page has been read.
    let info = headers.stream_info(-1);
    if let Some(code) = announce(feed, &info) {
        return code;
    }

    let (input, captured) = packets.into_inner().into_parts();
    let mut decoder = match VorbisDecoder::new(Cursor::new(captured).chain(input)) {
        Ok(decoder) => decoder,
        Err(e) => {
            tracing::warn!(%e, "libvorbis rejected stream headers");
            return DecodeResultCode::CorruptSecondaryHeader;
        }
    };

    let mut playhead = Playhead::new(&info);
    let mut seeks = SeekTracker::new();
    loop {
        if let Some(target) = seeks.poll(feed) {
            if playhead.skip_to(target) {
                tracing::debug!(target, "Skipping forward in stream");
            } else {
                tracing::warn!(target, "Backward seek ignored on unseekable stream");
            }
        }

        match decoder.decode_audio_block() {
            Ok(Some(block)) => {
                if !playhead.deliver(block.samples(), feed) {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(%e, "Corrupt audio data, ending stream");
                break;
            }
        }
    }
    DecodeResultCode::Success
}

// ── File ───────────────────────────────────────────────────────────

/// Headers and duration of a file.
pub fn read_metadata(path: &Path) -> Result<(VorbisHeaders, StreamInfo), EngineError> {
    let mut file = File::open(path)?;

    let headers = {
        let mut packets = StreamPackets::new(BufReader::new(&mut file));
        header::read_headers(&mut packets)?
    };

    let duration = match container::last_granule_position(BufReader::new(&mut file), headers.serial) {
        Ok(Some(granule)) => i64::try_from(granule / u64::from(headers.sample_rate)).unwrap_or(-1),
        Ok(None) => -1,
        Err(e) => {
            tracing::debug!(%e, "Could not read final page");
            -1
        }
    };

    let info = headers.stream_info(duration);
    Ok((headers, info))
}

fn open_decoder(path: &Path) -> Result<VorbisDecoder<BufReader<File>>, EngineError> {
    Ok(VorbisDecoder::new(BufReader::new(File::open(path)?))?)
}

pub fn decode_file(path: &Path, feed: &dyn DecodeFeed) -> DecodeResultCode {
    let code = run_file(path, feed);
    feed.stop();
    code
}

fn run_file(path: &Path, feed: &dyn DecodeFeed) -> DecodeResultCode {
    feed.start_reading_header();

    let info = match read_metadata(path).map(|(_, info)| info) {
        Ok(info) => info,
        Err(e) => {
            tracing::warn!(path = %path.display(), %e, "Not a readable Vorbis file");
            return DecodeResultCode::NotVorbisHeader;
        }
    };
    if let Some(code) = announce(feed, &info) {
        return code;
    }

    let mut decoder = match open_decoder(path) {
        Ok(decoder) => decoder,
        Err(e) => {
            tracing::warn!(path = %path.display(), %e, "libvorbis rejected file");
            return DecodeResultCode::NotVorbisHeader;
        }
    };

    let mut playhead = Playhead::new(&info);
    let mut seeks = SeekTracker::new();
    loop {
        if let Some(target) = seeks.poll(feed) {
            if playhead.skip_to(target) {
                tracing::debug!(target, "Seeking forward in file");
            } else {
                match open_decoder(path) {
                    Ok(reopened) => {
                        decoder = reopened;
                        playhead.rewind_to(target);
                        tracing::debug!(target, "Seeking back in file");
                    }
                    Err(e) => tracing::warn!(%e, target, "Seek failed"),
                }
            }
        }

        match decoder.decode_audio_block() {
            Ok(Some(block)) => {
                if !playhead.deliver(block.samples(), feed) {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(%e, "Corrupt audio data, ending playback");
                break;
            }
        }
    }
    DecodeResultCode::Success
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct Collector {
        writes: Mutex<Vec<Vec<i16>>>,
        elapsed: Mutex<Vec<u64>>,
        /// Empty writes, made while audio is being discarded.
        polls: AtomicUsize,
        stopped: AtomicBool,
    }

    impl DecodeFeed for Collector {
        fn start_reading_header(&self) {}
        fn start(&self, _info: &StreamInfo) -> Result<(), BridgeError> {
            Ok(())
        }
        fn read_input(&self, _buf: &mut [u8]) -> usize {
            0
        }
        fn write_output(&self, pcm: &[i16]) -> bool {
            if self.stopped.load(Ordering::SeqCst) {
                return false;
            }
            if pcm.is_empty() {
                self.polls.fetch_add(1, Ordering::SeqCst);
            } else {
                self.writes.lock().unwrap().push(pcm.to_vec());
            }
            true
        }
        fn report_elapsed_seconds(&self, seconds: u64) {
            self.elapsed.lock().unwrap().push(seconds);
        }
        fn query_seek_target(&self) -> i64 {
            -1
        }
        fn stop(&self) {}
    }

    fn stereo_block(frames: usize) -> (Vec<f32>, Vec<f32>) {
        (vec![0.5; frames], vec![-0.5; frames])
    }

    #[test]
    fn capture_reader_keeps_what_it_reads() {
        let mut reader = CaptureReader::new(Cursor::new(b"OggS-and-more".to_vec()));
        let mut head = [0_u8; 4];
        reader.read_exact(&mut head).unwrap();
        let (mut rest, captured) = reader.into_parts();
        assert_eq!(captured, b"OggS");

        let mut replay = Vec::new();
        Cursor::new(captured).chain(&mut rest).read_to_end(&mut replay).unwrap();
        assert_eq!(replay, b"OggS-and-more");
    }

    #[test]
    fn delivery_is_chunked_by_channel_count() {
        let feed = Collector::default();
        let mut playhead = Playhead::new(&StreamInfo::new(8_000, 2, "v", -1));
        let (left, right) = stereo_block(5_000);

        assert!(playhead.deliver(&[&left, &right], &feed));

        let writes = feed.writes.lock().unwrap();
        let sizes: Vec<usize> = writes.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4096, 4096, 1808]);
        assert_eq!(&writes[0][..2], &[16_384, -16_383]);
    }

    #[test]
    fn elapsed_seconds_follow_decoded_frames() {
        let feed = Collector::default();
        let mut playhead = Playhead::new(&StreamInfo::new(1_000, 1, "v", -1));
        let mono = vec![0.0_f32; 600];
        for _ in 0..4 {
            playhead.deliver(&[&mono], &feed);
        }
        assert_eq!(*feed.elapsed.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn forward_skip_discards_audio() {
        let feed = Collector::default();
        let mut playhead = Playhead::new(&StreamInfo::new(1_000, 1, "v", -1));
        let mono = vec![0.0_f32; 800];

        assert!(playhead.skip_to(1));
        playhead.deliver(&[&mono], &feed);
        assert!(feed.writes.lock().unwrap().is_empty());
        assert_eq!(feed.polls.load(Ordering::SeqCst), 1);

        playhead.deliver(&[&mono], &feed);
        let written: usize = feed.writes.lock().unwrap().iter().map(Vec::len).sum();
        assert_eq!(written, 600);
        assert_eq!(feed.polls.load(Ordering::SeqCst), 2);

        playhead.deliver(&[&mono], &feed);
        assert_eq!(feed.polls.load(Ordering::SeqCst), 2);

        assert!(!playhead.skip_to(0));
    }

    #[test]
    fn stop_ends_a_skip_at_the_next_block() {
        let feed = Collector::default();
        let mut playhead = Playhead::new(&StreamInfo::new(1_000, 1, "v", -1));
        let mono = vec![0.0_f32; 100];

        assert!(playhead.skip_to(600));
        assert!(playhead.deliver(&[&mono], &feed));

        feed.stopped.store(true, Ordering::SeqCst);
        assert!(!playhead.deliver(&[&mono], &feed));
        assert_eq!(playhead.clock.frames(), 100);
        assert!(feed.writes.lock().unwrap().is_empty());
    }

    #[test]
    fn rewind_restarts_the_clock() {
        let feed = Collector::default();
        let mut playhead = Playhead::new(&StreamInfo::new(1_000, 1, "v", -1));
        let mono = vec![0.0_f32; 2_500];
        playhead.deliver(&[&mono], &feed);

        playhead.rewind_to(1);
        playhead.deliver(&[&mono], &feed);

        let written: usize = feed.writes.lock().unwrap().iter().map(Vec::len).sum();
        assert_eq!(written, 2_500 + 1_500);
    }

    #[test]
    fn missing_file_is_not_vorbis() {
        let feed = Collector::default();
        let code = decode_file(Path::new("/no/such/file.ogg"), &feed);
        assert_eq!(code, DecodeResultCode::NotVorbisHeader);
    }

    #[test]
    fn empty_stream_succeeds_without_output() {
        let feed = Collector::default();
        assert_eq!(decode_stream(&feed), DecodeResultCode::Success);
        assert!(feed.writes.lock().unwrap().is_empty());
    }
}
