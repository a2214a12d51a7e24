// Wavfeed -- A wav decoding, encoding and streaming library in Rust
// Copyright (C) 2015 Ruud van Asseldonk
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::cmp;
use std::fs;
use std::io;
use std::path;

use tracing::{debug, info};

use crate::wav::{ChunkHeader, ChunkKind, RiffHeader, WAVE_FORMAT_PCM};
use crate::{Error, Result, WavSpec};

/// Extends the functionality of `io::Read` with additional methods.
///
/// The methods may be used on any type that implements `io::Read`.
pub trait ReadExt: io::Read {
    /// Reads as many bytes as `buf` is long.
    ///
    /// This may issue multiple `read` calls internally. An error of kind
    /// `UnexpectedEof` is returned if the stream ends before the buffer is
    /// full.
    fn read_into(&mut self, buf: &mut [u8]) -> io::Result<()>;

    /// Reads up to `buf.len()` bytes, stopping early only at end of stream.
    ///
    /// Returns the number of bytes read.
    fn read_up_to(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Reads 4 bytes and returns them in an array.
    fn read_4_bytes(&mut self) -> io::Result<[u8; 4]>;

    /// Skip over `n` bytes by reading and discarding them.
    fn skip_bytes(&mut self, n: usize) -> io::Result<()>;

    /// Reads two bytes and interprets them as a little-endian 16-bit signed integer.
    fn read_le_i16(&mut self) -> io::Result<i16>;

    /// Reads two bytes and interprets them as a little-endian 16-bit unsigned integer.
    fn read_le_u16(&mut self) -> io::Result<u16>;

    /// Reads four bytes and interprets them as a little-endian 32-bit unsigned integer.
    fn read_le_u32(&mut self) -> io::Result<u32>;
}

impl<R> ReadExt for R
    where R: io::Read
{
    #[inline(always)]
    fn read_into(&mut self, buf: &mut [u8]) -> io::Result<()> {
        let n = self.read_up_to(buf)?;
        if n < buf.len() {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "failed to read enough bytes"));
        }
        Ok(())
    }

    fn read_up_to(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut n = 0;
        while n < buf.len() {
            match self.read(&mut buf[n..]) {
                Ok(0) => break,
                Ok(progress) => n += progress,
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
        Ok(n)
    }

    #[inline(always)]
    fn skip_bytes(&mut self, n: usize) -> io::Result<()> {
        // This is only used for a handful of bytes inside the fmt chunk, so a
        // small stack buffer is enough. Whole chunks are skipped by seeking.
        let mut n_read = 0;
        let mut buf = [0u8; 64];
        while n_read < n {
            let end = cmp::min(n - n_read, buf.len());
            self.read_into(&mut buf[..end])?;
            n_read += end;
        }
        Ok(())
    }

    #[inline(always)]
    fn read_4_bytes(&mut self) -> io::Result<[u8; 4]> {
        let mut buf = [0_u8; 4];
        self.read_into(&mut buf[..])?;
        Ok(buf)
    }

    #[inline(always)]
    fn read_le_i16(&mut self) -> io::Result<i16> {
        self.read_le_u16().map(|x| x as i16)
    }

    #[inline(always)]
    fn read_le_u16(&mut self) -> io::Result<u16> {
        let mut buf = [0u8; 2];
        self.read_into(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    #[inline(always)]
    fn read_le_u32(&mut self) -> io::Result<u32> {
        let mut buf = [0u8; 4];
        self.read_into(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }
}

/// Reads the RIFF WAVE header, returns the supposed file size.
///
/// This function can be used to quickly check if the file could be a wav file
/// by reading 12 bytes of the header. If an `Ok` is returned, the file is
/// likely a wav file. If an `Err` is returned, it is definitely not a wav
/// file.
///
/// The returned file size cannot be larger than 2<sup>32</sup> + 7 bytes.
pub fn read_wave_header<R: io::Read>(reader: &mut R) -> Result<u64> {
    let mut bytes = [0u8; 12];
    reader.read_into(&mut bytes)?;
    let header = RiffHeader::from_bytes(bytes)?;

    // The stored file length does not include the "RIFF" magic and 4-byte
    // length field, so the total size is 8 bytes more than what is stored.
    Ok(header.inner_len as u64 + 8)
}

fn read_chunk_header<R: io::Read>(reader: &mut R) -> Result<ChunkHeader> {
    let mut bytes = [0u8; 8];
    reader.read_into(&mut bytes)?;
    Ok(ChunkHeader::from_bytes(bytes))
}

/// Reads the body of a fmt chunk and returns the format it describes.
///
/// Fields are validated in the order they appear, so a file with a bad
/// format code is reported as such even when the rest of the chunk is
/// missing.
fn read_fmt_chunk<R>(reader: &mut R, chunk_len: u32) -> Result<WavSpec>
    where R: io::Read + io::Seek
{
    if chunk_len < 16 {
        return Err(Error::FormatError("invalid fmt chunk size"));
    }

    if reader.read_le_u16()? != WAVE_FORMAT_PCM {
        return Err(Error::FormatError("not PCM data"));
    }

    let channels = reader.read_le_u16()?;
    if channels != 1 && channels != 2 {
        return Err(Error::FormatError("only mono and stereo are supported"));
    }

    let sample_rate = reader.read_le_u32()?;
    if sample_rate == 0 {
        return Err(Error::FormatError("sample rate is 0"));
    }

    // nAvgBytesPerSec and nBlockAlign are redundant, we derive both.
    reader.skip_bytes(6)?;

    let bits_per_sample = reader.read_le_u16()?;
    if bits_per_sample != 8 && bits_per_sample != 16 {
        return Err(Error::FormatError("bits per sample is not 8 or 16"));
    }

    // WAVEFORMATEX and friends append more fields; none of them matter for
    // plain PCM.
    if chunk_len > 16 {
        reader.seek(io::SeekFrom::Current((chunk_len - 16) as i64))?;
    }

    Ok(WavSpec {
        channels: channels,
        sample_rate: sample_rate,
        bits_per_sample: bits_per_sample,
    })
}

/// Reads chunks until a data chunk is encountered.
///
/// Returns the format in effect and the length field of the data chunk.
/// Afterwards, the reader is positioned at the first content byte of the
/// data chunk.
///
/// A data chunk that precedes every fmt chunk is not an error: the format
/// then falls back to `WavSpec::HEADERLESS`.
pub fn read_until_data<R>(reader: &mut R) -> Result<(WavSpec, u32)>
    where R: io::Read + io::Seek
{
    let mut spec = WavSpec::HEADERLESS;

    loop {
        let header = read_chunk_header(reader)?;
        match header.kind {
            ChunkKind::Fmt => {
                spec = read_fmt_chunk(reader, header.len)?;
            }
            ChunkKind::Data => return Ok((spec, header.len)),
            ChunkKind::Other(tag) => {
                info!("ignoring chunk: {}", String::from_utf8_lossy(&tag));
                reader.seek(io::SeekFrom::Current(header.len as i64))?;
            }
        }
        // If no data chunk is ever encountered, the function will return via
        // one of the `?` operators that propagate the end of file.
    }
}

/// Converts the length field of the data chunk into a number of frames.
///
/// Stereo counts round up, so a trailing half frame still counts.
fn frames_from_data_len(spec: &WavSpec, data_len: u32) -> u32 {
    let mut frames = data_len;
    if spec.channels == 2 {
        frames = frames / 2 + frames % 2;
    }
    if spec.bits_per_sample == 16 {
        frames /= 2;
    }
    frames
}

/// A decoder for PCM wav data.
///
/// A `WavDecoder` is a streaming reader: the header is parsed when it is
/// constructed, sample data is read on demand. No internal buffering is
/// performed on the underlying reader, but this can easily be added by
/// wrapping the reader in an `io::BufReader`. The `open` constructor takes
/// care of this for you.
///
/// Dropping the decoder closes the underlying stream.
pub struct WavDecoder<R> {
    /// Format of the file as found in the fmt chunk.
    spec: WavSpec,

    /// Offset of the first byte of sample data in the stream.
    data_start: u64,

    /// Offset one past the last byte of the data chunk, or the end of the
    /// stream if that comes first.
    ///
    /// Reads never go beyond this point, so chunks that follow the data
    /// chunk are not played as audio.
    data_end: u64,

    /// The number of frames declared by the data chunk.
    frames: u32,

    /// The reader from which the WAVE format is read.
    reader: R,
}

impl<R> WavDecoder<R>
    where R: io::Read + io::Seek
{
    /// Attempts to create a decoder that reads the WAVE format.
    ///
    /// The header is read immediately, and on success the reader is
    /// positioned at the first byte of sample data. On failure the reader is
    /// dropped.
    pub fn new(mut reader: R) -> Result<WavDecoder<R>> {
        read_wave_header(&mut reader)?;
        let (spec, data_len) = read_until_data(&mut reader)?;
        let data_start = reader.stream_position()?;

        // Streamed files often declare more data than they hold.
        let stream_len = reader.seek(io::SeekFrom::End(0))?;
        reader.seek(io::SeekFrom::Start(data_start))?;
        let data_end = cmp::min(data_start + data_len as u64, stream_len);

        let decoder = WavDecoder {
            spec: spec,
            data_start: data_start,
            data_end: data_end,
            frames: frames_from_data_len(&spec, data_len),
            reader: reader,
        };

        debug!(
            channels = spec.channels,
            sample_rate = spec.sample_rate,
            bits_per_sample = spec.bits_per_sample,
            frames = decoder.frames,
            data_start = data_start,
            "opened wav data"
        );

        Ok(decoder)
    }

    /// Returns information about the WAVE file.
    pub fn spec(&self) -> WavSpec {
        self.spec
    }

    /// Returns the number of frames declared by the data chunk.
    ///
    /// This is independent of how many frames have been read already.
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Returns the duration of the file in seconds.
    pub fn duration(&self) -> f64 {
        self.frames as f64 / self.spec.sample_rate as f64
    }

    /// Returns the stream offset where sample data begins.
    pub fn data_start(&self) -> u64 {
        self.data_start
    }

    /// Returns the current position in bytes, relative to the data start.
    ///
    /// A position that is not a multiple of `spec().bytes_per_frame()` means
    /// a partial frame has been consumed.
    pub fn byte_position(&mut self) -> Result<u64> {
        let pos = self.reader.stream_position()?;
        Ok(pos.saturating_sub(self.data_start))
    }

    /// Returns the number of whole frames between the current position and
    /// the end of the data that is actually present.
    pub fn frames_remaining(&mut self) -> Result<u64> {
        let pos = self.reader.stream_position()?;
        Ok(self.data_end.saturating_sub(pos) / self.spec.bytes_per_frame() as u64)
    }

    /// Moves to the start of the given frame.
    ///
    /// Seeking beyond the data chunk is allowed; subsequent reads then
    /// return no frames.
    pub fn seek_frame(&mut self, frame: u64) -> Result<()> {
        let offset = frame * self.spec.bytes_per_frame() as u64;
        self.reader.seek(io::SeekFrom::Start(self.data_start + offset))?;
        Ok(())
    }

    /// Reads up to `frames` frames into `buf`, returns the number of whole
    /// frames written.
    ///
    /// Samples are stored in the native layout of their depth: 8-bit samples
    /// are copied as the unsigned bytes found in the file, 16-bit samples
    /// are written as `i16` in native byte order. The request is clamped to
    /// what fits in `buf`.
    ///
    /// Running out of data is not an error. A count smaller than requested
    /// signals the end of the stream, and later reads return 0.
    pub fn read_frames(&mut self, buf: &mut [u8], frames: usize) -> Result<usize> {
        let channels = self.spec.channels as usize;
        let bytes_per_sample = self.spec.bytes_per_sample() as usize;

        let pos = self.reader.stream_position()?;
        let remaining = self.data_end.saturating_sub(pos);
        let available = cmp::min(remaining, usize::MAX as u64) as usize / bytes_per_sample;

        let n = cmp::min(frames.saturating_mul(channels), buf.len() / bytes_per_sample);
        let n = cmp::min(n, available);

        if bytes_per_sample == 1 {
            let read = self.reader.read_up_to(&mut buf[..n])?;
            return Ok(read / channels);
        }

        let mut i = 0;
        while i < n {
            match self.reader.read_le_i16() {
                Ok(s) => buf[2 * i..2 * i + 2].copy_from_slice(&s.to_ne_bytes()),
                Err(ref err) if err.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(err) => return Err(Error::from(err)),
            }
            i += 1;
        }
        Ok(i / channels)
    }

    /// Destroys the `WavDecoder` and returns the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl WavDecoder<io::BufReader<fs::File>> {
    /// Attempts to create a decoder that reads from the specified file.
    ///
    /// This is a convenience constructor that opens a `File`, wraps it in a
    /// `BufReader` and then constructs a `WavDecoder` from it.
    pub fn open<P: AsRef<path::Path>>(filename: P) -> Result<WavDecoder<io::BufReader<fs::File>>> {
        let file = fs::File::open(filename)?;
        let buf_reader = io::BufReader::new(file);
        WavDecoder::new(buf_reader)
    }
}

#[cfg(test)]
fn minimal_wav(channels: u16, rate: u32, bits: u16, data: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data.len() as u32).to_le_bytes());
    bytes.extend_from_slice(b"WAVEfmt \x10\x00\x00\x00\x01\x00");
    bytes.extend_from_slice(&channels.to_le_bytes());
    bytes.extend_from_slice(&rate.to_le_bytes());
    bytes.extend_from_slice(&[0; 6]);
    bytes.extend_from_slice(&bits.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
    bytes.extend_from_slice(data);
    bytes
}

#[test]
fn read_wav_8bit_mono() {
    let bytes = minimal_wav(1, 8000, 8, &[0x10, 0x20, 0x30, 0x40]);
    let mut decoder = WavDecoder::new(io::Cursor::new(bytes)).unwrap();

    assert_eq!(decoder.spec().channels, 1);
    assert_eq!(decoder.spec().bits_per_sample, 8);
    assert_eq!(decoder.spec().sample_rate, 8000);
    assert_eq!(decoder.frames(), 4);
    assert_eq!(decoder.data_start(), 44);

    let mut buf = [0u8; 4];
    assert_eq!(decoder.read_frames(&mut buf, 4).unwrap(), 4);
    assert_eq!(buf, [0x10, 0x20, 0x30, 0x40]);
}

#[test]
fn read_wav_16bit_stereo() {
    let mut data = Vec::new();
    for s in &[2_i16, -3, 5, -7, 11, -13] {
        data.extend_from_slice(&s.to_le_bytes());
    }
    let bytes = minimal_wav(2, 44100, 16, &data);
    let mut decoder = WavDecoder::new(io::Cursor::new(bytes)).unwrap();

    // 12 bytes: (12 + 1) / 2 = 6, then halved for 16 bits.
    assert_eq!(decoder.frames(), 3);

    let mut buf = [0u8; 12];
    assert_eq!(decoder.read_frames(&mut buf, 3).unwrap(), 3);
    let samples: Vec<i16> = buf.chunks(2)
                               .map(|b| i16::from_ne_bytes([b[0], b[1]]))
                               .collect();
    assert_eq!(&samples[..], &[2, -3, 5, -7, 11, -13]);
}

#[test]
fn short_read_signals_exhaustion() {
    let bytes = minimal_wav(1, 8000, 16, &[1, 0, 2, 0, 3, 0]);
    let mut decoder = WavDecoder::new(io::Cursor::new(bytes)).unwrap();

    let mut buf = [0u8; 16];
    assert_eq!(decoder.frames_remaining().unwrap(), 3);
    assert_eq!(decoder.read_frames(&mut buf, 8).unwrap(), 3);
    assert_eq!(decoder.read_frames(&mut buf, 8).unwrap(), 0);
    assert_eq!(decoder.frames_remaining().unwrap(), 0);
}

#[test]
fn oversized_data_chunk_is_clamped_to_stream() {
    let mut bytes = minimal_wav(1, 8000, 8, &[1, 2, 3]);
    bytes[40..44].copy_from_slice(&u32::MAX.to_le_bytes());
    let mut decoder = WavDecoder::new(io::Cursor::new(bytes)).unwrap();

    // The declared count is kept, reads end where the bytes do.
    assert_eq!(decoder.frames(), u32::MAX);
    assert_eq!(decoder.frames_remaining().unwrap(), 3);
    let mut buf = [0u8; 8];
    assert_eq!(decoder.read_frames(&mut buf, 8).unwrap(), 3);
}

#[test]
fn odd_stereo_data_length_rounds_up() {
    let bytes = minimal_wav(2, 8000, 8, &[1, 2, 3, 4, 5]);
    let mut decoder = WavDecoder::new(io::Cursor::new(bytes)).unwrap();
    assert_eq!(decoder.spec().channels, 2);
    assert_eq!(decoder.spec().bits_per_sample, 8);
    assert_eq!(decoder.frames(), 3);

    // Only whole frames are read; the trailing half frame is not.
    let mut buf = [0u8; 6];
    assert_eq!(decoder.read_frames(&mut buf, 3).unwrap(), 2);
    assert_eq!(&buf[..4], &[1, 2, 3, 4]);

    // 7 bytes of 16-bit stereo: (7 + 1) / 2 = 4, halved to 2.
    let bytes = minimal_wav(2, 8000, 16, &[0; 7]);
    let decoder = WavDecoder::new(io::Cursor::new(bytes)).unwrap();
    assert_eq!(decoder.frames(), 2);
}

#[test]
fn read_is_clamped_to_buffer() {
    let bytes = minimal_wav(2, 8000, 8, &[1, 2, 3, 4, 5, 6]);
    let mut decoder = WavDecoder::new(io::Cursor::new(bytes)).unwrap();

    let mut buf = [0u8; 4];
    assert_eq!(decoder.read_frames(&mut buf, 3).unwrap(), 2);
    assert_eq!(buf, [1, 2, 3, 4]);
    assert_eq!(decoder.read_frames(&mut buf, 3).unwrap(), 1);
    assert_eq!(&buf[..2], &[5, 6]);
}

#[test]
fn read_stops_at_end_of_data_chunk() {
    let mut bytes = minimal_wav(1, 8000, 8, &[7, 8]);
    bytes.extend_from_slice(b"LIST\x04\x00\x00\x00abcd");
    let mut decoder = WavDecoder::new(io::Cursor::new(bytes)).unwrap();

    let mut buf = [0u8; 16];
    assert_eq!(decoder.read_frames(&mut buf, 16).unwrap(), 2);
    assert_eq!(&buf[..2], &[7, 8]);
}

#[test]
fn data_before_fmt_uses_defaults() {
    let bytes = b"RIFF\x10\x00\x00\x00WAVEdata\x02\x00\x00\x00\x80\x81".to_vec();
    let decoder = WavDecoder::new(io::Cursor::new(bytes)).unwrap();
    assert_eq!(decoder.spec(), WavSpec::HEADERLESS);
    assert_eq!(decoder.spec().sample_rate, 22050);
    assert_eq!(decoder.frames(), 2);
}

#[test]
fn unknown_chunks_are_skipped() {
    let mut bytes = b"RIFF\x00\x00\x00\x00WAVEJUNK\x03\x00\x00\x00xyz".to_vec();
    bytes.extend_from_slice(&minimal_wav(1, 11025, 8, &[9])[12..]);
    let mut decoder = WavDecoder::new(io::Cursor::new(bytes)).unwrap();
    assert_eq!(decoder.spec().sample_rate, 11025);

    let mut buf = [0u8; 1];
    assert_eq!(decoder.read_frames(&mut buf, 1).unwrap(), 1);
    assert_eq!(buf[0], 9);
}

#[test]
fn extended_fmt_chunk_is_skipped() {
    let mut bytes = b"RIFF\x00\x00\x00\x00WAVEfmt \x12\x00\x00\x00\x01\x00\x01\x00".to_vec();
    bytes.extend_from_slice(&8000_u32.to_le_bytes());
    bytes.extend_from_slice(&[0; 6]);
    bytes.extend_from_slice(b"\x08\x00\x00\x00data\x01\x00\x00\x00\x42");
    let mut decoder = WavDecoder::new(io::Cursor::new(bytes)).unwrap();

    let mut buf = [0u8; 1];
    assert_eq!(decoder.read_frames(&mut buf, 1).unwrap(), 1);
    assert_eq!(buf[0], 0x42);
}

#[test]
fn seek_frame_and_byte_position_agree() {
    let bytes = minimal_wav(2, 8000, 16, &[0; 32]);
    let mut decoder = WavDecoder::new(io::Cursor::new(bytes)).unwrap();
    assert_eq!(decoder.byte_position().unwrap(), 0);
    decoder.seek_frame(3).unwrap();
    assert_eq!(decoder.byte_position().unwrap(), 12);

    let mut buf = [0u8; 4];
    assert_eq!(decoder.read_frames(&mut buf, 1).unwrap(), 1);
    assert_eq!(decoder.byte_position().unwrap(), 16);
}

#[test]
fn format_errors_are_reported() {
    fn expect_format_error(bytes: Vec<u8>) {
        match WavDecoder::new(io::Cursor::new(bytes)) {
            Err(Error::FormatError(..)) => {}
            Err(err) => panic!("expected a format error, got {:?}", err),
            Ok(..) => panic!("expected a format error, got a decoder"),
        }
    }

    let mut not_riff = minimal_wav(1, 8000, 8, &[0]);
    not_riff[..4].copy_from_slice(b"RIFX");
    expect_format_error(not_riff);

    let mut not_wave = minimal_wav(1, 8000, 8, &[0]);
    not_wave[8..12].copy_from_slice(b"AVI ");
    expect_format_error(not_wave);

    let mut short_fmt = minimal_wav(1, 8000, 8, &[0]);
    short_fmt[16] = 14;
    expect_format_error(short_fmt);

    let mut float = minimal_wav(1, 8000, 8, &[0]);
    float[20] = 3;
    expect_format_error(float);

    expect_format_error(minimal_wav(3, 8000, 8, &[0]));
    expect_format_error(minimal_wav(1, 8000, 24, &[0, 0, 0]));
    expect_format_error(minimal_wav(1, 0, 8, &[0]));
}

#[test]
fn truncated_header_is_an_io_error() {
    let bytes = minimal_wav(1, 8000, 8, &[0]);
    for &len in &[0, 6, 16, 22, 30, 36, 40] {
        match WavDecoder::new(io::Cursor::new(bytes[..len].to_vec())) {
            Err(Error::IoError(ref err)) => {
                assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
            }
            Err(err) => panic!("expected an IO error at length {}, got {:?}", len, err),
            Ok(..) => panic!("expected an IO error at length {}", len),
        }
    }
}
