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

//! Wavfeed, a wav decoding, encoding and streaming library.
//!
//! Wavfeed reads and writes mono and stereo PCM wav files with 8 or 16 bits
//! per sample, and can feed a file to a player in fixed-size fragments from a
//! background thread.
//!
//! Examples
//! ========
//!
//! The following example renders a 440 Hz sine wave into a mono buffer with
//! a sample rate of 44.1 kHz and 16 bits per sample, encodes it, and decodes
//! it again.
//!
//! ```
//! use std::f32::consts::PI;
//! use std::io::Cursor;
//!
//! let samples: Vec<i16> = (0..44100)
//!     .map(|x| x as f32 / 44100.0)
//!     .map(|t| ((t * 440.0 * 2.0 * PI).sin() * i16::MAX as f32) as i16)
//!     .collect();
//! let buffer = wavfeed::SampleBuffer::new(1, 44100, wavfeed::SampleData::Int16(samples));
//!
//! let mut file = Cursor::new(Vec::new());
//! wavfeed::save_to(&mut file, &buffer).unwrap();
//!
//! file.set_position(0);
//! let decoder = wavfeed::WavDecoder::new(file).unwrap();
//! assert_eq!(decoder.spec().channels, 1);
//! assert_eq!(decoder.frames(), 44100);
//! ```
//!
//! The following example streams a file in fragments of 1024 frames, the way
//! an audio callback would consume it.
//!
//! ```no_run
//! use wavfeed::{StreamConfig, StreamEvent};
//!
//! let config = StreamConfig::default().with_frames_per_buffer(1024);
//! let stream = wavfeed::load_wav_audio_stream("testsamples/pop.wav", config).unwrap();
//! while let Some(event) = stream.next_event() {
//!     match event {
//!         StreamEvent::Fragment(fragment) => {
//!             // Hand the fragment to the output device, then return it.
//!             stream.recycle(fragment);
//!         }
//!         StreamEvent::Finished => break,
//!     }
//! }
//! stream.close();
//! ```

use std::cmp;
use std::fs;
use std::io;
use std::path;

use thiserror::Error;
use tracing::warn;

mod buffer;
mod read;
mod stream;
mod wav;
mod write;

pub use buffer::{AudioDepth, SampleBuffer, SampleData};
pub use read::{read_wave_header, WavDecoder};
pub use stream::{load_wav_audio_stream, AudioStream, PlayMode, StreamConfig, StreamEvent,
                 StreamFeeder, StreamState, WavFeeder};
pub use write::{encode, save, save_to};

/// Converts a signed integer in the range -128-127 to an unsigned one in the range 0-255.
///
/// For all bit depths except 8, samples in a wav file are stored as
/// little-endian _signed_ integers. An 8-bit sample is instead stored as an
/// _unsigned_ integer, biased by 128.
fn u8_from_signed(x: i8) -> u8 {
    (x as i16 + 128) as u8
}

/// Converts an unsigned integer in the range 0-255 to a signed one in the range -128-127.
#[cfg(test)]
fn signed_from_u8(x: u8) -> i8 {
    (x as i16 - 128) as i8
}

#[test]
fn u8_sign_conversion_is_bijective() {
    for x in 0..255 {
        assert_eq!(x, u8_from_signed(signed_from_u8(x)));
    }
    for x in -128..127 {
        assert_eq!(x, signed_from_u8(u8_from_signed(x)));
    }
}

/// Specifies properties of the audio data in a wav file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WavSpec {
    /// The number of channels, 1 or 2.
    pub channels: u16,

    /// The number of frames per second.
    ///
    /// A common value is 44100, this is 44.1 kHz which is used for CD audio.
    pub sample_rate: u32,

    /// The number of bits per sample, 8 or 16.
    ///
    /// 8-bit samples are unsigned, 16-bit samples are signed.
    pub bits_per_sample: u16,
}

impl WavSpec {
    /// The format assumed for a data chunk that is not preceded by a fmt
    /// chunk: 22050 Hz, 8 bits, mono.
    pub const HEADERLESS: WavSpec = WavSpec {
        channels: 1,
        sample_rate: 22050,
        bits_per_sample: 8,
    };

    /// The number of bytes used to store a single sample.
    pub fn bytes_per_sample(&self) -> u16 {
        self.bits_per_sample / 8
    }

    /// The number of bytes used to store one sample for every channel.
    pub fn bytes_per_frame(&self) -> usize {
        self.bytes_per_sample() as usize * self.channels as usize
    }

    /// The number of bytes of sample data per second of audio.
    pub fn bytes_per_second(&self) -> f64 {
        self.bytes_per_frame() as f64 * self.sample_rate as f64
    }
}

/// The error type for all operations in Wavfeed.
#[derive(Debug, Error)]
pub enum Error {
    /// An IO error occurred in the underlying reader or writer.
    ///
    /// This includes running out of data in the middle of a header field,
    /// which is reported with `io::ErrorKind::UnexpectedEof`.
    #[error(transparent)]
    IoError(#[from] io::Error),

    /// Ill-formed or unsupported WAVE data was encountered.
    #[error("ill-formed WAVE file: {0}")]
    FormatError(&'static str),

    /// Only mono and stereo audio can be encoded.
    #[error("cannot encode {0} channels, only mono and stereo are supported")]
    UnsupportedChannels(u16),

    /// The sample data does not hold `frames × channels` values.
    #[error("expected {expected} sample values, found {actual}")]
    LengthMismatch {
        /// The number of values implied by the frame and channel counts.
        expected: usize,
        /// The number of values actually present.
        actual: usize,
    },

    /// A streaming session was configured with unusable parameters.
    #[error("invalid stream configuration: {0}")]
    InvalidConfig(&'static str),
}

/// A type for results generated by Wavfeed where the error type is hard-wired.
pub type Result<T> = std::result::Result<T, Error>;

/// Reads a whole wav file into memory.
///
/// 8-bit files produce `SampleData::UInt8`, 16-bit files produce
/// `SampleData::Int16`. If the file holds fewer frames than its data chunk
/// declares, the buffer is truncated to the frames actually present.
pub fn load<P: AsRef<path::Path>>(filename: P) -> Result<SampleBuffer> {
    let file = fs::File::open(filename)?;
    load_from(io::BufReader::new(file))
}

/// Reads wav data from a seekable reader into memory.
///
/// See `load` for details.
pub fn load_from<R: io::Read + io::Seek>(reader: R) -> Result<SampleBuffer> {
    let mut decoder = WavDecoder::new(reader)?;
    let spec = decoder.spec();
    let declared = decoder.frames() as u64;
    let present = cmp::min(declared, decoder.frames_remaining()?) as usize;

    let mut bytes = vec![0u8; present * spec.bytes_per_frame()];
    let frames = decoder.read_frames(&mut bytes, present)?;
    if (frames as u64) < declared {
        warn!(declared, frames, "wav data is shorter than its data chunk declares");
    }
    bytes.truncate(frames * spec.bytes_per_frame());

    let data = match spec.bits_per_sample {
        8 => SampleData::UInt8(bytes),
        _ => SampleData::Int16(bytes.chunks_exact(2)
                                    .map(|b| i16::from_ne_bytes([b[0], b[1]]))
                                    .collect()),
    };

    Ok(SampleBuffer {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        frames: frames,
        data: data,
    })
}

#[test]
fn write_read_i16_is_lossless() {
    let samples: Vec<i16> = (-1024_i16..1024).collect();
    let buffer = SampleBuffer::new(2, 44100, SampleData::Int16(samples.clone()));

    let mut file = io::Cursor::new(Vec::new());
    save_to(&mut file, &buffer).unwrap();
    file.set_position(0);

    let loaded = load_from(file).unwrap();
    assert_eq!(loaded.channels, 2);
    assert_eq!(loaded.sample_rate, 44100);
    assert_eq!(loaded.frames, 1024);
    assert_eq!(loaded.data, SampleData::Int16(samples));
}

#[test]
fn write_read_u8_is_lossless() {
    let samples: Vec<u8> = (0..=255).collect();
    let buffer = SampleBuffer::new(1, 11025, SampleData::UInt8(samples.clone()));

    let mut file = io::Cursor::new(Vec::new());
    save_to(&mut file, &buffer).unwrap();
    file.set_position(0);

    let loaded = load_from(file).unwrap();
    assert_eq!(loaded, buffer);
}

#[test]
fn write_read_i8_is_biased() {
    let buffer = SampleBuffer::new(1, 8000, SampleData::Int8(vec![-128, -1, 0, 127]));

    let mut file = io::Cursor::new(Vec::new());
    save_to(&mut file, &buffer).unwrap();
    file.set_position(0);

    let loaded = load_from(file).unwrap();
    assert_eq!(loaded.data, SampleData::UInt8(vec![0, 127, 128, 255]));
}

#[test]
fn load_truncates_to_frames_present() {
    let mut bytes = encode(&SampleBuffer::new(1, 8000, SampleData::Int16(vec![1, 2, 3]))).unwrap();
    // Drop the last sample and a half, the header still claims three.
    let len = bytes.len();
    bytes.truncate(len - 3);

    let loaded = load_from(io::Cursor::new(bytes)).unwrap();
    assert_eq!(loaded.frames, 1);
    assert_eq!(loaded.data, SampleData::Int16(vec![1]));
}
