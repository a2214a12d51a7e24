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

/// The sample encodings an in-memory buffer can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioDepth {
    /// Signed 8-bit integers.
    Int8,
    /// Unsigned 8-bit integers, silence at 128.
    UInt8,
    /// Signed 16-bit integers.
    Int16,
    /// Unsigned 16-bit integers, silence at 32768.
    UInt16,
    /// Signed 24-bit integers, stored in the low bits of an `i32`.
    Int24,
    /// Unsigned 24-bit integers, stored in the low bits of a `u32`.
    UInt24,
    /// 32-bit floats, normally in the range [-1.0, 1.0].
    Float32,
}

impl AudioDepth {
    /// The bits per sample of a wav file encoded from this depth.
    ///
    /// Only 8 and 16 bits are written; wider depths are reduced to 16 bits.
    pub fn wav_bits(self) -> u16 {
        match self {
            AudioDepth::Int8 | AudioDepth::UInt8 => 8,
            _ => 16,
        }
    }
}

/// Interleaved sample values, one vector variant per depth.
#[derive(Clone, Debug, PartialEq)]
pub enum SampleData {
    Int8(Vec<i8>),
    UInt8(Vec<u8>),
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int24(Vec<i32>),
    UInt24(Vec<u32>),
    Float32(Vec<f32>),
}

impl SampleData {
    /// Returns the depth of the stored samples.
    pub fn depth(&self) -> AudioDepth {
        match *self {
            SampleData::Int8(..) => AudioDepth::Int8,
            SampleData::UInt8(..) => AudioDepth::UInt8,
            SampleData::Int16(..) => AudioDepth::Int16,
            SampleData::UInt16(..) => AudioDepth::UInt16,
            SampleData::Int24(..) => AudioDepth::Int24,
            SampleData::UInt24(..) => AudioDepth::UInt24,
            SampleData::Float32(..) => AudioDepth::Float32,
        }
    }

    /// Returns the number of sample values, counting every channel.
    pub fn len(&self) -> usize {
        match *self {
            SampleData::Int8(ref v) => v.len(),
            SampleData::UInt8(ref v) => v.len(),
            SampleData::Int16(ref v) => v.len(),
            SampleData::UInt16(ref v) => v.len(),
            SampleData::Int24(ref v) => v.len(),
            SampleData::UInt24(ref v) => v.len(),
            SampleData::Float32(ref v) => v.len(),
        }
    }

    /// Returns whether there are no sample values at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A fully decoded sound held in memory.
///
/// This is what a one-shot `load` produces and what `save` consumes. The
/// fields are public; `save` verifies that `data` holds exactly
/// `frames × channels` values before writing anything.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBuffer {
    /// The number of interleaved channels.
    pub channels: u16,

    /// The number of frames per second.
    pub sample_rate: u32,

    /// The number of frames, a frame being one sample for every channel.
    pub frames: usize,

    /// The interleaved sample values.
    pub data: SampleData,
}

impl SampleBuffer {
    /// Wraps interleaved samples, deriving the frame count from their number.
    ///
    /// A trailing partial frame is not counted.
    pub fn new(channels: u16, sample_rate: u32, data: SampleData) -> SampleBuffer {
        let frames = match channels {
            0 => 0,
            n => data.len() / n as usize,
        };
        SampleBuffer {
            channels: channels,
            sample_rate: sample_rate,
            frames: frames,
            data: data,
        }
    }

    /// Returns the depth of the stored samples.
    pub fn depth(&self) -> AudioDepth {
        self.data.depth()
    }

    /// Returns the duration in seconds.
    pub fn duration(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }
}

#[test]
fn new_counts_whole_frames() {
    let buffer = SampleBuffer::new(2, 48000, SampleData::Float32(vec![0.0; 5]));
    assert_eq!(buffer.frames, 2);
    assert_eq!(buffer.depth(), AudioDepth::Float32);

    let silent = SampleBuffer::new(1, 8000, SampleData::UInt8(vec![128; 4000]));
    assert_eq!(silent.frames, 4000);
    assert_eq!(silent.duration(), 0.5);
}

#[test]
fn wav_bits_follow_depth() {
    assert_eq!(AudioDepth::Int8.wav_bits(), 8);
    assert_eq!(AudioDepth::UInt8.wav_bits(), 8);
    assert_eq!(AudioDepth::UInt16.wav_bits(), 16);
    assert_eq!(AudioDepth::Int24.wav_bits(), 16);
    assert_eq!(AudioDepth::Float32.wav_bits(), 16);
}
