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

//! Header parsing over every supported format.

use std::io::Cursor;

use proptest::prelude::*;
use wavfeed::{SampleBuffer, SampleData, WavDecoder};

/// Builds a wav file by hand, so odd data lengths can be expressed.
fn wav_bytes(channels: u16, sample_rate: u32, bits: u16, data: &[u8]) -> Vec<u8> {
    let block_align = channels * bits / 8;
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data.len() as u32).to_le_bytes());
    bytes.extend_from_slice(b"WAVEfmt \x10\x00\x00\x00\x01\x00");
    bytes.extend_from_slice(&channels.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&(sample_rate.wrapping_mul(block_align as u32)).to_le_bytes());
    bytes.extend_from_slice(&block_align.to_le_bytes());
    bytes.extend_from_slice(&bits.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
    bytes.extend_from_slice(data);
    bytes
}

fn channels() -> impl Strategy<Value = u16> {
    prop_oneof![Just(1_u16), Just(2_u16)]
}

fn bits() -> impl Strategy<Value = u16> {
    prop_oneof![Just(8_u16), Just(16_u16)]
}

proptest! {
    /// Every mono/stereo, 8/16-bit header reports exactly its format, and
    /// the frame count follows the data length.
    #[test]
    fn open_reports_channels_and_depth(
        channels in channels(),
        bits in bits(),
        sample_rate in 1_u32..=192_000,
        data in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let bytes = wav_bytes(channels, sample_rate, bits, &data);
        let decoder = WavDecoder::new(Cursor::new(bytes)).unwrap();
        let spec = decoder.spec();
        prop_assert_eq!(spec.channels, channels);
        prop_assert_eq!(spec.bits_per_sample, bits);
        prop_assert_eq!(spec.sample_rate, sample_rate);
        prop_assert_eq!(decoder.data_start(), 44);

        let mut frames = data.len() as u32;
        if channels == 2 {
            frames = (frames + 1) / 2;
        }
        if bits == 16 {
            frames /= 2;
        }
        prop_assert_eq!(decoder.frames(), frames);
    }

    /// Reading never yields more whole frames than the bytes hold.
    #[test]
    fn read_returns_whole_frames_present(
        channels in channels(),
        bits in bits(),
        data in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let bytes = wav_bytes(channels, 8000, bits, &data);
        let mut decoder = WavDecoder::new(Cursor::new(bytes)).unwrap();
        let bytes_per_frame = decoder.spec().bytes_per_frame();

        let mut buf = vec![0u8; 128];
        let n = decoder.read_frames(&mut buf, 64).unwrap();
        prop_assert_eq!(n, data.len() / bytes_per_frame);
    }

    /// What is saved at a supported format opens with the same format.
    #[test]
    fn saved_format_is_reported_on_open(
        channels in channels(),
        eight_bit in any::<bool>(),
        sample_rate in 1_u32..=192_000,
        frames in 0_usize..32,
    ) {
        let n = frames * channels as usize;
        let data = if eight_bit {
            SampleData::UInt8(vec![0x80; n])
        } else {
            SampleData::Int16(vec![0; n])
        };
        let bytes = wavfeed::encode(&SampleBuffer::new(channels, sample_rate, data)).unwrap();

        let decoder = WavDecoder::new(Cursor::new(bytes)).unwrap();
        prop_assert_eq!(decoder.spec().channels, channels);
        prop_assert_eq!(decoder.spec().bits_per_sample, if eight_bit { 8 } else { 16 });
        prop_assert_eq!(decoder.frames() as usize, frames);
    }
}
