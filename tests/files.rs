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

use std::fs;
use std::io;

use wavfeed::{Error, SampleBuffer, SampleData, WavDecoder};

#[test]
fn save_then_load_works_on_files_not_just_in_memory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roundtrip.wav");

    let samples = vec![11_i16, -13, 17, -19, 23, -29];
    let buffer = SampleBuffer::new(2, 22050, SampleData::Int16(samples.clone()));
    wavfeed::save(&path, &buffer).unwrap();

    assert_eq!(fs::metadata(&path).unwrap().len(), 44 + 12);

    let loaded = wavfeed::load(&path).unwrap();
    assert_eq!(loaded, buffer);
}

#[test]
fn open_reads_header_and_frames() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mono8.wav");

    let buffer = SampleBuffer::new(1, 8000, SampleData::UInt8(vec![0x10, 0x20, 0x30, 0x40]));
    wavfeed::save(&path, &buffer).unwrap();

    let mut decoder = WavDecoder::open(&path).unwrap();
    let spec = decoder.spec();
    assert_eq!((spec.channels, spec.sample_rate, spec.bits_per_sample), (1, 8000, 8));
    assert_eq!(decoder.frames(), 4);
    assert_eq!(decoder.duration(), 0.0005);

    let mut buf = [0u8; 4];
    assert_eq!(decoder.read_frames(&mut buf, 4).unwrap(), 4);
    assert_eq!(buf, [0x10, 0x20, 0x30, 0x40]);
    assert_eq!(decoder.read_frames(&mut buf, 4).unwrap(), 0);
}

#[test]
fn failed_save_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.wav");

    let mut buffer = SampleBuffer::new(1, 8000, SampleData::Int24(vec![0; 10]));
    buffer.frames = 20;
    match wavfeed::save(&path, &buffer) {
        Err(Error::LengthMismatch { expected: 20, actual: 10 }) => {}
        other => panic!("expected LengthMismatch, got {:?}", other),
    }
    assert!(!path.exists());

    let surround = SampleBuffer::new(6, 48000, SampleData::Float32(vec![0.0; 12]));
    match wavfeed::save(&path, &surround) {
        Err(Error::UnsupportedChannels(6)) => {}
        other => panic!("expected UnsupportedChannels, got {:?}", other),
    }
    assert!(!path.exists());
}

#[test]
fn save_into_missing_directory_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("out.wav");

    let buffer = SampleBuffer::new(1, 8000, SampleData::Int16(vec![0; 8]));
    match wavfeed::save(&path, &buffer) {
        Err(Error::IoError(ref err)) => assert_eq!(err.kind(), io::ErrorKind::NotFound),
        other => panic!("expected an IO error, got {:?}", other),
    }
}

#[test]
fn save_overwrites_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("overwrite.wav");
    fs::write(&path, vec![0xaa; 1000]).unwrap();

    let buffer = SampleBuffer::new(1, 8000, SampleData::UInt8(vec![1, 2, 3]));
    wavfeed::save(&path, &buffer).unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len(), 47);
    assert_eq!(wavfeed::load(&path).unwrap(), buffer);
}

#[test]
fn load_of_missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    match wavfeed::load(dir.path().join("nope.wav")) {
        Err(Error::IoError(ref err)) => assert_eq!(err.kind(), io::ErrorKind::NotFound),
        other => panic!("expected an IO error, got {:?}", other),
    }
}

#[test]
fn load_of_non_wav_is_a_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("text.wav");
    fs::write(&path, b"this is not a riff file at all").unwrap();

    match wavfeed::load(&path) {
        Err(Error::FormatError(..)) => {}
        other => panic!("expected a format error, got {:?}", other),
    }
}
