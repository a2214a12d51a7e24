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

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tempfile::TempDir;
use wavfeed::{AudioStream, Error, PlayMode, SampleBuffer, SampleData, StreamConfig,
              StreamEvent, StreamFeeder, StreamState, WavSpec};

/// Saves a mono 8-bit file whose sample at frame `i` is `i as u8`.
fn ramp_file(dir: &TempDir, sample_rate: u32, frames: usize) -> PathBuf {
    let path = dir.path().join("ramp.wav");
    let data = SampleData::UInt8((0..frames).map(|i| i as u8).collect());
    wavfeed::save(&path, &SampleBuffer::new(1, sample_rate, data)).unwrap();
    path
}

fn expect_fragment(stream: &AudioStream) -> Vec<u8> {
    match stream.next_event() {
        Some(StreamEvent::Fragment(fragment)) => fragment,
        other => panic!("expected a fragment, got {:?}", other),
    }
}

#[test]
fn seek_at_or_beyond_loop_end_leaves_position_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = ramp_file(&dir, 8000, 8000);
    let config = StreamConfig::default().with_buffer_count(2).with_frames_per_buffer(100);
    let stream = wavfeed::load_wav_audio_stream(&path, config).unwrap();

    assert_eq!(stream.length(), 1.0);
    assert!(stream.seek(0.5));
    assert_eq!(stream.position(), 0.5);

    assert!(!stream.seek(1.0));
    assert!(!stream.seek(3.0));
    assert!(!stream.seek(-0.1));
    assert_eq!(stream.position(), 0.5);

    stream.close();
}

#[test]
fn seek_rounds_down_to_a_whole_frame() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stereo.wav");
    let buffer = SampleBuffer::new(2, 8000, SampleData::Int16(vec![0; 16000]));
    wavfeed::save(&path, &buffer).unwrap();

    let stream = wavfeed::load_wav_audio_stream(&path, StreamConfig::default()).unwrap();
    assert_eq!(stream.fragment_len(), 1024 * 4);
    assert!(stream.seek(0.2501));
    assert_eq!(stream.position(), 0.25);
}

#[test]
fn once_mode_pads_with_silence_and_finishes() {
    let dir = tempfile::tempdir().unwrap();
    let path = ramp_file(&dir, 8000, 250);
    let config = StreamConfig::default().with_buffer_count(2).with_frames_per_buffer(100);
    let stream = wavfeed::load_wav_audio_stream(&path, config).unwrap();

    let first = expect_fragment(&stream);
    let second = expect_fragment(&stream);
    assert_eq!(first, (0..100).collect::<Vec<u8>>());
    assert_eq!(second, (100..200).collect::<Vec<u8>>());

    assert!(stream.recycle(first));
    let third = expect_fragment(&stream);
    assert_eq!(&third[..50], &(200..250).collect::<Vec<u8>>()[..]);
    assert!(third[50..].iter().all(|&x| x == 0x80));
    assert_eq!(stream.next_event(), Some(StreamEvent::Finished));

    // A drained stream holds on to recycled fragments until it is moved.
    assert!(stream.recycle(second));
    assert!(stream.rewind());
    let again = expect_fragment(&stream);
    assert_eq!(again, (0..100).collect::<Vec<u8>>());
}

#[test]
fn loop_mode_wraps_to_loop_start() {
    let dir = tempfile::tempdir().unwrap();
    let path = ramp_file(&dir, 8000, 150);
    let config = StreamConfig::default()
        .with_buffer_count(1)
        .with_frames_per_buffer(100)
        .with_play_mode(PlayMode::Loop);
    let stream = wavfeed::load_wav_audio_stream(&path, config).unwrap();

    let first = expect_fragment(&stream);
    assert_eq!(first, (0..100).collect::<Vec<u8>>());

    assert!(stream.recycle(first));
    let second = expect_fragment(&stream);
    let expected: Vec<u8> = (100..150).chain(0..50).collect();
    assert_eq!(second, expected);

    assert!(stream.recycle(second));
    let third = expect_fragment(&stream);
    assert_eq!(third, (50..150).collect::<Vec<u8>>());
    assert_eq!(stream.try_next_event(), None);
}

#[test]
fn loop_region_shorter_than_a_fragment_repeats() {
    let dir = tempfile::tempdir().unwrap();
    let path = ramp_file(&dir, 1024, 1024);
    let config = StreamConfig::default()
        .with_buffer_count(1)
        .with_frames_per_buffer(10)
        .with_play_mode(PlayMode::Loop);
    let stream = wavfeed::load_wav_audio_stream(&path, config).unwrap();
    let first = expect_fragment(&stream);

    // Frames 256 up to 260.
    assert!(stream.set_loop(0.25, 0.25390625));
    assert!(stream.rewind());
    assert!(stream.recycle(first));
    assert_eq!(expect_fragment(&stream), vec![0, 1, 2, 3, 0, 1, 2, 3, 0, 1]);

    assert!(!stream.set_loop(0.5, 0.5));
}

#[test]
fn switching_a_drained_stream_to_loop_resumes_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = ramp_file(&dir, 8000, 30);
    let config = StreamConfig::default().with_buffer_count(1).with_frames_per_buffer(20);
    let stream = wavfeed::load_wav_audio_stream(&path, config).unwrap();

    let first = expect_fragment(&stream);
    assert!(stream.recycle(first));
    let second = expect_fragment(&stream);
    assert_eq!(&second[..10], &(20..30).collect::<Vec<u8>>()[..]);
    assert_eq!(stream.next_event(), Some(StreamEvent::Finished));

    assert!(stream.recycle(second));
    assert!(stream.set_play_mode(PlayMode::Loop));
    assert_eq!(expect_fragment(&stream), (0..20).collect::<Vec<u8>>());
}

#[test]
fn zero_sized_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = ramp_file(&dir, 8000, 10);

    let config = StreamConfig::default().with_buffer_count(0);
    match wavfeed::load_wav_audio_stream(&path, config) {
        Err(Error::InvalidConfig(..)) => {}
        Err(err) => panic!("expected InvalidConfig, got {:?}", err),
        Ok(..) => panic!("expected InvalidConfig, got a stream"),
    }

    let config = StreamConfig::default().with_frames_per_buffer(0);
    match wavfeed::load_wav_audio_stream(&path, config) {
        Err(Error::InvalidConfig(..)) => {}
        Err(err) => panic!("expected InvalidConfig, got {:?}", err),
        Ok(..) => panic!("expected InvalidConfig, got a stream"),
    }
}

/// A feeder that produces a constant value and records when it is closed.
struct ConstFeeder {
    value: u8,
    frames_left: usize,
    closed: Arc<AtomicBool>,
}

impl StreamFeeder for ConstFeeder {
    fn spec(&self) -> WavSpec {
        WavSpec { channels: 1, sample_rate: 1000, bits_per_sample: 8 }
    }

    fn update(&mut self, buf: &mut [u8], _mode: PlayMode) -> usize {
        let n = buf.len().min(self.frames_left);
        for x in &mut buf[..n] {
            *x = self.value;
        }
        self.frames_left -= n;
        n
    }

    fn seek(&mut self, _time: f64) -> bool {
        false
    }

    fn rewind(&mut self) -> bool {
        false
    }

    fn position(&mut self) -> f64 {
        0.0
    }

    fn length(&self) -> f64 {
        f64::INFINITY
    }

    fn set_loop(&mut self, _start: f64, _end: f64) -> bool {
        false
    }

    fn close(self: Box<Self>) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[test]
fn any_feeder_can_drive_a_stream() {
    let closed = Arc::new(AtomicBool::new(false));
    let feeder = ConstFeeder { value: 7, frames_left: 6, closed: closed.clone() };
    let config = StreamConfig::default().with_buffer_count(1).with_frames_per_buffer(4);
    let stream = AudioStream::new(Box::new(feeder), config).unwrap();

    assert_eq!(stream.spec().sample_rate, 1000);
    let first = expect_fragment(&stream);
    assert_eq!(stream.state(), StreamState::Running);
    assert_eq!(first, vec![7, 7, 7, 7]);
    assert!(stream.recycle(first));
    assert_eq!(expect_fragment(&stream), vec![7, 7, 0x80, 0x80]);
    assert_eq!(stream.next_event(), Some(StreamEvent::Finished));

    assert!(!stream.seek(0.0));
    assert!(!closed.load(Ordering::SeqCst));
    stream.close();
    assert!(closed.load(Ordering::SeqCst));
}

#[test]
fn dropping_a_stream_closes_its_feeder() {
    let closed = Arc::new(AtomicBool::new(false));
    let feeder = ConstFeeder { value: 1, frames_left: usize::MAX, closed: closed.clone() };
    let stream = AudioStream::new(Box::new(feeder), StreamConfig::default()).unwrap();
    let _ = expect_fragment(&stream);
    drop(stream);
    assert!(closed.load(Ordering::SeqCst));
}
