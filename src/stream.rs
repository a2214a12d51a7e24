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

//! Streaming playback.
//!
//! A streaming session hands out fixed-size fragments of audio that a
//! background _feeder thread_ refills on demand. The thread owns a
//! `StreamFeeder`, the format-specific part that knows how to fill a byte
//! buffer, seek, and report its position. Everything else talks to the
//! thread through a bounded command channel, so the feeder's stream cursor
//! and loop region are only ever touched from one thread. The position is
//! published back through an atomic snapshot after every command.

use std::cell::Cell;
use std::cmp;
use std::fs;
use std::io;
use std::mem;
use std::path;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use tracing::{debug, trace, warn};

use crate::read::WavDecoder;
use crate::{Error, Result, WavSpec};

/// How a stream behaves when it reaches the end of its data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayMode {
    /// Play to the end once, then report `StreamEvent::Finished`.
    Once,
    /// Play the loop region over and over, in one direction.
    Loop,
}

/// The lifecycle of a streaming session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    /// The feeder is attached, but the thread has not started yet.
    Idle,
    /// The feeder thread is producing fragments.
    Running,
    /// The thread was told to quit and is being joined.
    Stopping,
    /// The thread has exited and the feeder is closed.
    Closed,
}

impl StreamState {
    fn from_u8(x: u8) -> StreamState {
        match x {
            0 => StreamState::Idle,
            1 => StreamState::Running,
            2 => StreamState::Stopping,
            _ => StreamState::Closed,
        }
    }
}

/// The format-specific half of a streaming session.
///
/// A feeder is moved onto the feeder thread when the session starts, and all
/// of its methods are called from that thread only.
pub trait StreamFeeder: Send {
    /// The format of the bytes that `update` produces.
    fn spec(&self) -> WavSpec;

    /// The byte value that represents silence in this format.
    fn silence(&self) -> u8 {
        match self.spec().bits_per_sample {
            8 => 0x80,
            _ => 0,
        }
    }

    /// Fills `buf` with the next frames, returns the number of bytes written.
    ///
    /// Zero means no more data is available for this refill. In
    /// `PlayMode::Loop` the feeder stops at the end of the loop region.
    fn update(&mut self, buf: &mut [u8], mode: PlayMode) -> usize;

    /// Moves to `time` seconds. Returns false, without moving, if the time
    /// lies at or beyond the end of the loop region.
    fn seek(&mut self, time: f64) -> bool;

    /// Moves to the start of the loop region.
    fn rewind(&mut self) -> bool;

    /// The current position in seconds.
    fn position(&mut self) -> f64;

    /// The total duration in seconds.
    fn length(&self) -> f64;

    /// Replaces the loop region. Returns false if the region was rejected.
    fn set_loop(&mut self, start: f64, end: f64) -> bool;

    /// Releases the feeder and its underlying stream.
    fn close(self: Box<Self>);
}

/// Streams PCM frames from a `WavDecoder`.
pub struct WavFeeder<R> {
    decoder: WavDecoder<R>,
    loop_start: f64,
    loop_end: f64,
}

impl<R> WavFeeder<R>
    where R: io::Read + io::Seek
{
    /// Wraps a decoder. The loop region initially covers the whole file.
    pub fn new(decoder: WavDecoder<R>) -> WavFeeder<R> {
        let loop_end = decoder.duration();
        WavFeeder {
            decoder: decoder,
            loop_start: 0.0,
            loop_end: loop_end,
        }
    }

    /// Returns the current loop region as `(start, end)` in seconds.
    pub fn loop_region(&self) -> (f64, f64) {
        (self.loop_start, self.loop_end)
    }

    /// Destroys the feeder and returns the decoder.
    pub fn into_decoder(self) -> WavDecoder<R> {
        self.decoder
    }
}

impl<R> StreamFeeder for WavFeeder<R>
    where R: io::Read + io::Seek + Send
{
    fn spec(&self) -> WavSpec {
        self.decoder.spec()
    }

    fn update(&mut self, buf: &mut [u8], mode: PlayMode) -> usize {
        let spec = self.decoder.spec();
        let bytes_per_frame = spec.bytes_per_frame();
        let rate = spec.sample_rate as f64;

        let frames = buf.len() / bytes_per_frame;
        let frames = match mode {
            PlayMode::Loop => {
                // Clip to the loop end, counted in whole frames.
                let end = (self.loop_end * rate).round() as u64;
                let now = match self.decoder.byte_position() {
                    Ok(pos) => pos / bytes_per_frame as u64,
                    Err(err) => {
                        warn!(error = %err, "failed to query the wav stream position");
                        return 0;
                    }
                };
                if now >= end {
                    return 0;
                }
                cmp::min(end - now, frames as u64) as usize
            }
            PlayMode::Once => frames,
        };

        match self.decoder.read_frames(buf, frames) {
            Ok(n) => n * bytes_per_frame,
            Err(err) => {
                warn!(error = %err, "failed to read wav data, treating it as the end");
                0
            }
        }
    }

    fn seek(&mut self, time: f64) -> bool {
        if !time.is_finite() || time < 0.0 || time >= self.loop_end {
            warn!(time, loop_end = self.loop_end, "rejected seek outside of the loop region");
            return false;
        }

        let spec = self.decoder.spec();
        let bytes_per_frame = spec.bytes_per_frame() as u64;
        let offset = (time * spec.bytes_per_second()) as u64;
        match self.decoder.seek_frame(offset / bytes_per_frame) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, time, "failed to seek in wav data");
                false
            }
        }
    }

    fn rewind(&mut self) -> bool {
        let start = self.loop_start;
        self.seek(start)
    }

    fn position(&mut self) -> f64 {
        let bytes_per_second = self.decoder.spec().bytes_per_second();
        match self.decoder.byte_position() {
            Ok(pos) => pos as f64 / bytes_per_second,
            Err(err) => {
                warn!(error = %err, "failed to query the wav stream position");
                0.0
            }
        }
    }

    fn length(&self) -> f64 {
        self.decoder.duration()
    }

    fn set_loop(&mut self, start: f64, end: f64) -> bool {
        if !start.is_finite() || !end.is_finite() {
            warn!(start, end, "rejected loop region with non-finite bounds");
            return false;
        }

        let length = self.length();
        let start = start.max(0.0).min(length);
        let end = end.max(0.0).min(length);
        if start >= end {
            warn!(start, end, "rejected empty loop region");
            return false;
        }

        self.loop_start = start;
        self.loop_end = end;
        true
    }

    fn close(self: Box<Self>) {
        // Dropping the decoder closes the stream.
        drop(self.decoder);
    }
}

/// Parameters of a streaming session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamConfig {
    /// The number of fragments in circulation.
    pub buffer_count: usize,

    /// The number of frames in one fragment.
    pub frames_per_buffer: usize,

    /// The play mode the session starts in.
    pub play_mode: PlayMode,
}

impl Default for StreamConfig {
    fn default() -> StreamConfig {
        StreamConfig {
            buffer_count: 4,
            frames_per_buffer: 1024,
            play_mode: PlayMode::Once,
        }
    }
}

impl StreamConfig {
    /// Sets the number of fragments in circulation.
    pub fn with_buffer_count(mut self, buffer_count: usize) -> StreamConfig {
        self.buffer_count = buffer_count;
        self
    }

    /// Sets the number of frames in one fragment.
    pub fn with_frames_per_buffer(mut self, frames_per_buffer: usize) -> StreamConfig {
        self.frames_per_buffer = frames_per_buffer;
        self
    }

    /// Sets the initial play mode.
    pub fn with_play_mode(mut self, play_mode: PlayMode) -> StreamConfig {
        self.play_mode = play_mode;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.buffer_count == 0 {
            return Err(Error::InvalidConfig("buffer count is 0"));
        }
        if self.frames_per_buffer == 0 {
            return Err(Error::InvalidConfig("frames per buffer is 0"));
        }
        Ok(())
    }
}

/// What the feeder thread delivers to the consumer.
#[derive(Debug, PartialEq)]
pub enum StreamEvent {
    /// A full fragment of audio. Any part the feeder could not fill is
    /// silence. Pass it back through `AudioStream::recycle` once played.
    Fragment(Vec<u8>),
    /// The stream ran out of data in `PlayMode::Once`.
    Finished,
}

enum Command {
    Refill(Vec<u8>),
    Seek(f64, mpsc::Sender<bool>),
    Rewind(mpsc::Sender<bool>),
    SetLoop(f64, f64, mpsc::Sender<bool>),
    SetPlayMode(PlayMode),
    Quit,
}

fn publish(snapshot: &AtomicU64, position: f64) {
    snapshot.store(position.to_bits(), Ordering::Release);
}

/// State owned by the feeder thread.
struct FeedLoop {
    feeder: Box<dyn StreamFeeder>,
    mode: PlayMode,
    /// Set when a `Once` stream ran dry. Refills are parked until a seek or
    /// rewind succeeds.
    drained: bool,
    parked: Vec<Vec<u8>>,
    events: mpsc::Sender<StreamEvent>,
    position: Arc<AtomicU64>,
}

impl FeedLoop {
    fn run(mut self, commands: mpsc::Receiver<Command>, state: Arc<AtomicU8>) {
        state.store(StreamState::Running as u8, Ordering::Release);
        debug!("feeder thread started");

        // A closed channel means the session was dropped without a quit.
        while let Ok(command) = commands.recv() {
            match command {
                Command::Refill(buf) => self.refill(buf),
                Command::Seek(time, reply) => {
                    let ok = self.feeder.seek(time);
                    self.reply_and_resume(ok, reply);
                }
                Command::Rewind(reply) => {
                    let ok = self.feeder.rewind();
                    self.reply_and_resume(ok, reply);
                }
                Command::SetLoop(start, end, reply) => {
                    let ok = self.feeder.set_loop(start, end);
                    let _ = reply.send(ok);
                }
                Command::SetPlayMode(mode) => {
                    self.mode = mode;
                    // A drained stream that starts looping continues from the
                    // loop start.
                    if mode == PlayMode::Loop && self.drained && self.feeder.rewind() {
                        self.resume();
                    }
                }
                Command::Quit => break,
            }
            publish(&self.position, self.feeder.position());
        }

        self.feeder.close();
        state.store(StreamState::Closed as u8, Ordering::Release);
        debug!("feeder thread stopped");
    }

    /// Answers a seek or rewind, then refills whatever was parked while the
    /// stream was drained.
    fn reply_and_resume(&mut self, ok: bool, reply: mpsc::Sender<bool>) {
        // The position must be visible before the caller sees the answer.
        publish(&self.position, self.feeder.position());
        let _ = reply.send(ok);
        if ok {
            self.resume();
        }
    }

    fn resume(&mut self) {
        if self.drained {
            self.drained = false;
            for buf in mem::take(&mut self.parked) {
                self.refill(buf);
            }
        }
    }

    fn refill(&mut self, mut buf: Vec<u8>) {
        if self.drained {
            self.parked.push(buf);
            return;
        }

        let len = buf.len();
        let mut filled = self.feeder.update(&mut buf[..], self.mode);

        // The loop end may fall inside the fragment. Continue from the loop
        // start, repeatedly if the loop region is shorter than a fragment.
        if self.mode == PlayMode::Loop {
            while filled < len {
                if !self.feeder.rewind() {
                    break;
                }
                let n = self.feeder.update(&mut buf[filled..], self.mode);
                if n == 0 {
                    break;
                }
                filled += n;
            }
        }

        let silence = self.feeder.silence();
        for x in &mut buf[filled..] {
            *x = silence;
        }
        trace!(filled, len, "refilled fragment");

        let _ = self.events.send(StreamEvent::Fragment(buf));
        if filled < len && self.mode == PlayMode::Once {
            self.drained = true;
            let _ = self.events.send(StreamEvent::Finished);
        }
    }
}

/// A streaming session: a feeder driven by a background thread.
///
/// The session starts with `buffer_count` fragments queued for filling. The
/// consumer takes filled fragments with `next_event`, plays them, and hands
/// them back with `recycle`, which queues them for the next refill.
///
/// Exactly `buffer_count` fragments circulate: `recycle` only takes back as
/// many fragments as `next_event` handed out.
///
/// Dropping the session (or calling `close`) stops the feeder thread, waits
/// for it to exit, and closes the feeder.
pub struct AudioStream {
    spec: WavSpec,
    length: f64,
    fragment_len: usize,
    silence: u8,
    /// Fragments handed to the consumer and not yet recycled.
    held: Cell<usize>,
    commands: mpsc::SyncSender<Command>,
    events: mpsc::Receiver<StreamEvent>,
    position: Arc<AtomicU64>,
    state: Arc<AtomicU8>,
    thread: Option<thread::JoinHandle<()>>,
}

impl AudioStream {
    /// Starts a streaming session for `feeder`.
    pub fn new(mut feeder: Box<dyn StreamFeeder>, config: StreamConfig) -> Result<AudioStream> {
        config.validate()?;

        let spec = feeder.spec();
        let length = feeder.length();
        let silence = feeder.silence();
        let fragment_len = config.frames_per_buffer
            .checked_mul(spec.bytes_per_frame())
            .ok_or(Error::InvalidConfig("fragment size overflows"))?;

        let position = Arc::new(AtomicU64::new(0));
        publish(&position, feeder.position());
        let state = Arc::new(AtomicU8::new(StreamState::Idle as u8));

        // Every fragment is either queued for a refill, waiting in the event
        // channel, or held by the consumer. Two more slots leave room for a
        // control request and the final quit.
        let (command_tx, command_rx) = mpsc::sync_channel(config.buffer_count.saturating_add(2));
        let (event_tx, event_rx) = mpsc::channel();

        // The feeder is handed over once the thread exists, so that it can
        // still be closed here if spawning fails.
        let (feeder_tx, feeder_rx) = mpsc::channel::<Box<dyn StreamFeeder>>();
        let mode = config.play_mode;
        let thread_position = position.clone();
        let thread_state = state.clone();
        let spawned = thread::Builder::new()
            .name("wavfeed-feeder".to_string())
            .spawn(move || {
                if let Ok(feeder) = feeder_rx.recv() {
                    let feed_loop = FeedLoop {
                        feeder: feeder,
                        mode: mode,
                        drained: false,
                        parked: Vec::new(),
                        events: event_tx,
                        position: thread_position,
                    };
                    feed_loop.run(command_rx, thread_state);
                }
            });
        let thread = match spawned {
            Ok(thread) => thread,
            Err(err) => {
                warn!(error = %err, "failed to spawn feeder thread");
                feeder.close();
                return Err(Error::IoError(err));
            }
        };
        if let Err(mpsc::SendError(feeder)) = feeder_tx.send(feeder) {
            feeder.close();
        }

        let stream = AudioStream {
            spec: spec,
            length: length,
            fragment_len: fragment_len,
            silence: silence,
            held: Cell::new(0),
            commands: command_tx,
            events: event_rx,
            position: position,
            state: state,
            thread: Some(thread),
        };

        for _ in 0..config.buffer_count {
            let _ = stream.commands.send(Command::Refill(vec![silence; fragment_len]));
        }

        debug!(
            buffer_count = config.buffer_count,
            fragment_len,
            length,
            "started audio stream"
        );
        Ok(stream)
    }

    /// Returns the format of the fragments.
    pub fn spec(&self) -> WavSpec {
        self.spec
    }

    /// Returns the size of one fragment in bytes.
    pub fn fragment_len(&self) -> usize {
        self.fragment_len
    }

    /// Returns the lifecycle state of the session.
    pub fn state(&self) -> StreamState {
        StreamState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Blocks until the feeder thread delivers the next event.
    ///
    /// Returns `None` once the feeder thread has exited.
    pub fn next_event(&self) -> Option<StreamEvent> {
        self.events.recv().ok().map(|event| self.hand_out(event))
    }

    /// Returns the next event if one is ready.
    pub fn try_next_event(&self) -> Option<StreamEvent> {
        self.events.try_recv().ok().map(|event| self.hand_out(event))
    }

    fn hand_out(&self, event: StreamEvent) -> StreamEvent {
        if let StreamEvent::Fragment(..) = event {
            self.held.set(self.held.get() + 1);
        }
        event
    }

    /// Hands a played fragment back for refilling.
    ///
    /// The buffer is resized to the fragment length. Returns false, dropping
    /// the buffer, if no fragment is outstanding or the feeder thread is
    /// gone.
    pub fn recycle(&self, mut fragment: Vec<u8>) -> bool {
        let held = self.held.get();
        if held == 0 {
            warn!("recycled more fragments than were handed out");
            return false;
        }
        fragment.resize(self.fragment_len, self.silence);
        if self.commands.send(Command::Refill(fragment)).is_err() {
            return false;
        }
        self.held.set(held - 1);
        true
    }

    fn request<F>(&self, make: F) -> bool
        where F: FnOnce(mpsc::Sender<bool>) -> Command
    {
        let (reply_tx, reply_rx) = mpsc::channel();
        if self.commands.send(make(reply_tx)).is_err() {
            return false;
        }
        reply_rx.recv().unwrap_or(false)
    }

    /// Moves playback to `time` seconds.
    ///
    /// Fails, without moving, if `time` is negative or at or beyond the end
    /// of the loop region. Fragments that are already filled are not
    /// affected.
    pub fn seek(&self, time: f64) -> bool {
        self.request(|reply| Command::Seek(time, reply))
    }

    /// Moves playback to the start of the loop region.
    pub fn rewind(&self) -> bool {
        self.request(Command::Rewind)
    }

    /// Replaces the loop region.
    ///
    /// Both bounds are clamped to `[0, length]`; the region is rejected if
    /// the clamped start is not before the clamped end.
    pub fn set_loop(&self, start: f64, end: f64) -> bool {
        self.request(|reply| Command::SetLoop(start, end, reply))
    }

    /// Changes the play mode for subsequent refills.
    pub fn set_play_mode(&self, mode: PlayMode) -> bool {
        self.commands.send(Command::SetPlayMode(mode)).is_ok()
    }

    /// Returns the feeder position in seconds.
    ///
    /// This is the position of the next refill, which runs ahead of what is
    /// audible by the fragments in flight.
    pub fn position(&self) -> f64 {
        f64::from_bits(self.position.load(Ordering::Acquire))
    }

    /// Returns the total duration in seconds.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Stops the feeder thread and closes the feeder.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.state.store(StreamState::Stopping as u8, Ordering::Release);
            let _ = self.commands.send(Command::Quit);
            if thread.join().is_err() {
                warn!("feeder thread panicked");
            }
            self.state.store(StreamState::Closed as u8, Ordering::Release);
        }
    }
}

impl Drop for AudioStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Opens a wav file and starts streaming it.
pub fn load_wav_audio_stream<P: AsRef<path::Path>>(filename: P, config: StreamConfig)
                                                   -> Result<AudioStream> {
    config.validate()?;
    let decoder = WavDecoder::<io::BufReader<fs::File>>::open(filename)?;
    AudioStream::new(Box::new(WavFeeder::new(decoder)), config)
}

#[cfg(test)]
fn feeder_for(channels: u16, rate: u32, bits: u16, frames: usize) -> WavFeeder<io::Cursor<Vec<u8>>> {
    use crate::{encode, SampleBuffer, SampleData};
    let n = frames * channels as usize;
    let data = match bits {
        8 => SampleData::UInt8((0..n).map(|i| i as u8).collect()),
        _ => SampleData::Int16((0..n).map(|i| i as i16).collect()),
    };
    let bytes = encode(&SampleBuffer::new(channels, rate, data)).unwrap();
    WavFeeder::new(WavDecoder::new(io::Cursor::new(bytes)).unwrap())
}

#[test]
fn loop_region_starts_as_whole_file() {
    let feeder = feeder_for(1, 8000, 8, 4000);
    assert_eq!(feeder.loop_region(), (0.0, 0.5));
    assert_eq!(feeder.length(), 0.5);
}

#[test]
fn seek_rounds_down_to_whole_frames() {
    let mut feeder = feeder_for(2, 8000, 16, 8000);
    assert!(feeder.seek(0.25));
    assert_eq!(feeder.position(), 0.25);
    assert!(feeder.seek(0.2501));
    assert_eq!(feeder.position(), 0.25);
    assert_eq!(feeder.decoder.byte_position().unwrap(), 8000);
}

#[test]
fn seek_at_or_beyond_loop_end_is_rejected() {
    let mut feeder = feeder_for(1, 8000, 8, 8000);
    assert!(feeder.seek(0.5));
    assert!(!feeder.seek(1.0));
    assert!(!feeder.seek(2.0));
    assert!(!feeder.seek(-0.5));
    assert_eq!(feeder.position(), 0.5);

    assert!(feeder.set_loop(0.0, 0.75));
    assert!(!feeder.seek(0.75));
    assert_eq!(feeder.position(), 0.5);
}

#[test]
fn set_loop_clamps_and_rejects_empty_regions() {
    let mut feeder = feeder_for(1, 8000, 8, 8000);
    assert!(feeder.set_loop(-1.0, 5.0));
    assert_eq!(feeder.loop_region(), (0.0, 1.0));

    assert!(!feeder.set_loop(0.5, 0.5));
    assert!(!feeder.set_loop(0.75, 0.25));
    assert!(!feeder.set_loop(2.0, 3.0));
    assert!(!feeder.set_loop(0.0, f64::NAN));
    assert_eq!(feeder.loop_region(), (0.0, 1.0));

    assert!(feeder.set_loop(0.25, 0.5));
    assert!(feeder.rewind());
    assert_eq!(feeder.position(), 0.25);
}

#[test]
fn update_stops_at_loop_end() {
    let mut feeder = feeder_for(1, 1024, 8, 2048);
    // Frames 128 up to 136.
    assert!(feeder.set_loop(0.125, 0.1328125));
    assert!(feeder.rewind());

    let mut buf = [0u8; 32];
    assert_eq!(feeder.update(&mut buf, PlayMode::Loop), 8);
    assert_eq!(&buf[..8], &[128, 129, 130, 131, 132, 133, 134, 135]);
    assert_eq!(feeder.update(&mut buf, PlayMode::Loop), 0);

    // Without looping the region end does not matter.
    assert_eq!(feeder.update(&mut buf, PlayMode::Once), 32);
    assert_eq!(buf[0], 136);
}

#[test]
fn update_reports_bytes_of_whole_frames() {
    let mut feeder = feeder_for(2, 8000, 16, 3);
    let mut buf = [0u8; 64];
    assert_eq!(feeder.update(&mut buf, PlayMode::Once), 12);
    assert_eq!(feeder.update(&mut buf, PlayMode::Once), 0);
}

#[test]
fn config_rejects_zero_sizes() {
    assert!(StreamConfig::default().validate().is_ok());
    assert!(StreamConfig::default().with_buffer_count(0).validate().is_err());
    assert!(StreamConfig::default().with_frames_per_buffer(0).validate().is_err());
}

#[test]
fn recycle_takes_back_only_fragments_handed_out() {
    let feeder = feeder_for(1, 8000, 8, 8000);
    let config = StreamConfig::default().with_buffer_count(2).with_frames_per_buffer(16);
    let stream = AudioStream::new(Box::new(feeder), config).unwrap();

    assert!(!stream.recycle(vec![0; 16]));

    let fragment = match stream.next_event() {
        Some(StreamEvent::Fragment(fragment)) => fragment,
        other => panic!("expected a fragment, got {:?}", other),
    };
    assert!(stream.recycle(fragment));
    assert!(!stream.recycle(vec![0; 16]));
}

#[cfg(test)]
struct PanickingFeeder;

#[cfg(test)]
impl StreamFeeder for PanickingFeeder {
    fn spec(&self) -> WavSpec {
        WavSpec::HEADERLESS
    }

    fn update(&mut self, _buf: &mut [u8], _mode: PlayMode) -> usize {
        panic!("feeder failure");
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
        0.0
    }

    fn set_loop(&mut self, _start: f64, _end: f64) -> bool {
        false
    }

    fn close(self: Box<Self>) {}
}

#[test]
fn panicked_feeder_thread_still_ends_closed() {
    let config = StreamConfig::default().with_buffer_count(1);
    let mut stream = AudioStream::new(Box::new(PanickingFeeder), config).unwrap();

    // The thread dies on the first refill and takes the event channel along.
    assert_eq!(stream.next_event(), None);
    assert!(!stream.seek(0.0));

    stream.shutdown();
    assert_eq!(stream.state(), StreamState::Closed);
}
