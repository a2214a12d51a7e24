// Wavfeed -- A wav decoding, encoding and streaming library in Rust
// Copyright (C) 2015 Ruud van Asseldonk
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

#![no_main]

use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use wavfeed::{PlayMode, StreamFeeder, WavDecoder, WavFeeder};

fuzz_target!(|data: &[u8]| {
    // Decoding must never panic, and must not allocate based on what the
    // header claims.
    if let Ok(buffer) = wavfeed::load_from(Cursor::new(data)) {
        assert_eq!(buffer.data.len(), buffer.frames * buffer.channels as usize);
    }

    let decoder = match WavDecoder::new(Cursor::new(data)) {
        Ok(d) => d,
        Err(..) => return,
    };

    // Drive the feeder through a few fragments in both modes, with a seek in
    // between. Loop mode must terminate even for degenerate loop regions.
    let mut feeder = WavFeeder::new(decoder);
    let mut buf = [0u8; 256];
    for _ in 0..4 {
        let n = feeder.update(&mut buf, PlayMode::Once);
        assert!(n <= buf.len());
    }
    let length = feeder.length();
    feeder.seek(length / 2.0);
    for _ in 0..4 {
        let n = feeder.update(&mut buf, PlayMode::Loop);
        assert!(n <= buf.len());
    }
});
