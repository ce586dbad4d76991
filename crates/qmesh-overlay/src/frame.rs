// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

//! Length-prefixed JSON framing: every message on the wire is a 4-byte
//! big-endian length followed by that many bytes of UTF-8 JSON.

use crate::error::Error;

/// Default maximum frame size: 10 MiB.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 10 * 1024 * 1024;

pub fn encode(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + body.len());
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(body);
    out
}

/// Per-connection accumulator that turns a stream of inbound byte chunks
/// into complete frames. Never assumes one read yields one frame: a single
/// `push` can both complete a pending frame and contain the start (or all)
/// of the next one.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    max_frame_bytes: usize,
}

impl FrameDecoder {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_frame_bytes,
        }
    }

    /// Feed newly-read bytes in and drain as many complete frames as are
    /// now available, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Vec<u8>>, Error> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        loop {
            if self.buffer.len() < 4 {
                break;
            }

            let mut len_bytes = [0u8; 4];
            len_bytes.copy_from_slice(&self.buffer[0..4]);
            let len = u32::from_be_bytes(len_bytes) as usize;

            if len > self.max_frame_bytes {
                return Err(Error::FrameTooLarge(len, self.max_frame_bytes));
            }

            if self.buffer.len() < 4 + len {
                break;
            }

            let body = self.buffer[4..4 + len].to_vec();
            self.buffer.drain(0..4 + len);
            frames.push(body);
        }

        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_single_frame() {
        let encoded = encode(b"hello");
        let mut decoder = FrameDecoder::new(DEFAULT_MAX_FRAME_BYTES);
        let frames = decoder.push(&encoded).unwrap();
        assert_eq!(frames, vec![b"hello".to_vec()]);
    }

    #[test]
    fn splits_multiple_frames_from_one_read() {
        let mut encoded = encode(b"one");
        encoded.extend(encode(b"two"));
        let mut decoder = FrameDecoder::new(DEFAULT_MAX_FRAME_BYTES);
        let frames = decoder.push(&encoded).unwrap();
        assert_eq!(frames, vec![b"one".to_vec(), b"two".to_vec()]);
    }

    #[test]
    fn reassembles_a_frame_split_across_reads() {
        let encoded = encode(b"hello world");
        let mut decoder = FrameDecoder::new(DEFAULT_MAX_FRAME_BYTES);

        assert!(decoder.push(&encoded[0..6]).unwrap().is_empty());
        let frames = decoder.push(&encoded[6..]).unwrap();
        assert_eq!(frames, vec![b"hello world".to_vec()]);
    }

    #[test]
    fn rejects_frames_over_the_limit() {
        let mut decoder = FrameDecoder::new(4);
        let encoded = encode(b"hello");
        assert!(matches!(
            decoder.push(&encoded),
            Err(Error::FrameTooLarge(5, 4))
        ));
    }
}
