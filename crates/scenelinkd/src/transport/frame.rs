//! Newline-delimited framing over a byte stream.
//!
//! TCP delivers bytes, not messages: one request may arrive across several
//! reads and one read may carry several requests. [`FrameReader`] keeps the
//! unread tail of the stream in a buffer, so pipelined requests are served
//! in order and a request split across reads is reassembled before decoding.

use std::io::{self, Read};
use std::mem;
use std::net::TcpStream;
use std::time::{Duration, Instant};

use thiserror::Error;

const CHUNK_BYTES: usize = 8 * 1024;

/// Byte source whose blocking reads can be bounded in time.
pub trait FrameSource: Read {
    /// Bounds the next blocking read; `None` blocks indefinitely.
    ///
    /// # Errors
    ///
    /// Returns the platform error when the timeout cannot be applied.
    fn set_read_deadline(&mut self, timeout: Option<Duration>) -> io::Result<()>;
}

impl FrameSource for TcpStream {
    fn set_read_deadline(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.set_read_timeout(timeout)
    }
}

/// Failures that end a connection's read loop.
#[derive(Debug, Error)]
pub enum FrameError {
    /// A frame exceeded the configured size limit.
    #[error("Request exceeds the maximum message size of {limit} bytes")]
    TooLarge {
        /// Limit in bytes, excluding the delimiter.
        limit: usize,
    },
    /// No complete frame arrived within the idle timeout.
    #[error("no complete message within {}s", timeout.as_secs())]
    IdleTimeout {
        /// Configured idle budget.
        timeout: Duration,
    },
    /// Reading from the stream failed.
    #[error("failed to read from connection: {0}")]
    Io(#[from] io::Error),
}

/// Splits a byte stream into `\n`-terminated frames.
#[derive(Debug)]
pub struct FrameReader<S> {
    source: S,
    buffer: Vec<u8>,
    limit: usize,
    idle_timeout: Duration,
    eof: bool,
}

impl<S: FrameSource> FrameReader<S> {
    /// Wraps `source` with a frame size limit and a per-frame idle budget.
    pub const fn new(source: S, limit: usize, idle_timeout: Duration) -> Self {
        Self {
            source,
            buffer: Vec::new(),
            limit,
            idle_timeout,
            eof: false,
        }
    }

    /// Returns the next non-blank frame without its line terminator.
    ///
    /// Returns `Ok(None)` once the peer has closed the stream and nothing
    /// but whitespace remains. A trailing frame without a newline is still
    /// returned at end of stream.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::TooLarge`] when a frame exceeds the limit,
    /// [`FrameError::IdleTimeout`] when no complete frame arrives in time,
    /// and [`FrameError::Io`] for read failures.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        let deadline = Instant::now() + self.idle_timeout;
        loop {
            if let Some(frame) = self.take_line()? {
                return Ok(Some(frame));
            }
            if content_len(&self.buffer) > self.limit {
                return Err(FrameError::TooLarge { limit: self.limit });
            }
            if self.eof {
                let rest = mem::take(&mut self.buffer);
                return Ok((!is_blank(&rest)).then_some(rest));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(FrameError::IdleTimeout {
                    timeout: self.idle_timeout,
                });
            }
            self.fill(remaining)?;
        }
    }

    fn fill(&mut self, remaining: Duration) -> Result<(), FrameError> {
        self.source.set_read_deadline(Some(remaining))?;
        let mut chunk = [0_u8; CHUNK_BYTES];
        match self.source.read(&mut chunk) {
            Ok(0) => self.eof = true,
            Ok(read) => self
                .buffer
                .extend_from_slice(chunk.get(..read).unwrap_or_default()),
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) => {}
            Err(error) => return Err(FrameError::Io(error)),
        }
        Ok(())
    }

    fn take_line(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.len() > self.limit {
                return Err(FrameError::TooLarge { limit: self.limit });
            }
            if !is_blank(&line) {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }
}

/// Length of buffered content, not counting a carriage return that may be
/// the first half of a CRLF terminator.
fn content_len(bytes: &[u8]) -> usize {
    match bytes.split_last() {
        Some((b'\r', rest)) => rest.len(),
        _ => bytes.len(),
    }
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use rstest::rstest;

    use super::*;

    /// Source that replays scripted read results, then reports end of stream.
    struct Scripted {
        reads: VecDeque<io::Result<Vec<u8>>>,
        stall: bool,
    }

    impl Scripted {
        fn new(chunks: &[&[u8]]) -> Self {
            Self {
                reads: chunks.iter().map(|chunk| Ok(chunk.to_vec())).collect(),
                stall: false,
            }
        }

        fn stalling() -> Self {
            Self {
                reads: VecDeque::new(),
                stall: true,
            }
        }
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                Some(Ok(bytes)) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Some(Err(error)) => Err(error),
                None if self.stall => {
                    std::thread::sleep(Duration::from_millis(5));
                    Err(io::Error::from(io::ErrorKind::WouldBlock))
                }
                None => Ok(0),
            }
        }
    }

    impl FrameSource for Scripted {
        fn set_read_deadline(&mut self, _timeout: Option<Duration>) -> io::Result<()> {
            Ok(())
        }
    }

    fn reader(source: Scripted, limit: usize) -> FrameReader<Scripted> {
        FrameReader::new(source, limit, Duration::from_secs(5))
    }

    fn frames(mut reader: FrameReader<Scripted>) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(frame) = reader.next_frame().expect("frame") {
            out.push(String::from_utf8(frame).expect("utf8"));
        }
        out
    }

    #[rstest]
    fn reassembles_frames_split_across_reads() {
        let source = Scripted::new(&[b"{\"type\":", b"\"get_scene", b"_info\"}\n"]);
        assert_eq!(frames(reader(source, 1024)), vec![r#"{"type":"get_scene_info"}"#]);
    }

    #[rstest]
    fn splits_pipelined_frames_in_order() {
        let source = Scripted::new(&[b"{\"a\":1}\n{\"b\":2}\n{\"c\"", b":3}\n"]);
        assert_eq!(
            frames(reader(source, 1024)),
            vec![r#"{"a":1}"#, r#"{"b":2}"#, r#"{"c":3}"#]
        );
    }

    #[rstest]
    fn skips_blank_lines_and_strips_carriage_returns() {
        let source = Scripted::new(&[b"\n  \r\n{\"a\":1}\r\n\n"]);
        assert_eq!(frames(reader(source, 1024)), vec![r#"{"a":1}"#]);
    }

    #[rstest]
    fn returns_unterminated_tail_at_end_of_stream() {
        let source = Scripted::new(&[b"{\"a\":1}\n{\"b\":2}"]);
        assert_eq!(frames(reader(source, 1024)), vec![r#"{"a":1}"#, r#"{"b":2}"#]);
    }

    #[rstest]
    fn rejects_oversized_frame_without_newline() {
        let source = Scripted::new(&[b"0123456789abcdef"]);
        let error = reader(source, 8).next_frame().expect_err("too large");
        assert!(matches!(error, FrameError::TooLarge { limit: 8 }));
    }

    #[rstest]
    fn rejects_oversized_frame_with_newline() {
        let source = Scripted::new(&[b"0123456789\n{}\n"]);
        let error = reader(source, 8).next_frame().expect_err("too large");
        assert!(matches!(error, FrameError::TooLarge { .. }));
    }

    #[rstest]
    fn frame_at_exact_limit_is_accepted() {
        let source = Scripted::new(&[b"12345678\n"]);
        assert_eq!(frames(reader(source, 8)), vec!["12345678"]);
    }

    #[rstest]
    #[case::single_read(&[b"12345678\r\n".as_slice()])]
    #[case::split_terminator(&[b"12345678\r".as_slice(), b"\n".as_slice()])]
    fn crlf_frame_at_exact_limit_is_accepted(#[case] chunks: &[&[u8]]) {
        let source = Scripted::new(chunks);
        assert_eq!(frames(reader(source, 8)), vec!["12345678"]);
    }

    #[rstest]
    fn idle_peer_times_out() {
        let mut reader = FrameReader::new(Scripted::stalling(), 64, Duration::from_millis(30));
        let error = reader.next_frame().expect_err("idle");
        assert!(matches!(error, FrameError::IdleTimeout { .. }));
    }

    #[rstest]
    fn read_errors_are_reported() {
        let mut source = Scripted::new(&[]);
        source
            .reads
            .push_back(Err(io::Error::from(io::ErrorKind::ConnectionReset)));
        let error = reader(source, 64).next_frame().expect_err("io");
        assert!(matches!(error, FrameError::Io(_)));
    }
}
