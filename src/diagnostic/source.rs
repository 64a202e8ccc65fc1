//! Line sources feeding the diagnostic parser

#[cfg(any(feature = "serial", test))]
use chrono::Local;
use std::io::{self, BufRead};
#[cfg(any(feature = "serial", test))]
use std::io::Write;
use std::time::Instant;

/// A blocking source of text lines.
///
/// `read_line` waits for the next line but gives up once `deadline` has
/// passed. `Ok(None)` means no line arrived in time or the source is
/// exhausted. Returned lines may still carry their terminator.
pub trait LineSource {
    fn read_line(&mut self, deadline: Instant) -> io::Result<Option<String>>;
}

impl<S: LineSource + ?Sized> LineSource for &mut S {
    fn read_line(&mut self, deadline: Instant) -> io::Result<Option<String>> {
        (**self).read_line(deadline)
    }
}

/// Lines from any buffered reader (captured logs, stdin).
///
/// Reads never block on the deadline; the end of the input is reported as
/// `Ok(None)`.
pub struct ReaderSource<R> {
    reader: R,
}

impl<R: BufRead> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for ReaderSource<R> {
    fn read_line(&mut self, _deadline: Instant) -> io::Result<Option<String>> {
        let mut buffer = Vec::new();
        if self.reader.read_until(b'\n', &mut buffer)? == 0 {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&buffer).into_owned()))
    }
}

/// Copies every line handed to the parser into a capture file
#[cfg(any(feature = "serial", test))]
pub struct CaptureSource<S, W: Write> {
    inner: S,
    writer: W,
}

#[cfg(any(feature = "serial", test))]
impl<S: LineSource, W: Write> CaptureSource<S, W> {
    /// Wrap `inner`, writing a timestamped header to `writer` first
    pub fn new(inner: S, mut writer: W, origin: &str) -> io::Result<Self> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        writeln!(writer, "# bgeigie-qc capture {} from {}", timestamp, origin)?;
        writer.flush()?;
        Ok(Self { inner, writer })
    }
}

#[cfg(any(feature = "serial", test))]
impl<S: LineSource, W: Write> LineSource for CaptureSource<S, W> {
    fn read_line(&mut self, deadline: Instant) -> io::Result<Option<String>> {
        let line = self.inner.read_line(deadline)?;
        if let Some(ref line) = line {
            writeln!(self.writer, "{}", line.trim_end_matches(['\r', '\n']))?;
            self.writer.flush()?;
        }
        Ok(line)
    }
}
