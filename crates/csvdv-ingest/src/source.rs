//! Line sources: decoded text lines, one input file at a time.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

use encoding_rs::{CoderResult, Decoder, Encoding};

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Supplies decoded lines to the tokenizer.
pub trait LineSource {
    /// Moves to the next input. Returns `false` once every input is consumed.
    fn next_file(&mut self) -> io::Result<bool>;

    /// Next line of the current input without its terminator, `None` at end of input.
    fn poll_line(&mut self) -> io::Result<Option<String>>;
}

impl<L: LineSource + ?Sized> LineSource for &mut L {
    fn next_file(&mut self) -> io::Result<bool> {
        (**self).next_file()
    }

    fn poll_line(&mut self) -> io::Result<Option<String>> {
        (**self).poll_line()
    }
}

impl<L: LineSource + ?Sized> LineSource for Box<L> {
    fn next_file(&mut self) -> io::Result<bool> {
        (**self).next_file()
    }

    fn poll_line(&mut self) -> io::Result<Option<String>> {
        (**self).poll_line()
    }
}

/// Finds the first line terminator (`\r\n`, `\n` or `\r`) in `text`.
///
/// Returns `(line_end, next_line_start)`. A trailing `\r` is only a
/// terminator when `at_end` is set, since a `\n` may still follow.
fn find_terminator(text: &str, at_end: bool) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let idx = bytes.iter().position(|&b| b == b'\n' || b == b'\r')?;
    if bytes[idx] == b'\n' {
        return Some((idx, idx + 1));
    }
    match bytes.get(idx + 1) {
        Some(b'\n') => Some((idx, idx + 2)),
        Some(_) => Some((idx, idx + 1)),
        None if at_end => Some((idx, idx + 1)),
        None => None,
    }
}

/// Splits text into lines on `\r\n`, `\n` and `\r`. A final terminator does
/// not produce an empty trailing line.
pub fn split_lines(text: &str) -> Vec<String> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = Vec::new();
    let mut rest = text;
    while let Some((end, next)) = find_terminator(rest, true) {
        lines.push(rest[..end].to_string());
        rest = &rest[next..];
    }
    if !rest.is_empty() {
        lines.push(rest.to_string());
    }
    lines
}

/// In-memory inputs, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryLineSource {
    files: VecDeque<VecDeque<String>>,
    current: Option<VecDeque<String>>,
}

impl MemoryLineSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// One input per text, split with [`split_lines`].
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut source = Self::new();
        for text in texts {
            source.push_text(text.as_ref());
        }
        source
    }

    pub fn push_text(&mut self, text: &str) {
        self.files.push_back(split_lines(text).into());
    }
}

impl LineSource for MemoryLineSource {
    fn next_file(&mut self) -> io::Result<bool> {
        self.current = self.files.pop_front();
        Ok(self.current.is_some())
    }

    fn poll_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.current.as_mut().and_then(VecDeque::pop_front))
    }
}

/// An input handed to [`DecodingLineSource`].
pub enum Input {
    Path(PathBuf),
    Reader(Box<dyn Read + Send>),
}

impl std::fmt::Debug for Input {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Input::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Input::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

struct DecodedStream {
    reader: Box<dyn Read + Send>,
    decoder: Decoder,
    pending: String,
    lines: VecDeque<String>,
    eof: bool,
}

impl DecodedStream {
    fn new(reader: Box<dyn Read + Send>, encoding: &'static Encoding) -> Self {
        Self {
            reader,
            // BOM sniffing: a BOM overrides the configured charset and is removed.
            decoder: encoding.new_decoder(),
            pending: String::new(),
            lines: VecDeque::new(),
            eof: false,
        }
    }

    fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        while self.lines.is_empty() && !self.eof {
            let read = self.reader.read(&mut chunk)?;
            let last = read == 0;
            self.decode(&chunk[..read], last);
            self.split_pending(last);
            self.eof = last;
        }
        Ok(self.lines.pop_front())
    }

    fn decode(&mut self, mut input: &[u8], last: bool) {
        loop {
            if let Some(needed) = self.decoder.max_utf8_buffer_length(input.len()) {
                self.pending.reserve(needed);
            }
            let (result, consumed, _had_errors) =
                self.decoder.decode_to_string(input, &mut self.pending, last);
            input = &input[consumed..];
            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => continue,
            }
        }
    }

    fn split_pending(&mut self, last: bool) {
        let mut start = 0;
        while let Some((end, next)) = find_terminator(&self.pending[start..], last) {
            self.lines
                .push_back(self.pending[start..start + end].to_string());
            start += next;
        }
        self.pending.drain(..start);
        if last && !self.pending.is_empty() {
            self.lines.push_back(std::mem::take(&mut self.pending));
        }
    }
}

/// Reads files or readers, decoding them with a configured charset.
pub struct DecodingLineSource {
    inputs: VecDeque<Input>,
    encoding: &'static Encoding,
    current: Option<DecodedStream>,
}

impl DecodingLineSource {
    pub fn new(inputs: Vec<Input>, encoding: &'static Encoding) -> Self {
        Self {
            inputs: inputs.into(),
            encoding,
            current: None,
        }
    }

    pub fn from_paths<I, P>(paths: I, encoding: &'static Encoding) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::new(
            paths.into_iter().map(|p| Input::Path(p.into())).collect(),
            encoding,
        )
    }
}

impl LineSource for DecodingLineSource {
    fn next_file(&mut self) -> io::Result<bool> {
        self.current = None;
        let Some(input) = self.inputs.pop_front() else {
            return Ok(false);
        };
        let reader: Box<dyn Read + Send> = match input {
            Input::Path(path) => {
                tracing::debug!(path = %path.display(), "opening input");
                Box::new(File::open(&path).map_err(|e| {
                    io::Error::new(e.kind(), format!("{}: {e}", path.display()))
                })?)
            }
            Input::Reader(reader) => reader,
        };
        self.current = Some(DecodedStream::new(reader, self.encoding));
        Ok(true)
    }

    fn poll_line(&mut self) -> io::Result<Option<String>> {
        match self.current.as_mut() {
            Some(stream) => stream.next_line(),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn drain(source: &mut impl LineSource) -> Vec<Vec<String>> {
        let mut files = Vec::new();
        while source.next_file().unwrap() {
            let mut lines = Vec::new();
            while let Some(line) = source.poll_line().unwrap() {
                lines.push(line);
            }
            files.push(lines);
        }
        files
    }

    #[test]
    fn test_split_lines_mixed_terminators() {
        assert_eq!(split_lines("a\r\nb\nc\rd"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_lines("a\n\nb\n"), vec!["a", "", "b"]);
        assert_eq!(split_lines("\u{feff}x\r"), vec!["x"]);
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn test_memory_source_files() {
        let mut source = MemoryLineSource::from_texts(["a\nb\n", "c"]);
        assert_eq!(drain(&mut source), vec![vec!["a", "b"], vec!["c"]]);
    }

    #[test]
    fn test_decoding_source_utf8_bom_and_crlf() {
        let bytes = b"\xEF\xBB\xBFid,name\r\n1,caf\xC3\xA9\r\n".to_vec();
        let mut source = DecodingLineSource::new(
            vec![Input::Reader(Box::new(Cursor::new(bytes)))],
            encoding_rs::UTF_8,
        );
        assert_eq!(drain(&mut source), vec![vec!["id,name", "1,café"]]);
    }

    #[test]
    fn test_decoding_source_latin1() {
        let bytes = b"na\xEFve\nx".to_vec();
        let mut source = DecodingLineSource::new(
            vec![Input::Reader(Box::new(Cursor::new(bytes)))],
            encoding_rs::WINDOWS_1252,
        );
        assert_eq!(drain(&mut source), vec![vec!["naïve", "x"]]);
    }

    #[test]
    fn test_decoding_source_missing_file() {
        let mut source = DecodingLineSource::from_paths(
            ["/definitely/not/here.csv"],
            encoding_rs::UTF_8,
        );
        let err = source.next_file().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
