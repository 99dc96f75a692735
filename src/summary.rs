//! Condensed statistical view of a file, used instead of its full content.

use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

const PREVIEW_LINES: usize = 3;
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Line statistics plus the first and last few lines of a file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileSummary {
    /// Number of lines
    pub total_lines: usize,

    /// First `min(3, total_lines)` lines
    pub first_three: Vec<String>,

    /// Last `min(3, total_lines)` lines, in file order
    pub last_three: Vec<String>,

    /// Lines containing only whitespace
    pub empty_lines: usize,

    /// Line bytes (terminators excluded) divided by line count
    pub average_bytes_per_line: f64,
}

impl FileSummary {
    /// Reads `path` line by line and computes its summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, or
    /// [`Error::EmptyFile`] if it contains no lines.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);
        Self::from_reader(&mut reader).map_err(|err| match err {
            SummaryError::Io(e) => Error::io(path, e),
            SummaryError::Empty => Error::empty_file(path),
        })
    }

    fn from_reader<R: BufRead>(reader: &mut R) -> std::result::Result<Self, SummaryError> {
        let mut first_three = Vec::with_capacity(PREVIEW_LINES);
        let mut last_three = VecDeque::with_capacity(PREVIEW_LINES);
        let mut total_lines = 0_usize;
        let mut empty_lines = 0_usize;
        let mut total_bytes = 0_usize;
        let mut raw = Vec::new();

        loop {
            raw.clear();
            if reader.read_until(b'\n', &mut raw).map_err(SummaryError::Io)? == 0 {
                break;
            }

            let line = strip_terminator(&raw);
            total_lines += 1;
            total_bytes += line.len();
            let text = String::from_utf8_lossy(line).into_owned();
            if text.trim().is_empty() {
                empty_lines += 1;
            }

            if first_three.len() < PREVIEW_LINES {
                first_three.push(text.clone());
            }
            if last_three.len() == PREVIEW_LINES {
                last_three.pop_front();
            }
            last_three.push_back(text);
        }

        if total_lines == 0 {
            return Err(SummaryError::Empty);
        }

        Ok(Self {
            total_lines,
            first_three,
            last_three: last_three.into(),
            empty_lines,
            average_bytes_per_line: total_bytes as f64 / total_lines as f64,
        })
    }

    /// Writes the tagged summary block for `relative_path` into `out`.
    pub fn render(&self, relative_path: &str, out: &mut Vec<u8>) {
        // Writing into a Vec cannot fail.
        let _ = self.write_block(relative_path, out);
    }

    fn write_block(&self, relative_path: &str, out: &mut Vec<u8>) -> std::io::Result<()> {
        writeln!(out, "<Summary of file {relative_path}>")?;

        writeln!(out, "<First three lines>")?;
        write_lines(out, &self.first_three)?;
        writeln!(out, "</First three lines>")?;

        writeln!(out, "<Last three lines>")?;
        write_lines(out, &self.last_three)?;
        writeln!(out, "</Last three lines>")?;

        writeln!(out, "<Statistics>")?;
        writeln!(out, "<Total lines>{}</Total lines>", self.total_lines)?;
        writeln!(out, "<Empty lines>{}</Empty lines>", self.empty_lines)?;
        writeln!(
            out,
            "<Average bytest per line>{:.2}</Average bytest per line>",
            self.average_bytes_per_line
        )?;
        writeln!(out, "</Statistics>")?;

        writeln!(out, "</Summary of file {relative_path}>")
    }
}

enum SummaryError {
    Io(std::io::Error),
    Empty,
}

fn write_lines(out: &mut Vec<u8>, lines: &[String]) -> std::io::Result<()> {
    for (i, line) in lines.iter().enumerate() {
        writeln!(out, "<line index=\"{}\"><{line}></line>", i + 1)?;
    }
    Ok(())
}

/// Drops a trailing `\n` or `\r\n`.
fn strip_terminator(raw: &[u8]) -> &[u8] {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    line.strip_suffix(b"\r").unwrap_or(line)
}
