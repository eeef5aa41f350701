use std::{
    fs::{File, OpenOptions},
    io::{self, BufRead, BufReader, Write},
    path::Path,
    sync::Arc,
};

use parking_lot::Mutex;

pub fn strip_ansi_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' {
            in_escape = true;
        } else if in_escape {
            if c.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else {
            result.push(c);
        }
    }
    result
}

/// Append-only log file that keeps roughly the newest `max_lines` lines.
///
/// The file is allowed to overshoot by a slack of 10% (at least 50 lines)
/// before it is rewritten with only its tail.
#[derive(Clone)]
pub(crate) struct LineCappedWriter {
    path: String,
    max_lines: u32,
    lines_written: Arc<Mutex<u32>>,
}

impl LineCappedWriter {
    pub fn new(path: String, max_lines: u32) -> Self {
        let existing = File::open(&path)
            .map(|f| BufReader::new(f).lines().count() as u32)
            .unwrap_or(0);
        Self {
            path,
            max_lines: max_lines.max(1),
            lines_written: Arc::new(Mutex::new(existing)),
        }
    }

    fn slack(&self) -> u32 {
        (self.max_lines / 10).max(50)
    }

    fn truncate_to_tail(&self) -> io::Result<u32> {
        if !Path::new(&self.path).exists() {
            return Ok(0);
        }
        let lines: Vec<String> = BufReader::new(File::open(&self.path)?)
            .lines()
            .collect::<Result<_, _>>()?;
        let keep = lines.len().min(self.max_lines as usize);
        let mut file = File::create(&self.path)?;
        for line in &lines[lines.len() - keep..] {
            writeln!(file, "{}", line)?;
        }
        Ok(keep as u32)
    }
}

impl io::Write for LineCappedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut count = self.lines_written.lock();

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?
            .write_all(buf)?;

        *count += buf.iter().filter(|&&b| b == b'\n').count() as u32;
        if *count > self.max_lines + self.slack() {
            match self.truncate_to_tail() {
                Ok(kept) => *count = kept,
                Err(e) => eprintln!("Failed to truncate log file: {}", e),
            }
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LineCappedWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
