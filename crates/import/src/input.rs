use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

/// Where statement bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    Path(PathBuf),
}

impl InputSource {
    /// `-` and `/dev/stdin` select standard input.
    pub fn from_arg(arg: &str) -> Self {
        match arg {
            "-" | "/dev/stdin" => InputSource::Stdin,
            other => InputSource::Path(PathBuf::from(other)),
        }
    }

    pub fn is_stdin(&self) -> bool {
        matches!(self, InputSource::Stdin)
    }

    /// Provenance label used by the consolidator.
    pub fn label(&self) -> String {
        match self {
            InputSource::Stdin => "<stdin>".to_string(),
            InputSource::Path(p) => p.display().to_string(),
        }
    }

    /// Lowercased extension including the leading dot, e.g. `.qfx`.
    pub fn extension(&self) -> Option<String> {
        match self {
            InputSource::Stdin => None,
            InputSource::Path(p) => p
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| format!(".{}", e.to_lowercase())),
        }
    }
}

/// Standard input, read to the end once and then served from memory.
///
/// Detection and parsing each need the full stream, and a pipe can only be
/// read once. Every `acquire` hands out a fresh cursor positioned at the
/// start of the buffer.
pub struct StdinSnapshot {
    reader: Option<Box<dyn Read>>,
    buffer: Option<Vec<u8>>,
}

impl StdinSnapshot {
    pub fn new() -> Self {
        Self::from_reader(io::stdin())
    }

    pub fn from_reader(reader: impl Read + 'static) -> Self {
        Self {
            reader: Some(Box::new(reader)),
            buffer: None,
        }
    }

    pub fn bytes(&mut self) -> io::Result<&[u8]> {
        if self.buffer.is_none() {
            let mut data = Vec::new();
            if let Some(mut reader) = self.reader.take() {
                reader.read_to_end(&mut data)?;
            }
            tracing::debug!("Buffered {} bytes from stdin", data.len());
            self.buffer = Some(data);
        }
        Ok(self.buffer.as_deref().unwrap_or_default())
    }

    pub fn acquire(&mut self) -> io::Result<Cursor<&[u8]>> {
        Ok(Cursor::new(self.bytes()?))
    }

    /// The first `n` bytes, without affecting later reads.
    pub fn peek(&mut self, n: usize) -> io::Result<&[u8]> {
        let data = self.bytes()?;
        Ok(&data[..n.min(data.len())])
    }
}

impl Default for StdinSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Read a whole source. `.gnucash` files are gunzipped; GnuCash can also
/// save uncompressed XML under the same suffix, so a file without the gzip
/// header is returned as is.
pub fn read_source(source: &InputSource, stdin: &mut StdinSnapshot) -> io::Result<Vec<u8>> {
    match source {
        InputSource::Stdin => Ok(stdin.bytes()?.to_vec()),
        InputSource::Path(path) => {
            let raw = std::fs::read(path)?;
            if is_gnucash_path(path) && raw.starts_with(&GZIP_MAGIC) {
                let mut out = Vec::new();
                GzDecoder::new(raw.as_slice()).read_to_end(&mut out)?;
                Ok(out)
            } else {
                Ok(raw)
            }
        }
    }
}

fn is_gnucash_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gnucash"))
}
