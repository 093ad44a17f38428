use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParseError>;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Could not detect statement type: {0}")]
    Detection(String),
    #[error("Not a valid {format} file: {reason}")]
    MissingMarker {
        format: &'static str,
        reason: String,
    },
    #[error("Malformed {format} at line {line}, column {column}: {message}\n{context}")]
    Structural {
        format: &'static str,
        line: u32,
        column: u32,
        message: String,
        context: String,
    },
    #[error("No transactions found in {format} input{hint}")]
    Empty {
        format: &'static str,
        hint: &'static str,
    },
}

impl ParseError {
    pub(crate) fn empty(format: &'static str) -> Self {
        ParseError::Empty { format, hint: "" }
    }

    /// Wrap an XML parser failure with the offending lines of `source`, and
    /// log the same window so it is visible even when the error is
    /// swallowed by a multi-file merge.
    pub(crate) fn from_xml(format: &'static str, source: &str, err: &roxmltree::Error) -> Self {
        let pos = err.pos();
        let context = context_window(source, pos.row as usize, 3);
        tracing::error!(
            "{format} parse error at line {}, col {}: {err}\n{context}",
            pos.row,
            pos.col
        );
        ParseError::Structural {
            format,
            line: pos.row,
            column: pos.col,
            message: err.to_string(),
            context,
        }
    }
}

/// Render the lines around 1-based `line` as `NNNN: text`.
pub fn context_window(source: &str, line: usize, radius: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let start = line.saturating_sub(radius);
    let end = (line + radius).min(lines.len());
    (start..end)
        .map(|i| format!("{:4}: {}", i + 1, lines[i]))
        .collect::<Vec<_>>()
        .join("\n")
}
