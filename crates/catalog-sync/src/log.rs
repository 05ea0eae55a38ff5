/// A single line in a sync run's decision log.
///
/// Callers receive these in order with every chunk result. The CLI prints
/// them, the log store accumulates them per store for the status call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogLine {
    /// Step-by-step reasoning (classification, price source, image handling).
    Debug(String),
    /// Outcome of a product or page.
    Info(String),
    /// Operation continued but something was skipped.
    Warning(String),
    /// Something failed (fatal only at page or configuration level).
    Error(String),
}

impl LogLine {
    pub fn debug(msg: impl Into<String>) -> Self {
        Self::Debug(msg.into())
    }

    pub fn info(msg: impl Into<String>) -> Self {
        Self::Info(msg.into())
    }

    pub fn warning(msg: impl Into<String>) -> Self {
        Self::Warning(msg.into())
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self::Error(msg.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warning(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Debug(msg) | Self::Info(msg) | Self::Warning(msg) | Self::Error(msg) => msg,
        }
    }
}

impl std::fmt::Display for LogLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Debug(msg) => write!(f, "[DEBUG] {msg}"),
            Self::Info(msg) => write!(f, "{msg}"),
            Self::Warning(msg) => write!(f, "[WARNING] {msg}"),
            Self::Error(msg) => write!(f, "[ERROR] {msg}"),
        }
    }
}

/// Ordered log for one unit of work, mirrored to `tracing` as lines arrive.
#[derive(Debug, Default)]
pub struct RunLog {
    store: String,
    lines: Vec<LogLine>,
}

impl RunLog {
    pub fn new(store: impl Into<String>) -> Self {
        Self {
            store: store.into(),
            lines: Vec::new(),
        }
    }

    pub fn debug(&mut self, msg: impl Into<String>) {
        let line = LogLine::debug(msg);
        tracing::debug!(store = %self.store, "{}", line.message());
        self.lines.push(line);
    }

    pub fn info(&mut self, msg: impl Into<String>) {
        let line = LogLine::info(msg);
        tracing::info!(store = %self.store, "{}", line.message());
        self.lines.push(line);
    }

    pub fn warning(&mut self, msg: impl Into<String>) {
        let line = LogLine::warning(msg);
        tracing::warn!(store = %self.store, "{}", line.message());
        self.lines.push(line);
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        let line = LogLine::error(msg);
        tracing::error!(store = %self.store, "{}", line.message());
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<LogLine> {
        self.lines
    }
}
