use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiftError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Parse error: {message}")]
    Parse { message: String, line: Option<usize>, col: Option<usize> },
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),
    #[error("Invalid operand for {operator}: {message}")]
    InvalidOperand { operator: String, message: String },
    #[error("Pointer not found: {0}")]
    PointerNotFound(String),
    #[error("Invalid rule: {0}")]
    InvalidRule(String),
    #[error("I/O error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, SiftError>;

impl SiftError {
    pub(crate) fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse { message: message.into(), line: None, col: None }
    }
    pub(crate) fn operand<O: Into<String>, M: Into<String>>(operator: O, message: M) -> Self {
        Self::InvalidOperand { operator: operator.into(), message: message.into() }
    }
}

// Helper conversions
impl From<config::ConfigError> for SiftError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}

impl From<std::io::Error> for SiftError {
    fn from(e: std::io::Error) -> Self { Self::Io(e.to_string()) }
}

impl<R: pest::RuleType> From<pest::error::Error<R>> for SiftError {
    fn from(e: pest::error::Error<R>) -> Self {
        let (line, col) = match e.line_col {
            pest::error::LineColLocation::Pos((l, c)) => (l, c),
            pest::error::LineColLocation::Span((l, c), _) => (l, c),
        };
        let message = format!("{} at {}:{} in `{}`", e.variant.message(), line, col, e.line().trim_end());
        Self::Parse { message, line: Some(line), col: Some(col) }
    }
}

impl From<serde_json::Error> for SiftError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse { message: e.to_string(), line: Some(e.line()), col: Some(e.column()) }
    }
}
