use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The token configuration is empty or names no known command.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A loop bracket has no partner.
    #[error("Malformed program: {0}")]
    MalformedProgram(String),

    /// Strict-mode pointer or jump target outside its valid range.
    #[error("{what} out of bounds: {index} not in 0..{limit}")]
    Bounds {
        what: &'static str,
        index: i64,
        limit: i64,
    },

    /// Strict-mode attempt to store a negative cell or clipboard value.
    #[error("Negative {what} value: {value}")]
    NegativeValue { what: &'static str, value: i64 },

    #[error("Invalid state: {0}")]
    State(String),

    #[error("Input exhausted")]
    InputExhausted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
