pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Grammar parse error (line {line}): {message}")]
    GrammarParse { line: usize, message: String },

    #[error("Duplicate rule `{name}` (line {line})")]
    DuplicateRule { name: String, line: usize },

    #[error("Invalid config overrides: {message}")]
    InvalidConfig { message: String },
}
