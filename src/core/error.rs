use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Missing transition cell: from '{from}' to '{to}'")]
    MissingCell { from: String, to: String },

    #[error("Unknown state: {0}")]
    UnknownState(String),

    #[error("Duplicate state: {0}")]
    DuplicateState(String),

    #[error("Category '{category}' (used by element '{element}') has no configured weight")]
    MissingCategoryWeight { category: String, element: String },

    #[error("Unresolvable plugin '{name}': no entry point '{entry}' in '{origin}'")]
    UnresolvedPlugin {
        name: String,
        origin: String,
        entry: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown offering element: {0}")]
    UnknownElement(String),

    #[error("Rating {rating} for element '{element}' is outside [0, 10]")]
    InvalidRating { element: String, rating: f64 },

    #[error("Stage '{stage}' failed: {reason}")]
    StageFailed { stage: String, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl SimError {
    /// Errors that must abort a run before any stepping happens.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SimError::MissingInput(_)
                | SimError::MissingCell { .. }
                | SimError::UnknownState(_)
                | SimError::DuplicateState(_)
                | SimError::MissingCategoryWeight { .. }
                | SimError::UnresolvedPlugin { .. }
                | SimError::InvalidConfig(_)
                | SimError::CsvError(_)
                | SimError::TomlError(_)
                | SimError::IoError(_)
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SimError::UnknownElement(_) | SimError::InvalidRating { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
