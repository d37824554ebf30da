use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("Expected element #{0} is missing from the page")]
    MissingElement(String),

    #[error("Pager control carries no doPostBack('target','argument') callback: {0:?}")]
    PostbackGrammar(String),

    #[error("Dropdown label {0:?} appears more than once")]
    DuplicateYearLabel(String),

    #[error("Pager current-page label is not numeric: {0:?}")]
    PagerLabel(String),

    #[error("Grid header mismatch, expected {expected:?} but found {found:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Year {0} is not offered by the voting period dropdown")]
    YearUnavailable(String),

    #[error("Row field {column:?} is unparsable: {value:?}")]
    RowField {
        column: &'static str,
        value: String,
    },

    #[error("Step {name} failed: {source}")]
    Step {
        name: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wraps an error with the logical name of the fetch step it occurred in,
    /// so a failed walk reports where to look before re-running.
    pub(crate) fn in_step(self, name: &str) -> Self {
        Error::Step {
            name: name.to_owned(),
            source: Box::new(self),
        }
    }
}
