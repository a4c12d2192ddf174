pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No <svg> root element found in diagram markup")]
    NoDiagramRoot,

    #[error("Malformed diagram markup: {message}")]
    MalformedDocument { message: String },

    #[error("Failed to fetch diagram markup ({reference}): {message}")]
    Fetch { reference: String, message: String },

    #[error("Invalid resolver config: {0}")]
    InvalidConfig(#[source] serde_json::Error),

    #[error("Invalid section catalog: {0}")]
    InvalidCatalog(#[source] serde_json::Error),
}

impl From<roxmltree::Error> for Error {
    fn from(value: roxmltree::Error) -> Self {
        Self::MalformedDocument {
            message: value.to_string(),
        }
    }
}
