use thiserror::Error;

#[derive(Debug, Error)]
pub enum FitsError {
    #[error("I/O error reading FITS data: {0}")]
    Io(#[from] std::io::Error),

    #[error("FITS library error: {0}")]
    Fitsio(#[from] fitsio::errors::Error),

    #[error("HDU '{0}' not found")]
    HduNotFound(String),

    #[error("HDU '{0}' is not a binary table")]
    NotATable(String),

    #[error("HDU '{0}' is not an image")]
    NotAnImage(String),

    #[error("column '{column}' not found in {hdu}")]
    ColumnNotFound { hdu: String, column: String },

    #[error("keyword {keyword} in {hdu} is invalid: {message}")]
    InvalidKeyword {
        hdu: String,
        keyword: String,
        message: String,
    },

    #[error("target pixel file invalid: {0}")]
    Validation(String),
}
