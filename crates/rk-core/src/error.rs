/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur when loading or addressing cards.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Persisted card data could not be decoded.
    #[error("invalid card data: {0}")]
    InvalidCard(#[from] serde_json::Error),

    /// No card is registered under the given name.
    #[error("card not found: \"{0}\"")]
    CardNotFound(String),

    /// A card with the same name is already registered.
    #[error("card already exists: \"{0}\"")]
    DuplicateCard(String),
}
