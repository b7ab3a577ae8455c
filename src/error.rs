use derive_more::Display;

/// Failure talking to the backing store. The text is shown to users verbatim.
#[derive(Debug, Display)]
pub enum StoreError {
    #[display(fmt = "{}", _0)]
    Database(sqlx::Error),
    /// Unique-key violation; displays the database text like `Database`.
    #[display(fmt = "{}", _0)]
    Duplicate(sqlx::Error),
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Database(e) | StoreError::Duplicate(e) => Some(e),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        let unique = matches!(&e, sqlx::Error::Database(db_err) if db_err.is_unique_violation());
        if unique {
            StoreError::Duplicate(e)
        } else {
            StoreError::Database(e)
        }
    }
}
