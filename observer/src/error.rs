use thiserror::Error;

/// Error returned when a registration cannot be made
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObserveError {
    #[error("cannot observe unknown property `{0}`")]
    UnknownProperty(String),
    #[error("cannot observe read-only property `{0}`")]
    ReadOnly(String),
}

/// Error returned by property reads and writes on a [`State`](crate::State)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    #[error("unknown property `{0}`")]
    Unknown(String),
    #[error("property `{0}` is read-only")]
    ReadOnly(String),
    #[error("property `{0}` is already defined")]
    AlreadyDefined(String),
}
