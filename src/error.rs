pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("pool not started")]
    NotStarted,

    #[error("pool already started")]
    AlreadyStarted,

    #[error("worker already started: {0}")]
    WorkerAlreadyStarted(String),

    #[error("invalid size: {0}")]
    InvalidSize(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("worker {0} cannot join its own thread")]
    JoinSelf(String),

    #[error("worker panic: {0}")]
    WorkerPanic(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_size<S: Into<String>>(msg: S) -> Self {
        Error::InvalidSize(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// True for errors caused by calling the API out of order or with bad
    /// arguments, as opposed to failures of a running worker.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            Error::NotStarted
                | Error::AlreadyStarted
                | Error::WorkerAlreadyStarted(_)
                | Error::InvalidSize(_)
                | Error::Config(_)
                | Error::JoinSelf(_)
        )
    }
}
