use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to load profiles: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid profile '{name}': {reason}")]
    InvalidProfile { name: String, reason: String },
}

impl From<figment::Error> for Error {
    fn from(e: figment::Error) -> Self { Self::Load(Box::new(e)) }
}

pub type Result<T> = std::result::Result<T, Error>;
