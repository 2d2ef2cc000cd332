use thiserror::Error;

#[derive(Error, Debug)]
pub enum StakenetError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Formula error: {0}")]
    Formula(String),

    #[error("State error: {0}")]
    State(String),

    #[error("Signature error: {0}")]
    Signature(String),

    #[error("Commission error: {0}")]
    Commission(String),
}

pub type Result<T> = std::result::Result<T, StakenetError>;

impl From<secp256k1::Error> for StakenetError {
    fn from(err: secp256k1::Error) -> Self {
        StakenetError::Signature(err.to_string())
    }
}

impl From<serde_json::Error> for StakenetError {
    fn from(err: serde_json::Error) -> Self {
        StakenetError::Decode(err.to_string())
    }
}
