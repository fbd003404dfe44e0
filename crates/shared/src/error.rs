use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{}", error_messages.join(", "))]
pub struct ValidationError {
    pub error_messages: Vec<String>,
}

impl ValidationError {
    /// Ok if no messages were collected
    pub fn from_messages(error_messages: Vec<String>) -> Result<(), Self> {
        if error_messages.is_empty() {
            Ok(())
        } else {
            Err(Self { error_messages })
        }
    }
}
