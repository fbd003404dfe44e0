mod manifest;
pub use manifest::*;

mod package;
pub use package::*;

use crate::error::ValidationError;

pub trait ValidateModel {
    fn validate(&self) -> Result<(), ValidationError>;
}
