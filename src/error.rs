//! Crate-level error type

use thiserror::Error;

use crate::binding::BindingError;
use crate::registry::RegistryError;
use crate::sink::SinkError;

/// Any error produced by this crate
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Result alias using the crate [`enum@Error`]
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{ContainerRef, InsertMode};

    #[test]
    fn test_conversions_keep_message() {
        let sink = SinkError::NoParent {
            container: ContainerRef::new(3),
            mode: InsertMode::Before,
        };
        let message = sink.to_string();

        let binding: BindingError = sink.into();
        let error: Error = RegistryError::from(binding).into();

        assert!(matches!(error, Error::Registry(RegistryError::Binding(_))));
        assert_eq!(error.to_string(), message);
    }
}
