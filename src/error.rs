use std::{any::Any, error::Error as StdError, io, sync::Arc};

/// Why a slot resolved without its producer handing over a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Abandoned {
    #[error("producer panicked: {0}")]
    Panicked(Arc<str>),
    #[error("producer was dropped without resolving")]
    Dropped,
}

impl Abandoned {
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message: Arc<str> = match payload.downcast::<String>() {
            Ok(message) => Arc::from(message.as_str()),
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => Arc::from(*message),
                Err(_) => Arc::from("opaque panic payload"),
            },
        };
        Abandoned::Panicked(message)
    }
}

/// The error carried by a [`FailableFuture`](crate::FailableFuture).
///
/// Cheap to clone: every waiter of a failed future observes the same error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A completion callback fired with neither a value nor an error.
    #[error("completion fired with neither a value nor an error")]
    NoElements,
    #[error(transparent)]
    Abandoned(#[from] Abandoned),
    #[error("failed to spawn worker thread `{name}`")]
    Spawn {
        name: String,
        #[source]
        source: Arc<io::Error>,
    },
    #[error(transparent)]
    Failed(Arc<dyn StdError + Send + Sync + 'static>),
}

impl Error {
    /// Wraps an arbitrary error. Wrapping an [`Error`] returns it unchanged.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        if let Some(error) = (&error as &dyn Any).downcast_ref::<Error>() {
            return error.clone();
        }
        Error::Failed(Arc::new(error))
    }

    /// Returns the wrapped user error if it is of type `E`.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        match self {
            Error::Failed(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }
}

impl From<Box<dyn StdError + Send + Sync + 'static>> for Error {
    fn from(error: Box<dyn StdError + Send + Sync + 'static>) -> Self {
        Error::Failed(Arc::from(error))
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::Failed(Arc::new(error))
    }
}
