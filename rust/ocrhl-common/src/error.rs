use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// Whether the failure is confined to the document being processed.
    ///
    /// A highlighting batch should log and skip the document for these errors.
    /// The remaining kinds (`Unsupported`, `InvalidArgument`) point at a
    /// configuration or programming problem that will recur for every document.
    pub fn is_document_scoped(&self) -> bool {
        !matches!(
            self.kind(),
            ErrorKind::Unsupported { .. } | ErrorKind::InvalidArgument { .. }
        )
    }

    pub fn not_found(path: impl Into<String>) -> Error {
        Error(ErrorKind::NotFound { path: path.into() }.into())
    }

    pub fn empty_source(path: impl Into<String>) -> Error {
        Error(ErrorKind::EmptySource { path: path.into() }.into())
    }

    pub fn malformed(element: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::Malformed {
                element: element.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn unsupported(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::Unsupported {
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn out_of_bounds(offset: u64, len: u64, size: u64) -> Error {
        Error(ErrorKind::OutOfBounds { offset, len, size }.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("source not found: '{path}'")]
    NotFound { path: String },

    #[error("source is empty: '{path}'")]
    EmptySource { path: String },

    #[error("malformed {element}: {message}")]
    Malformed { element: String, message: String },

    #[error("unsupported: {message}")]
    Unsupported { message: String },

    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("range {offset}+{len} is out of bounds (size {size})")]
    OutOfBounds { offset: u64, len: u64, size: u64 },

    #[error("offset {offset} is not aligned to a record boundary (record size {record_size})")]
    AlignmentViolation { offset: u64, record_size: usize },

    #[error("missing required features: required {required:#04x}, present {present:#04x}")]
    MissingFeatures { required: u8, present: u8 },

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}
