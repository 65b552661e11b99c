//! Error taxonomy - user-visible failures and internal contract violations
//!
//! Design: Recoverable failures are plain `Error` values carrying a kind, a
//! message and a backtrace string. They cross the C boundary through a
//! thread-local "raised" slot (see `raised`) and are materialized as
//! `ffi.Error` objects when stored in an `Any`.
//!
//! Violations of internal contracts (dereferencing an undefined reference,
//! overflowing a closed type range, ...) go through `fatal!`, which logs and
//! halts instead of returning.

mod raised;
mod object;


use std::fmt;

pub use object::{ErrorNode, ErrorObj};
pub use raised::{has_raised, set_raised, take_raised};

/// Result alias used throughout the runtime
pub type Result<T> = std::result::Result<T, Error>;

/// Error category
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Wrong argument type, failed conversion, unsupported structural kind
    TypeError,
    /// Invalid value (unparseable dtype, unknown hook, structural mismatch assert)
    ValueError,
    /// Out-of-bounds element access
    IndexError,
    /// Missing map key
    KeyError,
    /// Unknown or readonly field
    AttributeError,
    /// Duplicate registration, missing symbol, foreign call failure
    RuntimeError,
    /// Contract violation reported through the C ABI
    InternalError,
    /// Kind raised by foreign code under its own name
    Custom(String),
}

impl ErrorKind {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ValueError => "ValueError",
            ErrorKind::IndexError => "IndexError",
            ErrorKind::KeyError => "KeyError",
            ErrorKind::AttributeError => "AttributeError",
            ErrorKind::RuntimeError => "RuntimeError",
            ErrorKind::InternalError => "InternalError",
            ErrorKind::Custom(name) => name,
        }
    }

    /// Map a kind name (as received over the C ABI) back to a kind
    pub fn from_name(name: &str) -> Self {
        match name {
            "TypeError" => ErrorKind::TypeError,
            "ValueError" => ErrorKind::ValueError,
            "IndexError" => ErrorKind::IndexError,
            "KeyError" => ErrorKind::KeyError,
            "AttributeError" => ErrorKind::AttributeError,
            "RuntimeError" => ErrorKind::RuntimeError,
            "InternalError" => ErrorKind::InternalError,
            other => ErrorKind::Custom(other.to_string()),
        }
    }
}

impl From<&str> for ErrorKind {
    fn from(name: &str) -> Self {
        Self::from_name(name)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recoverable runtime error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    backtrace: String,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            backtrace: String::new(),
        }
    }

    pub fn with_backtrace(mut self, backtrace: impl Into<String>) -> Self {
        self.backtrace = backtrace.into();
        self
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValueError, message)
    }

    pub fn index_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IndexError, message)
    }

    pub fn key_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::KeyError, message)
    }

    pub fn attribute_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AttributeError, message)
    }

    pub fn runtime_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RuntimeError, message)
    }

    /// Conversion failure between two type names
    pub fn type_mismatch(from: &str, to: &str) -> Self {
        Self::type_error(format!("Cannot convert from type `{from}` to `{to}`"))
    }

    /// A value of the right kind that does not fit the requested type
    pub fn out_of_range(value: &str, from: &str, to: &str) -> Self {
        Self::type_error(format!(
            "Value `{value}` of type `{from}` is out of range for `{to}`"
        ))
    }

    /// Element access outside `[0, len)`
    pub fn out_of_bounds(index: i64, len: usize) -> Self {
        Self::index_error(format!("indexing `{index}` on an array of size {len}"))
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn backtrace(&self) -> &str {
        &self.backtrace
    }

    /// Prefix the message with call-site context, keeping kind and backtrace
    pub fn context(mut self, context: impl fmt::Display) -> Self {
        self.message = format!("{context}: {}", self.message);
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.backtrace.is_empty() {
            writeln!(f, "Traceback (most recent call last):")?;
            writeln!(f, "{}", self.backtrace.trim_end())?;
        }
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {}

/// Halt on an internal contract violation
///
/// Logs the message through the runtime logger and panics with an
/// `InternalError:` prefix. Never use this for conditions a caller could
/// reasonably trigger with bad input; those return `Error`.
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)*) => {{
        let message = ::std::format!($($arg)*);
        $crate::logging::log_fatal(&message);
        let backtrace = ::std::backtrace::Backtrace::capture();
        ::std::panic!("InternalError: {}\n{}", message, backtrace)
    }};
}

/// `fatal!` unless the condition holds
#[macro_export]
macro_rules! ensure_internal {
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            $crate::fatal!($($arg)*);
        }
    };
}
