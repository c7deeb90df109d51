//! # error
//!
//! Error types returned by the directory engine

use std::fmt;
use std::io;

use remotefs::{RemoteError, RemoteErrorType};
use thiserror::Error;

use crate::status::NtStatus;

pub type SmbResult<T> = Result<T, SmbError>;

/// Error kinds surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmbErrorKind {
    /// Path is not a valid share path
    InvalidPath,
    /// No stored credential matches the host/share
    CredentialNotFound,
    /// Address resolution or transport connection failed
    HostUnreachable,
    /// Session establishment was rejected
    AuthenticationFailed,
    /// Target object does not exist
    NotFound,
    /// A path component does not exist or is not a directory
    PathNotFound,
    /// Permission, locking or pending-delete conflict
    AccessDenied,
    /// Exclusive create collided with an existing object
    AlreadyExists,
    /// Non-recursive delete on a non-empty directory
    DirectoryNotEmpty,
    /// Server reached its open-handle limit
    TooManyHandles,
    /// Server reached a memory or disk limit
    ResourceExhausted,
    /// Operation has no remote equivalent
    Unsupported,
    /// Any other non-success status
    ProtocolError,
}

impl fmt::Display for SmbErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let desc = match self {
            Self::InvalidPath => "invalid share path",
            Self::CredentialNotFound => "credential not found",
            Self::HostUnreachable => "host unreachable",
            Self::AuthenticationFailed => "authentication failed",
            Self::NotFound => "no such file or directory",
            Self::PathNotFound => "a component in the path prefix is not a directory",
            Self::AccessDenied => "access denied",
            Self::AlreadyExists => "an object with the same pathname already exists",
            Self::DirectoryNotEmpty => "directory is not empty",
            Self::TooManyHandles => "too many open files",
            Self::ResourceExhausted => "insufficient server resources",
            Self::Unsupported => "operation not supported",
            Self::ProtocolError => "protocol error",
        };
        f.write_str(desc)
    }
}

/// Error returned by any engine operation
#[derive(Debug, Error)]
#[error("{kind}{}", detail(.status, .msg))]
pub struct SmbError {
    pub kind: SmbErrorKind,
    /// Raw protocol status, when the error comes from the server
    pub status: Option<NtStatus>,
    pub msg: Option<String>,
}

fn detail(status: &Option<NtStatus>, msg: &Option<String>) -> String {
    match (status, msg) {
        (Some(status), Some(msg)) => format!(" ({status}): {msg}"),
        (Some(status), None) => format!(" ({status})"),
        (None, Some(msg)) => format!(": {msg}"),
        (None, None) => String::new(),
    }
}

impl SmbError {
    pub fn new(kind: SmbErrorKind) -> Self {
        Self {
            kind,
            status: None,
            msg: None,
        }
    }

    /// Instantiate a new error with a message
    pub fn new_ex<S: ToString>(kind: SmbErrorKind, msg: S) -> Self {
        Self {
            kind,
            status: None,
            msg: Some(msg.to_string()),
        }
    }

    pub fn from_status(kind: SmbErrorKind, status: NtStatus) -> Self {
        Self {
            kind,
            status: Some(status),
            msg: None,
        }
    }

    /// Attach a message to the error, keeping kind and status
    pub fn context<S: ToString>(mut self, msg: S) -> Self {
        self.msg = Some(msg.to_string());
        self
    }

    /// Returns whether the error states that the target is missing
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.kind,
            SmbErrorKind::NotFound | SmbErrorKind::PathNotFound
        )
    }
}

impl From<io::Error> for SmbError {
    fn from(err: io::Error) -> Self {
        if let Some(kind) = errno_kind(&err) {
            return Self::new_ex(kind, err);
        }
        let kind = match err.kind() {
            io::ErrorKind::NotFound => SmbErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => SmbErrorKind::AccessDenied,
            io::ErrorKind::AlreadyExists => SmbErrorKind::AlreadyExists,
            io::ErrorKind::InvalidInput => SmbErrorKind::InvalidPath,
            io::ErrorKind::Unsupported => SmbErrorKind::Unsupported,
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::AddrNotAvailable
            | io::ErrorKind::TimedOut => SmbErrorKind::HostUnreachable,
            _ => SmbErrorKind::ProtocolError,
        };
        Self::new_ex(kind, err)
    }
}

#[cfg(target_family = "unix")]
fn errno_kind(err: &io::Error) -> Option<SmbErrorKind> {
    match err.raw_os_error()? {
        libc::ENOTEMPTY => Some(SmbErrorKind::DirectoryNotEmpty),
        libc::ENOTDIR => Some(SmbErrorKind::PathNotFound),
        libc::EMFILE | libc::ENFILE => Some(SmbErrorKind::TooManyHandles),
        libc::ENOSPC => Some(SmbErrorKind::ResourceExhausted),
        _ => None,
    }
}

#[cfg(not(target_family = "unix"))]
fn errno_kind(_err: &io::Error) -> Option<SmbErrorKind> {
    None
}

impl From<SmbError> for RemoteError {
    fn from(err: SmbError) -> Self {
        let kind = match err.kind {
            SmbErrorKind::InvalidPath => RemoteErrorType::BadAddress,
            SmbErrorKind::CredentialNotFound | SmbErrorKind::AuthenticationFailed => {
                RemoteErrorType::AuthenticationFailed
            }
            SmbErrorKind::HostUnreachable => RemoteErrorType::ConnectionError,
            SmbErrorKind::NotFound | SmbErrorKind::PathNotFound => {
                RemoteErrorType::NoSuchFileOrDirectory
            }
            SmbErrorKind::AccessDenied => RemoteErrorType::CouldNotOpenFile,
            SmbErrorKind::AlreadyExists => RemoteErrorType::DirectoryAlreadyExists,
            SmbErrorKind::DirectoryNotEmpty => RemoteErrorType::CouldNotRemoveFile,
            SmbErrorKind::TooManyHandles | SmbErrorKind::ResourceExhausted => {
                RemoteErrorType::IoError
            }
            SmbErrorKind::Unsupported => RemoteErrorType::UnsupportedFeature,
            SmbErrorKind::ProtocolError => RemoteErrorType::ProtocolError,
        };
        RemoteError::new_ex(kind, err)
    }
}
