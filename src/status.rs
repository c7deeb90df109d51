//! # status
//!
//! NT status codes returned by the SMB protocol and their translation into [`SmbErrorKind`].

use std::fmt;

use crate::error::{SmbError, SmbErrorKind, SmbResult};

/// A raw NT status code, as returned by the remote server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NtStatus(pub u32);

impl NtStatus {
    pub const STATUS_SUCCESS: Self = Self(0x0000_0000);
    pub const STATUS_PENDING: Self = Self(0x0000_0103);
    pub const STATUS_NOTIFY_ENUM_DIR: Self = Self(0x0000_010C);
    pub const STATUS_INVALID_SMB: Self = Self(0x0001_0002);
    pub const STATUS_SMB_BAD_FID: Self = Self(0x0006_0001);
    pub const STATUS_OS2_INVALID_ACCESS: Self = Self(0x000C_0001);
    pub const STATUS_OS2_NO_MORE_SIDS: Self = Self(0x0071_0001);
    pub const STATUS_OS2_INVALID_LEVEL: Self = Self(0x007C_0001);
    pub const STATUS_BUFFER_OVERFLOW: Self = Self(0x8000_0005);
    pub const STATUS_NO_MORE_FILES: Self = Self(0x8000_0006);
    pub const SEC_E_INVALID_TOKEN: Self = Self(0x8009_0308);
    pub const STATUS_UNSUCCESSFUL: Self = Self(0xC000_0001);
    pub const STATUS_NOT_IMPLEMENTED: Self = Self(0xC000_0002);
    pub const STATUS_INVALID_INFO_CLASS: Self = Self(0xC000_0003);
    pub const STATUS_INVALID_HANDLE: Self = Self(0xC000_0008);
    pub const STATUS_INVALID_PARAMETER: Self = Self(0xC000_000D);
    pub const STATUS_NO_SUCH_DEVICE: Self = Self(0xC000_000E);
    pub const STATUS_NO_SUCH_FILE: Self = Self(0xC000_000F);
    pub const STATUS_INVALID_DEVICE_REQUEST: Self = Self(0xC000_0010);
    pub const STATUS_END_OF_FILE: Self = Self(0xC000_0011);
    pub const STATUS_MORE_PROCESSING_REQUIRED: Self = Self(0xC000_0016);
    pub const STATUS_ACCESS_DENIED: Self = Self(0xC000_0022);
    pub const STATUS_OBJECT_NAME_INVALID: Self = Self(0xC000_0033);
    pub const STATUS_OBJECT_NAME_NOT_FOUND: Self = Self(0xC000_0034);
    pub const STATUS_OBJECT_NAME_COLLISION: Self = Self(0xC000_0035);
    pub const STATUS_OBJECT_PATH_INVALID: Self = Self(0xC000_0039);
    pub const STATUS_OBJECT_PATH_NOT_FOUND: Self = Self(0xC000_003A);
    pub const STATUS_OBJECT_PATH_SYNTAX_BAD: Self = Self(0xC000_003B);
    pub const STATUS_DATA_ERROR: Self = Self(0xC000_003E);
    pub const STATUS_SHARING_VIOLATION: Self = Self(0xC000_0043);
    pub const STATUS_FILE_LOCK_CONFLICT: Self = Self(0xC000_0054);
    pub const STATUS_LOCK_NOT_GRANTED: Self = Self(0xC000_0055);
    pub const STATUS_DELETE_PENDING: Self = Self(0xC000_0056);
    pub const STATUS_PRIVILEGE_NOT_HELD: Self = Self(0xC000_0061);
    pub const STATUS_LOGON_FAILURE: Self = Self(0xC000_006D);
    pub const STATUS_ACCOUNT_RESTRICTION: Self = Self(0xC000_006E);
    pub const STATUS_INVALID_LOGON_HOURS: Self = Self(0xC000_006F);
    pub const STATUS_INVALID_WORKSTATION: Self = Self(0xC000_0070);
    pub const STATUS_PASSWORD_EXPIRED: Self = Self(0xC000_0071);
    pub const STATUS_ACCOUNT_DISABLED: Self = Self(0xC000_0072);
    pub const STATUS_RANGE_NOT_LOCKED: Self = Self(0xC000_007E);
    pub const STATUS_DISK_FULL: Self = Self(0xC000_007F);
    pub const STATUS_IO_TIMEOUT: Self = Self(0xC000_00B5);
    pub const STATUS_FILE_IS_A_DIRECTORY: Self = Self(0xC000_00BA);
    pub const STATUS_NOT_SUPPORTED: Self = Self(0xC000_00BB);
    pub const STATUS_NETWORK_NAME_DELETED: Self = Self(0xC000_00C9);
    pub const STATUS_BAD_NETWORK_NAME: Self = Self(0xC000_00CC);
    pub const STATUS_DIRECTORY_NOT_EMPTY: Self = Self(0xC000_0101);
    pub const STATUS_NOT_A_DIRECTORY: Self = Self(0xC000_0103);
    pub const STATUS_TOO_MANY_OPENED_FILES: Self = Self(0xC000_011F);
    pub const STATUS_CANCELLED: Self = Self(0xC000_0120);
    pub const STATUS_CANNOT_DELETE: Self = Self(0xC000_0121);
    pub const STATUS_FILE_CLOSED: Self = Self(0xC000_0128);
    pub const STATUS_LOGON_TYPE_NOT_GRANTED: Self = Self(0xC000_015B);
    pub const STATUS_ACCOUNT_EXPIRED: Self = Self(0xC000_0193);
    pub const STATUS_INSUFF_SERVER_RESOURCES: Self = Self(0xC000_0205);
    pub const STATUS_PASSWORD_MUST_CHANGE: Self = Self(0xC000_0224);
    pub const STATUS_ACCOUNT_LOCKED_OUT: Self = Self(0xC000_0234);
    pub const STATUS_CONNECTION_REFUSED: Self = Self(0xC000_0236);
    pub const STATUS_NETWORK_UNREACHABLE: Self = Self(0xC000_023C);
    pub const STATUS_HOST_UNREACHABLE: Self = Self(0xC000_023D);

    /// Returns whether the status is `STATUS_SUCCESS`
    pub fn is_success(self) -> bool {
        self == Self::STATUS_SUCCESS
    }

    /// Returns whether the status is `STATUS_PENDING`
    pub fn is_pending(self) -> bool {
        self == Self::STATUS_PENDING
    }

    /// Symbolic name of the status, if known
    pub fn name(self) -> Option<&'static str> {
        STATUS_TABLE
            .iter()
            .find(|(status, _, _)| *status == self)
            .map(|(_, name, _)| *name)
    }

    /// Translate the status into a [`StatusOutcome`]
    pub fn outcome(self) -> StatusOutcome {
        match STATUS_TABLE.iter().find(|(status, _, _)| *status == self) {
            Some((_, _, Some(kind))) => StatusOutcome::Error(*kind),
            Some((_, _, None)) => StatusOutcome::Success,
            None => StatusOutcome::Error(SmbErrorKind::ProtocolError),
        }
    }

    /// Convert a status which prevented an operation from completing into an error.
    /// Benign statuses become a `ProtocolError`, since the expected outcome is missing.
    pub fn into_error(self) -> SmbError {
        match self.outcome() {
            StatusOutcome::Error(kind) => SmbError::from_status(kind, self),
            StatusOutcome::Success => SmbError::from_status(SmbErrorKind::ProtocolError, self),
        }
    }

    /// Convert the status into a result; benign statuses are `Ok`
    pub fn into_result(self) -> SmbResult<()> {
        match self.outcome() {
            StatusOutcome::Success => Ok(()),
            StatusOutcome::Error(kind) => Err(SmbError::from_status(kind, self)),
        }
    }
}

impl fmt::Display for NtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} (0x{:08X})", name, self.0),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}

impl From<u32> for NtStatus {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

/// Outcome of the translation of a raw status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    Success,
    Error(SmbErrorKind),
}

/// Status name and error kind; `None` marks a benign status which never raises.
/// Statuses missing from the table translate to [`SmbErrorKind::ProtocolError`].
static STATUS_TABLE: &[(NtStatus, &str, Option<SmbErrorKind>)] = &[
    // benign
    (NtStatus::STATUS_SUCCESS, "STATUS_SUCCESS", None),
    (NtStatus::STATUS_PENDING, "STATUS_PENDING", None),
    (NtStatus::STATUS_CANCELLED, "STATUS_CANCELLED", None),
    // not found
    (
        NtStatus::STATUS_NO_SUCH_FILE,
        "STATUS_NO_SUCH_FILE",
        Some(SmbErrorKind::NotFound),
    ),
    (
        NtStatus::STATUS_NO_SUCH_DEVICE,
        "STATUS_NO_SUCH_DEVICE",
        Some(SmbErrorKind::NotFound),
    ),
    (
        NtStatus::STATUS_OBJECT_NAME_NOT_FOUND,
        "STATUS_OBJECT_NAME_NOT_FOUND",
        Some(SmbErrorKind::NotFound),
    ),
    (
        NtStatus::STATUS_BAD_NETWORK_NAME,
        "STATUS_BAD_NETWORK_NAME",
        Some(SmbErrorKind::NotFound),
    ),
    (
        NtStatus::STATUS_NETWORK_NAME_DELETED,
        "STATUS_NETWORK_NAME_DELETED",
        Some(SmbErrorKind::NotFound),
    ),
    // path not found
    (
        NtStatus::STATUS_OBJECT_PATH_INVALID,
        "STATUS_OBJECT_PATH_INVALID",
        Some(SmbErrorKind::PathNotFound),
    ),
    (
        NtStatus::STATUS_OBJECT_PATH_NOT_FOUND,
        "STATUS_OBJECT_PATH_NOT_FOUND",
        Some(SmbErrorKind::PathNotFound),
    ),
    (
        NtStatus::STATUS_OBJECT_PATH_SYNTAX_BAD,
        "STATUS_OBJECT_PATH_SYNTAX_BAD",
        Some(SmbErrorKind::PathNotFound),
    ),
    (
        NtStatus::STATUS_NOT_A_DIRECTORY,
        "STATUS_NOT_A_DIRECTORY",
        Some(SmbErrorKind::PathNotFound),
    ),
    (
        NtStatus::STATUS_OBJECT_NAME_INVALID,
        "STATUS_OBJECT_NAME_INVALID",
        Some(SmbErrorKind::InvalidPath),
    ),
    // access denied
    (
        NtStatus::STATUS_ACCESS_DENIED,
        "STATUS_ACCESS_DENIED",
        Some(SmbErrorKind::AccessDenied),
    ),
    (
        NtStatus::STATUS_DELETE_PENDING,
        "STATUS_DELETE_PENDING",
        Some(SmbErrorKind::AccessDenied),
    ),
    (
        NtStatus::STATUS_PRIVILEGE_NOT_HELD,
        "STATUS_PRIVILEGE_NOT_HELD",
        Some(SmbErrorKind::AccessDenied),
    ),
    (
        NtStatus::STATUS_FILE_IS_A_DIRECTORY,
        "STATUS_FILE_IS_A_DIRECTORY",
        Some(SmbErrorKind::AccessDenied),
    ),
    (
        NtStatus::STATUS_CANNOT_DELETE,
        "STATUS_CANNOT_DELETE",
        Some(SmbErrorKind::AccessDenied),
    ),
    (
        NtStatus::STATUS_OS2_INVALID_ACCESS,
        "STATUS_OS2_INVALID_ACCESS",
        Some(SmbErrorKind::AccessDenied),
    ),
    (
        NtStatus::STATUS_SHARING_VIOLATION,
        "STATUS_SHARING_VIOLATION",
        Some(SmbErrorKind::AccessDenied),
    ),
    (
        NtStatus::STATUS_FILE_LOCK_CONFLICT,
        "STATUS_FILE_LOCK_CONFLICT",
        Some(SmbErrorKind::AccessDenied),
    ),
    (
        NtStatus::STATUS_LOCK_NOT_GRANTED,
        "STATUS_LOCK_NOT_GRANTED",
        Some(SmbErrorKind::AccessDenied),
    ),
    (
        NtStatus::STATUS_RANGE_NOT_LOCKED,
        "STATUS_RANGE_NOT_LOCKED",
        Some(SmbErrorKind::AccessDenied),
    ),
    // authentication
    (
        NtStatus::STATUS_LOGON_FAILURE,
        "STATUS_LOGON_FAILURE",
        Some(SmbErrorKind::AuthenticationFailed),
    ),
    (
        NtStatus::STATUS_ACCOUNT_RESTRICTION,
        "STATUS_ACCOUNT_RESTRICTION",
        Some(SmbErrorKind::AuthenticationFailed),
    ),
    (
        NtStatus::STATUS_INVALID_LOGON_HOURS,
        "STATUS_INVALID_LOGON_HOURS",
        Some(SmbErrorKind::AuthenticationFailed),
    ),
    (
        NtStatus::STATUS_INVALID_WORKSTATION,
        "STATUS_INVALID_WORKSTATION",
        Some(SmbErrorKind::AuthenticationFailed),
    ),
    (
        NtStatus::STATUS_PASSWORD_EXPIRED,
        "STATUS_PASSWORD_EXPIRED",
        Some(SmbErrorKind::AuthenticationFailed),
    ),
    (
        NtStatus::STATUS_ACCOUNT_DISABLED,
        "STATUS_ACCOUNT_DISABLED",
        Some(SmbErrorKind::AuthenticationFailed),
    ),
    (
        NtStatus::STATUS_LOGON_TYPE_NOT_GRANTED,
        "STATUS_LOGON_TYPE_NOT_GRANTED",
        Some(SmbErrorKind::AuthenticationFailed),
    ),
    (
        NtStatus::STATUS_ACCOUNT_EXPIRED,
        "STATUS_ACCOUNT_EXPIRED",
        Some(SmbErrorKind::AuthenticationFailed),
    ),
    (
        NtStatus::STATUS_PASSWORD_MUST_CHANGE,
        "STATUS_PASSWORD_MUST_CHANGE",
        Some(SmbErrorKind::AuthenticationFailed),
    ),
    (
        NtStatus::STATUS_ACCOUNT_LOCKED_OUT,
        "STATUS_ACCOUNT_LOCKED_OUT",
        Some(SmbErrorKind::AuthenticationFailed),
    ),
    (
        NtStatus::SEC_E_INVALID_TOKEN,
        "SEC_E_INVALID_TOKEN",
        Some(SmbErrorKind::AuthenticationFailed),
    ),
    // collisions
    (
        NtStatus::STATUS_OBJECT_NAME_COLLISION,
        "STATUS_OBJECT_NAME_COLLISION",
        Some(SmbErrorKind::AlreadyExists),
    ),
    (
        NtStatus::STATUS_DIRECTORY_NOT_EMPTY,
        "STATUS_DIRECTORY_NOT_EMPTY",
        Some(SmbErrorKind::DirectoryNotEmpty),
    ),
    // server limits
    (
        NtStatus::STATUS_TOO_MANY_OPENED_FILES,
        "STATUS_TOO_MANY_OPENED_FILES",
        Some(SmbErrorKind::TooManyHandles),
    ),
    (
        NtStatus::STATUS_OS2_NO_MORE_SIDS,
        "STATUS_OS2_NO_MORE_SIDS",
        Some(SmbErrorKind::TooManyHandles),
    ),
    (
        NtStatus::STATUS_INSUFF_SERVER_RESOURCES,
        "STATUS_INSUFF_SERVER_RESOURCES",
        Some(SmbErrorKind::ResourceExhausted),
    ),
    (
        NtStatus::STATUS_DISK_FULL,
        "STATUS_DISK_FULL",
        Some(SmbErrorKind::ResourceExhausted),
    ),
    // unsupported
    (
        NtStatus::STATUS_NOT_IMPLEMENTED,
        "STATUS_NOT_IMPLEMENTED",
        Some(SmbErrorKind::Unsupported),
    ),
    (
        NtStatus::STATUS_NOT_SUPPORTED,
        "STATUS_NOT_SUPPORTED",
        Some(SmbErrorKind::Unsupported),
    ),
    (
        NtStatus::STATUS_INVALID_DEVICE_REQUEST,
        "STATUS_INVALID_DEVICE_REQUEST",
        Some(SmbErrorKind::Unsupported),
    ),
    // network
    (
        NtStatus::STATUS_IO_TIMEOUT,
        "STATUS_IO_TIMEOUT",
        Some(SmbErrorKind::HostUnreachable),
    ),
    (
        NtStatus::STATUS_CONNECTION_REFUSED,
        "STATUS_CONNECTION_REFUSED",
        Some(SmbErrorKind::HostUnreachable),
    ),
    (
        NtStatus::STATUS_NETWORK_UNREACHABLE,
        "STATUS_NETWORK_UNREACHABLE",
        Some(SmbErrorKind::HostUnreachable),
    ),
    (
        NtStatus::STATUS_HOST_UNREACHABLE,
        "STATUS_HOST_UNREACHABLE",
        Some(SmbErrorKind::HostUnreachable),
    ),
    // everything else is a protocol error, named for diagnostics
    (
        NtStatus::STATUS_NOTIFY_ENUM_DIR,
        "STATUS_NOTIFY_ENUM_DIR",
        Some(SmbErrorKind::ProtocolError),
    ),
    (
        NtStatus::STATUS_INVALID_SMB,
        "STATUS_INVALID_SMB",
        Some(SmbErrorKind::ProtocolError),
    ),
    (
        NtStatus::STATUS_SMB_BAD_FID,
        "STATUS_SMB_BAD_FID",
        Some(SmbErrorKind::ProtocolError),
    ),
    (
        NtStatus::STATUS_OS2_INVALID_LEVEL,
        "STATUS_OS2_INVALID_LEVEL",
        Some(SmbErrorKind::ProtocolError),
    ),
    (
        NtStatus::STATUS_BUFFER_OVERFLOW,
        "STATUS_BUFFER_OVERFLOW",
        Some(SmbErrorKind::ProtocolError),
    ),
    (
        NtStatus::STATUS_NO_MORE_FILES,
        "STATUS_NO_MORE_FILES",
        Some(SmbErrorKind::ProtocolError),
    ),
    (
        NtStatus::STATUS_UNSUCCESSFUL,
        "STATUS_UNSUCCESSFUL",
        Some(SmbErrorKind::ProtocolError),
    ),
    (
        NtStatus::STATUS_INVALID_INFO_CLASS,
        "STATUS_INVALID_INFO_CLASS",
        Some(SmbErrorKind::ProtocolError),
    ),
    (
        NtStatus::STATUS_INVALID_HANDLE,
        "STATUS_INVALID_HANDLE",
        Some(SmbErrorKind::ProtocolError),
    ),
    (
        NtStatus::STATUS_INVALID_PARAMETER,
        "STATUS_INVALID_PARAMETER",
        Some(SmbErrorKind::ProtocolError),
    ),
    (
        NtStatus::STATUS_END_OF_FILE,
        "STATUS_END_OF_FILE",
        Some(SmbErrorKind::ProtocolError),
    ),
    (
        NtStatus::STATUS_MORE_PROCESSING_REQUIRED,
        "STATUS_MORE_PROCESSING_REQUIRED",
        Some(SmbErrorKind::ProtocolError),
    ),
    (
        NtStatus::STATUS_DATA_ERROR,
        "STATUS_DATA_ERROR",
        Some(SmbErrorKind::ProtocolError),
    ),
    (
        NtStatus::STATUS_FILE_CLOSED,
        "STATUS_FILE_CLOSED",
        Some(SmbErrorKind::ProtocolError),
    ),
];
