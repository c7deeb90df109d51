//! # client
//!
//! Handle-oriented SMB client interface consumed by the engine.
//!
//! The wire protocol (framing, authentication handshake, transport negotiation) lives behind
//! these traits; the engine only drives sessions, tree connects and file handles.

use std::io;
use std::net::SocketAddr;
use std::time::SystemTime;

use bitflags::bitflags;

use crate::config::TransportType;
use crate::credentials::SmbCredential;
use crate::status::NtStatus;

// -- libsmbclient backend

#[cfg(all(target_family = "unix", feature = "pavao"))]
mod smbclient;
#[cfg(all(target_family = "unix", feature = "pavao"))]
pub use smbclient::PavaoClientFactory;

/// Opaque reference to an open file or directory, valid inside the tree connect which created it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileHandle(u64);

impl FileHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

bitflags! {
    /// Access rights requested when opening a handle
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AccessMask: u32 {
        const FILE_READ_DATA = 0x0000_0001;
        const FILE_WRITE_DATA = 0x0000_0002;
        const FILE_APPEND_DATA = 0x0000_0004;
        const FILE_READ_EA = 0x0000_0008;
        const FILE_WRITE_EA = 0x0000_0010;
        const FILE_READ_ATTRIBUTES = 0x0000_0080;
        const FILE_WRITE_ATTRIBUTES = 0x0000_0100;
        const DELETE = 0x0001_0000;
        const SYNCHRONIZE = 0x0010_0000;
        const MAXIMUM_ALLOWED = 0x0200_0000;
        const GENERIC_ALL = 0x1000_0000;
        const GENERIC_WRITE = 0x4000_0000;
        const GENERIC_READ = 0x8000_0000;
    }
}

bitflags! {
    /// Sharing mode granted to other openers while the handle is open
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ShareAccess: u32 {
        const READ = 0x0000_0001;
        const WRITE = 0x0000_0002;
        const DELETE = 0x0000_0004;
    }
}

bitflags! {
    /// Create options of a create request
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CreateOptions: u32 {
        const FILE_DIRECTORY_FILE = 0x0000_0001;
        const FILE_WRITE_THROUGH = 0x0000_0002;
        const FILE_SEQUENTIAL_ONLY = 0x0000_0004;
        const FILE_SYNCHRONOUS_IO_NONALERT = 0x0000_0020;
        const FILE_NON_DIRECTORY_FILE = 0x0000_0040;
        const FILE_DELETE_ON_CLOSE = 0x0000_1000;
    }
}

bitflags! {
    /// File attributes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FileAttributes: u32 {
        const READONLY = 0x0000_0001;
        const HIDDEN = 0x0000_0002;
        const SYSTEM = 0x0000_0004;
        const DIRECTORY = 0x0000_0010;
        const ARCHIVE = 0x0000_0020;
        const NORMAL = 0x0000_0080;
        const TEMPORARY = 0x0000_0100;
        const REPARSE_POINT = 0x0000_0400;
    }
}

/// What the server does when the target exists or not
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateDisposition {
    /// Replace if exists, create otherwise
    Supersede,
    /// Open if exists, fail otherwise
    Open,
    /// Fail if exists, create otherwise
    Create,
    /// Open if exists, create otherwise
    OpenIf,
    /// Overwrite if exists, fail otherwise
    Overwrite,
    /// Overwrite if exists, create otherwise
    OverwriteIf,
}

/// What the server actually did on create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Superseded,
    Opened,
    Created,
    Overwritten,
}

/// An entry returned by a directory query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub attributes: FileAttributes,
    pub creation_time: SystemTime,
    pub last_access_time: SystemTime,
    pub last_write_time: SystemTime,
    pub change_time: SystemTime,
    pub end_of_file: u64,
}

impl DirectoryEntry {
    pub fn is_directory(&self) -> bool {
        self.attributes.contains(FileAttributes::DIRECTORY)
    }
}

/// Timestamps, size and attributes of an open handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNetworkOpenInformation {
    pub creation_time: SystemTime,
    pub last_access_time: SystemTime,
    pub last_write_time: SystemTime,
    pub change_time: SystemTime,
    pub end_of_file: u64,
    pub attributes: FileAttributes,
}

impl FileNetworkOpenInformation {
    pub fn is_directory(&self) -> bool {
        self.attributes.contains(FileAttributes::DIRECTORY)
    }
}

/// Information set on an open handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetFileInformation {
    /// Update timestamps; `None` leaves the value untouched
    Basic {
        creation_time: Option<SystemTime>,
        last_access_time: Option<SystemTime>,
        last_write_time: Option<SystemTime>,
    },
    /// Rename the handle target to `target`, a path relative to the share
    Rename { target: String, replace: bool },
}

/// Opens transport connections to SMB servers
pub trait SmbClientFactory: Send + Sync {
    /// Connect to `address` with the provided transport
    fn connect(&self, address: SocketAddr, transport: TransportType)
        -> io::Result<Box<dyn SmbSession>>;
}

/// A transport connection to a server, authenticated with `login`
pub trait SmbSession: Send {
    fn login(&mut self, credential: &SmbCredential) -> NtStatus;

    /// Bind the session to a share
    fn tree_connect(&mut self, share: &str) -> Result<Box<dyn SmbFileStore>, NtStatus>;

    fn logoff(&mut self) -> NtStatus;

    /// Close the transport connection
    fn disconnect(&mut self);
}

/// A share bound by a tree connect. Paths are relative to the share root and backslash separated.
pub trait SmbFileStore: Send {
    fn create_file(
        &mut self,
        path: &str,
        access: AccessMask,
        attributes: FileAttributes,
        share_access: ShareAccess,
        disposition: CreateDisposition,
        options: CreateOptions,
    ) -> Result<(FileHandle, FileStatus), NtStatus>;

    /// List the directory opened by `handle`, filtered by the glob `pattern`
    fn query_directory(
        &mut self,
        handle: &FileHandle,
        pattern: &str,
    ) -> Result<Vec<DirectoryEntry>, NtStatus>;

    fn query_information(
        &mut self,
        handle: &FileHandle,
    ) -> Result<FileNetworkOpenInformation, NtStatus>;

    fn set_information(&mut self, handle: &FileHandle, information: SetFileInformation)
        -> NtStatus;

    fn read_file(
        &mut self,
        handle: &FileHandle,
        offset: u64,
        length: u32,
    ) -> Result<Vec<u8>, NtStatus>;

    /// Write `data` at `offset`, returning the amount of bytes written
    fn write_file(&mut self, handle: &FileHandle, offset: u64, data: &[u8])
        -> Result<u32, NtStatus>;

    fn close_file(&mut self, handle: FileHandle) -> NtStatus;

    /// Disconnect from the share
    fn disconnect(&mut self) -> NtStatus;
}
