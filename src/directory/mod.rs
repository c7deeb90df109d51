//! # directory
//!
//! The directory verb surface, shared by the remote engine and the local filesystem, and the
//! dispatcher choosing between them by path.

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use remotefs::fs::UnixPex;
use remotefs::File;

use crate::client::SmbClientFactory;
use crate::config::SmbConfig;
use crate::connection::{AddressResolver, SmbConnector};
use crate::credentials::CredentialStore;
use crate::error::{SmbError, SmbErrorKind, SmbResult};
use crate::file::SmbFile;
use crate::info::SmbDirectoryInfoFactory;
use crate::path::SmbPathExt;

mod local;
mod remote;

pub use local::LocalDirectory;
pub use remote::RemoteDirectory;

/// Pattern matching every entry
pub const DEFAULT_SEARCH_PATTERN: &str = "*";

/// Recursion depth of enumerations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchOption {
    /// Only the entries of the directory itself
    #[default]
    TopDirectoryOnly,
    /// The entries of the directory and of all its subdirectories
    AllDirectories,
}

/// Filesystem verbs on directories, addressed by path strings
pub trait Directory: Send + Sync {
    /// Create the directory at `path` and return its metadata
    fn create_directory(&self, path: &str) -> SmbResult<File>;

    /// Delete the directory at `path`. Without `recursive` the directory must be empty.
    fn delete(&self, path: &str, recursive: bool) -> SmbResult<()>;

    /// Full paths of the subdirectories of `path` matching `pattern`
    fn enumerate_directories(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
    ) -> SmbResult<Vec<String>>;

    /// Full paths of the files in `path` matching `pattern`
    fn enumerate_files(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
    ) -> SmbResult<Vec<String>>;

    /// Full paths of files and directories in `path` matching `pattern`
    fn enumerate_file_system_entries(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
    ) -> SmbResult<Vec<String>>;

    /// Files and directories in `path` matching `pattern`, with their metadata
    fn enumerate_file_system_infos(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
    ) -> SmbResult<Vec<File>>;

    /// Returns whether `path` exists. Absence is not an error.
    fn exists(&self, path: &str) -> SmbResult<bool>;

    /// Metadata of the parent directory of `path`
    fn get_parent(&self, path: &str) -> SmbResult<File>;

    /// Move the directory `source` with all its content to `dest`
    fn move_directory(&self, source: &str, dest: &str) -> SmbResult<()>;

    /// Root of `path`: the share for remote paths
    fn get_directory_root(&self, path: &str) -> SmbResult<String>;

    /// Metadata of the file or directory at `path`
    fn file_info(&self, path: &str) -> SmbResult<File>;

    fn get_access_control(&self, path: &str) -> SmbResult<UnixPex>;

    fn set_access_control(&self, path: &str, mode: UnixPex) -> SmbResult<()>;

    fn get_current_directory(&self) -> SmbResult<String>;

    fn set_current_directory(&self, path: &str) -> SmbResult<()>;

    fn creation_time_utc(&self, path: &str) -> SmbResult<DateTime<Utc>>;

    fn last_access_time_utc(&self, path: &str) -> SmbResult<DateTime<Utc>>;

    fn last_write_time_utc(&self, path: &str) -> SmbResult<DateTime<Utc>>;

    fn set_creation_time_utc(&self, path: &str, time: DateTime<Utc>) -> SmbResult<()>;

    fn set_last_access_time_utc(&self, path: &str, time: DateTime<Utc>) -> SmbResult<()>;

    fn set_last_write_time_utc(&self, path: &str, time: DateTime<Utc>) -> SmbResult<()>;

    fn creation_time(&self, path: &str) -> SmbResult<DateTime<Local>> {
        self.creation_time_utc(path)
            .map(|time| time.with_timezone(&Local))
    }

    fn last_access_time(&self, path: &str) -> SmbResult<DateTime<Local>> {
        self.last_access_time_utc(path)
            .map(|time| time.with_timezone(&Local))
    }

    fn last_write_time(&self, path: &str) -> SmbResult<DateTime<Local>> {
        self.last_write_time_utc(path)
            .map(|time| time.with_timezone(&Local))
    }

    fn set_creation_time(&self, path: &str, time: DateTime<Local>) -> SmbResult<()> {
        self.set_creation_time_utc(path, time.with_timezone(&Utc))
    }

    fn set_last_access_time(&self, path: &str, time: DateTime<Local>) -> SmbResult<()> {
        self.set_last_access_time_utc(path, time.with_timezone(&Utc))
    }

    fn set_last_write_time(&self, path: &str, time: DateTime<Local>) -> SmbResult<()> {
        self.set_last_write_time_utc(path, time.with_timezone(&Utc))
    }
}

/// Directory verbs on any path: share paths go to the remote engine, everything else to the
/// local filesystem
pub struct SmbDirectory {
    remote: RemoteDirectory,
    local: Box<dyn Directory>,
}

impl SmbDirectory {
    pub fn new(
        factory: Arc<dyn SmbClientFactory>,
        credentials: Arc<dyn CredentialStore>,
        config: SmbConfig,
    ) -> Self {
        Self {
            remote: RemoteDirectory::new(SmbConnector::new(factory, credentials, config)),
            local: Box::new(LocalDirectory),
        }
    }

    /// Construct SmbDirectory with the provided address resolver
    pub fn with_resolver(self, resolver: Arc<dyn AddressResolver>) -> Self {
        Self {
            remote: RemoteDirectory::new(self.remote.connector().clone().resolver(resolver)),
            local: self.local,
        }
    }

    /// Construct SmbDirectory with the provided local filesystem
    pub fn with_local(mut self, local: Box<dyn Directory>) -> Self {
        self.local = local;
        self
    }

    pub fn remote(&self) -> &RemoteDirectory {
        &self.remote
    }

    /// File primitives bound to the same connector
    pub fn file(&self) -> &SmbFile {
        self.remote.file()
    }

    /// Directory metadata collaborator bound to the same connector
    pub fn info(&self) -> &SmbDirectoryInfoFactory {
        self.remote.info()
    }

    fn target(&self, path: &str) -> &dyn Directory {
        if path.is_smb_path() {
            trace!("{} is a share path", path);
            &self.remote
        } else {
            self.local.as_ref()
        }
    }
}

impl Directory for SmbDirectory {
    fn create_directory(&self, path: &str) -> SmbResult<File> {
        self.target(path).create_directory(path)
    }

    fn delete(&self, path: &str, recursive: bool) -> SmbResult<()> {
        self.target(path).delete(path, recursive)
    }

    fn enumerate_directories(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
    ) -> SmbResult<Vec<String>> {
        self.target(path)
            .enumerate_directories(path, pattern, option)
    }

    fn enumerate_files(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
    ) -> SmbResult<Vec<String>> {
        self.target(path).enumerate_files(path, pattern, option)
    }

    fn enumerate_file_system_entries(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
    ) -> SmbResult<Vec<String>> {
        self.target(path)
            .enumerate_file_system_entries(path, pattern, option)
    }

    fn enumerate_file_system_infos(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
    ) -> SmbResult<Vec<File>> {
        self.target(path)
            .enumerate_file_system_infos(path, pattern, option)
    }

    fn exists(&self, path: &str) -> SmbResult<bool> {
        self.target(path).exists(path)
    }

    fn get_parent(&self, path: &str) -> SmbResult<File> {
        self.target(path).get_parent(path)
    }

    fn move_directory(&self, source: &str, dest: &str) -> SmbResult<()> {
        if source.is_smb_path() != dest.is_smb_path() {
            error!("cannot move {} to {}: mixed share and local paths", source, dest);
            return Err(SmbError::new_ex(
                SmbErrorKind::Unsupported,
                "cannot move directories between shares and the local filesystem",
            ));
        }
        self.target(source).move_directory(source, dest)
    }

    fn get_directory_root(&self, path: &str) -> SmbResult<String> {
        self.target(path).get_directory_root(path)
    }

    fn file_info(&self, path: &str) -> SmbResult<File> {
        self.target(path).file_info(path)
    }

    fn get_access_control(&self, path: &str) -> SmbResult<UnixPex> {
        self.target(path).get_access_control(path)
    }

    fn set_access_control(&self, path: &str, mode: UnixPex) -> SmbResult<()> {
        self.target(path).set_access_control(path, mode)
    }

    /// There is no current directory on shares
    fn get_current_directory(&self) -> SmbResult<String> {
        Err(SmbError::new_ex(
            SmbErrorKind::Unsupported,
            "current directory is not supported",
        ))
    }

    fn set_current_directory(&self, path: &str) -> SmbResult<()> {
        self.target(path).set_current_directory(path)
    }

    fn creation_time_utc(&self, path: &str) -> SmbResult<DateTime<Utc>> {
        self.target(path).creation_time_utc(path)
    }

    fn last_access_time_utc(&self, path: &str) -> SmbResult<DateTime<Utc>> {
        self.target(path).last_access_time_utc(path)
    }

    fn last_write_time_utc(&self, path: &str) -> SmbResult<DateTime<Utc>> {
        self.target(path).last_write_time_utc(path)
    }

    fn set_creation_time_utc(&self, path: &str, time: DateTime<Utc>) -> SmbResult<()> {
        self.target(path).set_creation_time_utc(path, time)
    }

    fn set_last_access_time_utc(&self, path: &str, time: DateTime<Utc>) -> SmbResult<()> {
        self.target(path).set_last_access_time_utc(path, time)
    }

    fn set_last_write_time_utc(&self, path: &str, time: DateTime<Utc>) -> SmbResult<()> {
        self.target(path).set_last_write_time_utc(path, time)
    }
}
