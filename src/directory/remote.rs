//! # remote
//!
//! Directory verbs on share paths. Each top-level call runs in its own connection scope; every
//! handle is closed before the scope is released.

use chrono::{DateTime, Utc};
use glob::{MatchOptions, Pattern};
use remotefs::fs::UnixPex;
use remotefs::File;

use super::{Directory, SearchOption, DEFAULT_SEARCH_PATTERN};
use crate::client::{AccessMask, CreateDisposition, CreateOptions, DirectoryEntry, ShareAccess};
use crate::connection::{SmbConnection, SmbConnector};
use crate::credentials::SmbCredential;
use crate::error::{SmbError, SmbErrorKind, SmbResult};
use crate::file::{self, SmbFile};
use crate::info::{SmbDirectoryInfo, SmbDirectoryInfoFactory};
use crate::path::{SharePath, SmbPathExt};
use crate::status::NtStatus;
use crate::utils::smb as smb_utils;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// The remote directory engine
#[derive(Clone)]
pub struct RemoteDirectory {
    connector: SmbConnector,
    file: SmbFile,
    info: SmbDirectoryInfoFactory,
}

impl RemoteDirectory {
    pub fn new(connector: SmbConnector) -> Self {
        Self {
            file: SmbFile::new(connector.clone()),
            info: SmbDirectoryInfoFactory::new(connector.clone()),
            connector,
        }
    }

    pub fn connector(&self) -> &SmbConnector {
        &self.connector
    }

    pub fn file(&self) -> &SmbFile {
        &self.file
    }

    pub fn info(&self) -> &SmbDirectoryInfoFactory {
        &self.info
    }

    /// Parse `path`, resolve its credential and open a connection scope on its share
    fn scope(&self, path: &str) -> SmbResult<(SharePath, SmbConnection)> {
        let share_path = SharePath::parse(path)?;
        let credential = self.connector.credential(&share_path)?;
        let conn = self.connector.connect(&share_path, &credential)?;
        Ok((share_path, conn))
    }

    fn scope_with(
        &self,
        path: &str,
        credential: &SmbCredential,
    ) -> SmbResult<(SharePath, SmbConnection)> {
        let share_path = SharePath::parse(path)?;
        let conn = self.connector.connect(&share_path, credential)?;
        Ok((share_path, conn))
    }

    /// Fetch the info of `path`, let `update` change it and save it back
    fn update_info<F>(&self, path: &str, update: F) -> SmbResult<()>
    where
        F: FnOnce(&mut SmbDirectoryInfo),
    {
        let (share_path, mut conn) = self.scope(path)?;
        let mut info = SmbDirectoryInfo::query(&mut conn, &share_path)?;
        update(&mut info);
        info.apply(&mut conn, &share_path)
    }

    /// Entries of `path` which pass `filter`, as full paths with their directory entry
    fn enumerate<F>(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
        filter: F,
    ) -> SmbResult<Vec<(String, DirectoryEntry)>>
    where
        F: Fn(&DirectoryEntry) -> bool,
    {
        let (share_path, mut conn) = self.scope(path)?;
        let mut entries = Vec::new();
        match option {
            SearchOption::TopDirectoryOnly => {
                entries.extend(
                    list(&mut conn, &share_path, pattern)?
                        .into_iter()
                        .map(|entry| (path.combine_to_share_path(&entry.name), entry)),
                );
            }
            SearchOption::AllDirectories => {
                let pattern = Pattern::new(pattern).map_err(|e| {
                    SmbError::new_ex(
                        SmbErrorKind::InvalidPath,
                        format!("invalid search pattern {pattern}: {e}"),
                    )
                })?;
                walk(&mut conn, path, &pattern, &mut entries)?;
            }
        }
        debug!("found {} entries in {}", entries.len(), path);
        Ok(entries
            .into_iter()
            .filter(|(_, entry)| filter(entry))
            .collect())
    }

    fn move_with(
        &self,
        source: &str,
        dest: &str,
        source_credential: &SmbCredential,
        dest_credential: &SmbCredential,
    ) -> SmbResult<()> {
        debug!("moving directory {} to {}", source, dest);
        {
            let (dest_path, mut conn) = self.scope_with(dest, dest_credential)?;
            create_directory(&mut conn, &dest_path)?;
        }
        let entries = {
            let (source_path, mut conn) = self.scope_with(source, source_credential)?;
            list_with_hidden(&mut conn, &source_path)?
        };
        let (directories, files): (Vec<DirectoryEntry>, Vec<DirectoryEntry>) =
            entries.into_iter().partition(DirectoryEntry::is_directory);
        for entry in directories {
            self.move_with(
                &source.combine_to_share_path(&entry.name),
                &dest.combine_to_share_path(&entry.name),
                source_credential,
                dest_credential,
            )?;
        }
        for entry in files {
            self.file.move_file_with(
                &source.combine_to_share_path(&entry.name),
                &dest.combine_to_share_path(&entry.name),
                source_credential,
                dest_credential,
            )?;
        }
        let (source_path, mut conn) = self.scope_with(source, source_credential)?;
        delete_empty(&mut conn, &source_path)
    }
}

// -- operations inside a connection scope

/// List `path` with `pattern`; `.`, `..` and hidden markers are not reported
fn list(
    conn: &mut SmbConnection,
    path: &SharePath,
    pattern: &str,
) -> SmbResult<Vec<DirectoryEntry>> {
    let handle = conn.open_directory(
        &path.protocol_path(),
        AccessMask::GENERIC_READ,
        ShareAccess::READ | ShareAccess::DELETE,
    )?;
    conn.with_handle(handle, |conn, handle| conn.list_directory(handle, pattern))
}

/// List every child of `path`, hidden markers included
fn list_with_hidden(
    conn: &mut SmbConnection,
    path: &SharePath,
) -> SmbResult<Vec<DirectoryEntry>> {
    let handle = conn.open_directory(
        &path.protocol_path(),
        AccessMask::GENERIC_READ,
        ShareAccess::READ | ShareAccess::DELETE,
    )?;
    conn.with_handle(handle, |conn, handle| {
        conn.list_directory_with_hidden(handle, DEFAULT_SEARCH_PATTERN)
    })
}

fn create_directory(conn: &mut SmbConnection, path: &SharePath) -> SmbResult<()> {
    trace!("creating directory {}", path);
    let handle = conn.create_file(
        &path.protocol_path(),
        AccessMask::MAXIMUM_ALLOWED,
        ShareAccess::empty(),
        CreateDisposition::Create,
        CreateOptions::FILE_DIRECTORY_FILE,
    )?;
    conn.close(handle)
}

/// Delete `path`, which must have no children but hidden markers
fn delete_empty(conn: &mut SmbConnection, path: &SharePath) -> SmbResult<()> {
    if path.is_share_root() {
        return Err(SmbError::new_ex(
            SmbErrorKind::AccessDenied,
            format!("cannot delete the share root {path}"),
        ));
    }
    let (markers, children): (Vec<DirectoryEntry>, Vec<DirectoryEntry>) =
        list_with_hidden(conn, path)?
            .into_iter()
            .partition(|entry| !entry.is_directory() && conn.is_hidden_entry(&entry.name));
    if !children.is_empty() {
        error!("cannot delete {}: directory is not empty", path);
        return Err(SmbError::new_ex(
            SmbErrorKind::DirectoryNotEmpty,
            format!("cannot delete {path}: directory is not empty"),
        ));
    }
    let uri = path.to_string();
    for marker in markers {
        trace!("deleting hidden marker {} in {}", marker.name, path);
        file::delete_file(conn, &SharePath::parse(&uri.combine_to_share_path(&marker.name))?)?;
    }
    trace!("deleting directory {}", path);
    let handle = conn.create_file(
        &path.protocol_path(),
        AccessMask::DELETE,
        ShareAccess::DELETE,
        CreateDisposition::Open,
        CreateOptions::FILE_DELETE_ON_CLOSE | CreateOptions::FILE_DIRECTORY_FILE,
    )?;
    conn.close(handle)
}

/// Delete `path` with its content, children strictly before their parent
fn delete_recursive(conn: &mut SmbConnection, path: &str) -> SmbResult<()> {
    let share_path = SharePath::parse(path)?;
    for entry in list_with_hidden(conn, &share_path)? {
        let child = path.combine_to_share_path(&entry.name);
        if entry.is_directory() {
            delete_recursive(conn, &child)?;
        } else {
            file::delete_file(conn, &SharePath::parse(&child)?)?;
        }
    }
    delete_empty(conn, &share_path)
}

/// Collect the entries of `path` and of its subdirectories in pre-order.
///
/// Everything is listed and the pattern is matched here, so that directories not matching it are
/// still traversed.
fn walk(
    conn: &mut SmbConnection,
    path: &str,
    pattern: &Pattern,
    entries: &mut Vec<(String, DirectoryEntry)>,
) -> SmbResult<()> {
    let share_path = SharePath::parse(path)?;
    for entry in list(conn, &share_path, DEFAULT_SEARCH_PATTERN)? {
        let child = path.combine_to_share_path(&entry.name);
        let recurse = entry.is_directory();
        if pattern.matches_with(&entry.name, MATCH_OPTIONS) {
            entries.push((child.clone(), entry));
        }
        if recurse {
            walk(conn, &child, pattern, entries)?;
        }
    }
    Ok(())
}

fn is_within(path: &SharePath, ancestor: &SharePath) -> bool {
    if !path.same_share(ancestor) {
        return false;
    }
    let path = path.protocol_path().to_lowercase();
    let ancestor = ancestor.protocol_path().to_lowercase();
    ancestor.is_empty() || path == ancestor || path.starts_with(&format!("{ancestor}\\"))
}

impl Directory for RemoteDirectory {
    fn create_directory(&self, path: &str) -> SmbResult<File> {
        let (share_path, mut conn) = self.scope(path)?;
        create_directory(&mut conn, &share_path)?;
        debug!("created directory {}", share_path);
        SmbDirectoryInfo::query(&mut conn, &share_path).map(File::from)
    }

    fn delete(&self, path: &str, recursive: bool) -> SmbResult<()> {
        let (share_path, mut conn) = self.scope(path)?;
        if share_path.is_share_root() {
            error!("refusing to delete the share root {}", share_path);
            return Err(SmbError::new_ex(
                SmbErrorKind::AccessDenied,
                format!("cannot delete the share root {share_path}"),
            ));
        }
        debug!("deleting {} (recursive: {})", share_path, recursive);
        if recursive {
            delete_recursive(&mut conn, path)
        } else {
            delete_empty(&mut conn, &share_path)
        }
    }

    fn enumerate_directories(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
    ) -> SmbResult<Vec<String>> {
        self.enumerate(path, pattern, option, DirectoryEntry::is_directory)
            .map(|entries| entries.into_iter().map(|(path, _)| path).collect())
    }

    fn enumerate_files(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
    ) -> SmbResult<Vec<String>> {
        self.enumerate(path, pattern, option, |entry| !entry.is_directory())
            .map(|entries| entries.into_iter().map(|(path, _)| path).collect())
    }

    fn enumerate_file_system_entries(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
    ) -> SmbResult<Vec<String>> {
        self.enumerate(path, pattern, option, |_| true)
            .map(|entries| entries.into_iter().map(|(path, _)| path).collect())
    }

    fn enumerate_file_system_infos(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
    ) -> SmbResult<Vec<File>> {
        self.enumerate(path, pattern, option, |_| true).map(|entries| {
            entries
                .iter()
                .map(|(path, entry)| smb_utils::entry_to_file(path, entry))
                .collect()
        })
    }

    fn exists(&self, path: &str) -> SmbResult<bool> {
        let share_path = SharePath::parse(path)?;
        let credential = self.connector.credential(&share_path)?;
        let mut conn = match self.connector.connect(&share_path, &credential) {
            Ok(conn) => conn,
            Err(err) if err.status == Some(NtStatus::STATUS_BAD_NETWORK_NAME) => {
                debug!("share {} does not exist", share_path.share());
                return Ok(false);
            }
            Err(err) => return Err(err),
        };
        let Some(name) = share_path.file_name() else {
            return Ok(true);
        };
        let relative = share_path.protocol_path();
        let parent = relative
            .rsplit_once('\\')
            .map(|(parent, _)| parent)
            .unwrap_or_default();
        let handle = match conn.open_directory(
            parent,
            AccessMask::GENERIC_READ,
            ShareAccess::READ,
        ) {
            Ok(handle) => handle,
            Err(err) if err.is_not_found() => {
                debug!("parent of {} does not exist", share_path);
                return Ok(false);
            }
            Err(err) => return Err(err),
        };
        let entries = conn.with_handle(handle, |conn, handle| {
            conn.list_directory(handle, DEFAULT_SEARCH_PATTERN)
        })?;
        let exists = entries.iter().any(|entry| entry.name == name);
        debug!("{} exists: {}", share_path, exists);
        Ok(exists)
    }

    fn get_parent(&self, path: &str) -> SmbResult<File> {
        let parent = path.parent_path()?;
        trace!("parent of {} is {}", path, parent);
        self.info.from_directory_name(&parent).map(File::from)
    }

    fn move_directory(&self, source: &str, dest: &str) -> SmbResult<()> {
        let source_path = SharePath::parse(source)?;
        let dest_path = SharePath::parse(dest)?;
        if is_within(&dest_path, &source_path) {
            return Err(SmbError::new_ex(
                SmbErrorKind::InvalidPath,
                format!("cannot move {source} into itself"),
            ));
        }
        let source_credential = self.connector.credential(&source_path)?;
        let dest_credential = self.connector.credential(&dest_path)?;
        self.move_with(source, dest, &source_credential, &dest_credential)
    }

    fn get_directory_root(&self, path: &str) -> SmbResult<String> {
        path.share_path()
    }

    fn file_info(&self, path: &str) -> SmbResult<File> {
        self.info.from_directory_name(path).map(File::from)
    }

    fn get_access_control(&self, path: &str) -> SmbResult<UnixPex> {
        Err(SmbError::new_ex(
            SmbErrorKind::Unsupported,
            format!("access control is not supported on {path}"),
        ))
    }

    fn set_access_control(&self, path: &str, _mode: UnixPex) -> SmbResult<()> {
        Err(SmbError::new_ex(
            SmbErrorKind::Unsupported,
            format!("access control is not supported on {path}"),
        ))
    }

    fn get_current_directory(&self) -> SmbResult<String> {
        Err(SmbError::new_ex(
            SmbErrorKind::Unsupported,
            "current directory is not supported on shares",
        ))
    }

    fn set_current_directory(&self, path: &str) -> SmbResult<()> {
        Err(SmbError::new_ex(
            SmbErrorKind::Unsupported,
            format!("cannot set current directory to {path}"),
        ))
    }

    fn creation_time_utc(&self, path: &str) -> SmbResult<DateTime<Utc>> {
        self.info
            .from_directory_name(path)
            .map(|info| info.creation_time)
    }

    fn last_access_time_utc(&self, path: &str) -> SmbResult<DateTime<Utc>> {
        self.info
            .from_directory_name(path)
            .map(|info| info.last_access_time)
    }

    fn last_write_time_utc(&self, path: &str) -> SmbResult<DateTime<Utc>> {
        self.info
            .from_directory_name(path)
            .map(|info| info.last_write_time)
    }

    fn set_creation_time_utc(&self, path: &str, time: DateTime<Utc>) -> SmbResult<()> {
        self.update_info(path, |info| info.creation_time = time)
    }

    fn set_last_access_time_utc(&self, path: &str, time: DateTime<Utc>) -> SmbResult<()> {
        self.update_info(path, |info| info.last_access_time = time)
    }

    fn set_last_write_time_utc(&self, path: &str, time: DateTime<Utc>) -> SmbResult<()> {
        self.update_info(path, |info| info.last_write_time = time)
    }
}
