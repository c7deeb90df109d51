//! # smbclient
//!
//! `SmbClientFactory` backed by libsmbclient through `pavao`.
//!
//! libsmbclient is path oriented, so handles are emulated: a handle remembers the path it was
//! opened on, reads are served from a buffer filled on the first read, and writes are buffered
//! and flushed when the handle is closed. Protocol statuses are derived from a `stat` of the
//! target before each namespace operation.

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use glob::{MatchOptions, Pattern};
use libc::mode_t;
use pavao::{
    SmbClient, SmbCredentials, SmbDirentType, SmbMode, SmbOpenOptions, SmbOptions, SmbStat,
};

use super::{
    AccessMask, CreateDisposition, CreateOptions, DirectoryEntry, FileAttributes, FileHandle,
    FileNetworkOpenInformation, FileStatus, SetFileInformation, ShareAccess, SmbClientFactory,
    SmbFileStore, SmbSession,
};
use crate::config::TransportType;
use crate::credentials::SmbCredential;
use crate::status::NtStatus;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DIRECTORY_MODE: mode_t = 0o755;
const FILE_MODE: mode_t = 0o644;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Client factory opening libsmbclient contexts
#[derive(Debug, Clone, Default)]
pub struct PavaoClientFactory {
    workgroup: Option<String>,
    case_sensitive: bool,
}

impl PavaoClientFactory {
    /// Workgroup used when the credential carries no domain
    pub fn workgroup<S: AsRef<str>>(mut self, workgroup: S) -> Self {
        self.workgroup = Some(workgroup.as_ref().to_string());
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }
}

impl SmbClientFactory for PavaoClientFactory {
    fn connect(
        &self,
        address: SocketAddr,
        transport: TransportType,
    ) -> io::Result<Box<dyn SmbSession>> {
        trace!("probing {} ({:?})", address, transport);
        // libsmbclient opens its own connection; make sure the server answers first
        TcpStream::connect_timeout(&address, CONNECT_TIMEOUT)?;
        Ok(Box::new(PavaoSession {
            address,
            factory: self.clone(),
            credential: None,
        }))
    }
}

struct PavaoSession {
    address: SocketAddr,
    factory: PavaoClientFactory,
    credential: Option<SmbCredential>,
}

impl SmbSession for PavaoSession {
    fn login(&mut self, credential: &SmbCredential) -> NtStatus {
        // authentication happens when the context binds a share
        self.credential = Some(credential.clone());
        NtStatus::STATUS_SUCCESS
    }

    fn tree_connect(&mut self, share: &str) -> Result<Box<dyn SmbFileStore>, NtStatus> {
        let credential = self
            .credential
            .as_ref()
            .ok_or(NtStatus::STATUS_LOGON_FAILURE)?;
        let workgroup = credential
            .get_domain()
            .map(str::to_string)
            .or_else(|| self.factory.workgroup.clone())
            .unwrap_or_default();
        let credentials = SmbCredentials::default()
            .server(format!("smb://{}", self.address))
            .share(format!("/{share}"))
            .username(credential.get_username().unwrap_or_default())
            .password(credential.get_password().unwrap_or_default())
            .workgroup(workgroup);
        let options = SmbOptions::default()
            .case_sensitive(self.factory.case_sensitive)
            .one_share_per_server(true);
        let client = SmbClient::new(credentials, options).map_err(|e| {
            error!("failed to initialize smb context: {}", e);
            NtStatus::STATUS_UNSUCCESSFUL
        })?;
        if let Err(e) = client.stat("/") {
            error!("cannot bind share {}: {}", share, e);
            return Err(NtStatus::STATUS_BAD_NETWORK_NAME);
        }
        debug!("bound share {} on {}", share, self.address);
        Ok(Box::new(PavaoFileStore {
            client,
            handles: HashMap::new(),
            next_handle: 1,
        }))
    }

    fn logoff(&mut self) -> NtStatus {
        self.credential = None;
        NtStatus::STATUS_SUCCESS
    }

    fn disconnect(&mut self) {
        trace!("session with {} closed", self.address);
    }
}

struct OpenFile {
    path: String,
    directory: bool,
    delete_on_close: bool,
    /// Content served to reads, loaded on the first read
    content: Option<Vec<u8>>,
    /// Size of the file when the handle was opened
    size: u64,
    pending: Vec<u8>,
}

impl OpenFile {
    /// Buffer `data`; writes must continue at the end of the file
    fn buffer_write(&mut self, offset: u64, data: &[u8]) -> Result<u32, NtStatus> {
        if offset != self.size + self.pending.len() as u64 {
            return Err(NtStatus::STATUS_NOT_SUPPORTED);
        }
        self.pending.extend_from_slice(data);
        Ok(data.len() as u32)
    }
}

struct PavaoFileStore {
    client: SmbClient,
    handles: HashMap<u64, OpenFile>,
    next_handle: u64,
}

impl PavaoFileStore {
    fn stat(&self, uri: &str) -> Option<SmbStat> {
        self.client.stat(uri).ok()
    }

    fn handle(&mut self, handle: &FileHandle) -> Result<&mut OpenFile, NtStatus> {
        self.handles
            .get_mut(&handle.id())
            .ok_or(NtStatus::STATUS_INVALID_HANDLE)
    }

    fn check_parent(&self, uri: &str) -> Result<(), NtStatus> {
        match parent_uri(uri) {
            None => Ok(()),
            Some(parent) => match self.stat(&parent) {
                Some(stat) if stat.mode.is_dir() => Ok(()),
                _ => Err(NtStatus::STATUS_OBJECT_PATH_NOT_FOUND),
            },
        }
    }

    fn create_new(&self, uri: &str, directory: bool) -> Result<(), NtStatus> {
        if directory {
            self.client
                .mkdir(uri, SmbMode::from(DIRECTORY_MODE))
                .map_err(|e| failure("mkdir", uri, e, NtStatus::STATUS_ACCESS_DENIED))
        } else {
            self.client
                .open_with(
                    uri,
                    SmbOpenOptions::default()
                        .create(true)
                        .write(true)
                        .mode(FILE_MODE),
                )
                .map(|_| ())
                .map_err(|e| failure("create", uri, e, NtStatus::STATUS_ACCESS_DENIED))
        }
    }

    fn remove(&self, file: &OpenFile) -> NtStatus {
        if file.path == "/" {
            return NtStatus::STATUS_CANNOT_DELETE;
        }
        let result = if file.directory {
            if self.list(&file.path).map(|e| !e.is_empty()).unwrap_or(false) {
                return NtStatus::STATUS_DIRECTORY_NOT_EMPTY;
            }
            self.client.rmdir(file.path.as_str())
        } else {
            self.client.unlink(file.path.as_str())
        };
        match result {
            Ok(()) => NtStatus::STATUS_SUCCESS,
            Err(e) => failure("delete", &file.path, e, NtStatus::STATUS_ACCESS_DENIED),
        }
    }

    fn flush(&self, file: &OpenFile) -> NtStatus {
        if file.pending.is_empty() {
            return NtStatus::STATUS_SUCCESS;
        }
        trace!("flushing {} bytes to {}", file.pending.len(), file.path);
        let mut remote = match self.client.open_with(
            file.path.as_str(),
            SmbOpenOptions::default()
                .create(true)
                .append(true)
                .write(true)
                .mode(FILE_MODE),
        ) {
            Ok(remote) => remote,
            Err(e) => return failure("open", &file.path, e, NtStatus::STATUS_ACCESS_DENIED),
        };
        match remote.write_all(&file.pending) {
            Ok(()) => NtStatus::STATUS_SUCCESS,
            Err(e) => failure("write", &file.path, e, NtStatus::STATUS_UNSUCCESSFUL),
        }
    }

    fn list(&self, uri: &str) -> Result<Vec<(String, SmbStat)>, NtStatus> {
        let dirents = self
            .client
            .list_dir(uri)
            .map_err(|e| failure("list", uri, e, NtStatus::STATUS_ACCESS_DENIED))?;
        Ok(dirents
            .into_iter()
            .filter(|d| d.get_type() == SmbDirentType::File || d.get_type() == SmbDirentType::Dir)
            .filter(|d| d.name() != "." && d.name() != "..")
            .filter_map(|d| {
                let name = d.name().to_string();
                self.stat(&join_uri(uri, &name)).map(|stat| (name, stat))
            })
            .collect())
    }
}

impl SmbFileStore for PavaoFileStore {
    fn create_file(
        &mut self,
        path: &str,
        _access: AccessMask,
        _attributes: FileAttributes,
        _share_access: ShareAccess,
        disposition: CreateDisposition,
        options: CreateOptions,
    ) -> Result<(FileHandle, FileStatus), NtStatus> {
        let uri = to_uri(path);
        let want_directory = options.contains(CreateOptions::FILE_DIRECTORY_FILE);
        let existing = self.stat(&uri);
        if existing.is_none() {
            self.check_parent(&uri)?;
        }
        if let Some(stat) = &existing {
            if want_directory && !stat.mode.is_dir() {
                return Err(NtStatus::STATUS_NOT_A_DIRECTORY);
            }
            if options.contains(CreateOptions::FILE_NON_DIRECTORY_FILE) && stat.mode.is_dir() {
                return Err(NtStatus::STATUS_FILE_IS_A_DIRECTORY);
            }
        }
        let status = match (disposition, existing.as_ref()) {
            (CreateDisposition::Open | CreateDisposition::Overwrite, None) => {
                return Err(NtStatus::STATUS_OBJECT_NAME_NOT_FOUND)
            }
            (CreateDisposition::Create, Some(_)) => {
                return Err(NtStatus::STATUS_OBJECT_NAME_COLLISION)
            }
            (CreateDisposition::Open | CreateDisposition::OpenIf, Some(_)) => FileStatus::Opened,
            (
                CreateDisposition::Overwrite
                | CreateDisposition::OverwriteIf
                | CreateDisposition::Supersede,
                Some(stat),
            ) => {
                if !stat.mode.is_dir() {
                    self.client
                        .unlink(uri.as_str())
                        .map_err(|e| failure("truncate", &uri, e, NtStatus::STATUS_ACCESS_DENIED))?;
                    self.create_new(&uri, false)?;
                }
                match disposition {
                    CreateDisposition::Supersede => FileStatus::Superseded,
                    _ => FileStatus::Overwritten,
                }
            }
            (_, None) => {
                self.create_new(&uri, want_directory)?;
                FileStatus::Created
            }
        };
        let stat = self.stat(&uri).ok_or(NtStatus::STATUS_OBJECT_NAME_NOT_FOUND)?;
        let handle = FileHandle::new(self.next_handle);
        self.next_handle += 1;
        trace!("opened {} as handle {} ({:?})", uri, handle.id(), status);
        self.handles.insert(
            handle.id(),
            OpenFile {
                path: uri,
                directory: stat.mode.is_dir(),
                delete_on_close: options.contains(CreateOptions::FILE_DELETE_ON_CLOSE),
                content: None,
                size: stat.size,
                pending: Vec::new(),
            },
        );
        Ok((handle, status))
    }

    fn query_directory(
        &mut self,
        handle: &FileHandle,
        pattern: &str,
    ) -> Result<Vec<DirectoryEntry>, NtStatus> {
        let path = self.handle(handle)?.path.clone();
        let pattern = Pattern::new(pattern).map_err(|_| NtStatus::STATUS_OBJECT_NAME_INVALID)?;
        let entries: Vec<DirectoryEntry> = self
            .list(&path)?
            .into_iter()
            .filter(|(name, _)| pattern.matches_with(name, MATCH_OPTIONS))
            .map(|(name, stat)| DirectoryEntry {
                name,
                attributes: stat_attributes(&stat),
                creation_time: stat.created,
                last_access_time: stat.accessed,
                last_write_time: stat.modified,
                change_time: stat.modified,
                end_of_file: stat.size,
            })
            .collect();
        if entries.is_empty() {
            Err(NtStatus::STATUS_NO_MORE_FILES)
        } else {
            Ok(entries)
        }
    }

    fn query_information(
        &mut self,
        handle: &FileHandle,
    ) -> Result<FileNetworkOpenInformation, NtStatus> {
        let file = self.handle(handle)?;
        let path = file.path.clone();
        let pending = file.pending.len() as u64;
        let stat = self
            .stat(&path)
            .ok_or(NtStatus::STATUS_OBJECT_NAME_NOT_FOUND)?;
        Ok(FileNetworkOpenInformation {
            creation_time: stat.created,
            last_access_time: stat.accessed,
            last_write_time: stat.modified,
            change_time: stat.modified,
            end_of_file: stat.size + pending,
            attributes: stat_attributes(&stat),
        })
    }

    fn set_information(
        &mut self,
        handle: &FileHandle,
        information: SetFileInformation,
    ) -> NtStatus {
        let path = match self.handle(handle) {
            Ok(file) => file.path.clone(),
            Err(status) => return status,
        };
        match information {
            SetFileInformation::Basic { .. } => {
                warn!("libsmbclient cannot set times on {}", path);
                NtStatus::STATUS_NOT_SUPPORTED
            }
            SetFileInformation::Rename { target, replace } => {
                let target = to_uri(&target);
                if let Err(status) = self.check_parent(&target) {
                    return status;
                }
                if !replace && self.stat(&target).is_some() {
                    return NtStatus::STATUS_OBJECT_NAME_COLLISION;
                }
                trace!("renaming {} to {}", path, target);
                match self.client.rename(path.as_str(), target.as_str()) {
                    Ok(()) => {
                        if let Ok(file) = self.handle(handle) {
                            file.path = target;
                        }
                        NtStatus::STATUS_SUCCESS
                    }
                    Err(e) => failure("rename", &path, e, NtStatus::STATUS_ACCESS_DENIED),
                }
            }
        }
    }

    fn read_file(
        &mut self,
        handle: &FileHandle,
        offset: u64,
        length: u32,
    ) -> Result<Vec<u8>, NtStatus> {
        let path = self.handle(handle)?.path.clone();
        if self.handle(handle)?.content.is_none() {
            let mut content = Vec::new();
            let mut remote = self
                .client
                .open_with(path.as_str(), SmbOpenOptions::default().read(true))
                .map_err(|e| failure("open", &path, e, NtStatus::STATUS_ACCESS_DENIED))?;
            remote
                .read_to_end(&mut content)
                .map_err(|e| failure("read", &path, e, NtStatus::STATUS_UNSUCCESSFUL))?;
            drop(remote);
            self.handle(handle)?.content = Some(content);
        }
        let content = self.handle(handle)?.content.as_deref().unwrap_or_default();
        let start = offset as usize;
        if start >= content.len() {
            return Err(NtStatus::STATUS_END_OF_FILE);
        }
        let end = content.len().min(start + length as usize);
        Ok(content[start..end].to_vec())
    }

    fn write_file(
        &mut self,
        handle: &FileHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<u32, NtStatus> {
        self.handle(handle)?.buffer_write(offset, data)
    }

    fn close_file(&mut self, handle: FileHandle) -> NtStatus {
        let Some(file) = self.handles.remove(&handle.id()) else {
            return NtStatus::STATUS_FILE_CLOSED;
        };
        let status = self.flush(&file);
        if !status.is_success() {
            return status;
        }
        if file.delete_on_close {
            self.remove(&file)
        } else {
            NtStatus::STATUS_SUCCESS
        }
    }

    fn disconnect(&mut self) -> NtStatus {
        if !self.handles.is_empty() {
            warn!("dropping {} open handles", self.handles.len());
            self.handles.clear();
        }
        NtStatus::STATUS_SUCCESS
    }
}

/// Convert a backslash separated share path to a libsmbclient path
fn to_uri(path: &str) -> String {
    let path = path.trim_matches('\\').replace('\\', "/");
    format!("/{path}")
}

fn parent_uri(uri: &str) -> Option<String> {
    match uri.trim_end_matches('/').rsplit_once('/') {
        Some(("", name)) if !name.is_empty() => Some("/".to_string()),
        Some((parent, _)) if !parent.is_empty() => Some(parent.to_string()),
        _ => None,
    }
}

fn join_uri(uri: &str, name: &str) -> String {
    format!("{}/{}", uri.trim_end_matches('/'), name)
}

fn stat_attributes(stat: &SmbStat) -> FileAttributes {
    if stat.mode.is_dir() {
        FileAttributes::DIRECTORY
    } else if stat.mode.is_symlink() {
        FileAttributes::REPARSE_POINT
    } else {
        FileAttributes::NORMAL
    }
}

fn failure(op: &str, uri: &str, err: impl std::fmt::Display, status: NtStatus) -> NtStatus {
    error!("{} failed on {}: {}", op, uri, err);
    status
}

#[cfg(test)]
mod test {

    use pretty_assertions::assert_eq;

    use super::*;

    fn open_file(size: u64) -> OpenFile {
        OpenFile {
            path: "/a.txt".to_string(),
            directory: false,
            delete_on_close: false,
            content: None,
            size,
            pending: Vec::new(),
        }
    }

    #[test]
    fn should_convert_share_path_to_uri() {
        assert_eq!(to_uri(""), "/");
        assert_eq!(to_uri("dir\\a.txt"), "/dir/a.txt");
        assert_eq!(to_uri("\\dir\\"), "/dir");
    }

    #[test]
    fn should_get_parent_uri() {
        assert_eq!(parent_uri("/"), None);
        assert_eq!(parent_uri("/a.txt").as_deref(), Some("/"));
        assert_eq!(parent_uri("/dir/a.txt").as_deref(), Some("/dir"));
        assert_eq!(join_uri("/", "a.txt"), "/a.txt");
        assert_eq!(join_uri("/dir", "a.txt"), "/dir/a.txt");
    }

    #[test]
    fn should_buffer_contiguous_writes() {
        let mut file = open_file(4);
        assert_eq!(file.buffer_write(4, b"hello").unwrap(), 5);
        assert_eq!(file.buffer_write(9, b"!").unwrap(), 1);
        assert_eq!(file.pending, b"hello!".to_vec());
        assert_eq!(
            file.buffer_write(0, b"x").unwrap_err(),
            NtStatus::STATUS_NOT_SUPPORTED
        );
    }

    #[test]
    fn should_match_names_case_insensitively() {
        let pattern = Pattern::new("*.TXT").unwrap();
        assert!(pattern.matches_with("a.txt", MATCH_OPTIONS));
        assert!(!pattern.matches_with("a.md", MATCH_OPTIONS));
    }
}
