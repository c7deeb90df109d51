//! ## Mock
//!
//! Contains mock for test units: the test logger and an in-memory SMB server implementing the
//! client traits

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use glob::{MatchOptions, Pattern};

use crate::client::{
    AccessMask, CreateDisposition, CreateOptions, DirectoryEntry, FileAttributes, FileHandle,
    FileNetworkOpenInformation, FileStatus, SetFileInformation, ShareAccess, SmbClientFactory,
    SmbFileStore, SmbSession,
};
use crate::config::{SmbConfig, TransportType, DEFAULT_HIDDEN_ENTRY};
use crate::connection::{AddressResolver, SmbConnector};
use crate::credentials::{InMemoryCredentialStore, SmbCredential};
use crate::directory::SmbDirectory;
use crate::status::NtStatus;

pub const HOST: &str = "host";
pub const SHARE: &str = "share";
pub const USERNAME: &str = "test";
pub const PASSWORD: &str = "test";
pub const ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));

// -- logger

#[allow(dead_code)]
pub fn logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Something the mock server has been asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    Connect(SocketAddr),
    Login(String),
    TreeConnect(String),
    Create(String),
    Query(String),
    Close { path: String, deleted: bool },
    Remove { path: String, directory: bool },
    SetInfo(String),
    Rename { from: String, to: String },
    TreeDisconnect(String),
    Logoff,
    Disconnect,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Directory,
    File(Vec<u8>),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    creation_time: SystemTime,
    last_access_time: SystemTime,
    last_write_time: SystemTime,
    change_time: SystemTime,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        let now = SystemTime::now();
        Self {
            kind,
            creation_time: now,
            last_access_time: now,
            last_write_time: now,
            change_time: now,
        }
    }

    fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory)
    }

    fn attributes(&self) -> FileAttributes {
        if self.is_directory() {
            FileAttributes::DIRECTORY
        } else {
            FileAttributes::ARCHIVE
        }
    }

    fn size(&self) -> u64 {
        match &self.kind {
            NodeKind::Directory => 0,
            NodeKind::File(data) => data.len() as u64,
        }
    }

    fn entry(&self, name: &str) -> DirectoryEntry {
        DirectoryEntry {
            name: name.to_string(),
            attributes: self.attributes(),
            creation_time: self.creation_time,
            last_access_time: self.last_access_time,
            last_write_time: self.last_write_time,
            change_time: self.change_time,
            end_of_file: self.size(),
        }
    }
}

#[derive(Debug)]
struct OpenFile {
    share: String,
    path: String,
    delete_on_close: bool,
}

#[derive(Debug, Default)]
struct State {
    hosts: Vec<String>,
    users: Vec<(String, String)>,
    /// share name (lowercase) -> path -> node; paths are backslash separated, root is ""
    shares: HashMap<String, BTreeMap<String, Node>>,
    handles: HashMap<u64, OpenFile>,
    next_handle: u64,
    closed_handles: usize,
    active_sessions: usize,
    refuse_connections: bool,
    hidden_marker: bool,
    dos_wildcards: bool,
    create_faults: HashMap<String, (NtStatus, usize)>,
    close_faults: HashMap<String, (NtStatus, usize)>,
    create_requests: HashMap<String, usize>,
    events: Vec<MockEvent>,
}

fn normalize(path: &str) -> String {
    path.replace('/', "\\").trim_matches('\\').to_string()
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('\\').map(|(parent, _)| parent).unwrap_or("")
}

fn name_of(path: &str) -> &str {
    path.rsplit_once('\\').map(|(_, name)| name).unwrap_or(path)
}

fn add_hidden_marker(nodes: &mut BTreeMap<String, Node>, directory: &str) {
    let path = if directory.is_empty() {
        DEFAULT_HIDDEN_ENTRY.to_string()
    } else {
        format!("{directory}\\{DEFAULT_HIDDEN_ENTRY}")
    };
    nodes.insert(path, Node::new(NodeKind::File(Vec::new())));
}

fn is_child(parent: &str, path: &str) -> bool {
    !path.is_empty() && path != parent && parent_of(path) == parent
}

fn is_descendant(ancestor: &str, path: &str) -> bool {
    if ancestor.is_empty() {
        !path.is_empty()
    } else {
        path.len() > ancestor.len()
            && path.starts_with(ancestor)
            && path[ancestor.len()..].starts_with('\\')
    }
}

impl State {
    fn share(&self, share: &str) -> Result<&BTreeMap<String, Node>, NtStatus> {
        self.shares
            .get(&share.to_lowercase())
            .ok_or(NtStatus::STATUS_BAD_NETWORK_NAME)
    }

    fn share_mut(&mut self, share: &str) -> Result<&mut BTreeMap<String, Node>, NtStatus> {
        self.shares
            .get_mut(&share.to_lowercase())
            .ok_or(NtStatus::STATUS_BAD_NETWORK_NAME)
    }

    fn open_file(&self, handle: &FileHandle) -> Result<&OpenFile, NtStatus> {
        self.handles
            .get(&handle.id())
            .ok_or(NtStatus::STATUS_FILE_CLOSED)
    }

    fn take_fault(
        faults: &mut HashMap<String, (NtStatus, usize)>,
        path: &str,
    ) -> Option<NtStatus> {
        match faults.get_mut(path) {
            Some((status, remaining)) if *remaining > 0 => {
                *remaining -= 1;
                Some(*status)
            }
            _ => None,
        }
    }

    fn create(
        &mut self,
        share: &str,
        path: &str,
        access: AccessMask,
        disposition: CreateDisposition,
        options: CreateOptions,
    ) -> Result<(FileHandle, FileStatus), NtStatus> {
        let path = normalize(path);
        *self.create_requests.entry(path.clone()).or_insert(0) += 1;
        self.events.push(MockEvent::Create(path.clone()));
        if let Some(status) = Self::take_fault(&mut self.create_faults, &path) {
            return Err(status);
        }
        let want_directory = options.contains(CreateOptions::FILE_DIRECTORY_FILE);
        let delete_on_close = options.contains(CreateOptions::FILE_DELETE_ON_CLOSE);
        if delete_on_close && !access.contains(AccessMask::DELETE) {
            return Err(NtStatus::STATUS_ACCESS_DENIED);
        }
        let nodes = self.share_mut(share)?;
        if !path.is_empty() {
            match nodes.get(parent_of(&path)) {
                Some(parent) if parent.is_directory() => {}
                _ => return Err(NtStatus::STATUS_OBJECT_PATH_NOT_FOUND),
            }
        }
        let status = match nodes.get_mut(&path) {
            Some(_) if disposition == CreateDisposition::Create => {
                return Err(NtStatus::STATUS_OBJECT_NAME_COLLISION)
            }
            Some(node) if want_directory && !node.is_directory() => {
                return Err(NtStatus::STATUS_NOT_A_DIRECTORY)
            }
            Some(node)
                if options.contains(CreateOptions::FILE_NON_DIRECTORY_FILE)
                    && node.is_directory() =>
            {
                return Err(NtStatus::STATUS_FILE_IS_A_DIRECTORY)
            }
            Some(node) => match disposition {
                CreateDisposition::Open | CreateDisposition::OpenIf => {
                    node.last_access_time = SystemTime::now();
                    FileStatus::Opened
                }
                disposition => {
                    if let NodeKind::File(data) = &mut node.kind {
                        data.clear();
                    }
                    node.last_write_time = SystemTime::now();
                    if disposition == CreateDisposition::Supersede {
                        FileStatus::Superseded
                    } else {
                        FileStatus::Overwritten
                    }
                }
            },
            None if matches!(
                disposition,
                CreateDisposition::Open | CreateDisposition::Overwrite
            ) =>
            {
                return Err(NtStatus::STATUS_OBJECT_NAME_NOT_FOUND)
            }
            None => {
                let kind = if want_directory {
                    NodeKind::Directory
                } else {
                    NodeKind::File(Vec::new())
                };
                nodes.insert(path.clone(), Node::new(kind));
                FileStatus::Created
            }
        };
        if delete_on_close && path.is_empty() {
            return Err(NtStatus::STATUS_CANNOT_DELETE);
        }
        self.next_handle += 1;
        let id = self.next_handle;
        self.handles.insert(
            id,
            OpenFile {
                share: share.to_lowercase(),
                path,
                delete_on_close,
            },
        );
        Ok((FileHandle::new(id), status))
    }

    fn close(&mut self, handle: FileHandle) -> NtStatus {
        let file = match self.handles.remove(&handle.id()) {
            Some(file) => file,
            None => return NtStatus::STATUS_FILE_CLOSED,
        };
        self.closed_handles += 1;
        let fault = if file.delete_on_close {
            Self::take_fault(&mut self.close_faults, &file.path)
        } else {
            None
        };
        if let Some(status) = fault {
            self.events.push(MockEvent::Close {
                path: file.path,
                deleted: false,
            });
            return status;
        }
        let mut deleted = false;
        let mut status = NtStatus::STATUS_SUCCESS;
        if file.delete_on_close {
            if let Ok(nodes) = self.share_mut(&file.share) {
                let has_children = nodes.keys().any(|p| is_child(&file.path, p));
                match nodes.get(&file.path).map(Node::is_directory) {
                    Some(true) if has_children => status = NtStatus::STATUS_DIRECTORY_NOT_EMPTY,
                    Some(directory) => {
                        nodes.remove(&file.path);
                        deleted = true;
                        self.events.push(MockEvent::Remove {
                            path: file.path.clone(),
                            directory,
                        });
                    }
                    None => status = NtStatus::STATUS_OBJECT_NAME_NOT_FOUND,
                }
            }
        }
        self.events.push(MockEvent::Close {
            path: file.path,
            deleted,
        });
        status
    }

    fn query(
        &mut self,
        handle: &FileHandle,
        pattern: &str,
    ) -> Result<Vec<DirectoryEntry>, NtStatus> {
        let file = self.open_file(handle)?;
        let (share, path) = (file.share.clone(), file.path.clone());
        self.events.push(MockEvent::Query(path.clone()));
        let nodes = self.share(&share)?;
        let directory = nodes
            .get(&path)
            .ok_or(NtStatus::STATUS_OBJECT_NAME_NOT_FOUND)?;
        if !directory.is_directory() {
            return Err(NtStatus::STATUS_INVALID_PARAMETER);
        }
        let pattern = match pattern {
            "*.*" if self.dos_wildcards => "*",
            pattern => pattern,
        };
        let pattern = Pattern::new(pattern).map_err(|_| NtStatus::STATUS_OBJECT_NAME_INVALID)?;
        let options = MatchOptions {
            case_sensitive: false,
            ..Default::default()
        };
        let mut entries = vec![directory.entry("."), directory.entry("..")];
        entries.extend(
            nodes
                .iter()
                .filter(|(p, _)| is_child(&path, p))
                .map(|(p, node)| node.entry(name_of(p))),
        );
        let entries: Vec<DirectoryEntry> = entries
            .into_iter()
            .filter(|entry| pattern.matches_with(&entry.name, options))
            .collect();
        if entries.is_empty() {
            Err(NtStatus::STATUS_NO_MORE_FILES)
        } else {
            Ok(entries)
        }
    }

    fn set_information(
        &mut self,
        handle: &FileHandle,
        information: SetFileInformation,
    ) -> NtStatus {
        let (share, path) = match self.open_file(handle) {
            Ok(file) => (file.share.clone(), file.path.clone()),
            Err(status) => return status,
        };
        self.events.push(MockEvent::SetInfo(path.clone()));
        let nodes = match self.share_mut(&share) {
            Ok(nodes) => nodes,
            Err(status) => return status,
        };
        match information {
            SetFileInformation::Basic {
                creation_time,
                last_access_time,
                last_write_time,
            } => {
                let Some(node) = nodes.get_mut(&path) else {
                    return NtStatus::STATUS_OBJECT_NAME_NOT_FOUND;
                };
                if let Some(time) = creation_time {
                    node.creation_time = time;
                }
                if let Some(time) = last_access_time {
                    node.last_access_time = time;
                }
                if let Some(time) = last_write_time {
                    node.last_write_time = time;
                }
                NtStatus::STATUS_SUCCESS
            }
            SetFileInformation::Rename { target, replace } => {
                let target = normalize(&target);
                if !matches!(nodes.get(parent_of(&target)), Some(parent) if parent.is_directory()) {
                    return NtStatus::STATUS_OBJECT_PATH_NOT_FOUND;
                }
                if nodes.contains_key(&target) && !replace {
                    return NtStatus::STATUS_OBJECT_NAME_COLLISION;
                }
                let moved: Vec<String> = nodes
                    .keys()
                    .filter(|p| **p == path || is_descendant(&path, p))
                    .cloned()
                    .collect();
                for old in moved {
                    if let Some(node) = nodes.remove(&old) {
                        let new = format!("{}{}", target, &old[path.len()..]);
                        nodes.insert(new, node);
                    }
                }
                if let Some(file) = self.handles.get_mut(&handle.id()) {
                    file.path = target.clone();
                }
                self.events.push(MockEvent::Rename { from: path, to: target });
                NtStatus::STATUS_SUCCESS
            }
        }
    }

    fn node_mut(&mut self, handle: &FileHandle) -> Result<&mut Node, NtStatus> {
        let file = self.open_file(handle)?;
        let (share, path) = (file.share.clone(), file.path.clone());
        self.share_mut(&share)?
            .get_mut(&path)
            .ok_or(NtStatus::STATUS_OBJECT_NAME_NOT_FOUND)
    }
}

/// In-memory SMB server. Clones share the same state.
#[derive(Clone)]
pub struct MockSmbServer {
    state: Arc<Mutex<State>>,
}

impl Default for MockSmbServer {
    /// Server reachable as `host`, exposing `share`, accepting `test:test`
    fn default() -> Self {
        Self::new()
            .with_host(HOST)
            .with_share(SHARE)
            .with_user(USERNAME, PASSWORD)
    }
}

impl MockSmbServer {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Add a host name resolving to this server
    pub fn with_host(self, host: &str) -> Self {
        self.state().hosts.push(host.to_string());
        self
    }

    pub fn with_share(self, share: &str) -> Self {
        let mut root = BTreeMap::new();
        root.insert(String::new(), Node::new(NodeKind::Directory));
        let mut state = self.state();
        if state.hidden_marker {
            add_hidden_marker(&mut root, "");
        }
        state.shares.insert(share.to_lowercase(), root);
        drop(state);
        self
    }

    pub fn with_user(self, username: &str, password: &str) -> Self {
        self.state()
            .users
            .push((username.to_string(), password.to_string()));
        self
    }

    /// Every directory created from here on holds a hidden marker file, like the existing ones
    pub fn with_hidden_marker(self) -> Self {
        {
            let mut state = self.state();
            state.hidden_marker = true;
            for nodes in state.shares.values_mut() {
                let directories: Vec<String> = nodes
                    .iter()
                    .filter(|(_, node)| node.is_directory())
                    .map(|(path, _)| path.clone())
                    .collect();
                for directory in directories {
                    add_hidden_marker(nodes, &directory);
                }
            }
        }
        self
    }

    /// `*.*` also matches names without an extension, as on Windows servers
    pub fn with_dos_wildcards(self) -> Self {
        self.state().dos_wildcards = true;
        self
    }

    pub fn mkdir(&self, share: &str, path: &str) {
        let mut state = self.state();
        let hidden_marker = state.hidden_marker;
        let nodes = state
            .shares
            .get_mut(&share.to_lowercase())
            .expect("no such share");
        let path = normalize(path);
        let mut current = String::new();
        for segment in path.split('\\').filter(|s| !s.is_empty()) {
            if !current.is_empty() {
                current.push('\\');
            }
            current.push_str(segment);
            if !nodes.contains_key(&current) {
                nodes.insert(current.clone(), Node::new(NodeKind::Directory));
                if hidden_marker {
                    add_hidden_marker(nodes, &current);
                }
            }
        }
    }

    pub fn touch(&self, share: &str, path: &str, data: &[u8]) {
        let path = normalize(path);
        self.mkdir(share, parent_of(&path));
        self.state()
            .shares
            .get_mut(&share.to_lowercase())
            .expect("no such share")
            .insert(path, Node::new(NodeKind::File(data.to_vec())));
    }

    pub fn exists(&self, share: &str, path: &str) -> bool {
        self.state()
            .shares
            .get(&share.to_lowercase())
            .map(|nodes| nodes.contains_key(&normalize(path)))
            .unwrap_or(false)
    }

    pub fn is_dir(&self, share: &str, path: &str) -> bool {
        self.state()
            .shares
            .get(&share.to_lowercase())
            .and_then(|nodes| nodes.get(&normalize(path)).map(Node::is_directory))
            .unwrap_or(false)
    }

    pub fn read(&self, share: &str, path: &str) -> Option<Vec<u8>> {
        self.state()
            .shares
            .get(&share.to_lowercase())
            .and_then(|nodes| match nodes.get(&normalize(path)).map(|n| &n.kind) {
                Some(NodeKind::File(data)) => Some(data.clone()),
                _ => None,
            })
    }

    /// Creation, last access and last write times of the object at `path`
    pub fn times(&self, share: &str, path: &str) -> Option<(SystemTime, SystemTime, SystemTime)> {
        self.state()
            .shares
            .get(&share.to_lowercase())
            .and_then(|nodes| nodes.get(&normalize(path)))
            .map(|n| (n.creation_time, n.last_access_time, n.last_write_time))
    }

    /// Next `times` create requests on `path` fail with `status`
    pub fn inject_create_status(&self, path: &str, status: NtStatus, times: usize) {
        self.state()
            .create_faults
            .insert(normalize(path), (status, times));
    }

    /// Next `times` closes of delete-on-close handles on `path` fail with `status`; the object
    /// is kept
    pub fn inject_close_status(&self, path: &str, status: NtStatus, times: usize) {
        self.state()
            .close_faults
            .insert(normalize(path), (status, times));
    }

    pub fn refuse_connections(&self) {
        self.state().refuse_connections = true;
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.state().events.clone()
    }

    pub fn clear_events(&self) {
        self.state().events.clear();
    }

    pub fn open_handles(&self) -> usize {
        self.state().handles.len()
    }

    pub fn closed_handles(&self) -> usize {
        self.state().closed_handles
    }

    pub fn active_sessions(&self) -> usize {
        self.state().active_sessions
    }

    /// Amount of create requests received for `path`
    pub fn create_requests(&self, path: &str) -> usize {
        self.state()
            .create_requests
            .get(&normalize(path))
            .copied()
            .unwrap_or(0)
    }

    pub fn factory(&self) -> Arc<dyn SmbClientFactory> {
        Arc::new(self.clone())
    }

    pub fn resolver(&self) -> Arc<dyn AddressResolver> {
        Arc::new(MockResolver {
            hosts: self.state().hosts.clone(),
        })
    }

    /// Credential store with the first user registered for every host
    pub fn credentials(&self) -> Arc<InMemoryCredentialStore> {
        let state = self.state();
        let store = InMemoryCredentialStore::default();
        if let Some((username, password)) = state.users.first() {
            for host in state.hosts.iter() {
                store.insert(
                    SmbCredential::new(host)
                        .username(username)
                        .password(password),
                );
            }
        }
        Arc::new(store)
    }

    pub fn connector(&self, config: SmbConfig) -> SmbConnector {
        SmbConnector::new(self.factory(), self.credentials(), config).resolver(self.resolver())
    }

    pub fn directory(&self) -> SmbDirectory {
        self.directory_with(SmbConfig::default())
    }

    pub fn directory_with(&self, config: SmbConfig) -> SmbDirectory {
        SmbDirectory::new(self.factory(), self.credentials(), config).with_resolver(self.resolver())
    }
}

impl SmbClientFactory for MockSmbServer {
    fn connect(
        &self,
        address: SocketAddr,
        _transport: TransportType,
    ) -> io::Result<Box<dyn SmbSession>> {
        let mut state = self.state();
        if state.refuse_connections {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            ));
        }
        state.active_sessions += 1;
        state.events.push(MockEvent::Connect(address));
        Ok(Box::new(MockSession {
            state: self.state.clone(),
        }))
    }
}

struct MockResolver {
    hosts: Vec<String>,
}

impl AddressResolver for MockResolver {
    fn resolve(&self, host: &str) -> io::Result<IpAddr> {
        if self.hosts.iter().any(|h| h.eq_ignore_ascii_case(host)) {
            Ok(ADDRESS)
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, "unknown host"))
        }
    }
}

struct MockSession {
    state: Arc<Mutex<State>>,
}

impl MockSession {
    fn state(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl SmbSession for MockSession {
    fn login(&mut self, credential: &SmbCredential) -> NtStatus {
        let mut state = self.state();
        let username = credential.get_username().unwrap_or_default();
        let password = credential.get_password().unwrap_or_default();
        if state
            .users
            .iter()
            .any(|(u, p)| u == username && p == password)
        {
            state.events.push(MockEvent::Login(username.to_string()));
            NtStatus::STATUS_SUCCESS
        } else {
            NtStatus::STATUS_LOGON_FAILURE
        }
    }

    fn tree_connect(&mut self, share: &str) -> Result<Box<dyn SmbFileStore>, NtStatus> {
        let mut state = self.state();
        state.share(share)?;
        state.events.push(MockEvent::TreeConnect(share.to_string()));
        Ok(Box::new(MockFileStore {
            state: self.state.clone(),
            share: share.to_string(),
        }))
    }

    fn logoff(&mut self) -> NtStatus {
        self.state().events.push(MockEvent::Logoff);
        NtStatus::STATUS_SUCCESS
    }

    fn disconnect(&mut self) {
        let mut state = self.state();
        state.active_sessions = state.active_sessions.saturating_sub(1);
        state.events.push(MockEvent::Disconnect);
    }
}

struct MockFileStore {
    state: Arc<Mutex<State>>,
    share: String,
}

impl MockFileStore {
    fn state(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl SmbFileStore for MockFileStore {
    fn create_file(
        &mut self,
        path: &str,
        access: AccessMask,
        _attributes: FileAttributes,
        _share_access: ShareAccess,
        disposition: CreateDisposition,
        options: CreateOptions,
    ) -> Result<(FileHandle, FileStatus), NtStatus> {
        let share = self.share.clone();
        self.state()
            .create(&share, path, access, disposition, options)
    }

    fn query_directory(
        &mut self,
        handle: &FileHandle,
        pattern: &str,
    ) -> Result<Vec<DirectoryEntry>, NtStatus> {
        self.state().query(handle, pattern)
    }

    fn query_information(
        &mut self,
        handle: &FileHandle,
    ) -> Result<FileNetworkOpenInformation, NtStatus> {
        let mut state = self.state();
        let node = state.node_mut(handle)?;
        Ok(FileNetworkOpenInformation {
            creation_time: node.creation_time,
            last_access_time: node.last_access_time,
            last_write_time: node.last_write_time,
            change_time: node.change_time,
            end_of_file: node.size(),
            attributes: node.attributes(),
        })
    }

    fn set_information(
        &mut self,
        handle: &FileHandle,
        information: SetFileInformation,
    ) -> NtStatus {
        self.state().set_information(handle, information)
    }

    fn read_file(
        &mut self,
        handle: &FileHandle,
        offset: u64,
        length: u32,
    ) -> Result<Vec<u8>, NtStatus> {
        let mut state = self.state();
        match &state.node_mut(handle)?.kind {
            NodeKind::File(data) => {
                let offset = offset as usize;
                if offset >= data.len() {
                    return Err(NtStatus::STATUS_END_OF_FILE);
                }
                let end = (offset + length as usize).min(data.len());
                Ok(data[offset..end].to_vec())
            }
            NodeKind::Directory => Err(NtStatus::STATUS_FILE_IS_A_DIRECTORY),
        }
    }

    fn write_file(
        &mut self,
        handle: &FileHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<u32, NtStatus> {
        let mut state = self.state();
        let node = state.node_mut(handle)?;
        match &mut node.kind {
            NodeKind::File(content) => {
                let offset = offset as usize;
                if content.len() < offset + data.len() {
                    content.resize(offset + data.len(), 0);
                }
                content[offset..offset + data.len()].copy_from_slice(data);
                node.last_write_time = SystemTime::now();
                Ok(data.len() as u32)
            }
            NodeKind::Directory => Err(NtStatus::STATUS_FILE_IS_A_DIRECTORY),
        }
    }

    fn close_file(&mut self, handle: FileHandle) -> NtStatus {
        self.state().close(handle)
    }

    fn disconnect(&mut self) -> NtStatus {
        let share = self.share.clone();
        self.state().events.push(MockEvent::TreeDisconnect(share));
        NtStatus::STATUS_SUCCESS
    }
}
