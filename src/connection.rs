//! # connection
//!
//! Connection scope: address resolution, transport, session and tree connect for a single operation

use std::io;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use crate::client::{
    AccessMask, CreateDisposition, CreateOptions, DirectoryEntry, FileAttributes, FileHandle,
    FileNetworkOpenInformation, SetFileInformation, ShareAccess, SmbClientFactory, SmbFileStore,
    SmbSession,
};
use crate::config::SmbConfig;
use crate::credentials::{CredentialResolver, CredentialStore, SmbCredential};
use crate::error::{SmbError, SmbErrorKind, SmbResult};
use crate::path::SharePath;
use crate::status::NtStatus;

/// Resolves host names into network addresses
pub trait AddressResolver: Send + Sync {
    fn resolve(&self, host: &str) -> io::Result<IpAddr>;
}

/// Resolver backed by the operating system; IPv4 addresses are preferred
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

impl AddressResolver for SystemResolver {
    fn resolve(&self, host: &str) -> io::Result<IpAddr> {
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(ip);
        }
        let addresses: Vec<SocketAddr> = (host, 0).to_socket_addrs()?.collect();
        addresses
            .iter()
            .find(|address| address.is_ipv4())
            .or_else(|| addresses.first())
            .map(|address| address.ip())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no address found for {host}"),
                )
            })
    }
}

/// Everything needed to open a connection scope; shared by the engine components
#[derive(Clone)]
pub struct SmbConnector {
    factory: Arc<dyn SmbClientFactory>,
    resolver: Arc<dyn AddressResolver>,
    credentials: CredentialResolver,
    config: Arc<SmbConfig>,
}

impl SmbConnector {
    pub fn new(
        factory: Arc<dyn SmbClientFactory>,
        credentials: Arc<dyn CredentialStore>,
        config: SmbConfig,
    ) -> Self {
        Self {
            factory,
            resolver: Arc::new(SystemResolver),
            credentials: CredentialResolver::new(credentials),
            config: Arc::new(config),
        }
    }

    /// Construct the connector with the provided address resolver
    pub fn resolver(mut self, resolver: Arc<dyn AddressResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn config(&self) -> &SmbConfig {
        &self.config
    }

    /// Resolve the credential for `path`
    pub fn credential(&self, path: &SharePath) -> SmbResult<SmbCredential> {
        self.credentials.get_credential(path)
    }

    /// Open a connection scope on the share of `path`
    pub fn connect(
        &self,
        path: &SharePath,
        credential: &SmbCredential,
    ) -> SmbResult<SmbConnection> {
        let ip = self.resolver.resolve(path.host()).map_err(|e| {
            error!("failed to resolve {}: {}", path.host(), e);
            SmbError::new_ex(
                SmbErrorKind::HostUnreachable,
                format!("could not resolve {}: {}", path.host(), e),
            )
        })?;
        let transport = self.config.transport;
        let address = SocketAddr::new(ip, path.port().unwrap_or(transport.default_port()));
        debug!("connecting to {} ({:?}) for {}", address, transport, path);
        let session = self.factory.connect(address, transport).map_err(|e| {
            error!("connection to {} failed: {}", address, e);
            SmbError::new_ex(
                SmbErrorKind::HostUnreachable,
                format!("could not connect to {address}: {e}"),
            )
        })?;
        let mut session = SessionGuard {
            session,
            logged_in: false,
        };
        session.login(credential)?;
        trace!("tree connect to {}", path.share());
        let store = session.session.tree_connect(path.share()).map_err(|status| {
            error!("tree connect to {} failed: {}", path.share(), status);
            status
                .into_error()
                .context(format!("could not connect to share {}", path.share()))
        })?;
        debug!("connected to {} on {}", path.share(), address);
        Ok(SmbConnection {
            address,
            share: path.share().to_string(),
            config: self.config.clone(),
            store,
            session,
        })
    }
}

/// Logs off and disconnects the session when dropped
struct SessionGuard {
    session: Box<dyn SmbSession>,
    logged_in: bool,
}

impl SessionGuard {
    fn login(&mut self, credential: &SmbCredential) -> SmbResult<()> {
        trace!("authenticating as {:?}", credential.get_username());
        let status = self.session.login(credential);
        if status.is_success() {
            self.logged_in = true;
            Ok(())
        } else {
            error!("authentication failed: {}", status);
            Err(SmbError::from_status(SmbErrorKind::AuthenticationFailed, status))
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.logged_in {
            let status = self.session.logoff();
            if !status.is_success() {
                warn!("logoff failed: {}", status);
            }
        }
        self.session.disconnect();
        trace!("session disconnected");
    }
}

/// A tree connect owned by a single operation. Released when dropped.
pub struct SmbConnection {
    address: SocketAddr,
    share: String,
    config: Arc<SmbConfig>,
    store: Box<dyn SmbFileStore>,
    // dropped after the store has been disconnected
    #[allow(dead_code)]
    session: SessionGuard,
}

impl SmbConnection {
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn share(&self) -> &str {
        &self.share
    }

    /// Open a handle on `path` (relative to the share, backslash separated)
    pub fn create_file(
        &mut self,
        path: &str,
        access: AccessMask,
        share_access: ShareAccess,
        disposition: CreateDisposition,
        options: CreateOptions,
    ) -> SmbResult<FileHandle> {
        trace!(
            "create {}\\{} (access: {:?}, disposition: {:?}, options: {:?})",
            self.share,
            path,
            access,
            disposition,
            options
        );
        self.store
            .create_file(
                path,
                access,
                FileAttributes::empty(),
                share_access,
                disposition,
                options,
            )
            .map(|(handle, _)| handle)
            .map_err(|status| {
                debug!("create {} failed: {}", path, status);
                status
                    .into_error()
                    .context(format!("unable to open {}\\{}", self.share, path))
            })
    }

    /// Open an existing directory, retrying while the server reports the request as pending
    pub fn open_directory(
        &mut self,
        path: &str,
        access: AccessMask,
        share_access: ShareAccess,
    ) -> SmbResult<FileHandle> {
        let attempts = self.config.pending_retries.max(1);
        let mut last_status = NtStatus::STATUS_PENDING;
        for attempt in 1..=attempts {
            trace!("opening directory {}\\{} (attempt {})", self.share, path, attempt);
            match self.store.create_file(
                path,
                access,
                FileAttributes::empty(),
                share_access,
                CreateDisposition::Open,
                CreateOptions::FILE_DIRECTORY_FILE,
            ) {
                Ok((handle, _)) => return Ok(handle),
                Err(status) if status.is_pending() => {
                    warn!("opening {} is pending (attempt {}/{})", path, attempt, attempts);
                    last_status = status;
                }
                Err(status) => {
                    debug!("opening directory {} failed: {}", path, status);
                    return Err(status
                        .into_error()
                        .context(format!("unable to open directory {}\\{}", self.share, path)));
                }
            }
        }
        error!("opening {} still pending after {} attempts", path, attempts);
        Err(last_status.into_error().context(format!(
            "directory {}\\{} still pending after {} attempts",
            self.share, path, attempts
        )))
    }

    /// List the entries of an open directory, without `.`, `..` and hidden markers
    pub fn list_directory(
        &mut self,
        handle: &FileHandle,
        pattern: &str,
    ) -> SmbResult<Vec<DirectoryEntry>> {
        let config = self.config.clone();
        Ok(self
            .query_directory(handle, pattern)?
            .into_iter()
            .filter(|entry| !config.is_special_entry(&entry.name))
            .collect())
    }

    /// Like [`SmbConnection::list_directory`], but hidden markers are reported too
    pub fn list_directory_with_hidden(
        &mut self,
        handle: &FileHandle,
        pattern: &str,
    ) -> SmbResult<Vec<DirectoryEntry>> {
        Ok(self
            .query_directory(handle, pattern)?
            .into_iter()
            .filter(|entry| entry.name != "." && entry.name != "..")
            .collect())
    }

    pub fn is_hidden_entry(&self, name: &str) -> bool {
        self.config.is_hidden_entry(name)
    }

    fn query_directory(
        &mut self,
        handle: &FileHandle,
        pattern: &str,
    ) -> SmbResult<Vec<DirectoryEntry>> {
        trace!("querying directory with pattern {}", pattern);
        match self.store.query_directory(handle, pattern) {
            Ok(entries) => Ok(entries),
            Err(status) if status == NtStatus::STATUS_NO_MORE_FILES => Ok(Vec::new()),
            Err(status) => Err(status.into_error().context("directory query failed")),
        }
    }

    pub fn query_information(
        &mut self,
        handle: &FileHandle,
    ) -> SmbResult<FileNetworkOpenInformation> {
        self.store
            .query_information(handle)
            .map_err(|status| status.into_error().context("query information failed"))
    }

    pub fn set_information(
        &mut self,
        handle: &FileHandle,
        information: SetFileInformation,
    ) -> SmbResult<()> {
        trace!("set information {:?}", information);
        self.store
            .set_information(handle, information)
            .into_result()
            .map_err(|e| e.context("set information failed"))
    }

    pub fn read(&mut self, handle: &FileHandle, offset: u64, length: u32) -> SmbResult<Vec<u8>> {
        match self.store.read_file(handle, offset, length) {
            Ok(data) => Ok(data),
            Err(status) if status == NtStatus::STATUS_END_OF_FILE => Ok(Vec::new()),
            Err(status) => Err(status.into_error().context("read failed")),
        }
    }

    pub fn write(&mut self, handle: &FileHandle, offset: u64, data: &[u8]) -> SmbResult<u32> {
        self.store
            .write_file(handle, offset, data)
            .map_err(|status| status.into_error().context("write failed"))
    }

    /// Close a handle; for delete-on-close handles this is where the deletion happens
    pub fn close(&mut self, handle: FileHandle) -> SmbResult<()> {
        trace!("closing handle {}", handle.id());
        self.store
            .close_file(handle)
            .into_result()
            .map_err(|e| e.context("close failed"))
    }

    /// Run `f` with `handle`, then close it whatever the outcome of `f`
    pub fn with_handle<T, F>(&mut self, handle: FileHandle, f: F) -> SmbResult<T>
    where
        F: FnOnce(&mut Self, &FileHandle) -> SmbResult<T>,
    {
        let result = f(self, &handle);
        let closed = self.close(handle);
        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(close_err)) => {
                warn!("failed to close handle after error: {}", close_err);
                Err(err)
            }
        }
    }
}

impl Drop for SmbConnection {
    fn drop(&mut self) {
        let status = self.store.disconnect();
        if !status.is_success() {
            warn!("tree disconnect from {} failed: {}", self.share, status);
        }
        trace!("disconnected from {} on {}", self.share, self.address);
    }
}

#[cfg(test)]
mod test {

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::mock::{self, MockEvent, MockSmbServer};

    fn connector(server: &MockSmbServer) -> SmbConnector {
        server.connector(SmbConfig::default())
    }

    fn credential() -> SmbCredential {
        SmbCredential::new("host")
            .username(mock::USERNAME)
            .password(mock::PASSWORD)
    }

    #[test]
    fn should_resolve_ip_literals() {
        let resolver = SystemResolver;
        assert_eq!(
            resolver.resolve("127.0.0.1").unwrap(),
            "127.0.0.1".parse::<IpAddr>().unwrap()
        );
        assert_eq!(
            resolver.resolve("[::1]").unwrap(),
            "::1".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn should_open_and_release_connection() {
        mock::logger();
        let server = MockSmbServer::default();
        let path = SharePath::parse("smb://host/share/a").unwrap();
        {
            let conn = connector(&server).connect(&path, &credential()).unwrap();
            assert_eq!(conn.share(), "share");
            assert_eq!(conn.address().port(), 445);
            assert_eq!(server.active_sessions(), 1);
        }
        assert_eq!(server.active_sessions(), 0);
        let events = server.events();
        assert_eq!(events.first(), Some(&MockEvent::Connect(SocketAddr::new(mock::ADDRESS, 445))));
        assert!(events.contains(&MockEvent::TreeDisconnect("share".to_string())));
        assert_eq!(events.last(), Some(&MockEvent::Disconnect));
    }

    #[test]
    fn should_use_port_from_path() {
        let server = MockSmbServer::default();
        let path = SharePath::parse("smb://host:3445/share").unwrap();
        let conn = connector(&server).connect(&path, &credential()).unwrap();
        assert_eq!(conn.address().port(), 3445);
    }

    #[test]
    fn should_fail_on_unknown_host() {
        let server = MockSmbServer::default();
        let path = SharePath::parse("smb://unknown/share").unwrap();
        let err = connector(&server)
            .connect(&path, &credential())
            .err()
            .unwrap();
        assert_eq!(err.kind, SmbErrorKind::HostUnreachable);
        assert!(server.events().is_empty());
    }

    #[test]
    fn should_fail_on_refused_connection() {
        let server = MockSmbServer::default();
        server.refuse_connections();
        let path = SharePath::parse("smb://host/share").unwrap();
        let err = connector(&server)
            .connect(&path, &credential())
            .err()
            .unwrap();
        assert_eq!(err.kind, SmbErrorKind::HostUnreachable);
    }

    #[test]
    fn should_fail_on_bad_credentials() {
        let server = MockSmbServer::default();
        let path = SharePath::parse("smb://host/share").unwrap();
        let err = connector(&server)
            .connect(
                &path,
                &SmbCredential::new("host").username("test").password("wrong"),
            )
            .err()
            .unwrap();
        assert_eq!(err.kind, SmbErrorKind::AuthenticationFailed);
        assert_eq!(err.status, Some(NtStatus::STATUS_LOGON_FAILURE));
        assert_eq!(server.active_sessions(), 0);
        assert!(!server.events().contains(&MockEvent::Logoff));
    }

    #[test]
    fn should_fail_on_unknown_share() {
        let server = MockSmbServer::default();
        let path = SharePath::parse("smb://host/missing").unwrap();
        let err = connector(&server)
            .connect(&path, &credential())
            .err()
            .unwrap();
        assert_eq!(err.kind, SmbErrorKind::NotFound);
        assert_eq!(err.status, Some(NtStatus::STATUS_BAD_NETWORK_NAME));
        assert_eq!(server.active_sessions(), 0);
    }

    #[test]
    fn should_close_handle_even_on_error() {
        let server = MockSmbServer::default();
        server.mkdir("share", "dir");
        let path = SharePath::parse("smb://host/share/dir").unwrap();
        let mut conn = connector(&server).connect(&path, &credential()).unwrap();
        let handle = conn
            .open_directory("dir", AccessMask::GENERIC_READ, ShareAccess::READ)
            .unwrap();
        assert_eq!(server.open_handles(), 1);
        let result: SmbResult<()> =
            conn.with_handle(handle, |_, _| Err(SmbError::new(SmbErrorKind::ProtocolError)));
        assert_eq!(result.unwrap_err().kind, SmbErrorKind::ProtocolError);
        assert_eq!(server.open_handles(), 0);
        assert_eq!(server.closed_handles(), 1);
    }

    #[test]
    fn should_retry_pending_directory_open() {
        let server = MockSmbServer::default();
        server.mkdir("share", "dir");
        server.inject_create_status("dir", NtStatus::STATUS_PENDING, 2);
        let path = SharePath::parse("smb://host/share/dir").unwrap();
        let mut conn = connector(&server).connect(&path, &credential()).unwrap();
        let handle = conn
            .open_directory("dir", AccessMask::GENERIC_READ, ShareAccess::READ)
            .unwrap();
        assert!(conn.close(handle).is_ok());
        assert_eq!(server.create_requests("dir"), 3);
    }

    #[test]
    fn should_give_up_when_still_pending() {
        let server = MockSmbServer::default();
        server.mkdir("share", "dir");
        server.inject_create_status("dir", NtStatus::STATUS_PENDING, 3);
        let path = SharePath::parse("smb://host/share/dir").unwrap();
        let mut conn = connector(&server).connect(&path, &credential()).unwrap();
        let err = conn
            .open_directory("dir", AccessMask::GENERIC_READ, ShareAccess::READ)
            .unwrap_err();
        assert_eq!(err.kind, SmbErrorKind::ProtocolError);
        assert_eq!(err.status, Some(NtStatus::STATUS_PENDING));
        assert_eq!(server.create_requests("dir"), 3);
        assert_eq!(server.open_handles(), 0);
    }

    #[test]
    fn should_filter_special_entries() {
        let server = MockSmbServer::default().with_hidden_marker();
        server.mkdir("share", "dir");
        server.touch("share", "dir/a.txt", b"hello");
        let path = SharePath::parse("smb://host/share/dir").unwrap();
        let mut conn = connector(&server).connect(&path, &credential()).unwrap();
        let handle = conn
            .open_directory("dir", AccessMask::GENERIC_READ, ShareAccess::READ)
            .unwrap();
        let entries = conn
            .with_handle(handle, |conn, handle| conn.list_directory(handle, "*"))
            .unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt"]);
        let handle = conn
            .open_directory("dir", AccessMask::GENERIC_READ, ShareAccess::READ)
            .unwrap();
        let entries = conn
            .with_handle(handle, |conn, handle| {
                conn.list_directory_with_hidden(handle, "*")
            })
            .unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec![".DS_Store", "a.txt"]);
        assert!(conn.is_hidden_entry(".DS_Store"));
    }
}
