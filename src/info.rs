//! # info
//!
//! Metadata of remote directories (and files), fetched by path and saved back through
//! set-information

use std::time::SystemTime;

use chrono::{DateTime, Utc};
use remotefs::File;

use crate::client::{
    AccessMask, CreateDisposition, CreateOptions, FileAttributes, FileNetworkOpenInformation,
    SetFileInformation, ShareAccess,
};
use crate::connection::{SmbConnection, SmbConnector};
use crate::credentials::SmbCredential;
use crate::error::SmbResult;
use crate::path::SharePath;
use crate::utils::{fmt as fmt_utils, smb as smb_utils};

/// Metadata of a remote object. Timestamps are in UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmbDirectoryInfo {
    path: String,
    pub creation_time: DateTime<Utc>,
    pub last_access_time: DateTime<Utc>,
    pub last_write_time: DateTime<Utc>,
    change_time: DateTime<Utc>,
    size: u64,
    attributes: FileAttributes,
}

impl SmbDirectoryInfo {
    fn new(path: &str, information: FileNetworkOpenInformation) -> Self {
        Self {
            path: path.to_string(),
            creation_time: information.creation_time.into(),
            last_access_time: information.last_access_time.into(),
            last_write_time: information.last_write_time.into(),
            change_time: information.change_time.into(),
            size: information.end_of_file,
            attributes: information.attributes,
        }
    }

    /// Query the metadata of `path` on an open connection
    pub(crate) fn query(conn: &mut SmbConnection, path: &SharePath) -> SmbResult<Self> {
        let handle = conn.create_file(
            &path.protocol_path(),
            AccessMask::FILE_READ_ATTRIBUTES,
            ShareAccess::READ | ShareAccess::WRITE | ShareAccess::DELETE,
            CreateDisposition::Open,
            CreateOptions::empty(),
        )?;
        let information = conn.with_handle(handle, |conn, handle| conn.query_information(handle))?;
        Ok(Self::new(&path.to_string(), information))
    }

    /// Write the timestamps of this info to `path` on an open connection
    pub(crate) fn apply(&self, conn: &mut SmbConnection, path: &SharePath) -> SmbResult<()> {
        debug!(
            "saving times of {} (created: {}, accessed: {}, written: {})",
            path,
            fmt_utils::fmt_utc(&self.creation_time),
            fmt_utils::fmt_utc(&self.last_access_time),
            fmt_utils::fmt_utc(&self.last_write_time),
        );
        let handle = conn.create_file(
            &path.protocol_path(),
            AccessMask::FILE_WRITE_ATTRIBUTES,
            ShareAccess::READ | ShareAccess::WRITE | ShareAccess::DELETE,
            CreateDisposition::Open,
            CreateOptions::empty(),
        )?;
        let information = SetFileInformation::Basic {
            creation_time: Some(SystemTime::from(self.creation_time)),
            last_access_time: Some(SystemTime::from(self.last_access_time)),
            last_write_time: Some(SystemTime::from(self.last_write_time)),
        };
        conn.with_handle(handle, |conn, handle| {
            conn.set_information(handle, information)
        })
    }

    /// Full path, as written by the caller
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn change_time(&self) -> DateTime<Utc> {
        self.change_time
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn attributes(&self) -> FileAttributes {
        self.attributes
    }

    pub fn is_directory(&self) -> bool {
        self.attributes.contains(FileAttributes::DIRECTORY)
    }
}

impl From<SmbDirectoryInfo> for File {
    fn from(info: SmbDirectoryInfo) -> Self {
        smb_utils::info_to_file(
            &info.path,
            info.attributes,
            info.size,
            info.creation_time.into(),
            info.last_access_time.into(),
            info.last_write_time.into(),
        )
    }
}

/// Fetches and saves [`SmbDirectoryInfo`], opening a connection scope per call
#[derive(Clone)]
pub struct SmbDirectoryInfoFactory {
    connector: SmbConnector,
}

impl SmbDirectoryInfoFactory {
    pub fn new(connector: SmbConnector) -> Self {
        Self { connector }
    }

    pub fn from_directory_name(&self, path: &str) -> SmbResult<SmbDirectoryInfo> {
        let share_path = SharePath::parse(path)?;
        let credential = self.connector.credential(&share_path)?;
        self.from_directory_name_with(path, &credential)
    }

    /// Fetch the info of `path` authenticating with `credential`
    pub fn from_directory_name_with(
        &self,
        path: &str,
        credential: &SmbCredential,
    ) -> SmbResult<SmbDirectoryInfo> {
        let share_path = SharePath::parse(path)?;
        trace!("getting info for {}", share_path);
        let mut conn = self.connector.connect(&share_path, credential)?;
        let mut info = SmbDirectoryInfo::query(&mut conn, &share_path)?;
        info.path = path.to_string();
        Ok(info)
    }

    pub fn save_directory_info(&self, info: &SmbDirectoryInfo) -> SmbResult<()> {
        let share_path = SharePath::parse(info.path())?;
        let credential = self.connector.credential(&share_path)?;
        let mut conn = self.connector.connect(&share_path, &credential)?;
        info.apply(&mut conn, &share_path)
    }
}

#[cfg(test)]
mod test {

    use std::time::{Duration, UNIX_EPOCH};

    use pretty_assertions::assert_eq;
    use remotefs::fs::FileType;

    use super::*;
    use crate::config::SmbConfig;
    use crate::error::SmbErrorKind;
    use crate::mock::{self, MockSmbServer};

    fn factory(server: &MockSmbServer) -> SmbDirectoryInfoFactory {
        SmbDirectoryInfoFactory::new(server.connector(SmbConfig::default()))
    }

    #[test]
    fn should_get_directory_info() {
        mock::logger();
        let server = MockSmbServer::default();
        server.mkdir("share", "dir");
        let info = factory(&server)
            .from_directory_name("smb://host/share/dir")
            .unwrap();
        assert_eq!(info.path(), "smb://host/share/dir");
        assert!(info.is_directory());
        assert_eq!(info.size(), 0);
        assert_eq!(server.open_handles(), 0);
        assert_eq!(server.active_sessions(), 0);
    }

    #[test]
    fn should_get_file_info() {
        let server = MockSmbServer::default();
        server.touch("share", "dir/a.txt", b"hello");
        let info = factory(&server)
            .from_directory_name("\\\\host\\share\\dir\\a.txt")
            .unwrap();
        assert!(!info.is_directory());
        assert_eq!(info.size(), 5);
        let file = File::from(info);
        assert_eq!(file.metadata().file_type, FileType::File);
        assert_eq!(file.metadata().size, 5);
    }

    #[test]
    fn should_fail_on_missing_path() {
        let server = MockSmbServer::default();
        let err = factory(&server)
            .from_directory_name("smb://host/share/missing")
            .unwrap_err();
        assert_eq!(err.kind, SmbErrorKind::NotFound);
        let err = factory(&server)
            .from_directory_name("smb://host/share/missing/a")
            .unwrap_err();
        assert_eq!(err.kind, SmbErrorKind::PathNotFound);
    }

    #[test]
    fn should_save_directory_info() {
        let server = MockSmbServer::default();
        server.mkdir("share", "dir");
        let factory = factory(&server);
        let mut info = factory.from_directory_name("smb://host/share/dir").unwrap();
        let time = UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        info.creation_time = time.into();
        info.last_write_time = time.into();
        factory.save_directory_info(&info).unwrap();
        let (created, _, written) = server.times("share", "dir").unwrap();
        assert_eq!(created, time);
        assert_eq!(written, time);
        assert_eq!(server.open_handles(), 0);
    }
}
