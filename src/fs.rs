//! # fs
//!
//! `RemoteFs` implementation bound to a single share

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use remotefs::fs::{File, Metadata, ReadStream, UnixPex, Welcome, WriteStream};
use remotefs::{RemoteError, RemoteErrorType, RemoteFs, RemoteResult};

use crate::directory::{Directory, RemoteDirectory, SearchOption, DEFAULT_SEARCH_PATTERN};
use crate::path::SmbPathExt;
use crate::utils::path as path_utils;

/// SMB file system client working on the share at `share_root`
pub struct SmbFs {
    remote: RemoteDirectory,
    share_root: String,
    wrkdir: PathBuf,
    connected: bool,
}

impl SmbFs {
    /// Try to create a new `SmbFs` for the share at `share`.
    /// Fails if `share` is not a share path.
    pub fn try_new(remote: RemoteDirectory, share: &str) -> RemoteResult<Self> {
        Ok(Self {
            share_root: share.share_path()?,
            remote,
            wrkdir: PathBuf::from("/"),
            connected: false,
        })
    }

    /// Return a reference to the inner directory engine
    pub fn remote(&self) -> &RemoteDirectory {
        &self.remote
    }

    /// Root of the share this client works on
    pub fn share_root(&self) -> &str {
        &self.share_root
    }

    // -- private

    fn check_connection(&self) -> RemoteResult<()> {
        if self.connected {
            Ok(())
        } else {
            Err(RemoteError::new(RemoteErrorType::NotConnected))
        }
    }

    fn get_abs_path(&self, p: &Path) -> PathBuf {
        path_utils::absolutize(self.wrkdir.as_path(), p)
    }

    fn get_uri(&self, p: &Path) -> String {
        let relative = path_utils::to_share_relative(self.get_abs_path(p).as_path());
        if relative.is_empty() {
            self.share_root.clone()
        } else {
            self.share_root.combine_to_share_path(&relative)
        }
    }
}

impl RemoteFs for SmbFs {
    fn connect(&mut self) -> RemoteResult<Welcome> {
        debug!("connecting to {}", self.share_root);
        if self.remote.exists(&self.share_root)? {
            self.connected = true;
            info!("connected to {}", self.share_root);
            Ok(Welcome::default())
        } else {
            error!("share {} does not exist", self.share_root);
            Err(RemoteError::new_ex(
                RemoteErrorType::ConnectionError,
                format!("share {} does not exist", self.share_root),
            ))
        }
    }

    fn disconnect(&mut self) -> RemoteResult<()> {
        self.check_connection()?;
        self.connected = false;
        debug!("disconnected from {}", self.share_root);
        Ok(())
    }

    fn is_connected(&mut self) -> bool {
        self.connected
    }

    fn pwd(&mut self) -> RemoteResult<PathBuf> {
        self.check_connection().map(|_| self.wrkdir.clone())
    }

    fn change_dir(&mut self, dir: &Path) -> RemoteResult<PathBuf> {
        self.check_connection()?;
        let dir = self.get_abs_path(dir);
        trace!("changing directory to {}", dir.display());
        if self.stat(dir.as_path())?.is_dir() {
            self.wrkdir = dir;
            debug!("new working directory: {}", self.wrkdir.display());
            Ok(self.wrkdir.clone())
        } else {
            error!("cannot enter directory {}. Not a directory", dir.display());
            Err(RemoteError::new_ex(
                RemoteErrorType::BadFile,
                "not a directory",
            ))
        }
    }

    fn list_dir(&mut self, path: &Path) -> RemoteResult<Vec<File>> {
        self.check_connection()?;
        let parent = self.get_abs_path(path);
        let uri = self.get_uri(path);
        trace!("listing files at {}", uri);
        let files = self.remote.enumerate_file_system_infos(
            &uri,
            DEFAULT_SEARCH_PATTERN,
            SearchOption::TopDirectoryOnly,
        )?;
        Ok(files
            .into_iter()
            .map(|mut file| {
                file.path = parent.join(file.name());
                file
            })
            .collect())
    }

    fn stat(&mut self, path: &Path) -> RemoteResult<File> {
        self.check_connection()?;
        let uri = self.get_uri(path);
        trace!("get stat for {}", uri);
        let mut file = self.remote.file_info(&uri)?;
        file.path = self.get_abs_path(path);
        Ok(file)
    }

    fn setstat(&mut self, path: &Path, metadata: Metadata) -> RemoteResult<()> {
        self.check_connection()?;
        let uri = self.get_uri(path);
        trace!("setting times for {}", uri);
        let mut info = self.remote.info().from_directory_name(&uri)?;
        if let Some(created) = metadata.created {
            info.creation_time = DateTime::<Utc>::from(created);
        }
        if let Some(accessed) = metadata.accessed {
            info.last_access_time = DateTime::<Utc>::from(accessed);
        }
        if let Some(modified) = metadata.modified {
            info.last_write_time = DateTime::<Utc>::from(modified);
        }
        self.remote
            .info()
            .save_directory_info(&info)
            .map_err(RemoteError::from)
    }

    fn exists(&mut self, path: &Path) -> RemoteResult<bool> {
        self.check_connection()?;
        let uri = self.get_uri(path);
        trace!("checking if {} exists...", uri);
        self.remote.exists(&uri).map_err(RemoteError::from)
    }

    fn remove_file(&mut self, path: &Path) -> RemoteResult<()> {
        self.check_connection()?;
        let uri = self.get_uri(path);
        trace!("removing file {}", uri);
        self.remote
            .file()
            .delete(&uri)
            .map_err(|e| RemoteError::new_ex(RemoteErrorType::CouldNotRemoveFile, e))
    }

    fn remove_dir(&mut self, path: &Path) -> RemoteResult<()> {
        self.check_connection()?;
        let uri = self.get_uri(path);
        trace!("removing directory at {}", uri);
        self.remote
            .delete(&uri, false)
            .map_err(|e| RemoteError::new_ex(RemoteErrorType::CouldNotRemoveFile, e))
    }

    fn remove_dir_all(&mut self, path: &Path) -> RemoteResult<()> {
        self.check_connection()?;
        let uri = self.get_uri(path);
        trace!("removing directory tree at {}", uri);
        self.remote
            .delete(&uri, true)
            .map_err(|e| RemoteError::new_ex(RemoteErrorType::CouldNotRemoveFile, e))
    }

    fn create_dir(&mut self, path: &Path, mode: UnixPex) -> RemoteResult<()> {
        self.check_connection()?;
        if self.exists(path)? {
            return Err(RemoteError::new(RemoteErrorType::DirectoryAlreadyExists));
        }
        let uri = self.get_uri(path);
        trace!(
            "making directory at {} (mode {:o} is ignored)",
            uri,
            u32::from(mode)
        );
        self.remote
            .create_directory(&uri)
            .map(|_| ())
            .map_err(|e| RemoteError::new_ex(RemoteErrorType::FileCreateDenied, e))
    }

    fn symlink(&mut self, _path: &Path, _target: &Path) -> RemoteResult<()> {
        Err(RemoteError::new(RemoteErrorType::UnsupportedFeature))
    }

    fn copy(&mut self, _src: &Path, _dest: &Path) -> RemoteResult<()> {
        Err(RemoteError::new(RemoteErrorType::UnsupportedFeature))
    }

    fn mov(&mut self, src: &Path, dest: &Path) -> RemoteResult<()> {
        let is_dir = self.stat(src)?.is_dir();
        let src = self.get_uri(src);
        let dest = self.get_uri(dest);
        trace!("moving {} to {}", src, dest);
        let result = if is_dir {
            self.remote.move_directory(&src, &dest)
        } else {
            self.remote.file().move_file(&src, &dest)
        };
        result.map_err(RemoteError::from)
    }

    fn exec(&mut self, _cmd: &str) -> RemoteResult<(u32, String)> {
        Err(RemoteError::new(RemoteErrorType::UnsupportedFeature))
    }

    fn append_file(
        &mut self,
        path: &Path,
        _metadata: &Metadata,
        mut reader: Box<dyn Read + Send>,
    ) -> RemoteResult<u64> {
        self.check_connection()?;
        let uri = self.get_uri(path);
        trace!("opening file at {} for append", uri);
        self.remote
            .file()
            .write_from(&uri, reader.as_mut(), true)
            .map_err(RemoteError::from)
    }

    fn create_file(
        &mut self,
        path: &Path,
        _metadata: &Metadata,
        mut reader: Box<dyn Read + Send>,
    ) -> RemoteResult<u64> {
        self.check_connection()?;
        let uri = self.get_uri(path);
        trace!("creating file at {}", uri);
        self.remote
            .file()
            .write_from(&uri, reader.as_mut(), false)
            .map_err(RemoteError::from)
    }

    fn open_file(&mut self, path: &Path, mut dest: Box<dyn Write + Send>) -> RemoteResult<u64> {
        self.check_connection()?;
        let uri = self.get_uri(path);
        trace!("opening file at {} for read", uri);
        self.remote
            .file()
            .read_to(&uri, dest.as_mut())
            .map_err(RemoteError::from)
    }

    fn append(&mut self, _path: &Path, _metadata: &Metadata) -> RemoteResult<WriteStream> {
        Err(RemoteError::new(RemoteErrorType::UnsupportedFeature))
    }

    fn create(&mut self, _path: &Path, _metadata: &Metadata) -> RemoteResult<WriteStream> {
        Err(RemoteError::new(RemoteErrorType::UnsupportedFeature))
    }

    fn open(&mut self, _path: &Path) -> RemoteResult<ReadStream> {
        Err(RemoteError::new(RemoteErrorType::UnsupportedFeature))
    }
}
