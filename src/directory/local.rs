//! # local
//!
//! Directory verbs on the local filesystem, used for every path which is not a share path

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use filetime::FileTime;
use glob::Pattern;
use remotefs::fs::{FileType, Metadata, UnixPex};
use remotefs::File;

use super::{Directory, SearchOption};
use crate::error::{SmbError, SmbErrorKind, SmbResult};
use crate::utils::fmt as fmt_utils;

/// Local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalDirectory;

impl LocalDirectory {
    fn stat(path: &Path) -> SmbResult<File> {
        let attr = fs::symlink_metadata(path)?;
        let file_type = if attr.file_type().is_symlink() {
            FileType::Symlink
        } else if attr.is_dir() {
            FileType::Directory
        } else {
            FileType::File
        };
        let mut metadata = Metadata::default().file_type(file_type).size(attr.len());
        if let Ok(time) = attr.accessed() {
            metadata = metadata.accessed(time);
        }
        if let Ok(time) = attr.created() {
            metadata = metadata.created(time);
        }
        if let Ok(time) = attr.modified() {
            metadata = metadata.modified(time);
        }
        #[cfg(target_family = "unix")]
        {
            use std::os::unix::fs::{MetadataExt, PermissionsExt};

            metadata = metadata
                .mode(UnixPex::from(attr.permissions().mode() & 0o7777))
                .uid(attr.uid())
                .gid(attr.gid());
        }
        Ok(File {
            path: path.to_path_buf(),
            metadata,
        })
    }

    fn walk(
        dir: &Path,
        pattern: &Pattern,
        option: SearchOption,
        entries: &mut Vec<(PathBuf, bool)>,
    ) -> SmbResult<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let is_dir = entry.file_type()?.is_dir();
            if pattern.matches(&entry.file_name().to_string_lossy()) {
                entries.push((path.clone(), is_dir));
            }
            if is_dir && option == SearchOption::AllDirectories {
                Self::walk(&path, pattern, option, entries)?;
            }
        }
        Ok(())
    }

    fn enumerate(
        path: &str,
        pattern: &str,
        option: SearchOption,
    ) -> SmbResult<Vec<(PathBuf, bool)>> {
        let pattern = Pattern::new(pattern).map_err(|e| {
            SmbError::new_ex(
                SmbErrorKind::InvalidPath,
                format!("invalid search pattern {pattern}: {e}"),
            )
        })?;
        let mut entries = Vec::new();
        Self::walk(Path::new(path), &pattern, option, &mut entries)?;
        Ok(entries)
    }

    fn paths<F>(entries: Vec<(PathBuf, bool)>, filter: F) -> Vec<String>
    where
        F: Fn(bool) -> bool,
    {
        entries
            .into_iter()
            .filter(|(_, is_dir)| filter(*is_dir))
            .map(|(path, _)| path.to_string_lossy().to_string())
            .collect()
    }

    fn times(path: &str) -> SmbResult<fs::Metadata> {
        fs::metadata(path).map_err(SmbError::from)
    }
}

impl Directory for LocalDirectory {
    fn create_directory(&self, path: &str) -> SmbResult<File> {
        trace!("creating local directory {}", path);
        fs::create_dir_all(path)?;
        Self::stat(Path::new(path))
    }

    fn delete(&self, path: &str, recursive: bool) -> SmbResult<()> {
        trace!("removing local directory {} (recursive: {})", path, recursive);
        if recursive {
            fs::remove_dir_all(path)?;
        } else {
            fs::remove_dir(path)?;
        }
        Ok(())
    }

    fn enumerate_directories(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
    ) -> SmbResult<Vec<String>> {
        Self::enumerate(path, pattern, option).map(|entries| Self::paths(entries, |dir| dir))
    }

    fn enumerate_files(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
    ) -> SmbResult<Vec<String>> {
        Self::enumerate(path, pattern, option).map(|entries| Self::paths(entries, |dir| !dir))
    }

    fn enumerate_file_system_entries(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
    ) -> SmbResult<Vec<String>> {
        Self::enumerate(path, pattern, option).map(|entries| Self::paths(entries, |_| true))
    }

    fn enumerate_file_system_infos(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
    ) -> SmbResult<Vec<File>> {
        Self::enumerate(path, pattern, option)?
            .iter()
            .map(|(path, _)| Self::stat(path))
            .collect()
    }

    fn exists(&self, path: &str) -> SmbResult<bool> {
        Ok(Path::new(path).exists())
    }

    fn get_parent(&self, path: &str) -> SmbResult<File> {
        let parent = Path::new(path).parent().ok_or_else(|| {
            SmbError::new_ex(SmbErrorKind::InvalidPath, format!("{path} has no parent"))
        })?;
        Self::stat(parent)
    }

    fn move_directory(&self, source: &str, dest: &str) -> SmbResult<()> {
        trace!("moving local directory {} to {}", source, dest);
        fs::rename(source, dest).map_err(SmbError::from)
    }

    fn get_directory_root(&self, path: &str) -> SmbResult<String> {
        let path = Path::new(path);
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        Ok(absolute
            .ancestors()
            .last()
            .unwrap_or(absolute.as_path())
            .to_string_lossy()
            .to_string())
    }

    fn file_info(&self, path: &str) -> SmbResult<File> {
        Self::stat(Path::new(path))
    }

    #[cfg(target_family = "unix")]
    fn get_access_control(&self, path: &str) -> SmbResult<UnixPex> {
        use std::os::unix::fs::PermissionsExt;

        let mode = fs::metadata(path)?.permissions().mode();
        Ok(UnixPex::from(mode & 0o7777))
    }

    #[cfg(not(target_family = "unix"))]
    fn get_access_control(&self, path: &str) -> SmbResult<UnixPex> {
        Err(SmbError::new_ex(
            SmbErrorKind::Unsupported,
            format!("access control is not supported on {path}"),
        ))
    }

    #[cfg(target_family = "unix")]
    fn set_access_control(&self, path: &str, mode: UnixPex) -> SmbResult<()> {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(path, fs::Permissions::from_mode(u32::from(mode)))
            .map_err(SmbError::from)
    }

    #[cfg(not(target_family = "unix"))]
    fn set_access_control(&self, path: &str, _mode: UnixPex) -> SmbResult<()> {
        Err(SmbError::new_ex(
            SmbErrorKind::Unsupported,
            format!("access control is not supported on {path}"),
        ))
    }

    fn get_current_directory(&self) -> SmbResult<String> {
        Ok(std::env::current_dir()?.to_string_lossy().to_string())
    }

    fn set_current_directory(&self, path: &str) -> SmbResult<()> {
        std::env::set_current_dir(path).map_err(SmbError::from)
    }

    fn creation_time_utc(&self, path: &str) -> SmbResult<DateTime<Utc>> {
        Ok(Self::times(path)?.created()?.into())
    }

    fn last_access_time_utc(&self, path: &str) -> SmbResult<DateTime<Utc>> {
        Ok(Self::times(path)?.accessed()?.into())
    }

    fn last_write_time_utc(&self, path: &str) -> SmbResult<DateTime<Utc>> {
        Ok(Self::times(path)?.modified()?.into())
    }

    fn set_creation_time_utc(&self, path: &str, _time: DateTime<Utc>) -> SmbResult<()> {
        Err(SmbError::new_ex(
            SmbErrorKind::Unsupported,
            format!("cannot set creation time of {path}"),
        ))
    }

    fn set_last_access_time_utc(&self, path: &str, time: DateTime<Utc>) -> SmbResult<()> {
        trace!("setting last access time of {} to {}", path, fmt_utils::fmt_utc(&time));
        let time = FileTime::from_system_time(SystemTime::from(time));
        filetime::set_file_atime(path, time).map_err(SmbError::from)
    }

    fn set_last_write_time_utc(&self, path: &str, time: DateTime<Utc>) -> SmbResult<()> {
        trace!("setting last write time of {} to {}", path, fmt_utils::fmt_utc(&time));
        let time = FileTime::from_system_time(SystemTime::from(time));
        filetime::set_file_mtime(path, time).map_err(SmbError::from)
    }
}
