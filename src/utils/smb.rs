//! # smb utils
//!
//! Conversion of SMB metadata into `remotefs` entries

use std::path::PathBuf;
use std::time::SystemTime;

use remotefs::fs::{FileType, Metadata};
use remotefs::File;

use crate::client::{DirectoryEntry, FileAttributes};

/// Build a `File` at `path` from SMB attributes and timestamps
pub fn info_to_file(
    path: &str,
    attributes: FileAttributes,
    size: u64,
    created: SystemTime,
    accessed: SystemTime,
    modified: SystemTime,
) -> File {
    File {
        path: PathBuf::from(path),
        metadata: Metadata::default()
            .accessed(accessed)
            .created(created)
            .file_type(get_file_type_from_attributes(attributes))
            .modified(modified)
            .size(size),
    }
}

/// Convert a directory query entry found at `path` to `File`
pub fn entry_to_file(path: &str, entry: &DirectoryEntry) -> File {
    info_to_file(
        path,
        entry.attributes,
        entry.end_of_file,
        entry.creation_time,
        entry.last_access_time,
        entry.last_write_time,
    )
}

fn get_file_type_from_attributes(attributes: FileAttributes) -> FileType {
    if attributes.contains(FileAttributes::DIRECTORY) {
        FileType::Directory
    } else if attributes.contains(FileAttributes::REPARSE_POINT) {
        FileType::Symlink
    } else {
        FileType::File
    }
}
