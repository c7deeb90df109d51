//! # file
//!
//! File primitives on share paths: delete, move, read and write

use std::io::{Read, Write};

use crate::client::{
    AccessMask, CreateDisposition, CreateOptions, FileHandle, SetFileInformation, ShareAccess,
};
use crate::connection::{SmbConnection, SmbConnector};
use crate::credentials::SmbCredential;
use crate::error::{SmbError, SmbErrorKind, SmbResult};
use crate::path::SharePath;

/// Amount of bytes transferred by a single read or write request
pub const CHUNK_SIZE: u32 = 65536;

/// File operations, each one in its own connection scope
#[derive(Clone)]
pub struct SmbFile {
    connector: SmbConnector,
}

impl SmbFile {
    pub fn new(connector: SmbConnector) -> Self {
        Self { connector }
    }

    /// Delete the file at `path`
    pub fn delete(&self, path: &str) -> SmbResult<()> {
        let path = SharePath::parse(path)?;
        let credential = self.connector.credential(&path)?;
        let mut conn = self.connector.connect(&path, &credential)?;
        delete_file(&mut conn, &path)
    }

    /// Move the file at `source` to `dest`; credentials are resolved for each side
    pub fn move_file(&self, source: &str, dest: &str) -> SmbResult<()> {
        let source_path = SharePath::parse(source)?;
        let dest_path = SharePath::parse(dest)?;
        let source_credential = self.connector.credential(&source_path)?;
        let dest_credential = self.connector.credential(&dest_path)?;
        self.move_file_with(source, dest, &source_credential, &dest_credential)
    }

    /// Move the file at `source` to `dest` with the provided credentials.
    ///
    /// On the same share the file is renamed; otherwise it is copied by chunks and the source is
    /// deleted once the copy has completed.
    pub fn move_file_with(
        &self,
        source: &str,
        dest: &str,
        source_credential: &SmbCredential,
        dest_credential: &SmbCredential,
    ) -> SmbResult<()> {
        let source = SharePath::parse(source)?;
        let dest = SharePath::parse(dest)?;
        debug!("moving file {} to {}", source, dest);
        let mut source_conn = self.connector.connect(&source, source_credential)?;
        if source.same_share(&dest) {
            return rename(&mut source_conn, &source, &dest);
        }
        let mut dest_conn = self.connector.connect(&dest, dest_credential)?;
        let source_handle = source_conn.create_file(
            &source.protocol_path(),
            AccessMask::GENERIC_READ,
            ShareAccess::READ,
            CreateDisposition::Open,
            CreateOptions::FILE_NON_DIRECTORY_FILE,
        )?;
        let copied = source_conn.with_handle(source_handle, |source_conn, source_handle| {
            let dest_handle = dest_conn.create_file(
                &dest.protocol_path(),
                AccessMask::GENERIC_WRITE,
                ShareAccess::empty(),
                CreateDisposition::Create,
                CreateOptions::FILE_NON_DIRECTORY_FILE,
            )?;
            dest_conn.with_handle(dest_handle, |dest_conn, dest_handle| {
                copy(source_conn, source_handle, dest_conn, dest_handle)
            })
        })?;
        debug!("copied {} bytes from {} to {}", copied, source, dest);
        delete_file(&mut source_conn, &source)
    }

    /// Read the file at `path` into `dest`, returning the amount of bytes read
    pub fn read_to(&self, path: &str, dest: &mut dyn Write) -> SmbResult<u64> {
        let path = SharePath::parse(path)?;
        let credential = self.connector.credential(&path)?;
        let mut conn = self.connector.connect(&path, &credential)?;
        trace!("opening file at {} for read", path);
        let handle = conn.create_file(
            &path.protocol_path(),
            AccessMask::GENERIC_READ,
            ShareAccess::READ,
            CreateDisposition::Open,
            CreateOptions::FILE_NON_DIRECTORY_FILE,
        )?;
        conn.with_handle(handle, |conn, handle| {
            let mut offset = 0;
            loop {
                let data = conn.read(handle, offset, CHUNK_SIZE)?;
                if data.is_empty() {
                    break;
                }
                dest.write_all(&data)?;
                offset += data.len() as u64;
            }
            Ok(offset)
        })
    }

    /// Write `reader` into the file at `path`; the file is created if missing and truncated,
    /// unless `append` is set
    pub fn write_from(&self, path: &str, reader: &mut dyn Read, append: bool) -> SmbResult<u64> {
        let path = SharePath::parse(path)?;
        let credential = self.connector.credential(&path)?;
        let mut conn = self.connector.connect(&path, &credential)?;
        trace!("opening file at {} for write (append: {})", path, append);
        let disposition = if append {
            CreateDisposition::OpenIf
        } else {
            CreateDisposition::OverwriteIf
        };
        let handle = conn.create_file(
            &path.protocol_path(),
            AccessMask::GENERIC_WRITE | AccessMask::FILE_READ_ATTRIBUTES,
            ShareAccess::empty(),
            disposition,
            CreateOptions::FILE_NON_DIRECTORY_FILE,
        )?;
        conn.with_handle(handle, |conn, handle| {
            let start = if append {
                conn.query_information(handle)?.end_of_file
            } else {
                0
            };
            let mut offset = start;
            let mut buffer = vec![0; CHUNK_SIZE as usize];
            loop {
                let read = reader.read(&mut buffer)?;
                if read == 0 {
                    break;
                }
                let mut written = 0;
                while written < read {
                    let amount =
                        check_written(conn.write(handle, offset, &buffer[written..read])?)?;
                    written += amount as usize;
                    offset += amount as u64;
                }
            }
            Ok(offset - start)
        })
    }
}

/// Delete a file through a delete-on-close handle
pub(crate) fn delete_file(conn: &mut SmbConnection, path: &SharePath) -> SmbResult<()> {
    trace!("deleting file {}", path);
    let handle = conn.create_file(
        &path.protocol_path(),
        AccessMask::DELETE,
        ShareAccess::DELETE,
        CreateDisposition::Open,
        CreateOptions::FILE_DELETE_ON_CLOSE | CreateOptions::FILE_NON_DIRECTORY_FILE,
    )?;
    conn.close(handle)
}

fn rename(conn: &mut SmbConnection, source: &SharePath, dest: &SharePath) -> SmbResult<()> {
    trace!("renaming {} to {}", source, dest);
    let handle = conn.create_file(
        &source.protocol_path(),
        AccessMask::DELETE | AccessMask::SYNCHRONIZE,
        ShareAccess::READ | ShareAccess::WRITE | ShareAccess::DELETE,
        CreateDisposition::Open,
        CreateOptions::FILE_NON_DIRECTORY_FILE,
    )?;
    let information = SetFileInformation::Rename {
        target: dest.protocol_path(),
        replace: false,
    };
    conn.with_handle(handle, |conn, handle| {
        conn.set_information(handle, information)
    })
}

fn check_written(amount: u32) -> SmbResult<u32> {
    if amount == 0 {
        Err(SmbError::new_ex(
            SmbErrorKind::ProtocolError,
            "server accepted no data",
        ))
    } else {
        Ok(amount)
    }
}

fn copy(
    source_conn: &mut SmbConnection,
    source_handle: &FileHandle,
    dest_conn: &mut SmbConnection,
    dest_handle: &FileHandle,
) -> SmbResult<u64> {
    let mut offset = 0;
    loop {
        let data = source_conn.read(source_handle, offset, CHUNK_SIZE)?;
        if data.is_empty() {
            break;
        }
        let mut written = 0;
        while written < data.len() {
            let amount = check_written(dest_conn.write(
                dest_handle,
                offset + written as u64,
                &data[written..],
            )?)?;
            written += amount as usize;
        }
        offset += data.len() as u64;
    }
    Ok(offset)
}
