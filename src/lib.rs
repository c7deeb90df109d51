#![crate_name = "remotefs_smb_directory"]
#![crate_type = "lib"]

//! # remotefs-smb-directory
//!
//! remotefs-smb-directory is a directory engine for SMB share paths, built for
//! [remotefs](https://github.com/remotefs-rs/remotefs-rs).
//!
//! Paths may be written as `smb://host[:port]/share/dir` or `\\host\share\dir`; any other path
//! is served by the local filesystem. Each operation opens its own connection scope (session,
//! tree connect, handles) which is released before the call returns.
//!
//! ## Get started
//!
//! First of all you need to add **remotefs** and the engine to your project dependencies:
//!
//! ```toml
//! remotefs = "^0.3"
//! remotefs-smb-directory = { version = "^0.1", features = ["pavao"] }
//! ```
//!
//! these features are supported:
//!
//! - `find`: enable `find()` method for RemoteFs. (*enabled by default*)
//! - `no-log`: disable logging. By default, this library will log via the `log` crate.
//! - `pavao`: libsmbclient backend (UNIX only)
//!
//! ### Directory engine
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use remotefs_smb_directory::{
//!     Directory, InMemoryCredentialStore, PavaoClientFactory, SearchOption, SmbConfig,
//!     SmbCredential, SmbDirectory,
//! };
//!
//! let credentials = InMemoryCredentialStore::default().with(
//!     SmbCredential::new("localhost")
//!         .username("test")
//!         .password("test"),
//! );
//! let directory = SmbDirectory::new(
//!     Arc::new(PavaoClientFactory::default().workgroup("pavao")),
//!     Arc::new(credentials),
//!     SmbConfig::default(),
//! );
//! directory.create_directory("smb://localhost/temp/cargo").unwrap();
//! for file in directory
//!     .enumerate_files("smb://localhost/temp", "*.txt", SearchOption::AllDirectories)
//!     .unwrap()
//! {
//!     println!("{file}");
//! }
//! directory.delete("smb://localhost/temp/cargo", true).unwrap();
//! ```
//!
//! ### RemoteFs client
//!
//! ```rust,ignore
//! use std::path::Path;
//!
//! use remotefs::{RemoteFs, fs::UnixPex};
//! use remotefs_smb_directory::SmbFs;
//!
//! let mut client = SmbFs::try_new(directory.remote().clone(), "smb://localhost/temp").unwrap();
//! assert!(client.connect().is_ok());
//! assert!(client.create_dir(Path::new("/cargo"), UnixPex::from(0o755)).is_ok());
//! assert!(client.change_dir(Path::new("/cargo")).is_ok());
//! assert!(client.disconnect().is_ok());
//! ```
//!

#![doc(html_playground_url = "https://play.rust-lang.org")]
#![doc(
    html_favicon_url = "https://raw.githubusercontent.com/remotefs-rs/remotefs-rs/main/assets/logo-128.png"
)]
#![doc(
    html_logo_url = "https://raw.githubusercontent.com/remotefs-rs/remotefs-rs/main/assets/logo.png"
)]

// -- crates
#[macro_use]
extern crate log;

pub mod client;
pub mod config;
pub mod connection;
pub mod credentials;
pub mod directory;
pub mod error;
pub mod file;
mod fs;
pub mod info;
pub mod path;
pub mod status;

#[cfg(all(target_family = "unix", feature = "pavao"))]
pub use client::PavaoClientFactory;
pub use client::{SmbClientFactory, SmbFileStore, SmbSession};
pub use config::{SmbConfig, TransportType};
pub use connection::{AddressResolver, SmbConnector, SystemResolver};
pub use credentials::{CredentialStore, InMemoryCredentialStore, SmbCredential};
pub use directory::{Directory, LocalDirectory, RemoteDirectory, SearchOption, SmbDirectory};
pub use error::{SmbError, SmbErrorKind, SmbResult};
pub use file::SmbFile;
pub use fs::SmbFs;
pub use info::{SmbDirectoryInfo, SmbDirectoryInfoFactory};
pub use path::{PathSyntax, SharePath, SmbPathExt};
pub use status::NtStatus;

// -- utils
pub(crate) mod utils;
// -- mock
#[cfg(test)]
pub(crate) mod mock;
