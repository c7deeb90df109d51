//! # path
//!
//! Classification and decomposition of share paths.
//!
//! Two syntaxes are accepted and resolve identically:
//!
//! - URI style: `smb://host[:port]/share/rest...`
//! - UNC style: `\\host\share\rest...`

use std::fmt;

use crate::error::{SmbError, SmbErrorKind, SmbResult};

/// Scheme accepted for URI-style paths (compared case-insensitively)
pub const SMB_SCHEME: &str = "smb";

const UNC_PREFIX: &str = "\\\\";
const SCHEME_SEPARATOR: &str = "://";

/// Syntax a share path was written with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSyntax {
    /// `smb://host/share/rest`
    Uri,
    /// `\\host\share\rest`
    Unc,
}

impl PathSyntax {
    /// Path separator used by this syntax
    pub fn separator(self) -> char {
        match self {
            Self::Uri => '/',
            Self::Unc => '\\',
        }
    }
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Raw split of a remote path: syntax, prefix (`smb://` or `\\`), host segment and the rest
struct RemoteParts<'a> {
    syntax: PathSyntax,
    prefix: &'a str,
    host: &'a str,
    rest: &'a str,
}

fn split_remote(path: &str) -> Option<RemoteParts<'_>> {
    let (syntax, prefix_len) = if path.starts_with(UNC_PREFIX) {
        (PathSyntax::Unc, UNC_PREFIX.len())
    } else {
        let idx = path.find(SCHEME_SEPARATOR)?;
        if !path[..idx].eq_ignore_ascii_case(SMB_SCHEME) {
            return None;
        }
        (PathSyntax::Uri, idx + SCHEME_SEPARATOR.len())
    };
    let body = &path[prefix_len..];
    let host_end = body.find(is_separator).unwrap_or(body.len());
    let host = &body[..host_end];
    if host.is_empty() {
        return None;
    }
    Some(RemoteParts {
        syntax,
        prefix: &path[..prefix_len],
        host,
        rest: &body[host_end..],
    })
}

fn split_port(host: &str) -> (&str, Option<u16>) {
    match host.rsplit_once(':') {
        Some((name, port)) if !name.is_empty() => match port.parse::<u16>() {
            Ok(port) => (name, Some(port)),
            Err(_) => (host, None),
        },
        _ => (host, None),
    }
}

/// Parsed view of a remote path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePath {
    syntax: PathSyntax,
    /// `smb://` or `\\`, as written
    prefix: String,
    host: String,
    port: Option<u16>,
    share: String,
    relative_path: String,
}

impl SharePath {
    /// Parse a remote path. Fails with `InvalidPath` if the path is not remote or has no share.
    pub fn parse(path: &str) -> SmbResult<Self> {
        let parts = split_remote(path).ok_or_else(|| {
            SmbError::new_ex(SmbErrorKind::InvalidPath, format!("{path} is not a share path"))
        })?;
        let rest = parts.rest.trim_start_matches(is_separator);
        let share_end = rest.find(is_separator).unwrap_or(rest.len());
        let share = &rest[..share_end];
        if share.is_empty() {
            return Err(SmbError::new_ex(
                SmbErrorKind::InvalidPath,
                format!("{path} has no share segment"),
            ));
        }
        let separator = parts.syntax.separator();
        let relative_path: String = rest[share_end..]
            .trim_start_matches(is_separator)
            .chars()
            .map(|c| if is_separator(c) { separator } else { c })
            .collect();
        let (host, port) = match parts.syntax {
            PathSyntax::Uri => split_port(parts.host),
            PathSyntax::Unc => (parts.host, None),
        };
        Ok(Self {
            syntax: parts.syntax,
            prefix: parts.prefix.to_string(),
            host: host.to_string(),
            port,
            share: share.to_string(),
            relative_path,
        })
    }

    pub fn syntax(&self) -> PathSyntax {
        self.syntax
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port of a URI-style path (`smb://host:port/...`)
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn share(&self) -> &str {
        &self.share
    }

    /// Path inside the share, with the syntax separator and no leading separator
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// Returns whether the path points to the share root
    pub fn is_share_root(&self) -> bool {
        self.protocol_path().is_empty()
    }

    /// Relative path as sent to the server: backslash separated, no trailing separator
    pub fn protocol_path(&self) -> String {
        self.relative_path
            .trim_end_matches(is_separator)
            .replace('/', "\\")
    }

    /// Last segment of the relative path
    pub fn file_name(&self) -> Option<&str> {
        self.relative_path
            .trim_end_matches(is_separator)
            .rsplit(is_separator)
            .next()
            .filter(|name| !name.is_empty())
    }

    /// `smb://host/share` or `\\host\share`
    pub fn share_root(&self) -> String {
        self.with_share(&self.share)
    }

    /// Share path on the same host pointing to another share
    pub fn with_share(&self, share: &str) -> String {
        format!(
            "{}{}{}{}",
            self.prefix,
            self.host_segment(),
            self.syntax.separator(),
            share
        )
    }

    /// Returns whether both paths live on the same host and share
    pub fn same_share(&self, other: &SharePath) -> bool {
        self.host.eq_ignore_ascii_case(&other.host)
            && self.port == other.port
            && self.share.eq_ignore_ascii_case(&other.share)
    }

    fn host_segment(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }
}

impl fmt::Display for SharePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.share_root())?;
        if !self.relative_path.is_empty() {
            write!(f, "{}{}", self.syntax.separator(), self.relative_path)?;
        }
        Ok(())
    }
}

/// Share path helpers on path strings
pub trait SmbPathExt {
    /// Returns whether the path is written in one of the remote syntaxes with a host segment
    fn is_smb_path(&self) -> bool;
    /// Host segment, without port
    fn hostname(&self) -> SmbResult<String>;
    fn share_name(&self) -> SmbResult<String>;
    fn relative_share_path(&self) -> SmbResult<String>;
    /// Path truncated to `smb://host/share` or `\\host\share`
    fn share_path(&self) -> SmbResult<String>;
    /// `smb://host/{share}` or `\\host\{share}` matching the path syntax
    fn build_share_path(&self, share: &str) -> SmbResult<String>;
    /// Append `suffix` with the separator of the path syntax
    fn combine_to_share_path(&self, suffix: &str) -> String;
    /// Parent path, resolved like the relative URI `..` (trailing separator) or `.`
    fn parent_path(&self) -> SmbResult<String>;
}

impl SmbPathExt for str {
    fn is_smb_path(&self) -> bool {
        split_remote(self).is_some()
    }

    fn hostname(&self) -> SmbResult<String> {
        let parts = split_remote(self).ok_or_else(|| not_remote(self))?;
        Ok(match parts.syntax {
            PathSyntax::Uri => split_port(parts.host).0.to_string(),
            PathSyntax::Unc => parts.host.to_string(),
        })
    }

    fn share_name(&self) -> SmbResult<String> {
        SharePath::parse(self).map(|p| p.share)
    }

    fn relative_share_path(&self) -> SmbResult<String> {
        SharePath::parse(self).map(|p| p.relative_path)
    }

    fn share_path(&self) -> SmbResult<String> {
        SharePath::parse(self).map(|p| p.share_root())
    }

    fn build_share_path(&self, share: &str) -> SmbResult<String> {
        let parts = split_remote(self).ok_or_else(|| not_remote(self))?;
        Ok(format!(
            "{}{}{}{}",
            parts.prefix,
            parts.host,
            parts.syntax.separator(),
            share
        ))
    }

    fn combine_to_share_path(&self, suffix: &str) -> String {
        let separator = if self.starts_with(UNC_PREFIX) {
            PathSyntax::Unc.separator()
        } else {
            PathSyntax::Uri.separator()
        };
        if self.ends_with(is_separator) {
            format!("{self}{suffix}")
        } else {
            format!("{self}{separator}{suffix}")
        }
    }

    fn parent_path(&self) -> SmbResult<String> {
        let parts = split_remote(self).ok_or_else(|| not_remote(self))?;
        let prefix_len = parts.prefix.len();
        let body = self[prefix_len..].trim_end_matches(is_separator);
        match body.rfind(is_separator) {
            Some(idx) => Ok(self[..prefix_len + idx + 1].to_string()),
            None => Err(SmbError::new_ex(
                SmbErrorKind::InvalidPath,
                format!("{self} has no parent"),
            )),
        }
    }
}

fn not_remote(path: &str) -> SmbError {
    SmbError::new_ex(
        SmbErrorKind::InvalidPath,
        format!("{path} is not a share path"),
    )
}
