//! # credentials
//!
//! Credentials for remote hosts and their lookup by share path

use std::fmt;
use std::sync::{Arc, RwLock};

use crate::error::{SmbError, SmbErrorKind, SmbResult};
use crate::path::SharePath;

/// Authentication material for a host, optionally scoped to a single share
#[derive(Default, Clone, PartialEq, Eq)]
pub struct SmbCredential {
    pub(crate) host: String,
    pub(crate) share: Option<String>,
    pub(crate) domain: Option<String>,
    pub(crate) username: Option<String>,
    pub(crate) password: Option<String>,
}

impl SmbCredential {
    pub fn new<S: AsRef<str>>(host: S) -> Self {
        Self {
            host: host.as_ref().to_string(),
            ..Default::default()
        }
    }

    /// Construct SmbCredential scoped to the provided share
    pub fn share<S: AsRef<str>>(mut self, share: S) -> Self {
        self.share = Some(share.as_ref().to_string());
        self
    }

    /// Construct SmbCredential with the provided domain (or workgroup)
    pub fn domain<S: AsRef<str>>(mut self, domain: S) -> Self {
        self.domain = Some(domain.as_ref().to_string());
        self
    }

    /// Construct SmbCredential with the provided username
    pub fn username<S: AsRef<str>>(mut self, username: S) -> Self {
        self.username = Some(username.as_ref().to_string());
        self
    }

    /// Construct SmbCredential with the provided password
    pub fn password<S: AsRef<str>>(mut self, password: S) -> Self {
        self.password = Some(password.as_ref().to_string());
        self
    }

    pub fn get_host(&self) -> &str {
        &self.host
    }

    pub fn get_share(&self) -> Option<&str> {
        self.share.as_deref()
    }

    pub fn get_domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn get_username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn get_password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

impl fmt::Debug for SmbCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmbCredential")
            .field("host", &self.host)
            .field("share", &self.share)
            .field("domain", &self.domain)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .finish()
    }
}

/// Store of credentials; the engine only reads from it
pub trait CredentialStore: Send + Sync {
    /// Look up a credential for `host`, scoped to `share` when given
    fn lookup(&self, host: &str, share: Option<&str>) -> Option<SmbCredential>;
}

/// A credential store kept in memory
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    credentials: RwLock<Vec<SmbCredential>>,
}

impl InMemoryCredentialStore {
    /// Add a credential, replacing any previous one for the same host and share
    pub fn insert(&self, credential: SmbCredential) {
        let mut credentials = match self.credentials.write() {
            Ok(lock) => lock,
            Err(poisoned) => poisoned.into_inner(),
        };
        credentials.retain(|c| !(same_host(c, &credential.host) && c.share == credential.share));
        credentials.push(credential);
    }

    /// Construct the store with the provided credential
    pub fn with(self, credential: SmbCredential) -> Self {
        self.insert(credential);
        self
    }
}

fn same_host(credential: &SmbCredential, host: &str) -> bool {
    credential.host.eq_ignore_ascii_case(host)
}

impl CredentialStore for InMemoryCredentialStore {
    fn lookup(&self, host: &str, share: Option<&str>) -> Option<SmbCredential> {
        let credentials = match self.credentials.read() {
            Ok(lock) => lock,
            Err(poisoned) => poisoned.into_inner(),
        };
        credentials
            .iter()
            .find(|c| {
                same_host(c, host)
                    && match (c.share.as_deref(), share) {
                        (None, None) => true,
                        (Some(scope), Some(share)) => scope.eq_ignore_ascii_case(share),
                        _ => false,
                    }
            })
            .cloned()
    }
}

/// Resolves the credential to use for a share path
#[derive(Clone)]
pub struct CredentialResolver {
    store: Arc<dyn CredentialStore>,
}

impl CredentialResolver {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Get the credential for `path`: a share-scoped entry wins over the host-wide one
    pub fn get_credential(&self, path: &SharePath) -> SmbResult<SmbCredential> {
        trace!("looking up credential for {}", path);
        self.store
            .lookup(path.host(), Some(path.share()))
            .or_else(|| self.store.lookup(path.host(), None))
            .map(|credential| {
                debug!(
                    "using credential {:?} for {}",
                    credential.username.as_deref().unwrap_or("<anonymous>"),
                    path
                );
                credential
            })
            .ok_or_else(|| {
                error!("no credential found for {}", path);
                SmbError::new_ex(
                    SmbErrorKind::CredentialNotFound,
                    format!("unable to find credential for path: {path}"),
                )
            })
    }
}
