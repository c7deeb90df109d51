//! # config
//!
//! Engine configuration

/// Default number of attempts when opening a directory handle reports `STATUS_PENDING`
pub const DEFAULT_PENDING_RETRIES: usize = 3;

/// Name of the hidden marker files which are never surfaced by enumerations
pub const DEFAULT_HIDDEN_ENTRY: &str = ".DS_Store";

/// Network transport used to reach the remote host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportType {
    /// SMB over TCP/445
    #[default]
    DirectTcp,
    /// SMB over NetBIOS session service on TCP/139
    NetBiosOverTcp,
}

impl TransportType {
    /// Default port for the transport
    pub fn default_port(self) -> u16 {
        match self {
            Self::DirectTcp => 445,
            Self::NetBiosOverTcp => 139,
        }
    }
}

/// Configuration shared by every operation of the engine
#[derive(Debug, Clone)]
pub struct SmbConfig {
    pub(crate) transport: TransportType,
    pub(crate) pending_retries: usize,
    pub(crate) hidden_entries: Vec<String>,
}

impl Default for SmbConfig {
    fn default() -> Self {
        Self {
            transport: TransportType::default(),
            pending_retries: DEFAULT_PENDING_RETRIES,
            hidden_entries: vec![DEFAULT_HIDDEN_ENTRY.to_string()],
        }
    }
}

impl SmbConfig {
    /// Set the transport type used to connect to hosts
    pub fn transport(mut self, transport: TransportType) -> Self {
        self.transport = transport;
        self
    }

    /// Set how many times a directory handle is requested while the server reports it pending.
    /// Values lower than 1 are treated as 1.
    pub fn pending_retries(mut self, retries: usize) -> Self {
        self.pending_retries = retries.max(1);
        self
    }

    /// Add a name which is always filtered out of enumerations
    pub fn hidden_entry<S: AsRef<str>>(mut self, name: S) -> Self {
        self.hidden_entries.push(name.as_ref().to_string());
        self
    }

    /// Remove every hidden entry name, including the default one
    pub fn no_hidden_entries(mut self) -> Self {
        self.hidden_entries.clear();
        self
    }

    /// Returns whether an enumerated name is `.`, `..` or a hidden marker
    pub fn is_special_entry(&self, name: &str) -> bool {
        name == "." || name == ".." || self.is_hidden_entry(name)
    }

    /// Returns whether `name` is a hidden marker
    pub fn is_hidden_entry(&self, name: &str) -> bool {
        self.hidden_entries.iter().any(|h| h == name)
    }
}
