use std::fmt;

#[derive(Debug)]
pub enum GongError {
    Storage(StorageError),
    Fetch(FetchError),
    Cache(CacheError),
    Config(ConfigError),
}

/// Failures of the key-value store backing persisted settings.
#[derive(Debug)]
pub enum StorageError {
    Unavailable { reason: String },
    QuotaExceeded { key: String },
    Io(std::io::Error),
    Encoding(serde_json::Error),
}

/// Failures while fetching a resource for the offline worker.
#[derive(Debug)]
pub enum FetchError {
    Network { url: String, reason: String },
    Status { url: String, status: u16 },
}

/// Failures of a named-cache backend.
#[derive(Debug)]
pub enum CacheError {
    InvalidName { name: String },
    Io(std::io::Error),
    Corrupt { url: String, reason: String },
}

#[derive(Debug)]
pub enum ConfigError {
    Read { path: String, reason: String },
    Parse { reason: String },
}

impl fmt::Display for GongError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GongError::Storage(e) => write!(f, "Storage error: {e}"),
            GongError::Fetch(e) => write!(f, "Fetch error: {e}"),
            GongError::Cache(e) => write!(f, "Cache error: {e}"),
            GongError::Config(e) => write!(f, "Config error: {e}"),
        }
    }
}

impl std::error::Error for GongError {}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Unavailable { reason } => write!(f, "storage unavailable: {reason}"),
            StorageError::QuotaExceeded { key } => write!(f, "quota exceeded writing '{key}'"),
            StorageError::Io(e) => write!(f, "{e}"),
            StorageError::Encoding(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Network { url, reason } => write!(f, "network failure for {url}: {reason}"),
            FetchError::Status { url, status } => write!(f, "{url} answered with status {status}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::InvalidName { name } => write!(f, "invalid cache name '{name}'"),
            CacheError::Io(e) => write!(f, "{e}"),
            CacheError::Corrupt { url, reason } => write!(f, "corrupt entry for {url}: {reason}"),
        }
    }
}

impl std::error::Error for CacheError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, reason } => write!(f, "could not read {path}: {reason}"),
            ConfigError::Parse { reason } => write!(f, "malformed config: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<StorageError> for GongError {
    fn from(e: StorageError) -> Self {
        GongError::Storage(e)
    }
}

impl From<FetchError> for GongError {
    fn from(e: FetchError) -> Self {
        GongError::Fetch(e)
    }
}

impl From<CacheError> for GongError {
    fn from(e: CacheError) -> Self {
        GongError::Cache(e)
    }
}

impl From<ConfigError> for GongError {
    fn from(e: ConfigError) -> Self {
        GongError::Config(e)
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Encoding(e)
    }
}

impl From<std::io::Error> for CacheError {
    fn from(e: std::io::Error) -> Self {
        CacheError::Io(e)
    }
}
