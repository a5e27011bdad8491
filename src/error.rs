//! Error types for gpass operations.
//!
//! Errors are grouped per subsystem and nested under [`Error`]. Every
//! variant maps onto the stable [`ErrorKind`] taxonomy, which the CLI turns
//! into an exit code.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error returned by every public operation.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Rcs(#[from] RcsError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Recipient(#[from] RecipientError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The user declined a confirmation or the context was canceled.
    #[error("aborted")]
    Aborted,

    /// Audit completed and found problems. Not a failure of the audit itself.
    #[error("audit found {0} secret(s) with findings")]
    AuditFindings(usize),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from parsing or mutating a secret's plaintext.
#[derive(Debug, Error)]
pub enum SecretError {
    /// Keyed operation on a format that has no keys (or no multi-values).
    #[error("{op} is not supported by the {format} format")]
    NotSupported {
        op: &'static str,
        format: &'static str,
    },

    #[error("malformed secret: {0}")]
    Malformed(String),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors from crypto backends.
#[derive(Debug, Error)]
pub enum CipherError {
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("armor failed: {0}")]
    ArmorFailed(String),

    #[error("crypto backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("{backend} does not support {op}")]
    NotSupported {
        backend: &'static str,
        op: &'static str,
    },

    #[error("unknown crypto backend: {0}")]
    UnknownBackend(String),
}

/// Errors from storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("entry not found: {0}")]
    NotFound(String),

    #[error("failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to link {from} to {to}: {reason}")]
    LinkFailed {
        from: String,
        to: String,
        reason: String,
    },

    #[error("{0} is a directory, use prune")]
    IsDirectory(String),

    #[error("invalid entry name: {0}")]
    InvalidName(String),

    #[error("unknown storage backend: {0}")]
    UnknownBackend(String),
}

/// Errors from the revision-control layer of a storage backend.
#[derive(Debug, Error)]
pub enum RcsError {
    #[error("revision control is not initialized")]
    NotInitialized,

    #[error("no remote named {0} configured")]
    NoRemote(String),

    #[error("nothing to commit")]
    NothingToCommit,

    #[error("merge conflict, resolve manually in {0}")]
    Conflict(PathBuf),

    #[error("push failed: {0}")]
    PushFailed(String),

    #[error("git is not installed")]
    GitMissing,

    #[error("git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("revision {rev} not found for {name}")]
    UnknownRevision { name: String, rev: String },
}

/// Errors from sub-stores and the root store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store at {0} is not initialized")]
    NotInitialized(PathBuf),

    #[error("store at {0} is already initialized")]
    AlreadyInitialized(PathBuf),

    #[error("secret not found: {0}")]
    NotFound(String),

    #[error("secret already exists: {0} (use --force to overwrite)")]
    AlreadyExists(String),

    #[error("no mount for {0}")]
    NoMount(String),

    #[error("{from} and {to} live in different mounts")]
    CrossMount { from: String, to: String },

    #[error("mount already exists: {0}")]
    MountExists(String),

    #[error("{0} is a mount point")]
    MountPoint(String),

    #[error("invalid secret name: {0}")]
    InvalidName(String),
}

/// Errors from recipient management.
#[derive(Debug, Error)]
pub enum RecipientError {
    #[error("recipient unknown: {0} (use --force to add anyway)")]
    Unknown(String),

    #[error("recipient {0} is not in this store")]
    NotInStore(String),

    #[error("recipient {0} is already in this store")]
    AlreadyPresent(String),

    #[error("cannot remove the last recipient")]
    LastRecipient,

    #[error("none of the store recipients are usable")]
    NoUsableKeys,
}

/// Errors from the layered configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{path}:{line}: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },

    #[error("unknown config key: {0}")]
    UnknownKey(String),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("config level {0} is read-only")]
    ReadOnly(String),

    #[error("no config file for level {0}")]
    NoFile(String),
}

/// Errors from template evaluation.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template recursion detected at {0}")]
    Recursion(String),

    #[error("template parse error: {0}")]
    Parse(String),

    #[error("unknown template function: {0}")]
    UnknownFunction(String),

    #[error("template error: {0}")]
    Exec(String),
}

/// Errors from argument validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid password length: {0}")]
    InvalidLength(String),

    #[error("no wordlist for language: {0}")]
    UnknownLanguage(String),

    #[error("could not generate a password satisfying the rules for {0}")]
    GenerationFailed(String),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Stable error taxonomy shared by the engine and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    NotInitialized,
    AlreadyInitialized,
    DecryptionFailed,
    EncryptionFailed,
    BackendUnavailable,
    RecipientUnknown,
    WriteFailed,
    ReadFailed,
    LinkFailed,
    NoMount,
    CrossMount,
    RcsNotInitialized,
    RcsNoRemote,
    RcsNothingToCommit,
    RcsConflict,
    RcsPushFailed,
    Aborted,
    InvalidArgument,
    TemplateRecursion,
    FormatError,
    AuditFindings,
}

impl ErrorKind {
    /// Process exit code used by the CLI for this kind.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::InvalidArgument => 2,
            ErrorKind::AuditFindings => 3,
            ErrorKind::NotFound => 10,
            ErrorKind::AlreadyExists => 11,
            ErrorKind::NotInitialized => 12,
            ErrorKind::AlreadyInitialized => 13,
            ErrorKind::DecryptionFailed => 20,
            ErrorKind::EncryptionFailed => 21,
            ErrorKind::BackendUnavailable => 22,
            ErrorKind::RecipientUnknown => 23,
            ErrorKind::WriteFailed => 30,
            ErrorKind::ReadFailed => 31,
            ErrorKind::LinkFailed => 32,
            ErrorKind::NoMount => 40,
            ErrorKind::CrossMount => 41,
            ErrorKind::RcsNotInitialized => 50,
            ErrorKind::RcsNoRemote => 51,
            ErrorKind::RcsNothingToCommit => 52,
            ErrorKind::RcsConflict => 53,
            ErrorKind::RcsPushFailed => 54,
            ErrorKind::Aborted => 60,
            ErrorKind::TemplateRecursion => 61,
            ErrorKind::FormatError => 62,
        }
    }
}

impl Error {
    /// Classify this error into the stable taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Secret(e) => match e {
                SecretError::NotSupported { .. } => ErrorKind::InvalidArgument,
                SecretError::Malformed(_) | SecretError::Yaml(_) => ErrorKind::FormatError,
            },
            Error::Cipher(e) => match e {
                CipherError::EncryptionFailed(_) | CipherError::ArmorFailed(_) => {
                    ErrorKind::EncryptionFailed
                }
                CipherError::DecryptionFailed(_) => ErrorKind::DecryptionFailed,
                CipherError::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
                CipherError::InvalidPublicKey(_) => ErrorKind::RecipientUnknown,
                CipherError::NotSupported { .. } | CipherError::UnknownBackend(_) => {
                    ErrorKind::InvalidArgument
                }
            },
            Error::Storage(e) => match e {
                StorageError::NotFound(_) => ErrorKind::NotFound,
                StorageError::ReadFailed { .. } => ErrorKind::ReadFailed,
                StorageError::WriteFailed { .. } => ErrorKind::WriteFailed,
                StorageError::LinkFailed { .. } => ErrorKind::LinkFailed,
                StorageError::IsDirectory(_)
                | StorageError::InvalidName(_)
                | StorageError::UnknownBackend(_) => ErrorKind::InvalidArgument,
            },
            Error::Rcs(e) => match e {
                RcsError::NotInitialized => ErrorKind::RcsNotInitialized,
                RcsError::NoRemote(_) => ErrorKind::RcsNoRemote,
                RcsError::NothingToCommit => ErrorKind::RcsNothingToCommit,
                RcsError::Conflict(_) => ErrorKind::RcsConflict,
                RcsError::PushFailed(_) => ErrorKind::RcsPushFailed,
                RcsError::GitMissing => ErrorKind::BackendUnavailable,
                RcsError::CommandFailed { .. } => ErrorKind::WriteFailed,
                RcsError::UnknownRevision { .. } => ErrorKind::NotFound,
            },
            Error::Store(e) => match e {
                StoreError::NotInitialized(_) => ErrorKind::NotInitialized,
                StoreError::AlreadyInitialized(_) => ErrorKind::AlreadyInitialized,
                StoreError::NotFound(_) => ErrorKind::NotFound,
                StoreError::AlreadyExists(_) | StoreError::MountExists(_) => {
                    ErrorKind::AlreadyExists
                }
                StoreError::NoMount(_) => ErrorKind::NoMount,
                StoreError::CrossMount { .. } => ErrorKind::CrossMount,
                StoreError::MountPoint(_) | StoreError::InvalidName(_) => {
                    ErrorKind::InvalidArgument
                }
            },
            Error::Recipient(e) => match e {
                RecipientError::Unknown(_) | RecipientError::NoUsableKeys => {
                    ErrorKind::RecipientUnknown
                }
                RecipientError::NotInStore(_) => ErrorKind::NotFound,
                RecipientError::AlreadyPresent(_) => ErrorKind::AlreadyExists,
                RecipientError::LastRecipient => ErrorKind::InvalidArgument,
            },
            Error::Config(e) => match e {
                ConfigError::Parse { .. } => ErrorKind::FormatError,
                ConfigError::UnknownKey(_) | ConfigError::InvalidValue { .. } => {
                    ErrorKind::InvalidArgument
                }
                ConfigError::ReadOnly(_) | ConfigError::NoFile(_) => ErrorKind::WriteFailed,
            },
            Error::Template(e) => match e {
                TemplateError::Recursion(_) => ErrorKind::TemplateRecursion,
                TemplateError::Parse(_)
                | TemplateError::UnknownFunction(_)
                | TemplateError::Exec(_) => ErrorKind::FormatError,
            },
            Error::Validation(_) => ErrorKind::InvalidArgument,
            Error::Aborted => ErrorKind::Aborted,
            Error::AuditFindings(_) => ErrorKind::AuditFindings,
            Error::Io(_) => ErrorKind::ReadFailed,
        }
    }

    /// True if this error means the requested entry does not exist.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err: Error = StoreError::NotFound("a".into()).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.is_not_found());

        let err: Error = StorageError::NotFound("a.age".into()).into();
        assert!(err.is_not_found());

        let err: Error = RcsError::NothingToCommit.into();
        assert_eq!(err.kind(), ErrorKind::RcsNothingToCommit);

        let err: Error = TemplateError::Recursion("a".into()).into();
        assert_eq!(err.kind(), ErrorKind::TemplateRecursion);
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        let kinds = [
            ErrorKind::NotFound,
            ErrorKind::AlreadyExists,
            ErrorKind::NotInitialized,
            ErrorKind::AlreadyInitialized,
            ErrorKind::DecryptionFailed,
            ErrorKind::EncryptionFailed,
            ErrorKind::BackendUnavailable,
            ErrorKind::RecipientUnknown,
            ErrorKind::WriteFailed,
            ErrorKind::ReadFailed,
            ErrorKind::LinkFailed,
            ErrorKind::NoMount,
            ErrorKind::CrossMount,
            ErrorKind::RcsNotInitialized,
            ErrorKind::RcsNoRemote,
            ErrorKind::RcsNothingToCommit,
            ErrorKind::RcsConflict,
            ErrorKind::RcsPushFailed,
            ErrorKind::Aborted,
            ErrorKind::InvalidArgument,
            ErrorKind::TemplateRecursion,
            ErrorKind::FormatError,
            ErrorKind::AuditFindings,
        ];
        let codes: std::collections::HashSet<i32> = kinds.iter().map(|k| k.exit_code()).collect();
        assert_eq!(codes.len(), kinds.len());
        assert!(!codes.contains(&0));
        assert!(!codes.contains(&1));
    }

    #[test]
    fn test_display_is_one_line() {
        let err: Error = RecipientError::Unknown("alice".into()).into();
        let msg = err.to_string();
        assert!(msg.contains("alice"));
        assert!(!msg.contains('\n'));
    }
}
