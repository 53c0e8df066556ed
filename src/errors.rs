use std::fmt;

// ============================================================
// Storage layer
// ============================================================

/// Discriminator for [`StorageError`], compared instead of error instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageErrorKind {
    NotFound,
    DuplicateKey,
    Serialize,
    Cancelled,
    Unknown,
}

#[derive(Debug, Clone)]
pub enum StorageError {
    NotFound(String),
    DuplicateKey(String),
    Serialize(String),
    Cancelled(String),
    Unknown(String),
}

impl StorageError {
    pub fn kind(&self) -> StorageErrorKind {
        match self {
            StorageError::NotFound(_) => StorageErrorKind::NotFound,
            StorageError::DuplicateKey(_) => StorageErrorKind::DuplicateKey,
            StorageError::Serialize(_) => StorageErrorKind::Serialize,
            StorageError::Cancelled(_) => StorageErrorKind::Cancelled,
            StorageError::Unknown(_) => StorageErrorKind::Unknown,
        }
    }

    pub fn is(&self, kind: StorageErrorKind) -> bool {
        self.kind() == kind
    }

    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::NotFound(_) => "S001",
            StorageError::DuplicateKey(_) => "S002",
            StorageError::Serialize(_) => "S003",
            StorageError::Cancelled(_) => "S004",
            StorageError::Unknown(_) => "S005",
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            StorageError::NotFound(_) => "Record Not Found",
            StorageError::DuplicateKey(_) => "Duplicate Key",
            StorageError::Serialize(_) => "Serialize Error",
            StorageError::Cancelled(_) => "Operation Cancelled",
            StorageError::Unknown(_) => "Unknown Storage Error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            StorageError::NotFound(msg)
            | StorageError::DuplicateKey(msg)
            | StorageError::Serialize(msg)
            | StorageError::Cancelled(msg)
            | StorageError::Unknown(msg) => msg,
        }
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        StorageError::NotFound(msg.into())
    }

    pub fn duplicate_key<T: Into<String>>(msg: T) -> Self {
        StorageError::DuplicateKey(msg.into())
    }

    pub fn serialize<T: Into<String>>(msg: T) -> Self {
        StorageError::Serialize(msg.into())
    }

    pub fn cancelled<T: Into<String>>(msg: T) -> Self {
        StorageError::Cancelled(msg.into())
    }

    pub fn unknown<T: Into<String>>(msg: T) -> Self {
        StorageError::Unknown(msg.into())
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type(), self.message())
    }
}

impl std::error::Error for StorageError {}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialize(err.to_string())
    }
}

// 唯一约束冲突映射为 DuplicateKey，其余一律视为 Unknown
impl From<sea_orm::DbErr> for StorageError {
    fn from(err: sea_orm::DbErr) -> Self {
        if let Some(sea_orm::SqlErr::UniqueConstraintViolation(msg)) = err.sql_err() {
            return StorageError::DuplicateKey(msg);
        }
        match err {
            sea_orm::DbErr::RecordNotFound(msg) => StorageError::NotFound(msg),
            other => StorageError::Unknown(other.to_string()),
        }
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ============================================================
// Service layer
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceErrorKind {
    RecordNotFound,
    DuplicateKey,
    GenerationExhausted,
    Cancelled,
    Gone,
    Snapshot,
    Unknown,
}

#[derive(Debug, Clone)]
pub enum ServiceError {
    RecordNotFound(String),
    DuplicateKey(String),
    GenerationExhausted(String),
    Cancelled(String),
    /// The identifier exists but its record was soft-deleted.
    Gone(String),
    /// Backup or restore could not be completed.
    Snapshot(String),
    Unknown(String),
}

impl ServiceError {
    pub fn kind(&self) -> ServiceErrorKind {
        match self {
            ServiceError::RecordNotFound(_) => ServiceErrorKind::RecordNotFound,
            ServiceError::DuplicateKey(_) => ServiceErrorKind::DuplicateKey,
            ServiceError::GenerationExhausted(_) => ServiceErrorKind::GenerationExhausted,
            ServiceError::Cancelled(_) => ServiceErrorKind::Cancelled,
            ServiceError::Gone(_) => ServiceErrorKind::Gone,
            ServiceError::Snapshot(_) => ServiceErrorKind::Snapshot,
            ServiceError::Unknown(_) => ServiceErrorKind::Unknown,
        }
    }

    pub fn is(&self, kind: ServiceErrorKind) -> bool {
        self.kind() == kind
    }

    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::RecordNotFound(_) => "E001",
            ServiceError::DuplicateKey(_) => "E002",
            ServiceError::GenerationExhausted(_) => "E003",
            ServiceError::Cancelled(_) => "E004",
            ServiceError::Gone(_) => "E005",
            ServiceError::Snapshot(_) => "E006",
            ServiceError::Unknown(_) => "E007",
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ServiceError::RecordNotFound(_) => "Record Not Found",
            ServiceError::DuplicateKey(_) => "Duplicate Key",
            ServiceError::GenerationExhausted(_) => "Identifier Generation Exhausted",
            ServiceError::Cancelled(_) => "Operation Cancelled",
            ServiceError::Gone(_) => "Link Deleted",
            ServiceError::Snapshot(_) => "Snapshot Error",
            ServiceError::Unknown(_) => "Unknown Error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ServiceError::RecordNotFound(msg)
            | ServiceError::DuplicateKey(msg)
            | ServiceError::GenerationExhausted(msg)
            | ServiceError::Cancelled(msg)
            | ServiceError::Gone(msg)
            | ServiceError::Snapshot(msg)
            | ServiceError::Unknown(msg) => msg,
        }
    }

    /// 格式化为彩色输出（用于 CLI）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    pub fn record_not_found<T: Into<String>>(msg: T) -> Self {
        ServiceError::RecordNotFound(msg.into())
    }

    pub fn duplicate_key<T: Into<String>>(msg: T) -> Self {
        ServiceError::DuplicateKey(msg.into())
    }

    pub fn generation_exhausted<T: Into<String>>(msg: T) -> Self {
        ServiceError::GenerationExhausted(msg.into())
    }

    pub fn cancelled<T: Into<String>>(msg: T) -> Self {
        ServiceError::Cancelled(msg.into())
    }

    pub fn gone<T: Into<String>>(msg: T) -> Self {
        ServiceError::Gone(msg.into())
    }

    pub fn snapshot<T: Into<String>>(msg: T) -> Self {
        ServiceError::Snapshot(msg.into())
    }

    pub fn unknown<T: Into<String>>(msg: T) -> Self {
        ServiceError::Unknown(msg.into())
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type(), self.message())
    }
}

impl std::error::Error for ServiceError {}

/// Storage → service translation. Every storage kind maps to exactly one
/// service kind; serialization failures are not something callers can act on,
/// so they surface as `Unknown`.
impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => ServiceError::RecordNotFound(msg),
            StorageError::DuplicateKey(msg) => ServiceError::DuplicateKey(msg),
            StorageError::Cancelled(msg) => ServiceError::Cancelled(msg),
            StorageError::Serialize(msg) => ServiceError::Unknown(format!("serialize: {}", msg)),
            StorageError::Unknown(msg) => ServiceError::Unknown(msg),
        }
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

// ============================================================
// Application (startup / operator) errors
// ============================================================

#[derive(Debug, Clone)]
pub enum ShorturlError {
    Config(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    FileOperation(String),
    Service(ServiceError),
}

impl ShorturlError {
    pub fn code(&self) -> &'static str {
        match self {
            ShorturlError::Config(_) => "A001",
            ShorturlError::DatabaseConfig(_) => "A002",
            ShorturlError::DatabaseConnection(_) => "A003",
            ShorturlError::DatabaseOperation(_) => "A004",
            ShorturlError::FileOperation(_) => "A005",
            ShorturlError::Service(err) => err.code(),
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ShorturlError::Config(_) => "Configuration Error",
            ShorturlError::DatabaseConfig(_) => "Database Configuration Error",
            ShorturlError::DatabaseConnection(_) => "Database Connection Error",
            ShorturlError::DatabaseOperation(_) => "Database Operation Error",
            ShorturlError::FileOperation(_) => "File Operation Error",
            ShorturlError::Service(err) => err.error_type(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ShorturlError::Config(msg)
            | ShorturlError::DatabaseConfig(msg)
            | ShorturlError::DatabaseConnection(msg)
            | ShorturlError::DatabaseOperation(msg)
            | ShorturlError::FileOperation(msg) => msg,
            ShorturlError::Service(err) => err.message(),
        }
    }

    /// 格式化为彩色输出
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        ShorturlError::Config(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        ShorturlError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        ShorturlError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        ShorturlError::DatabaseOperation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        ShorturlError::FileOperation(msg.into())
    }
}

impl fmt::Display for ShorturlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for ShorturlError {}

impl From<ServiceError> for ShorturlError {
    fn from(err: ServiceError) -> Self {
        ShorturlError::Service(err)
    }
}

impl From<sea_orm::DbErr> for ShorturlError {
    fn from(err: sea_orm::DbErr) -> Self {
        ShorturlError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for ShorturlError {
    fn from(err: std::io::Error) -> Self {
        ShorturlError::FileOperation(err.to_string())
    }
}

impl From<config::ConfigError> for ShorturlError {
    fn from(err: config::ConfigError) -> Self {
        ShorturlError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShorturlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_kind_comparison() {
        let a = StorageError::duplicate_key("key1");
        let b = StorageError::duplicate_key("other message");
        assert_eq!(a.kind(), b.kind());
        assert!(a.is(StorageErrorKind::DuplicateKey));
        assert!(!a.is(StorageErrorKind::NotFound));
    }

    #[test]
    fn test_storage_to_service_translation() {
        let cases = [
            (StorageError::not_found("x"), ServiceErrorKind::RecordNotFound),
            (StorageError::duplicate_key("x"), ServiceErrorKind::DuplicateKey),
            (StorageError::cancelled("x"), ServiceErrorKind::Cancelled),
            (StorageError::serialize("x"), ServiceErrorKind::Unknown),
            (StorageError::unknown("x"), ServiceErrorKind::Unknown),
        ];

        for (storage_err, expected) in cases {
            let service_err: ServiceError = storage_err.into();
            assert_eq!(service_err.kind(), expected);
        }
    }

    #[test]
    fn test_translation_keeps_message() {
        let err: ServiceError = StorageError::not_found("short identifier abc not found").into();
        assert_eq!(err.message(), "short identifier abc not found");
    }

    #[test]
    fn test_db_record_not_found_maps_to_not_found() {
        let err: StorageError = sea_orm::DbErr::RecordNotFound("gone".to_string()).into();
        assert_eq!(err.kind(), StorageErrorKind::NotFound);
    }

    #[test]
    fn test_db_custom_maps_to_unknown() {
        let err: StorageError = sea_orm::DbErr::Custom("boom".to_string()).into();
        assert_eq!(err.kind(), StorageErrorKind::Unknown);
        assert!(err.message().contains("boom"));
    }

    #[test]
    fn test_display_format() {
        let err = ServiceError::generation_exhausted("10 attempts");
        assert_eq!(
            err.to_string(),
            "Identifier Generation Exhausted: 10 attempts"
        );
    }

    #[test]
    fn test_app_error_wraps_service_error() {
        let err: ShorturlError = ServiceError::snapshot("disk full").into();
        assert_eq!(err.code(), "E006");
        assert_eq!(err.message(), "disk full");
    }
}
