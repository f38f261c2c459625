use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum MilkeywayError {
    Config(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    Validation(String),
    NotFound(String),
    Serialization(String),
}

impl MilkeywayError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            MilkeywayError::Config(_) => "E001",
            MilkeywayError::DatabaseConfig(_) => "E002",
            MilkeywayError::DatabaseConnection(_) => "E003",
            MilkeywayError::DatabaseOperation(_) => "E004",
            MilkeywayError::Validation(_) => "E005",
            MilkeywayError::NotFound(_) => "E006",
            MilkeywayError::Serialization(_) => "E007",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            MilkeywayError::Config(_) => "Configuration Error",
            MilkeywayError::DatabaseConfig(_) => "Database Configuration Error",
            MilkeywayError::DatabaseConnection(_) => "Database Connection Error",
            MilkeywayError::DatabaseOperation(_) => "Database Operation Error",
            MilkeywayError::Validation(_) => "Validation Error",
            MilkeywayError::NotFound(_) => "Resource Not Found",
            MilkeywayError::Serialization(_) => "Serialization Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            MilkeywayError::Config(msg)
            | MilkeywayError::DatabaseConfig(msg)
            | MilkeywayError::DatabaseConnection(msg)
            | MilkeywayError::DatabaseOperation(msg)
            | MilkeywayError::Validation(msg)
            | MilkeywayError::NotFound(msg)
            | MilkeywayError::Serialization(msg) => msg,
        }
    }

    /// 格式化为彩色输出（用于终端）
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

    /// 格式化为简洁输出（用于日志）
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for MilkeywayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for MilkeywayError {}

// 便捷的构造函数
impl MilkeywayError {
    pub fn config<T: Into<String>>(msg: T) -> Self {
        MilkeywayError::Config(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        MilkeywayError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        MilkeywayError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        MilkeywayError::DatabaseOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        MilkeywayError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        MilkeywayError::NotFound(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        MilkeywayError::Serialization(msg.into())
    }
}

impl From<sea_orm::DbErr> for MilkeywayError {
    fn from(err: sea_orm::DbErr) -> Self {
        MilkeywayError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for MilkeywayError {
    fn from(err: std::io::Error) -> Self {
        MilkeywayError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for MilkeywayError {
    fn from(err: serde_json::Error) -> Self {
        MilkeywayError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MilkeywayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            MilkeywayError::config("a"),
            MilkeywayError::database_config("b"),
            MilkeywayError::database_connection("c"),
            MilkeywayError::database_operation("d"),
            MilkeywayError::validation("e"),
            MilkeywayError::not_found("f"),
            MilkeywayError::serialization("g"),
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_display_uses_simple_format() {
        let err = MilkeywayError::not_found("consumer 42");
        assert_eq!(err.to_string(), "Resource Not Found: consumer 42");
        assert_eq!(err.message(), "consumer 42");
    }

    #[test]
    fn test_from_db_err() {
        let err: MilkeywayError = sea_orm::DbErr::Custom("boom".to_string()).into();
        assert_eq!(err.code(), "E004");
        assert!(err.message().contains("boom"));
    }
}
