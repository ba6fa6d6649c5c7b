use std::fmt;

#[derive(Debug, Clone)]
pub enum RedmapError {
    Connection(String),
    Command(String),
    Encoding(String),
    Decoding(String),
    MemberNotFound(String),
    FieldNotFound(String),
    IndexOutOfRange(String),
    Conflict(String),
    DoubleTransaction(String),
    CommitPhase(String),
    Config(String),
}

impl RedmapError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            RedmapError::Connection(_) => "E001",
            RedmapError::Command(_) => "E002",
            RedmapError::Encoding(_) => "E003",
            RedmapError::Decoding(_) => "E004",
            RedmapError::MemberNotFound(_) => "E005",
            RedmapError::FieldNotFound(_) => "E006",
            RedmapError::IndexOutOfRange(_) => "E007",
            RedmapError::Conflict(_) => "E008",
            RedmapError::DoubleTransaction(_) => "E009",
            RedmapError::CommitPhase(_) => "E010",
            RedmapError::Config(_) => "E011",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            RedmapError::Connection(_) => "Redis Connection Error",
            RedmapError::Command(_) => "Redis Command Error",
            RedmapError::Encoding(_) => "Value Encoding Error",
            RedmapError::Decoding(_) => "Value Decoding Error",
            RedmapError::MemberNotFound(_) => "Member Not Found",
            RedmapError::FieldNotFound(_) => "Field Not Found",
            RedmapError::IndexOutOfRange(_) => "Index Out Of Range",
            RedmapError::Conflict(_) => "Transaction Conflict",
            RedmapError::DoubleTransaction(_) => "Double Transaction",
            RedmapError::CommitPhase(_) => "Query During Commit Phase",
            RedmapError::Config(_) => "Configuration Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            RedmapError::Connection(msg) => msg,
            RedmapError::Command(msg) => msg,
            RedmapError::Encoding(msg) => msg,
            RedmapError::Decoding(msg) => msg,
            RedmapError::MemberNotFound(msg) => msg,
            RedmapError::FieldNotFound(msg) => msg,
            RedmapError::IndexOutOfRange(msg) => msg,
            RedmapError::Conflict(msg) => msg,
            RedmapError::DoubleTransaction(msg) => msg,
            RedmapError::CommitPhase(msg) => msg,
            RedmapError::Config(msg) => msg,
        }
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for RedmapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for RedmapError {}

// 便捷的构造函数
impl RedmapError {
    pub fn connection<T: Into<String>>(msg: T) -> Self {
        RedmapError::Connection(msg.into())
    }

    pub fn command<T: Into<String>>(msg: T) -> Self {
        RedmapError::Command(msg.into())
    }

    pub fn encoding<T: Into<String>>(msg: T) -> Self {
        RedmapError::Encoding(msg.into())
    }

    pub fn decoding<T: Into<String>>(msg: T) -> Self {
        RedmapError::Decoding(msg.into())
    }

    pub fn member_not_found<T: Into<String>>(msg: T) -> Self {
        RedmapError::MemberNotFound(msg.into())
    }

    pub fn field_not_found<T: Into<String>>(msg: T) -> Self {
        RedmapError::FieldNotFound(msg.into())
    }

    pub fn index_out_of_range<T: Into<String>>(msg: T) -> Self {
        RedmapError::IndexOutOfRange(msg.into())
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        RedmapError::Conflict(msg.into())
    }

    pub fn double_transaction<T: Into<String>>(msg: T) -> Self {
        RedmapError::DoubleTransaction(msg.into())
    }

    pub fn commit_phase<T: Into<String>>(msg: T) -> Self {
        RedmapError::CommitPhase(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        RedmapError::Config(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<redis::RedisError> for RedmapError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
            RedmapError::Connection(err.to_string())
        } else {
            RedmapError::Command(err.to_string())
        }
    }
}

impl From<chrono::ParseError> for RedmapError {
    fn from(err: chrono::ParseError) -> Self {
        RedmapError::Decoding(err.to_string())
    }
}

impl From<std::str::Utf8Error> for RedmapError {
    fn from(err: std::str::Utf8Error) -> Self {
        RedmapError::Decoding(err.to_string())
    }
}

impl From<std::num::ParseIntError> for RedmapError {
    fn from(err: std::num::ParseIntError) -> Self {
        RedmapError::Decoding(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RedmapError>;
