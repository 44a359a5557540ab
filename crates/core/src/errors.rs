use thiserror::Error;

/// dawis错误类型定义
#[derive(Debug, Error)]
pub enum DawisError {
    #[error("调度存储不可用: {path}: {message}")]
    StoreUnavailable { path: String, message: String },

    #[error("消息代理不可达: {0}")]
    BrokerUnreachable(String),

    #[error("无效的CRON表达式: {expr} - {message}")]
    InvalidCron { expr: String, message: String },

    #[error("任务执行错误: {0}")]
    TaskExecution(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("配置错误: {0}")]
    Configuration(String),
}

impl DawisError {
    /// 是否为致命错误
    ///
    /// 仅调度存储不可用允许结束进程：没有持久化状态就无法保证
    /// 每个调度间隔恰好发布一次的语义。其余错误都被隔离在产生它的
    /// 操作内部。
    pub fn is_fatal(&self) -> bool {
        matches!(self, DawisError::StoreUnavailable { .. })
    }
}

impl From<serde_json::Error> for DawisError {
    fn from(err: serde_json::Error) -> Self {
        DawisError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for DawisError {
    fn from(err: config::ConfigError) -> Self {
        DawisError::Configuration(err.to_string())
    }
}

/// 统一的Result类型
pub type DawisResult<T> = std::result::Result<T, DawisError>;
