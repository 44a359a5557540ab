//! 进程退出码约定
//!
//! 外部进程监督者依据退出码区分计划内关闭与被迫终止，
//! 以便选择对应的重启策略。

/// 正常优雅关闭
pub const CLEAN: i32 = 0;

/// 存活探测失败（healthcheck进程专用）
pub const UNHEALTHY: i32 = 1;

/// 致命错误（调度存储不可用等），需要监督者重启
pub const FATAL: i32 = 70;

/// 配置错误，重启无意义，需人工干预
pub const CONFIG: i32 = 78;
