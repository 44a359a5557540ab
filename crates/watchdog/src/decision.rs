use std::time::Duration;

/// 存活判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Healthy,
    Unhealthy,
}

/// 存活观测输入
#[derive(Debug, Clone, Copy)]
pub struct LivenessObservation {
    /// 维护哨兵是否存在
    pub sentinel_present: bool,
    /// 最旧心跳的年龄；None 表示心跳缺失或不可读
    pub heartbeat_age: Option<Duration>,
}

/// 纯存活判定函数，按顺序求值：
///
/// 1. 哨兵缺失 → Healthy。Worker尚未完成初始化或正处于受控
///    重启中，推迟判定，避免在计划维护或慢冷启动期间误杀。
/// 2. 心跳缺失或不可读 → Unhealthy。
/// 3. 心跳年龄超过阈值 → Unhealthy，否则 Healthy。
///
/// 两段式设计（哨兵门控 + 新鲜度窗口）既容忍慢启动（哨兵未放置
/// 时还没有心跳），又能抓住初始化之后停止刷新心跳的挂死Worker。
pub fn evaluate(observation: LivenessObservation, staleness_threshold: Duration) -> Liveness {
    if !observation.sentinel_present {
        return Liveness::Healthy;
    }

    match observation.heartbeat_age {
        None => Liveness::Unhealthy,
        Some(age) if age > staleness_threshold => Liveness::Unhealthy,
        Some(_) => Liveness::Healthy,
    }
}
