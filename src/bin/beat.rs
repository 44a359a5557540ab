use dawis::common::{exit_code_for, run_cli};

#[tokio::main]
async fn main() {
    if let Err(e) = run_cli(
        "dawis-beat",
        "dawis平台 - Beat调度器",
        Some("启动Beat调度器，周期扫描调度存储并把到期任务发布到消息代理"),
        vec![],
        "beat",
        "Beat",
    )
    .await
    {
        eprintln!("Beat 启动失败: {e:#}");
        std::process::exit(exit_code_for(&e));
    }
}
