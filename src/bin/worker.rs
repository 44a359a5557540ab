use clap::Arg;

use dawis::common::{exit_code_for, run_cli};

#[tokio::main]
async fn main() {
    // Worker服务特有参数
    let custom_args = vec![Arg::new("worker-id")
        .short('w')
        .long("worker-id")
        .value_name("ID")
        .help("Worker节点唯一标识符")];

    if let Err(e) = run_cli(
        "dawis-worker",
        "dawis平台 - Worker服务",
        Some("启动Worker节点服务，消费消息代理中的任务调用并执行对应处理器"),
        custom_args,
        "worker",
        "Worker",
    )
    .await
    {
        eprintln!("Worker 启动失败: {e:#}");
        std::process::exit(exit_code_for(&e));
    }
}
