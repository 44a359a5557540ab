use clap::Arg;

use dawis::common::{exit_code_for, run_cli};

#[tokio::main]
async fn main() {
    // 组合模式特有参数
    let custom_args = vec![
        Arg::new("mode")
            .short('m')
            .long("mode")
            .value_name("MODE")
            .help("运行模式")
            .value_parser(["beat", "worker", "all"])
            .default_value("all"),
        Arg::new("worker-id")
            .short('w')
            .long("worker-id")
            .value_name("ID")
            .help("Worker节点唯一标识符"),
    ];

    if let Err(e) = run_cli(
        "dawis",
        "数据聚合后台任务平台",
        Some("启动dawis平台：Beat调度器周期发布到期任务，Worker消费并执行"),
        custom_args,
        "all",
        "dawis",
    )
    .await
    {
        eprintln!("dawis 启动失败: {e:#}");
        std::process::exit(exit_code_for(&e));
    }
}
