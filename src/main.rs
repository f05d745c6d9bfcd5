/// Main entry point for the matching engine server
///
/// Parses command-line arguments, initializes logging and the runtime,
/// then wires the engine, the TCP front-end and the observability server.

use clap::Parser;
use clob_engine::emitter::EventEmitter;
use clob_engine::engine::Engine;
use clob_engine::observability::ObservabilityServer;
use clob_engine::server::run_server;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::sync::broadcast;

/// 撮合引擎命令行配置
#[derive(Parser, Debug, Clone)]
#[command(name = "clob-engine")]
#[command(version = "0.1.0")]
#[command(about = "多标的并行限价撮合引擎", long_about = None)]
struct CliConfig {
    /// 服务器监听地址
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// 服务器监听端口
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// 可观测性端口（/metrics 与 /health）
    #[arg(short = 'm', long, default_value_t = 9090)]
    metrics_port: u16,

    /// 运行时工作线程数（0表示自动检测CPU核心数）
    #[arg(short = 't', long, default_value_t = 0)]
    threads: usize,

    /// 事件广播缓冲大小
    #[arg(short = 'q', long, default_value_t = 1024)]
    event_buffer: usize,

    /// 日志级别
    #[arg(short = 'l', long, default_value = "info", value_parser = ["trace", "debug", "info", "warn", "error"])]
    log_level: String,

    /// 仅显示配置不启动服务器（用于调试）
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

fn main() {
    let config = CliConfig::parse();

    init_logging(&config.log_level);

    // 自动检测工作线程数
    let threads = if config.threads == 0 {
        let cpus = num_cpus::get();
        tracing::info!("自动检测到 {} 个CPU核心", cpus);
        cpus
    } else {
        config.threads
    };

    tracing::info!("撮合引擎启动");
    tracing::info!("配置: {:?}", config);

    if config.dry_run {
        println!("Dry-run 模式 - 不启动服务器");
        return;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(threads)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime");

    runtime.block_on(run(config));
}

async fn run(config: CliConfig) {
    let (events_tx, _) = broadcast::channel(config.event_buffer);

    // 事件流：引擎 → 写线程（标准输出） + 广播口（网络回显）
    let (emitter, writer) = EventEmitter::stdout();
    let emitter = emitter.with_tap(events_tx.clone());
    let engine = Arc::new(Engine::new(emitter));

    // 可观测性服务器
    let observability = ObservabilityServer::new(config.metrics_port);
    let health = observability.health_checker();
    tokio::spawn(async move {
        if let Err(e) = observability.run().await {
            tracing::error!("可观测性服务器退出: {}", e);
        }
    });

    // 撮合服务器
    let addr = SocketAddr::new(config.host, config.port);
    let server = tokio::spawn(run_server(addr, Arc::clone(&engine), events_tx));
    health.mark_ready();
    tracing::info!("服务器已准备就绪");

    tokio::signal::ctrl_c().await.ok();
    tracing::info!("收到退出信号，正在关闭");

    server.abort();
    // 释放引擎即关闭事件通道，join 保证输出全部落盘
    drop(engine);
    writer.join();
}

/// 初始化日志系统
fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
