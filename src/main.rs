// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # relay
//!
//! 本地静态文件预览服务器。启动流程：
//! - 初始化 log4rs 日志（配置文件缺失时退回控制台输出）
//! - 载入 TOML 配置并叠加命令行参数
//! - 按配置的工作线程数构建 Tokio 运行时
//! - 绑定端口（被占用时自动顺延）并进入主事件循环
//! - 后台管理控制台（stop / status / help）与 Ctrl-C 负责停机

use std::{
    path::Path,
    process::ExitCode,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use clap::Parser;
use log::{error, info, warn, LevelFilter};
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Config as LogConfig, Root},
    encode::pattern::PatternEncoder,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    runtime::Builder,
    sync::oneshot,
};

use relay::{cli::Args, config::Config, exception::Exception, resolver::ServerRoot, server::Server};

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_config);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("启动失败：{}", e);
            eprintln!("relay: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(path: &Path) {
    let file_error = match log4rs::init_file(path, Default::default()) {
        Ok(()) => return,
        Err(e) => e,
    };

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} {h({l})} {m}{n}",
        )))
        .build();
    let config = LogConfig::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info));

    match config.map(log4rs::init_config) {
        Ok(Ok(_)) => warn!(
            "无法载入日志配置{}：{}，改用控制台输出",
            path.display(),
            file_error
        ),
        Ok(Err(e)) => eprintln!("relay: 无法初始化日志：{}", e),
        Err(e) => eprintln!("relay: 无法构建日志配置：{}", e),
    }
}

fn run(args: Args) -> Result<(), Exception> {
    let config = Config::load(&args.config.to_string_lossy())?.apply_args(&args);
    let root = ServerRoot::new(config.www_root())?;
    info!("www root: {}", root.path().display());

    let runtime = Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()
        .map_err(|e| Exception::RuntimeFailure(e.to_string()))?;

    let result = runtime.block_on(async {
        let live_reload = config.live_reload();
        let server = Server::bind(config, root).await?;
        let addr = server.local_addr()?;
        info!("服务端已在http://{}上监听Socket连接", addr);
        match live_reload {
            true => info!("热重载已开启"),
            false => info!("热重载已关闭"),
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        tokio::spawn(console(stop_tx, server.active_connection()));

        let shutdown = async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("接收到Ctrl-C"),
                Ok(()) = stop_rx => info!("接收到stop指令"),
            }
        };
        server.run(shutdown).await;
        Ok::<(), Exception>(())
    });

    // 控制台任务可能还阻塞在标准输入上
    runtime.shutdown_timeout(Duration::from_millis(500));
    info!("服务器已停止");
    result
}

/// 后台管理控制台，从标准输入读取指令
async fn console(stop: oneshot::Sender<()>, active_connection: Arc<AtomicUsize>) {
    let mut reader = BufReader::new(tokio::io::stdin());
    let mut input = String::new();
    loop {
        input.clear();
        match reader.read_line(&mut input).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        match input.trim() {
            "stop" => {
                println!("停机指令已激活，服务器将停止接受新连接...");
                let _ = stop.send(());
                return;
            }
            "help" => {
                println!("== relay Help ==");
                println!("stop   - 发出停机信号");
                println!("status - 查看当前服务器运行状态");
                println!("help   - 显示此帮助信息");
                println!("================");
            }
            "status" => {
                println!("== relay 状态 ==");
                println!(
                    "当前活跃连接数: {}",
                    active_connection.load(Ordering::SeqCst)
                );
                println!("================");
            }
            "" => {}
            cmd => println!("无效的命令：{}", cmd),
        }
    }
}
