// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use std::path::PathBuf;

use clap::Parser;

/// 命令行参数。未给出的项沿用配置文件或默认值。
#[derive(Parser, Debug, Clone)]
#[command(
    name = "relay",
    version,
    about = "Zero-config HTTP server for instant site previews"
)]
pub struct Args {
    /// Directory to serve (defaults to `www_root` from the config file, then the current directory)
    pub directory: Option<PathBuf>,

    /// Port to run the server on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Disable live reload on file changes
    #[arg(short = 'd', long)]
    pub disable_live_reload: bool,

    /// Path to the TOML config file
    #[arg(short, long, default_value = "config/relay.toml")]
    pub config: PathBuf,

    /// Path to the log4rs YAML config file
    #[arg(long, default_value = "config/log4rs.yaml")]
    pub log_config: PathBuf,
}
