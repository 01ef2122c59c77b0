// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use serde_derive::Deserialize;
use serde_derive::Serialize;

use log::{error, info};
use std::fs::File;
use std::io::prelude::*;
use std::path::Path;

use crate::{
    cli::Args,
    exception::Exception,
    mime::SniffConfig,
    param::{DEFAULT_SNIFF_SAMPLE_SIZE, DEFAULT_TEXT_THRESHOLD},
};

/// 服务器运行参数。启动时构建一次，之后只读，以引用或 `Arc` 的形式显式传给各个组件。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    www_root: String,
    port: u16,
    local: bool,
    live_reload: bool,
    worker_threads: usize,
    port_retries: u16,
    compression: bool,
    sniff_sample_size: usize,
    text_threshold: f64,
    max_request_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            www_root: ".".to_string(),
            port: 8080,
            local: true,
            live_reload: true,
            worker_threads: 0,
            port_retries: 10,
            compression: true,
            sniff_sample_size: DEFAULT_SNIFF_SAMPLE_SIZE,
            text_threshold: DEFAULT_TEXT_THRESHOLD,
            max_request_size: 8192,
        }
    }

    /// 从 TOML 文件读取配置。
    ///
    /// 文件无法读取时返回 `ConfigUnreadable`；内容无法解析时记录错误并退回默认配置。
    pub fn from_toml(filename: &str) -> Result<Self, Exception> {
        let mut file =
            File::open(filename).map_err(|e| Exception::ConfigUnreadable(format!("{}: {}", filename, e)))?;
        let mut str_val = String::new();
        file.read_to_string(&mut str_val)
            .map_err(|e| Exception::ConfigUnreadable(format!("{}: {}", filename, e)))?;

        let raw_config = match toml::from_str(&str_val) {
            Ok(t) => t,
            Err(e) => {
                error!("无法成功从配置文件{}构建配置对象，使用默认配置：{}", filename, e);
                Config::new()
            }
        };
        Ok(raw_config.normalized())
    }

    /// 配置文件不存在时直接使用默认配置，存在则按 `from_toml` 的规则载入。
    pub fn load(filename: &str) -> Result<Self, Exception> {
        if Path::new(filename).exists() {
            let config = Self::from_toml(filename)?;
            info!("配置文件{}已载入", filename);
            Ok(config)
        } else {
            info!("未找到配置文件{}，使用默认配置", filename);
            Ok(Self::new())
        }
    }

    /// 命令行参数优先于配置文件。
    pub fn apply_args(mut self, args: &Args) -> Self {
        if let Some(dir) = &args.directory {
            self.www_root = dir.to_string_lossy().into_owned();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if args.disable_live_reload {
            self.live_reload = false;
        }
        self
    }

    fn normalized(mut self) -> Self {
        if self.sniff_sample_size == 0 {
            error!("sniff_sample_size不能为0，将使用默认值{}", DEFAULT_SNIFF_SAMPLE_SIZE);
            self.sniff_sample_size = DEFAULT_SNIFF_SAMPLE_SIZE;
        }
        if !(0.0..=1.0).contains(&self.text_threshold) {
            error!("text_threshold必须位于0到1之间，将使用默认值{}", DEFAULT_TEXT_THRESHOLD);
            self.text_threshold = DEFAULT_TEXT_THRESHOLD;
        }
        self
    }

    pub fn with_www_root(mut self, root: &str) -> Self {
        self.www_root = root.to_string();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_live_reload(mut self, live_reload: bool) -> Self {
        self.live_reload = live_reload;
        self
    }

    pub fn with_port_retries(mut self, port_retries: u16) -> Self {
        self.port_retries = port_retries;
        self
    }

    pub fn with_compression(mut self, compression: bool) -> Self {
        self.compression = compression;
        self
    }
}

impl Config {
    pub fn www_root(&self) -> &str {
        &self.www_root
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn live_reload(&self) -> bool {
        self.live_reload
    }

    /// 为 0 时按 CPU 核心数分配工作线程
    pub fn worker_threads(&self) -> usize {
        match self.worker_threads {
            0 => num_cpus::get(),
            n => n,
        }
    }

    pub fn port_retries(&self) -> u16 {
        self.port_retries
    }

    pub fn compression(&self) -> bool {
        self.compression
    }

    pub fn max_request_size(&self) -> usize {
        self.max_request_size
    }

    pub fn sniff_config(&self) -> SniffConfig {
        SniffConfig {
            sample_size: self.sniff_sample_size,
            text_threshold: self.text_threshold,
        }
    }
}
