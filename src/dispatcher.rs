// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求分发
//!
//! 每个请求走一遍固定的流程：清洗 → 解析 → 返回文件 / 目录列表 / 变更探测结果 / 404。
//! 分发器本身不持有可变状态，可以在多个连接之间共享。

use std::{fs, path::Path};

use bytes::Bytes;
use log::{debug, error, warn};

use crate::{
    config::Config,
    listing,
    mime::ContentTyper,
    param::{RELOAD_CHECK_PATH, TEXT_HTML},
    reload,
    resolver::{PathResolver, ResolvedEntry, ResolvedFile, ServerRoot},
    response::Response,
    tracker::{now_ms, ChangeDetector, ChangeQuery, ChangeReport, ScanTracker},
    util::format_http_date,
};

pub struct Dispatcher {
    resolver: PathResolver,
    typer: ContentTyper,
    detector: Box<dyn ChangeDetector>,
    live_reload: bool,
}

impl Dispatcher {
    pub fn new(root: ServerRoot, config: &Config) -> Self {
        let detector = Box::new(ScanTracker::new(root.clone()));
        Self::with_detector(root, config, detector)
    }

    /// 使用指定的变更探测实现
    pub fn with_detector(root: ServerRoot, config: &Config, detector: Box<dyn ChangeDetector>) -> Self {
        Self {
            resolver: PathResolver::new(root),
            typer: ContentTyper::new(config.sniff_config()),
            detector,
            live_reload: config.live_reload(),
        }
    }

    pub fn root(&self) -> &ServerRoot {
        self.resolver.root()
    }

    pub fn live_reload(&self) -> bool {
        self.live_reload
    }

    /// 为一个请求 URI 生成响应。这里不会失败，所有文件系统错误都降级为 404。
    pub fn dispatch(&self, uri: &str, id: u128) -> Response {
        // 热重载关闭时探测端点按普通路径解析，自然得到 404
        if self.live_reload && uri.starts_with(RELOAD_CHECK_PATH) {
            return self.serve_reload_check(uri, id);
        }

        match self.resolver.resolve(uri) {
            ResolvedEntry::File(file) => self.serve_file(file, id),
            ResolvedEntry::Directory { path, request_path } => {
                self.serve_directory(&path, &request_path, id)
            }
            ResolvedEntry::NotFound => {
                warn!("[ID{}]{}不存在，返回404", id, uri);
                Response::not_found()
            }
        }
    }

    fn serve_reload_check(&self, uri: &str, id: u128) -> Response {
        let query = ChangeQuery::from_uri(uri);
        // 扫描前取时间，扫描过程中发生的修改留给下一次询问
        let timestamp = now_ms();
        let report = ChangeReport {
            has_changes: self.detector.has_changed_since(query.since_ms),
            timestamp,
        };
        debug!("[ID{}]变更探测：since={}, {:?}", id, query.since_ms, report);

        let body = match serde_json::to_vec(&report) {
            Ok(body) => body,
            Err(e) => {
                error!("[ID{}]无法序列化变更探测结果：{}", id, e);
                return Response::from_status_code(500);
            }
        };
        let mut response = Response::new(200);
        response
            .add_header("Content-Type", "application/json")
            .add_header("Content-Length", &body.len().to_string())
            .add_header("Cache-Control", "no-cache, no-store, must-revalidate")
            .set_content(Bytes::from(body));
        response
    }

    fn serve_file(&self, file: ResolvedFile, id: u128) -> Response {
        let content = match fs::read(&file.path) {
            Ok(content) => Bytes::from(content),
            Err(e) => {
                warn!("[ID{}]无法读取{}：{}，返回404", id, file.path.display(), e);
                return Response::not_found();
            }
        };

        let mime = self.typer.classify(&file.path);
        debug!("[ID{}]{}的类型为{}", id, file.path.display(), mime);

        let content = match self.live_reload && file.is_html() {
            true => {
                debug!("[ID{}]注入热重载脚本", id);
                reload::inject(content)
            }
            false => content,
        };

        let mut response = Response::new(200);
        response
            .add_header("Content-Type", mime)
            .add_header("Content-Length", &content.len().to_string())
            .add_header("X-Content-Type-Options", "nosniff")
            .add_header("X-Frame-Options", "SAMEORIGIN");
        if let Some(modified) = file.modified {
            response.add_header("Last-Modified", &format_http_date(modified));
        }
        response.set_content(content);
        response
    }

    fn serve_directory(&self, path: &Path, request_path: &str, id: u128) -> Response {
        let items = match listing::read_items(path) {
            Ok(items) => items,
            Err(e) => {
                warn!("[ID{}]无法列出目录{}：{}，返回404", id, path.display(), e);
                return Response::not_found();
            }
        };
        debug!("[ID{}]目录{}共有{}个条目", id, request_path, items.len());

        let page = listing::render(items, request_path);
        let mut response = Response::new(200);
        response
            .add_header("Content-Type", TEXT_HTML)
            .add_header("Content-Length", &page.len().to_string())
            .set_content(Bytes::from(page));
        response
    }
}
