// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路径解析模块
//!
//! 把请求 URI 转换为服务根目录内部的真实文件系统路径：
//! 1. 去掉查询串并做百分号解码，解码失败时按原字符串处理。
//! 2. 含有 `..` 或 `//` 的路径一律映射到根路径 `/`。
//! 3. 与根目录拼接后解析符号链接，确认结果仍位于根目录之内。
//! 4. 目录按 `INDEX_FILES` 的顺序探测首页文件，找不到则交给目录列表。
//!
//! 所有文件系统错误在这里被吸收，对外只表现为 `ResolvedEntry::NotFound`。

use std::{
    fs::{self, Metadata},
    path::{Path, PathBuf},
    time::SystemTime,
};

use log::{debug, warn};
use percent_encoding::percent_decode_str;

use crate::{exception::Exception, param::INDEX_FILES};

/// 服务根目录：启动时规范化（解析符号链接）一次，之后不再变化。
#[derive(Debug, Clone, PartialEq)]
pub struct ServerRoot(PathBuf);

impl ServerRoot {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, Exception> {
        let path = path.as_ref();
        let real = fs::canonicalize(path)
            .map_err(|e| Exception::RootUnavailable(format!("{}: {}", path.display(), e)))?;
        if !real.is_dir() {
            return Err(Exception::RootUnavailable(format!(
                "{} is not a directory",
                real.display()
            )));
        }
        Ok(Self(real))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// 按路径组件比较，`/srv/site-evil` 不会被当成 `/srv/site` 的子路径。
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.0)
    }
}

/// 解析出的普通文件
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFile {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<SystemTime>,
    /// 小写的扩展名
    pub extension: Option<String>,
}

impl ResolvedFile {
    fn from_metadata(path: PathBuf, metadata: &Metadata) -> Self {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());
        Self {
            size: metadata.len(),
            modified: metadata.modified().ok(),
            extension,
            path,
        }
    }

    pub fn is_html(&self) -> bool {
        matches!(self.extension.as_deref(), Some("html") | Some("htm"))
    }
}

/// 一次请求的解析结果，每次请求都重新计算，不跨请求缓存。
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedEntry {
    File(ResolvedFile),
    Directory {
        path: PathBuf,
        /// 经过清洗的虚拟路径，目录列表用它生成标题和链接
        request_path: String,
    },
    NotFound,
}

/// 把原始 URI 清洗为以 `/` 开头的虚拟路径。
///
/// 整个 URI（含查询串与片段）解码后只要含有 `..` 或 `//` 就直接映射到 `/`；
/// 否则去掉 `?` 与 `#` 之后的部分，除根路径外不保留末尾的 `/`。
pub fn sanitize(uri: &str) -> String {
    let raw = uri.split(|c| c == '?' || c == '#').next().unwrap_or("");
    let mut path = decode(raw);
    // 查询串解码失败时整体保留原文，路径部分需要单独再查一次
    if [decode(uri), path.clone()]
        .iter()
        .any(|s| s.contains("..") || s.contains("//"))
    {
        return "/".to_string();
    }

    if !path.starts_with('/') {
        path.insert(0, '/');
    }
    if path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    path
}

/// 百分号解码并去掉空字节，解码失败时保留原文。
///
/// 先去掉空字节再检查，避免 `.\0.` 这样的写法在去除后拼出 `..`
fn decode(raw: &str) -> String {
    let decoded = match percent_decode_str(raw).decode_utf8() {
        Ok(s) => s.into_owned(),
        Err(_) => raw.to_string(),
    };
    decoded.chars().filter(|&c| c != '\0').collect()
}

pub struct PathResolver {
    root: ServerRoot,
}

impl PathResolver {
    pub fn new(root: ServerRoot) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &ServerRoot {
        &self.root
    }

    /// 解析请求 URI。越界、不存在、无法读取统统返回 `NotFound`。
    pub fn resolve(&self, uri: &str) -> ResolvedEntry {
        let request_path = sanitize(uri);
        debug!("清洗后的请求路径：{}", request_path);
        match self.try_resolve(&request_path) {
            Ok(entry) => entry,
            Err(Exception::PathEscape) => {
                warn!("请求路径{}解析后离开了服务根目录，按404处理", request_path);
                ResolvedEntry::NotFound
            }
            Err(e) => {
                debug!("请求路径{}无法解析：{}", request_path, e);
                ResolvedEntry::NotFound
            }
        }
    }

    fn try_resolve(&self, request_path: &str) -> Result<ResolvedEntry, Exception> {
        let joined = self.root.path().join(request_path.trim_start_matches('/'));
        let real = self.contained(&joined)?;
        let metadata = fs::metadata(&real).map_err(|_| Exception::NotFound)?;

        if metadata.is_dir() {
            for name in INDEX_FILES {
                match self.probe_index(&real.join(name)) {
                    Ok(file) => return Ok(ResolvedEntry::File(file)),
                    Err(Exception::PathEscape) => {
                        warn!("首页文件{}指向服务根目录之外，已忽略", real.join(name).display());
                    }
                    Err(_) => {}
                }
            }
            return Ok(ResolvedEntry::Directory {
                path: real,
                request_path: request_path.to_string(),
            });
        }

        if metadata.is_file() {
            return Ok(ResolvedEntry::File(ResolvedFile::from_metadata(real, &metadata)));
        }

        Err(Exception::NotFound)
    }

    fn probe_index(&self, candidate: &Path) -> Result<ResolvedFile, Exception> {
        let real = self.contained(candidate)?;
        let metadata = fs::metadata(&real).map_err(|_| Exception::NotFound)?;
        if !metadata.is_file() {
            return Err(Exception::NotFound);
        }
        Ok(ResolvedFile::from_metadata(real, &metadata))
    }

    /// 解析符号链接并确认结果仍在根目录内
    fn contained(&self, path: &Path) -> Result<PathBuf, Exception> {
        let real = fs::canonicalize(path).map_err(|_| Exception::NotFound)?;
        if !self.root.contains(&real) {
            return Err(Exception::PathEscape);
        }
        Ok(real)
    }
}
