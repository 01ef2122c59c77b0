// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 变更追踪
//!
//! 热重载脚本带着上一次拿到的时间戳来询问“根目录下是否有东西变了”。
//! 服务端不保存任何状态，每次询问都重新遍历整棵目录树比较修改时间，
//! 找到第一个更新的条目就立即返回。

use std::{
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use log::debug;
use serde_derive::Serialize;
use walkdir::{DirEntry, WalkDir};

use crate::resolver::ServerRoot;

/// 判断服务根目录在某个时间点之后是否发生过变化。
///
/// 目前的实现是轮询扫描，换成文件系统事件订阅时只需提供另一个实现。
#[cfg_attr(test, mockall::automock)]
pub trait ChangeDetector: Send + Sync {
    /// `timestamp_ms` 为 Unix 纪元以来的毫秒数，存在修改时间严格晚于它的条目时返回 `true`
    fn has_changed_since(&self, timestamp_ms: u64) -> bool;
}

/// 遍历目录树比较修改时间的实现
pub struct ScanTracker {
    root: ServerRoot,
}

impl ScanTracker {
    pub fn new(root: ServerRoot) -> Self {
        Self { root }
    }
}

impl ChangeDetector for ScanTracker {
    fn has_changed_since(&self, timestamp_ms: u64) -> bool {
        let changed = newer_entry(self.root.path(), timestamp_ms);
        if let Some(path) = &changed {
            debug!("{}在{}之后被修改", path, timestamp_ms);
        }
        changed.is_some()
    }
}

/// 返回第一个修改时间晚于 `since_ms` 的非隐藏条目。
///
/// 修改时间先截断到整毫秒再比较，与返回给客户端的时间戳精度一致。
/// 目录也参与比较（根目录本身除外），删除文件会更新父目录的修改时间。
/// 隐藏目录不会被深入遍历，符号链接不跟随，读取失败的条目直接跳过。
fn newer_entry(root: &Path, since_ms: u64) -> Option<String> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
        .filter_map(|e| e.ok())
        .find(|entry| {
            entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
                .map_or(false, |d| d.as_millis() > u128::from(since_ms))
        })
        .map(|entry| entry.path().display().to_string())
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map_or(false, |name| name.starts_with('.'))
}

/// 客户端的一次变更询问
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeQuery {
    pub since_ms: u64,
}

impl ChangeQuery {
    /// 从 `?t=<毫秒>` 中取出时间戳，缺失、为负或无法解析时按 0 处理
    pub fn from_uri(uri: &str) -> Self {
        let since_ms = uri
            .split_once('?')
            .map(|(_, query)| query)
            .into_iter()
            .flat_map(|query| query.split('&'))
            .find_map(|pair| pair.strip_prefix("t="))
            .and_then(|value| value.parse::<f64>().ok())
            .filter(|value| value.is_finite() && *value >= 0.0)
            .map(|value| value as u64)
            .unwrap_or(0);
        Self { since_ms }
    }
}

/// 探测端点的 JSON 响应体
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeReport {
    pub has_changes: bool,
    /// 客户端下一次询问时应携带的时间戳
    pub timestamp: u64,
}

/// 当前时间，Unix 纪元以来的毫秒数
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, time::Duration};
    use tempfile::TempDir;

    fn tracker(dir: &TempDir) -> ScanTracker {
        ScanTracker::new(ServerRoot::new(dir.path()).unwrap())
    }

    fn set_mtime(path: &Path, time: SystemTime) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(time).unwrap();
    }

    #[test]
    fn test_everything_is_newer_than_epoch() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        assert!(tracker(&dir).has_changed_since(0));
    }

    #[test]
    fn test_untouched_tree_at_now() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("css")).unwrap();
        fs::write(dir.path().join("css").join("site.css"), "body {}").unwrap();
        fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        let now = now_ms();
        assert!(!tracker(&dir).has_changed_since(now));
    }

    #[test]
    fn test_same_millisecond_is_not_newer() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("index.html");
        fs::write(&file, "<html></html>").unwrap();
        // 同一毫秒内稍晚的修改时间
        set_mtime(
            &file,
            UNIX_EPOCH + Duration::from_millis(1_700_000_000_000) + Duration::from_micros(750),
        );

        let tracker = tracker(&dir);
        assert!(!tracker.has_changed_since(1_700_000_000_000));
        assert!(tracker.has_changed_since(1_699_999_999_999));
    }

    #[test]
    fn test_requery_with_returned_timestamp() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        let tracker = tracker(&dir);
        for _ in 0..20 {
            let timestamp = now_ms();
            assert!(tracker.has_changed_since(0));
            std::thread::sleep(Duration::from_millis(2));
            assert!(!tracker.has_changed_since(timestamp));
        }
    }

    #[test]
    fn test_empty_tree_never_changes() {
        let dir = TempDir::new().unwrap();
        assert!(!tracker(&dir).has_changed_since(0));
    }

    #[test]
    fn test_strictly_newer() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "a").unwrap();
        let mtime = UNIX_EPOCH + Duration::from_millis(1_700_000_000_000);
        set_mtime(&file, mtime);

        let tracker = tracker(&dir);
        assert!(tracker.has_changed_since(1_699_999_999_999));
        assert!(!tracker.has_changed_since(1_700_000_000_000));
    }

    #[test]
    fn test_nested_change_is_detected() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        let before = now_ms() + 1000;
        fs::write(nested.join("deep.txt"), "deep").unwrap();
        set_mtime(
            &nested.join("deep.txt"),
            UNIX_EPOCH + Duration::from_millis(before + 5000),
        );
        assert!(tracker(&dir).has_changed_since(before));
    }

    #[test]
    fn test_hidden_entries_are_ignored() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git").join("HEAD"), "ref").unwrap();
        fs::write(dir.path().join(".env"), "SECRET=1").unwrap();
        let future = UNIX_EPOCH + Duration::from_millis(now_ms() + 60_000);
        set_mtime(&dir.path().join(".git").join("HEAD"), future);
        set_mtime(&dir.path().join(".env"), future);

        assert!(!tracker(&dir).has_changed_since(now_ms() + 10_000));
    }

    #[test]
    fn test_query_parsing() {
        assert_eq!(
            ChangeQuery::from_uri("/__relay_check__?t=1700000000123").since_ms,
            1_700_000_000_123
        );
        assert_eq!(ChangeQuery::from_uri("/__relay_check__?x=1&t=42").since_ms, 42);
        assert_eq!(ChangeQuery::from_uri("/__relay_check__?t=12.9").since_ms, 12);
        assert_eq!(ChangeQuery::from_uri("/__relay_check__").since_ms, 0);
        assert_eq!(ChangeQuery::from_uri("/__relay_check__?t=abc").since_ms, 0);
        assert_eq!(ChangeQuery::from_uri("/__relay_check__?t=-5").since_ms, 0);
        assert_eq!(ChangeQuery::from_uri("/__relay_check__?t=").since_ms, 0);
    }

    #[test]
    fn test_report_json_shape() {
        let report = ChangeReport {
            has_changes: true,
            timestamp: 1234,
        };
        assert_eq!(
            serde_json::to_string(&report).unwrap(),
            r#"{"hasChanges":true,"timestamp":1234}"#
        );
    }
}
