// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 目录列表
//!
//! 为没有首页文件的目录生成一个自包含的 HTML 页面：按名称（忽略大小写）排序，
//! 每行包含图标、链接、大小和本地时间格式的修改时间，非根目录额外带一行上级目录链接。

use std::{fs, path::Path};

use chrono::{DateTime, Local};
use log::debug;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::{
    exception::Exception,
    util::{escape_html, format_file_size, HtmlBuilder},
};

/// 路径段中需要百分号编码的字符
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'\'')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

const LISTING_CSS: &str = r"
            table {
                width: 100%;
                background: white;
                border-radius: 8px;
                box-shadow: 0 2px 12px rgba(0,0,0,0.06);
                border-collapse: collapse;
                margin-top: 20px;
            }
            th, td {
                text-align: left;
                padding: 12px 16px;
                border-bottom: 1px solid #eee;
            }
            th { background: #f8f8f8; font-weight: 600; color: #666; }
            tbody tr { cursor: pointer; }
            tbody tr:hover { background: #f9f9f9; }
            a { color: #0066cc; text-decoration: none; }
            a:hover { text-decoration: underline; }
            .icon { margin-right: 4px; }
            .size, .modified { color: #666; font-size: 0.9em; text-align: right; }
            .size { width: 100px; }
            .modified { width: 200px; }
            @media (prefers-color-scheme: dark) {
                table { background: #2a2a2a; }
                th, td { border-bottom-color: #444; }
                th { background: #333; color: #aaa; }
                tbody tr:hover { background: #333; }
                a { color: #4db8ff; }
            }";

/// 整行可点击：点在行的空白处时跳转到该行的链接
const LISTING_SCRIPT: &str = r"
        document.querySelectorAll('tbody tr').forEach(function (row) {
            var link = row.querySelector('a');
            if (!link) { return; }
            row.addEventListener('click', function (e) {
                if (e.target.tagName !== 'A') { window.location.href = link.href; }
            });
        });";

/// 目录中的一个条目
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryItem {
    pub name: String,
    pub is_dir: bool,
    /// 目录为 `-`
    pub size: String,
    pub modified: String,
}

/// 读取目录下的所有条目。目录本身无法读取时返回错误，单个条目读取失败则跳过。
pub fn read_items(dir: &Path) -> Result<Vec<DirectoryItem>, Exception> {
    let entries = fs::read_dir(dir).map_err(|_| Exception::ReadFailure)?;
    let mut items = Vec::new();
    for entry in entries {
        match entry.map_err(|_| Exception::EnumerationFailure).and_then(|e| to_item(&e.path())) {
            Ok(item) => items.push(item),
            Err(e) => debug!("跳过{}中的一个条目：{}", dir.display(), e),
        }
    }
    Ok(items)
}

fn to_item(path: &Path) -> Result<DirectoryItem, Exception> {
    // 跟随符号链接，指向目录的链接按目录展示；失效的链接在这里被跳过
    let metadata = fs::metadata(path).map_err(|_| Exception::EnumerationFailure)?;
    let name = path
        .file_name()
        .ok_or(Exception::EnumerationFailure)?
        .to_string_lossy()
        .into_owned();
    let is_dir = metadata.is_dir();
    let size = match is_dir {
        true => "-".to_string(),
        false => format_file_size(metadata.len()),
    };
    let modified = match metadata.modified() {
        Ok(time) => DateTime::<Local>::from(time)
            .format("%b %-d, %Y %-I:%M %p")
            .to_string(),
        Err(_) => "-".to_string(),
    };
    Ok(DirectoryItem {
        name,
        is_dir,
        size,
        modified,
    })
}

/// 渲染目录列表页面
pub fn render(mut items: Vec<DirectoryItem>, request_path: &str) -> String {
    items.sort_by_key(|item| item.name.to_lowercase());

    let base = match request_path {
        "/" => String::new(),
        path => encode_path(path),
    };

    let mut rows = String::new();
    if request_path != "/" {
        rows.push_str(&format!(
            r#"
            <tr>
                <td><span class="icon">⬆️</span> <a href="{}">../</a></td>
                <td class="size">-</td>
                <td class="modified"></td>
            </tr>"#,
            parent_href(request_path)
        ));
    }

    for item in &items {
        let suffix = if item.is_dir { "/" } else { "" };
        let href = format!(
            "{}/{}{}",
            base,
            utf8_percent_encode(&item.name, SEGMENT),
            suffix
        );
        rows.push_str(&format!(
            r#"
            <tr>
                <td><span class="icon">{}</span> <a href="{}">{}{}</a></td>
                <td class="size">{}</td>
                <td class="modified">{}</td>
            </tr>"#,
            icon_for(&item.name, item.is_dir),
            href,
            escape_html(&item.name),
            suffix,
            item.size,
            escape_html(&item.modified)
        ));
    }

    let title = format!("Index of {}", request_path);
    let body = format!(
        r#"
        <h1>{}</h1>
        <table>
            <thead>
                <tr>
                    <th>Name</th>
                    <th class="size">Size</th>
                    <th class="modified">Modified</th>
                </tr>
            </thead>
            <tbody>{}
            </tbody>
        </table>"#,
        escape_html(&title),
        rows
    );
    HtmlBuilder::new(&title, LISTING_CSS, LISTING_SCRIPT, body).build()
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// 上级目录的绝对链接，`/a/b` 的上级是 `/a/`
fn parent_href(request_path: &str) -> String {
    match request_path.rsplit_once('/') {
        Some(("", _)) | None => "/".to_string(),
        Some((parent, _)) => format!("{}/", encode_path(parent)),
    }
}

fn icon_for(name: &str, is_dir: bool) -> &'static str {
    if is_dir {
        return "📁";
    }
    let extension = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "html" | "htm" => "🌐",
        "css" => "🎨",
        "js" | "mjs" | "ts" => "📜",
        "json" => "📋",
        "png" | "jpg" | "jpeg" | "gif" | "svg" | "webp" => "🖼",
        "pdf" => "📕",
        "zip" | "tar" | "gz" => "📦",
        "mp3" | "wav" | "m4a" => "🎵",
        "mp4" | "mov" | "avi" => "🎬",
        "rs" => "🦀",
        "py" => "🐍",
        _ => "📄",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn item(name: &str, is_dir: bool) -> DirectoryItem {
        DirectoryItem {
            name: name.to_string(),
            is_dir,
            size: if is_dir { "-".to_string() } else { "1 B".to_string() },
            modified: "Jan 1, 2026 9:00 AM".to_string(),
        }
    }

    #[test]
    fn test_sorted_case_insensitively() {
        let html = render(
            vec![item("B.txt", false), item("c", true), item("a.txt", false)],
            "/",
        );
        let a = html.find(">a.txt<").unwrap();
        let b = html.find(">B.txt<").unwrap();
        let c = html.find(">c/<").unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_parent_row_only_below_root() {
        let root = render(vec![item("a.txt", false)], "/");
        assert!(!root.contains(">../<"));

        let nested = render(vec![item("a.txt", false)], "/docs/api");
        assert!(nested.contains(r#"<a href="/docs/">../</a>"#));

        let first_level = render(vec![], "/docs");
        assert!(first_level.contains(r#"<a href="/">../</a>"#));
    }

    #[test]
    fn test_links_are_encoded_and_dirs_get_trailing_slash() {
        let html = render(
            vec![item("my notes.md", false), item("assets", true)],
            "/site docs",
        );
        assert!(html.contains(r#"href="/site%20docs/my%20notes.md""#));
        assert!(html.contains(r#"href="/site%20docs/assets/">assets/</a>"#));
    }

    #[test]
    fn test_root_links() {
        let html = render(vec![item("index.css", false)], "/");
        assert!(html.contains(r#"href="/index.css""#));
    }

    #[test]
    fn test_names_are_escaped() {
        let html = render(vec![item("<b>.txt", false)], "/");
        assert!(html.contains("&lt;b&gt;.txt"));
        assert!(!html.contains("<b>.txt"));
        assert!(html.contains("%3Cb%3E.txt"));
    }

    #[test]
    fn test_icons() {
        assert_eq!(icon_for("src", true), "📁");
        assert_eq!(icon_for("index.HTML", false), "🌐");
        assert_eq!(icon_for("main.py", false), "🐍");
        assert_eq!(icon_for("Makefile", false), "📄");
    }

    #[test]
    fn test_document_is_self_contained() {
        let html = render(vec![item("a.txt", false)], "/");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Index of /</title>"));
        assert!(html.contains("<style>"));
        assert!(html.contains("addEventListener('click'"));
        assert!(!html.contains("<link"));
        assert!(!html.contains("src=\""));
    }

    #[test]
    fn test_read_items() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("big.bin"), vec![0u8; 2048]).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let mut items = read_items(dir.path()).unwrap();
        items.sort_by_key(|i| i.name.clone());
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "big.bin");
        assert_eq!(items[0].size, "2.0 KB");
        assert!(!items[0].is_dir);
        assert_eq!(items[1].name, "sub");
        assert_eq!(items[1].size, "-");
        assert!(items[1].is_dir);
        assert_ne!(items[1].modified, "-");
    }

    #[cfg(unix)]
    #[test]
    fn test_broken_symlink_is_skipped() {
        use std::os::unix::fs::symlink;

        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ok.txt"), "ok").unwrap();
        symlink(dir.path().join("gone"), dir.path().join("dangling")).unwrap();

        let items = read_items(dir.path()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "ok.txt");
    }

    #[test]
    fn test_unreadable_directory() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_items(&dir.path().join("missing")), Err(Exception::ReadFailure));
    }
}
