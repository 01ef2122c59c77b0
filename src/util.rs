// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use std::time::SystemTime;

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;

use crate::param::STATUS_CODES;

const BASE_CSS: &str = r"
            body {
                font-family: system-ui, -apple-system, Tahoma, Verdana, Arial, sans-serif;
                margin: 0;
                padding: 20px 40px;
                background: #f5f5f5;
                color: #333;
            }
            h1 {
                border-bottom: 1px solid #ddd;
                padding-bottom: 10px;
            }
            p { color: #666; }
            @media (prefers-color-scheme: dark) {
                body { background: #1a1a1a; color: #e0e0e0; }
                h1 { border-bottom-color: #444; }
                p { color: #999; }
            }
            ";

lazy_static! {
    /// 固定的 404 页面，所有“找不到”的情况（包括越界访问）都返回同一份内容
    pub static ref NOT_FOUND_PAGE: String = HtmlBuilder::not_found().build();
}

/// 自包含的 HTML 页面骨架，不引用任何外部资源
pub struct HtmlBuilder {
    title: String,
    css: String,
    script: String,
    body: String,
}

impl HtmlBuilder {
    pub fn new(title: &str, css: &str, script: &str, body: String) -> Self {
        Self {
            title: escape_html(title),
            css: [BASE_CSS, css].concat(),
            script: script.to_string(),
            body,
        }
    }

    /// 通用状态码页面，`note` 为空时使用标准原因短语
    pub fn from_status_code(code: u16, note: Option<&str>) -> Self {
        let reason = STATUS_CODES.get(&code).copied().unwrap_or("Unknown Status");
        let title = format!("{} {}", code, reason);
        let body = format!(
            r"
            <h1>{}</h1>
            <p>{}</p>
            ",
            title,
            note.unwrap_or(reason)
        );
        Self::new(&title, "", "", body)
    }

    pub fn not_found() -> Self {
        Self::from_status_code(404, Some("噢！你请求的文件无法找到。"))
    }

    pub fn build(&self) -> String {
        format!(
            r##"<!DOCTYPE html>
<html>
    <head>
        <meta charset="utf-8">
        <meta name="viewport" content="width=device-width, initial-scale=1">
        <title>{}</title>
        <style>{}</style>
    </head>
    <body>
        {}
        <script>{}</script>
    </body>
</html>"##,
            self.title, self.css, self.body, self.script
        )
    }
}

/// 转义 HTML 特殊字符，文件名可能包含 `<`、`&` 等字符
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// 按二进制前缀格式化文件大小，字节以上保留一位小数
pub fn format_file_size(size: u64) -> String {
    let units = ["B", "KB", "MB", "GB", "TB"];
    let mut size_f = size as f64;
    let mut unit_index = 0;

    while size_f >= 1024.0 && unit_index < units.len() - 1 {
        size_f /= 1024.0;
        unit_index += 1;
    }

    match unit_index {
        0 => format!("{} {}", size, units[0]),
        _ => format!("{:.1} {}", size_f, units[unit_index]),
    }
}

/// IMF-fixdate 格式，用于 `Last-Modified` 和 `Date` 响应头
pub fn format_http_date(time: SystemTime) -> String {
    let date: DateTime<Utc> = time.into();
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_file_size() {
        assert_eq!(format_file_size(9926), "9.7 KB".to_string());
        assert_eq!(format_file_size(51800), "50.6 KB".to_string());
    }

    #[test]
    fn test_file_size_bytes() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1023), "1023 B");
    }

    #[test]
    fn test_file_size_larger_units() {
        assert_eq!(format_file_size(1024), "1.0 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5242880), "5.0 MB");
        assert_eq!(format_file_size(3221225472), "3.0 GB");
        assert_eq!(format_file_size(1099511627776), "1.0 TB");
        assert_eq!(format_file_size(1024 * 1099511627776), "1024.0 TB");
    }

    #[test]
    fn test_format_http_date() {
        let time = UNIX_EPOCH + Duration::from_secs(784111777);
        assert_eq!(format_http_date(time), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain.txt"), "plain.txt");
    }

    #[test]
    fn test_not_found_page_structure() {
        let html = NOT_FOUND_PAGE.as_str();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>404 Not Found</title>"));
        assert!(html.contains("<h1>404 Not Found</h1>"));
        assert!(html.contains("charset=\"utf-8\""));
        assert!(html.contains("</body>"));
        assert!(html.contains("</html>"));
    }

    #[test]
    fn test_from_status_code_without_note() {
        let html = HtmlBuilder::from_status_code(405, None).build();
        assert!(html.contains("<h1>405 Method Not Allowed</h1>"));
        assert!(html.contains("<p>Method Not Allowed</p>"));
    }

    #[test]
    fn test_from_unknown_status_code() {
        let html = HtmlBuilder::from_status_code(599, None).build();
        assert!(html.contains("599 Unknown Status"));
    }

    #[test]
    fn test_title_is_escaped() {
        let html = HtmlBuilder::new("<script>", "", "", String::new()).build();
        assert!(html.contains("<title>&lt;script&gt;</title>"));
    }
}
