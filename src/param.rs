// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 协议参数与常量模块
//!
//! 该模块集中定义 `relay` 在请求处理流水线中使用的固定参数，包括：
//! - 服务器标识、热重载探测端点以及默认首页文件列表。
//! - HTTP 状态码及其原因短语（Reason Phrase）。
//! - 文件后缀名到 MIME 类型的映射表，以及内容嗅探使用的二进制文件魔数表。
//! - HTTP 方法、版本及编码格式的强类型枚举。

use lazy_static::lazy_static;
use std::collections::HashMap;

/// 服务器名称标识，用于 HTTP 响应头的 `Server` 字段
pub const SERVER_NAME: &str = "relay";

/// HTTP 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

/// 热重载脚本轮询的探测端点。只要请求 URI 以此开头且热重载已开启，就交给变更追踪器处理。
pub const RELOAD_CHECK_PATH: &str = "/__relay_check__";

/// 热重载脚本的轮询周期（毫秒）
pub const RELOAD_POLL_INTERVAL_MS: u64 = 250;

/// 页面加载后第一次轮询前的延迟（毫秒）
pub const RELOAD_FIRST_POLL_DELAY_MS: u64 = 50;

/// 内容嗅探默认读取的样本长度（字节）
pub const DEFAULT_SNIFF_SAMPLE_SIZE: usize = 512;

/// 样本中不可打印字节占比低于该阈值时判定为文本
pub const DEFAULT_TEXT_THRESHOLD: f64 = 0.3;

/// 请求目录时按顺序探测的首页文件，命中第一个即返回
pub const INDEX_FILES: [&str; 6] = [
    "index.html",
    "index.htm",
    "default.html",
    "default.htm",
    "home.html",
    "home.htm",
];

/// 通用文本类型，源代码、标记语言和配置文件都按纯文本展示
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// 兜底类型，用于无法识别的二进制流
pub const OCTET_STREAM: &str = "application/octet-stream";

/// HTML 页面（目录列表、错误页、首页）使用的类型
pub const TEXT_HTML: &str = "text/html; charset=utf-8";

/// 常见二进制文件的起始魔数。样本以其中任意一个开头即直接判定为二进制。
pub const BINARY_SIGNATURES: [(&str, &[u8]); 9] = [
    ("PNG", &[0x89, 0x50, 0x4E, 0x47]),
    ("JPEG", &[0xFF, 0xD8, 0xFF]),
    ("GIF", &[0x47, 0x49, 0x46]),
    ("PDF", &[0x25, 0x50, 0x44, 0x46]),
    ("ZIP", &[0x50, 0x4B]),
    ("ELF", &[0x7F, 0x45, 0x4C, 0x46]),
    ("Mach-O 64", &[0xCF, 0xFA, 0xED, 0xFE]),
    ("Mach-O 32", &[0xCE, 0xFA, 0xED, 0xFE]),
    ("Mach-O Fat", &[0xCA, 0xFE, 0xBA, 0xBE]),
];

lazy_static! {
    /// 服务器当前允许处理的 HTTP 方法列表，同时用于 `Allow` 响应头。
    pub static ref ALLOWED_METHODS: Vec<HttpRequestMethod> = {
        vec![
            HttpRequestMethod::Get,
            HttpRequestMethod::Head,
            HttpRequestMethod::Options,
        ]
    };
}

lazy_static! {
    /// 服务器可能发出的 HTTP 状态码与其标准原因短语。
    ///
    /// 参考标准：[RFC 9110: HTTP Semantics](https://www.rfc-editor.org/rfc/rfc9110.html)。
    pub static ref STATUS_CODES: HashMap<u16, &'static str> = {
        let mut map = HashMap::new();
        map.insert(200, "OK");
        map.insert(204, "No Content");
        map.insert(400, "Bad Request");
        map.insert(404, "Not Found");
        map.insert(405, "Method Not Allowed");
        map.insert(431, "Request Header Fields Too Large");
        map.insert(500, "Internal Server Error");
        map
    };
}

lazy_static! {
    /// 文件后缀名（小写）到 MIME 类型的映射表。
    ///
    /// 表中找不到的后缀交给 `mime` 模块做内容嗅探。
    pub static ref MIME_TYPES: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        // Web 基础资源
        map.insert("html", TEXT_HTML);
        map.insert("htm", TEXT_HTML);
        map.insert("css", "text/css; charset=utf-8");
        for ext in ["js", "mjs", "jsx", "ts", "tsx"] {
            map.insert(ext, "application/javascript; charset=utf-8");
        }
        map.insert("json", "application/json; charset=utf-8");
        map.insert("xml", "application/xml; charset=utf-8");
        map.insert("wasm", "application/wasm");
        map.insert("map", "application/json; charset=utf-8");
        map.insert("webmanifest", "application/manifest+json");

        // 图片
        map.insert("png", "image/png");
        map.insert("jpg", "image/jpeg");
        map.insert("jpeg", "image/jpeg");
        map.insert("gif", "image/gif");
        map.insert("svg", "image/svg+xml");
        map.insert("ico", "image/x-icon");
        map.insert("webp", "image/webp");
        map.insert("avif", "image/avif");
        map.insert("bmp", "image/bmp");

        // 字体
        map.insert("woff", "font/woff");
        map.insert("woff2", "font/woff2");
        map.insert("ttf", "font/ttf");
        map.insert("otf", "font/otf");
        map.insert("eot", "application/vnd.ms-fontobject");

        // 文档与归档
        map.insert("pdf", "application/pdf");
        map.insert("zip", "application/zip");
        map.insert("gz", "application/gzip");
        map.insert("tar", "application/x-tar");
        map.insert("csv", "text/csv; charset=utf-8");

        // 音视频
        map.insert("mp3", "audio/mpeg");
        map.insert("wav", "audio/wav");
        map.insert("ogg", "audio/ogg");
        map.insert("m4a", "audio/mp4");
        map.insert("mp4", "video/mp4");
        map.insert("webm", "video/webm");
        map.insert("mov", "video/quicktime");

        // 纯文本、源代码、标记语言与配置文件
        for ext in [
            "txt", "text", "log",
            "swift", "py", "rb", "go", "rs", "java", "kt", "c", "cpp", "h", "hpp", "cs", "php",
            "sh", "bash", "zsh", "fish",
            "md", "markdown", "yml", "yaml", "toml", "ini", "cfg", "conf", "env", "lock",
            "vue", "svelte", "astro", "scss", "sass", "less",
        ] {
            map.insert(ext, TEXT_PLAIN);
        }
        map
    };
}

/// 支持的 HTTP 协议版本
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HttpVersion {
    /// HTTP/1.0 版本（命令行工具偶尔仍会使用）
    V1_0,
    /// HTTP/1.1 版本
    V1_1,
}

/// 标准 HTTP 请求方法
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HttpRequestMethod {
    /// 获取资源
    Get,
    /// 获取资源的元数据（不包含响应体），热重载脚本的回退路径依赖它
    Head,
    /// 查询服务器支持的选项
    Options,
    /// 提交数据，本服务器只读，统一返回 405
    Post,
}

/// 支持的内容编码（压缩）格式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HttpEncoding {
    /// GNU zip 压缩
    Gzip,
    /// zlib 压缩
    Deflate,
    /// Brotli 压缩
    Br,
}

use std::fmt;

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpVersion::V1_0 => write!(f, "HTTP/1.0"),
            HttpVersion::V1_1 => write!(f, "HTTP/1.1"),
        }
    }
}

impl fmt::Display for HttpRequestMethod {
    /// 将枚举格式化为 HTTP 标准大写方法名
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpRequestMethod::Get => write!(f, "GET"),
            HttpRequestMethod::Head => write!(f, "HEAD"),
            HttpRequestMethod::Options => write!(f, "OPTIONS"),
            HttpRequestMethod::Post => write!(f, "POST"),
        }
    }
}

impl fmt::Display for HttpEncoding {
    /// 将枚举格式化为 `Content-Encoding` 头所使用的标识符
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpEncoding::Gzip => write!(f, "gzip"),
            HttpEncoding::Deflate => write!(f, "deflate"),
            HttpEncoding::Br => write!(f, "br"),
        }
    }
}
