// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了服务器从启动到处理单个请求的过程中可能出现的各类异常情况。
//!
//! ## 分类
//! - **文件系统类**：`PathEscape`、`NotFound`、`ReadFailure`、`EncodingFailure`、
//!   `EnumerationFailure`。它们只在核心组件内部流转，到达组件边界时一律降级为安全的默认值
//!   （404、原样返回或“无变化”），客户端永远看不到区分性的错误信息。
//! - **协议类**：请求报文无法解析时由传输层转换为 400 / 405。
//! - **启动类**：根目录不可用、配置文件不可读、端口无法绑定、运行时无法创建，会让进程以非零状态退出。

use std::fmt;

/// 服务器处理过程中发生的异常类型。
#[derive(Debug, Clone, PartialEq)]
pub enum Exception {
    /// 解析后的真实路径离开了服务根目录（符号链接或目录遍历）。对外表现与 `NotFound` 完全相同。
    PathEscape,
    /// 路径不存在，或者既不是普通文件也不是目录。对应 `404 Not Found`。
    NotFound,
    /// 文件存在但无法打开或读取（权限不足、读取时被删除等），按 `NotFound` 处理。
    ReadFailure,
    /// HTML 内容不是合法的 UTF-8，无法注入热重载脚本。响应体原样返回，不算错误。
    EncodingFailure,
    /// 目录列表或变更扫描时某个条目无法读取，跳过该条目即可。
    EnumerationFailure,
    /// 客户端发送的请求字节流无法解析为合法的 UTF-8 字符串。
    RequestIsNotUtf8,
    /// 客户端使用了服务器不支持的 HTTP 方法。
    UnSupportedRequestMethod,
    /// 客户端使用了服务器不支持的 HTTP 协议版本（例如 HTTP/2.0）。
    UnsupportedHttpVersion,
    /// 请求行格式不正确。
    MalformedRequest,
    /// 请求头超过了 `max_request_size` 限制。
    RequestTooLarge,
    /// 服务根目录不存在、不是目录或无法规范化。
    RootUnavailable(String),
    /// 配置文件存在但无法读取。
    ConfigUnreadable(String),
    /// 无法绑定监听端口。
    BindFailed(String),
    /// 异步运行时无法创建。
    RuntimeFailure(String),
}

use Exception::*;

impl fmt::Display for Exception {
    /// 根据错误类型写入人类可读的描述文本，主要用于日志。
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathEscape => write!(f, "Resolved path escapes the server root"),
            NotFound => write!(f, "File not found (404)"),
            ReadFailure => write!(f, "File exists but could not be read"),
            EncodingFailure => write!(f, "HTML body is not valid UTF-8"),
            EnumerationFailure => write!(f, "Directory entry could not be read"),
            RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            UnSupportedRequestMethod => write!(f, "Unsupported request method"),
            UnsupportedHttpVersion => write!(f, "Unsupported HTTP version"),
            MalformedRequest => write!(f, "Malformed request line"),
            RequestTooLarge => write!(f, "Request head exceeds the size limit"),
            RootUnavailable(detail) => write!(f, "Server root is unavailable: {}", detail),
            ConfigUnreadable(detail) => write!(f, "Couldn't read config file: {}", detail),
            BindFailed(detail) => write!(f, "Couldn't bind listener: {}", detail),
            RuntimeFailure(detail) => write!(f, "Couldn't start the async runtime: {}", detail),
        }
    }
}

impl std::error::Error for Exception {}
