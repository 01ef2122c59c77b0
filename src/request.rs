// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求解析模块
//!
//! 把从 TCP 流中读到的请求头字节解析为强类型的 `Request`。只提取分发与日志需要的信息：
//! 1. 请求行（方法、路径、版本）。
//! 2. `User-Agent`，用于访问日志。
//! 3. `Accept-Encoding`，用于响应压缩协商。
//!
//! 请求体一律忽略，服务器是只读的。

use crate::{exception::Exception, param::*};
use log::error;

/// 一个 HTTP 请求的元数据
#[derive(Debug, Clone)]
pub struct Request {
    method: HttpRequestMethod,
    /// 原始请求目标（包含查询字符串，未解码）
    path: String,
    version: HttpVersion,
    user_agent: String,
    /// 客户端支持的压缩编码列表（按出现顺序）
    accept_encoding: Vec<HttpEncoding>,
}

impl Request {
    /// 从原始字节缓冲区构建 `Request`。
    ///
    /// # 错误
    /// - 不是 UTF-8：`RequestIsNotUtf8`
    /// - 请求行不是 `方法 目标 版本` 三段：`MalformedRequest`
    /// - 方法不是 GET/HEAD/OPTIONS/POST：`UnSupportedRequestMethod`
    /// - 版本不是 HTTP/1.0 或 HTTP/1.1：`UnsupportedHttpVersion`
    pub fn try_from(buffer: &[u8], id: u128) -> Result<Self, Exception> {
        let request_string = match std::str::from_utf8(buffer) {
            Ok(string) => string,
            Err(_) => {
                error!("[ID{}]无法解析HTTP请求", id);
                return Err(Exception::RequestIsNotUtf8);
            }
        };

        let mut request_lines = request_string.split(CRLF);
        let first_line = request_lines.next().unwrap_or_default();
        let first_line_parts: Vec<&str> = first_line.split_whitespace().collect();

        let (method_str, path, version_str) = match first_line_parts.as_slice() {
            [method, path, version] => (method.to_uppercase(), *path, version.to_uppercase()),
            _ => {
                error!("[ID{}]HTTP请求行格式不正确：{}", id, first_line);
                return Err(Exception::MalformedRequest);
            }
        };

        let method = match method_str.as_str() {
            "GET" => HttpRequestMethod::Get,
            "HEAD" => HttpRequestMethod::Head,
            "OPTIONS" => HttpRequestMethod::Options,
            "POST" => HttpRequestMethod::Post,
            _ => {
                error!("[ID{}]不支持的HTTP请求方法：{}", id, &method_str);
                return Err(Exception::UnSupportedRequestMethod);
            }
        };

        let version = match version_str.as_str() {
            "HTTP/1.1" => HttpVersion::V1_1,
            "HTTP/1.0" => HttpVersion::V1_0,
            _ => {
                error!("[ID{}]不支持的HTTP协议版本：{}", id, &version_str);
                return Err(Exception::UnsupportedHttpVersion);
            }
        };

        let mut user_agent = String::new();
        let mut accept_encoding = vec![];
        for line in request_lines.take_while(|line| !line.is_empty()) {
            let (name, value) = match line.split_once(':') {
                Some((name, value)) => (name.trim(), value.trim()),
                None => continue,
            };
            if name.eq_ignore_ascii_case("user-agent") {
                user_agent = value.to_string();
            } else if name.eq_ignore_ascii_case("accept-encoding") && accept_encoding.is_empty() {
                accept_encoding = parse_encodings(value);
            }
        }

        Ok(Self {
            method,
            path: path.to_string(),
            version,
            user_agent,
            accept_encoding,
        })
    }
}

/// 解析 `Accept-Encoding`，忽略 `q=0` 的编码
fn parse_encodings(value: &str) -> Vec<HttpEncoding> {
    value
        .split(',')
        .filter_map(|item| {
            let mut parts = item.split(';').map(str::trim);
            let name = parts.next()?.to_ascii_lowercase();
            let refused = parts.any(|p| matches!(p, "q=0" | "q=0.0" | "q=0.00" | "q=0.000"));
            if refused {
                return None;
            }
            match name.as_str() {
                "gzip" | "x-gzip" => Some(HttpEncoding::Gzip),
                "deflate" => Some(HttpEncoding::Deflate),
                "br" => Some(HttpEncoding::Br),
                _ => None,
            }
        })
        .collect()
}

impl Request {
    pub fn version(&self) -> HttpVersion {
        self.version
    }

    /// 请求目标（含查询参数）
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn accept_encoding(&self) -> &[HttpEncoding] {
        &self.accept_encoding
    }
}
