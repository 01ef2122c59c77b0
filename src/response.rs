// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 响应描述
//!
//! 分发器只决定状态码、响应头和响应体；`Date`、`Connection`、`Content-Length`
//! 以及可选的压缩由传输层在序列化前补上。

use std::{
    io::{self, Write},
    time::SystemTime,
};

use brotli::enc::{self, backward_references::BrotliEncoderParams};
use bytes::Bytes;
use flate2::{
    write::{DeflateEncoder, GzEncoder},
    Compression,
};
use log::{debug, error};

use crate::{
    param::{HttpEncoding, HttpVersion, ALLOWED_METHODS, CRLF, SERVER_NAME, STATUS_CODES, TEXT_HTML},
    util::{format_http_date, HtmlBuilder, NOT_FOUND_PAGE},
};

#[derive(Debug, Clone)]
pub struct Response {
    version: HttpVersion,
    status_code: u16,
    information: String,
    headers: Vec<(String, String)>,
    content: Option<Bytes>,
}

impl Response {
    /// 新建一个只带 `Server` 头的响应
    pub fn new(code: u16) -> Self {
        let mut response = Self {
            version: HttpVersion::V1_1,
            status_code: 200,
            information: "OK".to_string(),
            headers: Vec::new(),
            content: None,
        };
        response.set_code(code).add_header("Server", SERVER_NAME);
        response
    }

    /// 固定的 404 页面
    pub fn not_found() -> Self {
        let mut response = Self::new(404);
        response
            .add_header("Content-Type", TEXT_HTML)
            .set_content(Bytes::from(NOT_FOUND_PAGE.as_str()));
        response
    }

    /// 带简单 HTML 说明页的错误响应
    pub fn from_status_code(code: u16) -> Self {
        let mut response = Self::new(code);
        let page = HtmlBuilder::from_status_code(code, None).build();
        response
            .add_header("Content-Type", TEXT_HTML)
            .set_content(Bytes::from(page));
        if code == 405 {
            response.add_header("Allow", &allow_list());
        }
        response
    }

    /// `OPTIONS` 请求的应答
    pub fn options() -> Self {
        let mut response = Self::new(204);
        response.add_header("Allow", &allow_list());
        response
    }

    pub fn set_code(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self.information = match STATUS_CODES.get(&code) {
            Some(&reason) => reason.to_string(),
            None => {
                error!("非法的状态码：{}。这条错误说明代码编写出现了错误。", code);
                "Unknown Status".to_string()
            }
        };
        self
    }

    pub fn set_version(&mut self, version: HttpVersion) -> &mut Self {
        self.version = version;
        self
    }

    pub fn add_header(&mut self, name: &str, value: &str) -> &mut Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// 替换同名（忽略大小写）的第一个响应头，不存在时追加
    pub fn replace_or_add_header(&mut self, name: &str, value: &str) -> &mut Self {
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(header) => header.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
        self
    }

    pub fn set_content(&mut self, content: Bytes) -> &mut Self {
        self.content = Some(content);
        self
    }

    /// 按协商结果压缩响应体。已压缩的格式、空响应体和已经带编码的响应保持原样。
    pub fn compress_for(&mut self, accept_encoding: &[HttpEncoding], id: u128) -> &mut Self {
        if self.header("Content-Encoding").is_some() {
            return self;
        }
        let content = match &self.content {
            Some(c) if !c.is_empty() => c.clone(),
            _ => return self,
        };
        if self.header("Content-Type").map_or(true, should_skip_compression) {
            return self;
        }
        let encoding = match decide_encoding(accept_encoding) {
            Some(e) => e,
            None => return self,
        };

        match compress(content.to_vec(), Some(encoding)) {
            Ok(compressed) => {
                let length = compressed.len().to_string();
                self.content = Some(Bytes::from(compressed));
                self.replace_or_add_header("Content-Length", &length)
                    .add_header("Content-Encoding", &encoding.to_string())
                    .add_header("Vary", "Accept-Encoding");
            }
            Err(e) => error!("[ID{}]压缩失败，按原样发送：{}", id, e),
        }
        self
    }

    /// 序列化为报文。`head_only` 为真时保留全部响应头（包括 `Content-Length`）但不写响应体。
    pub fn as_bytes(&self, head_only: bool) -> Vec<u8> {
        let content: &[u8] = match &self.content {
            Some(c) => c,
            None => b"",
        };

        let mut head = format!(
            "{} {} {}{}",
            self.version, self.status_code, self.information, CRLF
        );
        for (name, value) in &self.headers {
            head.push_str(&format!("{}: {}{}", name, value, CRLF));
        }
        if self.header("Content-Length").is_none() {
            head.push_str(&format!("Content-Length: {}{}", content.len(), CRLF));
        }
        if self.header("Date").is_none() {
            head.push_str(&format!("Date: {}{}", format_http_date(SystemTime::now()), CRLF));
        }
        if self.header("Connection").is_none() {
            head.push_str(&format!("Connection: close{}", CRLF));
        }
        head.push_str(CRLF);

        match head_only {
            true => head.into_bytes(),
            false => [head.as_bytes(), content].concat(),
        }
    }
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        &self.information
    }

    /// 按名称（忽略大小写）取第一个响应头的值
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn content(&self) -> Option<&Bytes> {
        self.content.as_ref()
    }
}

fn allow_list() -> String {
    ALLOWED_METHODS
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn compress(data: Vec<u8>, mode: Option<HttpEncoding>) -> io::Result<Vec<u8>> {
    let original_size = data.len();
    let result = match mode {
        Some(HttpEncoding::Gzip) => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&data)?;
            encoder.finish()
        }
        Some(HttpEncoding::Deflate) => {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&data)?;
            encoder.finish()
        }
        Some(HttpEncoding::Br) => {
            let params = BrotliEncoderParams::default();
            let mut output = Vec::new();
            enc::BrotliCompress(&mut io::Cursor::new(data), &mut output, &params)?;
            Ok(output)
        }
        None => Ok(data),
    };

    if let Ok(ref compressed) = result {
        debug!(
            "压缩完成: {:?}, 原始大小: {} bytes, 压缩后: {} bytes",
            mode,
            original_size,
            compressed.len()
        );
    }

    result
}

/// 本身已经压缩过的格式不再压缩
fn should_skip_compression(mime_type: &str) -> bool {
    let skip_types = [
        "image/",
        "video/",
        "audio/",
        "application/zip",
        "application/gzip",
        "application/x-tar",
        "application/pdf",
        "application/octet-stream",
        "font/woff",
    ];

    skip_types
        .iter()
        .any(|&skip_type| mime_type.starts_with(skip_type) && mime_type != "image/svg+xml")
}

/// 优先 gzip，其次 br，最后 deflate
fn decide_encoding(accept_encoding: &[HttpEncoding]) -> Option<HttpEncoding> {
    if accept_encoding.contains(&HttpEncoding::Gzip) {
        Some(HttpEncoding::Gzip)
    } else if accept_encoding.contains(&HttpEncoding::Br) {
        Some(HttpEncoding::Br)
    } else if accept_encoding.contains(&HttpEncoding::Deflate) {
        Some(HttpEncoding::Deflate)
    } else {
        None
    }
}
