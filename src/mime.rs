// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 内容类型推断
//!
//! 优先查扩展名映射表；查不到时读取文件开头的一段样本做嗅探，只区分“文本”与“二进制”两类。

use std::{fs::File, io::Read, path::Path};

use log::debug;

use crate::param::{
    BINARY_SIGNATURES, DEFAULT_SNIFF_SAMPLE_SIZE, DEFAULT_TEXT_THRESHOLD, MIME_TYPES, OCTET_STREAM,
    TEXT_PLAIN,
};

/// 内容嗅探的启发式参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SniffConfig {
    /// 从文件开头读取的最大字节数
    pub sample_size: usize,
    /// 不可打印字节占比低于该值时判定为文本
    pub text_threshold: f64,
}

impl Default for SniffConfig {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SNIFF_SAMPLE_SIZE,
            text_threshold: DEFAULT_TEXT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContentTyper {
    sniff: SniffConfig,
}

impl ContentTyper {
    pub fn new(sniff: SniffConfig) -> Self {
        Self { sniff }
    }

    /// 推断文件的 MIME 类型。无法打开或读取时返回 `application/octet-stream`。
    pub fn classify(&self, path: &Path) -> &'static str {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());
        if let Some(mime) = extension.as_deref().and_then(|e| MIME_TYPES.get(e)).copied() {
            return mime;
        }

        match self.read_sample(path) {
            Some(sample) if self.looks_like_text(&sample) => TEXT_PLAIN,
            Some(_) => OCTET_STREAM,
            None => {
                debug!("无法读取{}的样本，按二进制处理", path.display());
                OCTET_STREAM
            }
        }
    }

    fn read_sample(&self, path: &Path) -> Option<Vec<u8>> {
        let file = File::open(path).ok()?;
        let mut sample = Vec::with_capacity(self.sniff.sample_size);
        file.take(self.sniff.sample_size as u64)
            .read_to_end(&mut sample)
            .ok()?;
        Some(sample)
    }

    /// 判断样本是否像文本：
    /// 合法 UTF-8 直接算文本；命中二进制魔数直接算二进制；否则按不可打印字节的占比判断。
    pub fn looks_like_text(&self, sample: &[u8]) -> bool {
        if sample.is_empty() {
            return false;
        }

        match std::str::from_utf8(sample) {
            Ok(_) => return true,
            // 只是样本截断了末尾的多字节字符
            Err(e) if e.error_len().is_none() => return true,
            Err(_) => {}
        }

        if let Some((name, _)) = BINARY_SIGNATURES
            .iter()
            .find(|(_, magic)| sample.starts_with(magic))
        {
            debug!("样本命中{}魔数", name);
            return false;
        }

        let non_printable = sample
            .iter()
            .filter(|&&b| !(32..=126).contains(&b) && b != b'\t' && b != b'\n' && b != b'\r')
            .count();
        (non_printable as f64) / (sample.len() as f64) < self.sniff.text_threshold
    }
}
