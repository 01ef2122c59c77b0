// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 热重载脚本注入
//!
//! 在 HTML 页面里插入一段轮询脚本：每隔一段时间询问探测端点是否有文件变化，有则刷新页面。
//! 探测端点请求失败时退回到对当前页面发 `HEAD` 请求，比较 `Last-Modified`。

use bytes::Bytes;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::{
    exception::Exception,
    param::{RELOAD_CHECK_PATH, RELOAD_FIRST_POLL_DELAY_MS, RELOAD_POLL_INTERVAL_MS},
};

const SCRIPT_TEMPLATE: &str = r"<script>
(function () {
    var lastCheck = Date.now();

    function checkCurrentPage() {
        return fetch(window.location.href, { method: 'HEAD', cache: 'no-cache' })
            .then(function (response) {
                var modified = Date.parse(response.headers.get('Last-Modified'));
                if (!isNaN(modified) && modified > lastCheck) {
                    window.location.reload();
                    return;
                }
                lastCheck = Date.now();
            })
            .catch(function (err) {
                console.error('relay live reload check failed:', err);
            });
    }

    function checkForChanges() {
        return fetch('{endpoint}?t=' + lastCheck, { cache: 'no-cache' })
            .then(function (response) {
                if (!response.ok) { return; }
                return response.json().then(function (data) {
                    if (data.hasChanges) {
                        window.location.reload();
                    }
                    lastCheck = data.timestamp;
                });
            })
            .catch(checkCurrentPage);
    }

    setTimeout(checkForChanges, {delay});
    setInterval(checkForChanges, {interval});
})();
</script>";

lazy_static! {
    /// 注入到页面中的轮询脚本
    pub static ref RELOAD_SCRIPT: String = SCRIPT_TEMPLATE
        .replace("{endpoint}", RELOAD_CHECK_PATH)
        .replace("{delay}", &RELOAD_FIRST_POLL_DELAY_MS.to_string())
        .replace("{interval}", &RELOAD_POLL_INTERVAL_MS.to_string());
    static ref BODY_CLOSE: Regex = Regex::new(r"(?i)</body>").expect("constant regex");
    static ref HTML_CLOSE: Regex = Regex::new(r"(?i)</html>").expect("constant regex");
}

/// 注入热重载脚本。内容不是合法 UTF-8 时原样返回。
pub fn inject(body: Bytes) -> Bytes {
    match try_inject(&body) {
        Ok(injected) => Bytes::from(injected),
        Err(e) => {
            debug!("跳过热重载脚本注入：{}", e);
            body
        }
    }
}

/// 脚本插在第一个 `</body>` 之前（忽略大小写）；没有则插在 `</html>` 之前；都没有就追加到末尾。
pub fn try_inject(body: &[u8]) -> Result<Vec<u8>, Exception> {
    let html = std::str::from_utf8(body).map_err(|_| Exception::EncodingFailure)?;

    let position = BODY_CLOSE
        .find(html)
        .or_else(|| HTML_CLOSE.find(html))
        .map_or(html.len(), |m| m.start());

    let mut injected = Vec::with_capacity(body.len() + RELOAD_SCRIPT.len());
    injected.extend_from_slice(&body[..position]);
    injected.extend_from_slice(RELOAD_SCRIPT.as_bytes());
    injected.extend_from_slice(&body[position..]);
    Ok(injected)
}
