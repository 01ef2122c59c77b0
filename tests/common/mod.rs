// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 集成测试共用的辅助函数：在临时目录上启动服务器，以原始字节收发 HTTP 报文。

#![allow(dead_code)]

use std::{fs, net::SocketAddr, path::Path, time::Duration};

use relay::{config::Config, resolver::ServerRoot, server::Server};
use tempfile::TempDir;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::oneshot,
};

/// 运行在临时端口上的服务器，离开作用域时停止
pub struct TestServer {
    pub addr: SocketAddr,
    _guard: TempDir,
    stop: Option<oneshot::Sender<()>>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

pub async fn start(root: TempDir, config: Config) -> TestServer {
    let path = root.path().to_path_buf();
    start_at(root, &path, config).await
}

/// 以 `guard` 内的某个子目录为根启动
pub async fn start_at(guard: TempDir, root: &Path, config: Config) -> TestServer {
    let config = config.with_port(0).with_www_root(&root.to_string_lossy());
    let server = Server::bind(config, ServerRoot::new(root).unwrap())
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    tokio::spawn(server.run(async move {
        let _ = stopped.await;
    }));
    TestServer {
        addr,
        _guard: guard,
        stop: Some(stop),
    }
}

/// 典型的站点目录：首页、纯文本、子目录
pub fn site() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "index.html",
        "<!DOCTYPE html><html><body><h1>home</h1></body></html>",
    );
    write(dir.path(), "notes.txt", "plain notes");
    fs::create_dir(dir.path().join("docs")).unwrap();
    write(&dir.path().join("docs"), "a.txt", "a");
    write(&dir.path().join("docs"), "B.txt", "b");
    dir
}

pub fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

/// 发送原始请求并读到连接关闭为止
pub async fn send_raw(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();

    let mut buffer = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut buffer))
        .await
        .expect("server did not close the connection")
        .unwrap();
    buffer
}

pub struct RawResponse {
    pub status_line: String,
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub fn parse_response(raw: &[u8]) -> RawResponse {
    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has no header terminator");
    let head = String::from_utf8_lossy(&raw[..split]).into_owned();
    let body = raw[split + 4..].to_vec();

    let mut lines = head.split("\r\n");
    let status_line = lines.next().unwrap_or_default().to_string();
    let status_code = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap_or(0);
    let headers = lines
        .filter_map(|line| line.split_once(": "))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    RawResponse {
        status_line,
        status_code,
        headers,
        body,
    }
}

pub async fn get(addr: SocketAddr, path: &str) -> RawResponse {
    let request = format!("GET {} HTTP/1.1\r\nHost: localhost\r\nUser-Agent: relay-test\r\n\r\n", path);
    parse_response(&send_raw(addr, request.as_bytes()).await)
}
