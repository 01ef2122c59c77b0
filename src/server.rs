// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 传输层
//!
//! 基于 Tokio 的 TCP 监听循环：每个连接一个任务，每个连接只处理一个请求（`Connection: close`）。
//! 文件系统相关的工作都是阻塞的，放到 `spawn_blocking` 里交给分发器完成。

use std::{
    future::Future,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Instant,
};

use log::{debug, error, info, warn};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

use crate::{
    config::Config,
    dispatcher::Dispatcher,
    exception::Exception,
    param::HttpRequestMethod,
    request::Request,
    resolver::ServerRoot,
    response::Response,
};

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

pub struct Server {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    config: Arc<Config>,
    active_connection: Arc<AtomicUsize>,
}

impl Server {
    /// 绑定监听端口。端口被占用时依次尝试后面的端口，最多 `port_retries` 次。
    pub async fn bind(config: Config, root: ServerRoot) -> Result<Self, Exception> {
        let address = match config.local() {
            true => Ipv4Addr::new(127, 0, 0, 1),
            false => Ipv4Addr::new(0, 0, 0, 0),
        };
        let base_port = config.port();

        let mut listener = None;
        for attempt in 0..=config.port_retries() {
            let port = match base_port.checked_add(attempt) {
                Some(port) => port,
                None => break,
            };
            match TcpListener::bind(SocketAddrV4::new(address, port)).await {
                Ok(l) => {
                    listener = Some(l);
                    break;
                }
                Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                    warn!("端口{}已被占用，尝试下一个端口", port);
                }
                Err(e) => {
                    return Err(Exception::BindFailed(format!("{}:{}: {}", address, port, e)));
                }
            }
        }
        let listener = listener.ok_or_else(|| {
            Exception::BindFailed(format!(
                "no free port in {}..={}",
                base_port,
                base_port.saturating_add(config.port_retries())
            ))
        })?;

        let dispatcher = Dispatcher::new(root, &config);
        Ok(Self {
            listener,
            dispatcher: Arc::new(dispatcher),
            config: Arc::new(config),
            active_connection: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Exception> {
        self.listener
            .local_addr()
            .map_err(|e| Exception::BindFailed(e.to_string()))
    }

    /// 当前活跃连接数，供控制台 `status` 指令读取
    pub fn active_connection(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.active_connection)
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// 主事件循环，`shutdown` 完成后停止接受新连接。已经开始处理的连接不受影响。
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut id: u128 = 0;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("主循环接收到停机信号，正在退出...");
                    break;
                }
                accepted = self.listener.accept() => {
                    let (mut stream, addr) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            error!("接受TCP连接时遇到错误: {}", e);
                            continue;
                        }
                    };
                    debug!("[ID{}]TCP连接已建立：{}", id, addr);

                    let dispatcher = Arc::clone(&self.dispatcher);
                    let config = Arc::clone(&self.config);
                    let active_connection = Arc::clone(&self.active_connection);
                    tokio::spawn(async move {
                        active_connection.fetch_add(1, Ordering::SeqCst);
                        handle_connection(&mut stream, id, dispatcher, config).await;
                        active_connection.fetch_sub(1, Ordering::SeqCst);
                    });
                    id += 1;
                }
            }
        }
    }
}

/// 处理一个连接：读请求头、解析、分发、序列化并写回。
async fn handle_connection(
    stream: &mut TcpStream,
    id: u128,
    dispatcher: Arc<Dispatcher>,
    config: Arc<Config>,
) {
    let buffer = match read_head(stream, config.max_request_size(), id).await {
        Ok(Some(buffer)) => buffer,
        Ok(None) => return,
        Err(e) => {
            let code = match &e {
                Exception::RequestTooLarge => 431,
                _ => 400,
            };
            warn!("[ID{}]{}，返回{}", id, e, code);
            send(stream, &Response::from_status_code(code), false, id).await;
            return;
        }
    };
    debug!("[ID{}]HTTP请求接收完毕", id);

    let start_time = Instant::now();

    let request = match Request::try_from(&buffer, id) {
        Ok(request) => request,
        Err(Exception::UnSupportedRequestMethod) => {
            send(stream, &Response::from_status_code(405), false, id).await;
            return;
        }
        Err(e) => {
            warn!("[ID{}]解析HTTP请求失败: {}，返回400", id, e);
            send(stream, &Response::from_status_code(400), false, id).await;
            return;
        }
    };

    let mut response = match request.method() {
        HttpRequestMethod::Get | HttpRequestMethod::Head => {
            let path = request.path().to_string();
            match tokio::task::spawn_blocking(move || dispatcher.dispatch(&path, id)).await {
                Ok(response) => response,
                Err(e) => {
                    error!("[ID{}]分发任务异常结束: {}", id, e);
                    Response::from_status_code(500)
                }
            }
        }
        HttpRequestMethod::Options => Response::options(),
        HttpRequestMethod::Post => Response::from_status_code(405),
    };
    response.set_version(request.version());
    if config.compression() {
        response.compress_for(request.accept_encoding(), id);
    }

    debug!(
        "[ID{}]HTTP响应构建完成，服务端用时{}ms。",
        id,
        start_time.elapsed().as_millis()
    );
    info!(
        "[ID{}] {}, {}, {}, {}, {}, {}",
        id,
        request.version(),
        request.path(),
        request.method(),
        response.status_code(),
        response.information(),
        request.user_agent(),
    );

    let head_only = request.method() == HttpRequestMethod::Head;
    send(stream, &response, head_only, id).await;
}

async fn send(stream: &mut TcpStream, response: &Response, head_only: bool, id: u128) {
    let bytes = response.as_bytes(head_only);
    debug!("[ID{}]发送响应，长度: {}", id, bytes.len());
    if let Err(e) = stream.write_all(&bytes).await {
        error!("[ID{}]发送响应失败: {}", id, e);
        return;
    }
    if let Err(e) = stream.shutdown().await {
        debug!("[ID{}]关闭连接时遇到错误: {}", id, e);
    }
}

/// 读取请求头直到空行。对端未发送任何数据就关闭时返回 `None`；
/// 超过 `limit` 仍未读到空行时返回 `RequestTooLarge`。
async fn read_head<R>(reader: &mut R, limit: usize, id: u128) -> Result<Option<Vec<u8>>, Exception>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(n) => n,
            Err(e) => {
                error!("[ID{}]读取TCPStream时遇到错误: {}", id, e);
                return Ok(None);
            }
        };
        if n == 0 {
            // 对端提前关闭写方向，把已读到的部分交给解析器判断
            return Ok((!buffer.is_empty()).then_some(buffer));
        }

        let searched_from = buffer.len().saturating_sub(HEAD_TERMINATOR.len() - 1);
        buffer.extend_from_slice(&chunk[..n]);

        if let Some(position) = buffer[searched_from..]
            .windows(HEAD_TERMINATOR.len())
            .position(|w| w == HEAD_TERMINATOR)
        {
            let end = searched_from + position + HEAD_TERMINATOR.len();
            if end > limit {
                return Err(Exception::RequestTooLarge);
            }
            buffer.truncate(end);
            return Ok(Some(buffer));
        }
        if buffer.len() > limit {
            return Err(Exception::RequestTooLarge);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_head_stops_at_blank_line() {
        let mut raw: &[u8] = b"GET / HTTP/1.1\r\nHost: x\r\n\r\nbody bytes";
        let head = read_head(&mut raw, 8192, 0).await.unwrap().unwrap();
        assert_eq!(head, b"GET / HTTP/1.1\r\nHost: x\r\n\r\n");
    }

    #[tokio::test]
    async fn test_read_head_empty_connection() {
        let mut raw: &[u8] = b"";
        assert_eq!(read_head(&mut raw, 8192, 0).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_head_without_terminator() {
        let mut raw: &[u8] = b"GET / HTTP/1.0\r\n";
        let head = read_head(&mut raw, 8192, 0).await.unwrap().unwrap();
        assert_eq!(head, b"GET / HTTP/1.0\r\n");
    }

    #[tokio::test]
    async fn test_read_head_too_large() {
        let big = format!("GET / HTTP/1.1\r\nX-Pad: {}\r\n\r\n", "a".repeat(4096));
        let mut raw = big.as_bytes();
        assert_eq!(
            read_head(&mut raw, 1024, 0).await,
            Err(Exception::RequestTooLarge)
        );
    }

    #[tokio::test]
    async fn test_read_head_terminator_across_chunks() {
        // 第一块恰好 1024 字节，空行跨越两次读取
        let mut raw = format!("GET / HTTP/1.1\r\nX-Pad: {}", "a".repeat(1024 - 25)).into_bytes();
        raw.extend_from_slice(b"\r\n\r\n");
        let mut reader = &raw[..];
        let head = read_head(&mut reader, 8192, 0).await.unwrap().unwrap();
        assert!(head.ends_with(b"\r\n\r\n"));
        assert_eq!(head.len(), raw.len());
    }
}
