use crate::engine::Engine;
use crate::metrics::METRICS;
use crate::protocol::{parse_command, EngineEvent};
use crate::validation::Limits;
use futures::stream::StreamExt;
use futures::SinkExt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_util::codec::{Framed, LinesCodec};

/// 行协议允许的最大行长（标的名不超过 8 字节，正常命令远小于此）
const MAX_LINE_LEN: usize = 256;

/// 启动网络服务器
///
/// 每个客户端连接一个任务。命令在连接任务内解析、校验后直接
/// 调用共享引擎——簿锁持有期间没有任何 await 点，阻塞仅发生在
/// 锁竞争上。引擎事件经广播通道回显给所有连接的客户端。
pub async fn run_server(
    addr: SocketAddr,
    engine: Arc<Engine>,
    events: broadcast::Sender<EngineEvent>,
) {
    let listener = TcpListener::bind(&addr).await.expect("无法绑定监听地址");
    tracing::info!("服务器正在监听: {}", addr);

    while let Ok((stream, peer)) = listener.accept().await {
        tracing::info!("接受新连接: {}", peer);
        let engine = Arc::clone(&engine);
        let events_rx = events.subscribe();

        tokio::spawn(async move {
            handle_connection(stream, engine, events_rx).await;
            tracing::info!("连接 {} 已关闭", peer);
        });
    }
}

/// 处理单个客户端连接，EOF 或 I/O 错误时结束
async fn handle_connection(
    stream: TcpStream,
    engine: Arc<Engine>,
    mut events: broadcast::Receiver<EngineEvent>,
) {
    let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LEN));
    let limits = Limits::default();

    METRICS.connection_opened();

    loop {
        tokio::select! {
            // 从客户端接收命令行
            result = framed.next() => {
                match result {
                    Some(Ok(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        match parse_command(&line) {
                            Ok(command) => match limits.admit(&command) {
                                Ok(()) => engine.execute(command),
                                Err(reject) => {
                                    METRICS.record_reject("limits");
                                    tracing::warn!("拒绝非法命令 '{}': {}", line, reject);
                                }
                            },
                            Err(e) => {
                                METRICS.record_reject("parse");
                                tracing::warn!("无法解析的请求 '{}': {}", line, e);
                            }
                        }
                    }
                    Some(Err(e)) => {
                        tracing::warn!("处理连接时出错: {}", e);
                        break;
                    }
                    None => break, // 连接已关闭
                }
            }
            // 从广播通道接收引擎事件并发送给客户端
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        if framed.send(event.to_string()).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("客户端消费过慢，跳过 {} 条事件", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    METRICS.connection_closed();
}
