/// 事件输出端
///
/// 所有事件经由无锁通道汇入唯一的写线程，由单一消费者落盘，
/// 记录之间天然不会发生字节交错。输出端不保证记录按 seq 有序，
/// 消费方需要全序时按 seq 排序即可。
///
/// 可选的广播口供网络层订阅，把事件行回显给已连接的客户端；
/// 没有订阅者时发送失败属正常现象。

use crate::protocol::EngineEvent;
use crossbeam::channel::{unbounded, Receiver, Sender};
use std::io::Write;
use std::thread;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct EventEmitter {
    tx: Sender<EngineEvent>,
    tap: Option<broadcast::Sender<EngineEvent>>,
}

/// 写线程句柄，所有发射端释放后 join 以保证输出全部落盘
pub struct WriterHandle {
    handle: thread::JoinHandle<()>,
}

impl WriterHandle {
    pub fn join(self) {
        let _ = self.handle.join();
    }
}

impl EventEmitter {
    /// 将事件写入给定输出的发射器，以及配套的写线程句柄
    pub fn to_writer(writer: Box<dyn Write + Send>) -> (Self, WriterHandle) {
        let (tx, rx) = unbounded::<EngineEvent>();
        let handle = thread::Builder::new()
            .name("event-writer".to_string())
            .spawn(move || writer_loop(rx, writer))
            .expect("failed to spawn event writer thread");
        (Self { tx, tap: None }, WriterHandle { handle })
    }

    /// 标准输出发射器
    pub fn stdout() -> (Self, WriterHandle) {
        Self::to_writer(Box::new(std::io::stdout()))
    }

    /// 测试用：事件进通道不落盘，由测试侧自行消费
    pub fn capture() -> (Self, Receiver<EngineEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx, tap: None }, rx)
    }

    /// 挂接网络层的广播口
    pub fn with_tap(mut self, tap: broadcast::Sender<EngineEvent>) -> Self {
        self.tap = Some(tap);
        self
    }

    /// 输出单个事件
    pub fn emit(&self, event: EngineEvent) {
        if let Some(tap) = &self.tap {
            // 无客户端连接时发送会失败，这是正常现象
            let _ = tap.send(event.clone());
        }
        if self.tx.send(event).is_err() {
            tracing::warn!("事件写线程已退出，输出被丢弃");
        }
    }

    /// 按产生顺序输出一批事件
    pub fn emit_all(&self, events: impl IntoIterator<Item = EngineEvent>) {
        for event in events {
            self.emit(event);
        }
    }
}

fn writer_loop(rx: Receiver<EngineEvent>, mut writer: Box<dyn Write + Send>) {
    while let Ok(event) = rx.recv() {
        if writeln!(writer, "{}", event).is_err() {
            tracing::error!("事件输出写入失败，写线程退出");
            return;
        }
    }
    let _ = writer.flush();
}
