use futures::{SinkExt, StreamExt};
use rand::Rng;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec};

// --- 配置 ---
const NUM_CLIENTS: u32 = 8; // 模拟的并发客户端数量
const TEST_DURATION: Duration = Duration::from_secs(10); // 测试持续时间
const SERVER_ADDR: &str = "127.0.0.1:8080";
const INSTRUMENTS: &[&str] = &["AAPL", "MSFT", "GOOG", "TSLA"];
const CANCEL_RATIO: u32 = 10; // 约每10条命令发一条取消

#[tokio::main]
async fn main() {
    println!("启动吞吐量测试...");
    println!("模拟客户端数量: {}", NUM_CLIENTS);
    println!("测试持续时间: {:?}", TEST_DURATION);

    let event_counter = Arc::new(AtomicU64::new(0));
    let execution_counter = Arc::new(AtomicU64::new(0));

    let mut handles = Vec::new();
    for client_id in 0..NUM_CLIENTS {
        let event_counter = event_counter.clone();
        let execution_counter = execution_counter.clone();
        let handle = tokio::spawn(async move {
            run_client(client_id, event_counter, execution_counter).await;
        });
        handles.push(handle);
    }

    // 等待测试结束
    tokio::time::sleep(TEST_DURATION).await;

    let total_events = event_counter.load(Ordering::Relaxed);
    let total_executions = execution_counter.load(Ordering::Relaxed);
    let event_rate = total_events as f64 / TEST_DURATION.as_secs_f64();

    println!("\n--- 测试结果 ---");
    println!("收到事件总数: {}", total_events);
    println!("其中成交回报: {}", total_executions);
    println!("事件速率 (events/s): {:.2}", event_rate);

    // 直接退出进程即可中止所有客户端任务
    std::process::exit(0);
}

async fn run_client(
    client_id: u32,
    event_counter: Arc<AtomicU64>,
    execution_counter: Arc<AtomicU64>,
) {
    let addr: SocketAddr = SERVER_ADDR.parse().unwrap();
    let stream = match TcpStream::connect(addr).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[客户端 {}] 连接失败: {}", client_id, e);
            return;
        }
    };

    let framed = Framed::new(stream, LinesCodec::new());
    let (mut writer, mut reader) = framed.split();

    // 监听服务器回显事件的任务
    tokio::spawn(async move {
        while let Some(Ok(line)) = reader.next().await {
            event_counter.fetch_add(1, Ordering::Relaxed);
            if line.starts_with("E ") {
                execution_counter.fetch_add(1, Ordering::Relaxed);
            }
        }
    });

    // 发送命令的任务；订单ID按客户端分段保证全局唯一
    let mut sequence: u32 = 0;
    loop {
        sequence += 1;
        let order_id = (client_id << 24) | sequence;

        let line = {
            let mut rng = rand::thread_rng();
            if sequence > 1 && rng.gen_ratio(1, CANCEL_RATIO) {
                // 随机取消一个之前发过的订单（可能早已成交，拒绝也是正常回报）
                let victim = (client_id << 24) | rng.gen_range(1..sequence);
                format!("C {}", victim)
            } else {
                let instrument = INSTRUMENTS[rng.gen_range(0..INSTRUMENTS.len())];
                let is_buy = rng.gen::<bool>();
                let price = if is_buy {
                    rng.gen_range(49_990..=50_000)
                } else {
                    rng.gen_range(50_000..=50_010)
                };
                let count = rng.gen_range(1..=5);
                format!(
                    "{} {} {} {} {}",
                    if is_buy { "B" } else { "S" },
                    order_id,
                    instrument,
                    price,
                    count
                )
            }
        };

        if writer.send(line).await.is_err() {
            break; // 连接断开
        }
    }
}
