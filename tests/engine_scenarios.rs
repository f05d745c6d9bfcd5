use clob_engine::emitter::EventEmitter;
use clob_engine::engine::Engine;
use clob_engine::protocol::{parse_command, EngineEvent, Side};
use crossbeam::channel::Receiver;
use std::sync::Arc;
use std::thread;

fn new_engine() -> (Engine, Receiver<EngineEvent>) {
    let (emitter, rx) = EventEmitter::capture();
    (Engine::new(emitter), rx)
}

fn run(engine: &Engine, line: &str) {
    engine.execute(parse_command(line).unwrap());
}

fn drain(rx: &Receiver<EngineEvent>) -> Vec<EngineEvent> {
    rx.try_iter().collect()
}

/// 连续场景：挂单 → 部分成交 → 反向扫单挂余量 → 两笔取消
#[test]
fn test_partial_fill_and_cancel_sequence() {
    let (engine, rx) = new_engine();

    // 1. B 1 X 100 10 → A，簿内买单 {1@100×10}
    run(&engine, "B 1 X 100 10");
    let events = drain(&rx);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].to_string(), "A 1 X 100 10 B 1");

    // 2. S 2 X 100 4 → 与订单1成交4手
    run(&engine, "S 2 X 100 4");
    let events = drain(&rx);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].to_string(), "E 1 2 1 100 4 2");

    // 3. S 3 X 100 10 → 吃掉剩余6手，余4手挂卖侧
    run(&engine, "S 3 X 100 10");
    let events = drain(&rx);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].to_string(), "E 1 3 2 100 6 3");
    assert_eq!(events[1].to_string(), "A 3 X 100 4 S 4");

    // 4. C 1 → 订单1已完全成交，拒绝
    run(&engine, "C 1");
    let events = drain(&rx);
    assert_eq!(events[0].to_string(), "D 1 false 5");

    // 5. C 3 → 接受，簿清空
    run(&engine, "C 3");
    let events = drain(&rx);
    assert_eq!(events[0].to_string(), "D 3 true 6");

    let book = engine.registry().get("X").unwrap();
    assert!(book.best_bid().is_none());
    assert!(book.best_ask().is_none());
}

/// 完全成交的订单只产生 E，不产生 A
#[test]
fn test_full_match_emits_no_add() {
    let (engine, rx) = new_engine();

    run(&engine, "S 1 X 100 5");
    run(&engine, "S 2 X 101 5");
    drain(&rx);

    run(&engine, "B 3 X 101 10");
    let events = drain(&rx);
    assert_eq!(events.len(), 2);
    assert!(events
        .iter()
        .all(|e| matches!(e, EngineEvent::OrderExecuted { .. })));
}

/// 整条命令流产生的序列号严格递增且无空洞
#[test]
fn test_sequence_numbers_are_dense() {
    let (engine, rx) = new_engine();

    for line in [
        "B 1 X 100 10",
        "S 2 X 100 4",
        "S 3 X 100 10",
        "C 1",
        "C 3",
        "C 99",
        "B 4 Y 50 1",
    ] {
        run(&engine, line);
    }

    let seqs: Vec<u64> = drain(&rx).iter().map(|e| e.seq()).collect();
    let expected: Vec<u64> = (1..=seqs.len() as u64).collect();
    assert_eq!(seqs, expected);
}

/// 场景6：不同标的在不同线程上并行提交，簿状态相互独立
#[test]
fn test_parallel_instruments_are_independent() {
    let (engine, rx) = new_engine();
    let engine = Arc::new(engine);

    let handles: Vec<_> = [("Y", 10u32), ("Z", 11u32)]
        .into_iter()
        .map(|(instrument, order_id)| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                engine.submit(Side::Buy, order_id, instrument, 50, 1);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut events = drain(&rx);
    events.sort_by_key(|e| e.seq());
    assert_eq!(events.len(), 2);
    assert!(events
        .iter()
        .all(|e| matches!(e, EngineEvent::OrderAdded { .. })));
    // 序列号各不相同且稠密
    assert_eq!(events[0].seq(), 1);
    assert_eq!(events[1].seq(), 2);

    let y = engine.registry().get("Y").unwrap();
    let z = engine.registry().get("Z").unwrap();
    assert_eq!(y.best_bid(), Some(50));
    assert_eq!(z.best_bid(), Some(50));
    assert!(y.contains(10) && !y.contains(11));
    assert!(z.contains(11) && !z.contains(10));
}

/// 取消未知订单是幂等的负回报
#[test]
fn test_unknown_cancel_is_idempotent() {
    let (engine, rx) = new_engine();

    run(&engine, "C 7");
    run(&engine, "C 7");
    run(&engine, "C 7");

    let events = drain(&rx);
    assert_eq!(events.len(), 3);
    for (i, event) in events.iter().enumerate() {
        assert!(matches!(
            event,
            EngineEvent::OrderDeleted { order_id: 7, accepted: false, .. }
        ));
        assert_eq!(event.seq(), i as u64 + 1);
    }
}
