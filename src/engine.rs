use crate::emitter::EventEmitter;
use crate::metrics::METRICS;
use crate::order_index::OrderIndex;
use crate::protocol::{ClientCommand, EngineEvent, Side};
use crate::registry::InstrumentRegistry;
use crate::sequencer::Sequencer;
use std::time::Instant;

/// 撮合引擎门面
///
/// 把注册表、全局订单索引、序列号发生器与事件输出端装配为一个
/// 引擎值，所有连接处理任务共享同一个 Engine，内部各自加锁，
/// 因此方法都只需要 &self。
///
/// 锁次序约定：
/// - 提交路径：注册表锁 → 簿锁 →（簿锁内短暂取）全局索引锁
/// - 取消路径：全局索引锁 → 簿锁，两段临界区不重叠
///
/// 索引锁始终是叶子锁，其下不再取任何锁，两条路径不会构成环路。
pub struct Engine {
    registry: InstrumentRegistry,
    index: OrderIndex,
    sequencer: Sequencer,
    emitter: EventEmitter,
}

impl Engine {
    pub fn new(emitter: EventEmitter) -> Self {
        Self {
            registry: InstrumentRegistry::new(),
            index: OrderIndex::new(),
            sequencer: Sequencer::new(),
            emitter,
        }
    }

    /// 执行一条已解析且已校验的客户端命令
    pub fn execute(&self, command: ClientCommand) {
        match command {
            ClientCommand::Submit {
                side,
                order_id,
                instrument,
                price,
                count,
            } => self.submit(side, order_id, &instrument, price, count),
            ClientCommand::Cancel { order_id } => self.cancel(order_id),
        }
    }

    /// 提交买/卖单：解析标的 → 簿内撮合 → 事件输出
    pub fn submit(&self, side: Side, order_id: u32, instrument: &str, price: u32, count: u32) {
        METRICS.record_submit(side, instrument);

        let book = self.registry.get_or_create(instrument);
        let started = Instant::now();
        let events = book.submit(side, order_id, price, count, &self.sequencer, &self.index);
        METRICS.observe_match_latency(instrument, started.elapsed().as_secs_f64());

        let fills = events
            .iter()
            .filter(|e| matches!(e, EngineEvent::OrderExecuted { .. }))
            .count() as u64;
        METRICS.record_fills(instrument, fills);

        self.emitter.emit_all(events);
    }

    /// 取消订单
    ///
    /// 先原子摘除全局索引条目，再进入对应簿完成删除；索引未命中
    ///（从未挂过、已终结或已被并发取消）按 accepted=false 回报，
    /// 这是正常结果而非错误。
    pub fn cancel(&self, order_id: u32) {
        let event = match self.index.take(order_id) {
            Some(book) => book.cancel(order_id, &self.sequencer),
            None => EngineEvent::OrderDeleted {
                order_id,
                accepted: false,
                seq: self.sequencer.next(),
            },
        };

        if let EngineEvent::OrderDeleted { accepted, .. } = &event {
            METRICS.record_cancel(*accepted);
        }

        self.emitter.emit(event);
    }

    /// 标的注册表（供观测与测试检查簿状态）
    pub fn registry(&self) -> &InstrumentRegistry {
        &self.registry
    }

    /// 全局序列号发生器
    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parse_command;

    fn new_engine() -> (Engine, crossbeam::channel::Receiver<EngineEvent>) {
        let (emitter, rx) = EventEmitter::capture();
        (Engine::new(emitter), rx)
    }

    fn run(engine: &Engine, line: &str) {
        engine.execute(parse_command(line).unwrap());
    }

    #[test]
    fn test_submit_then_cancel_round_trip() {
        let (engine, rx) = new_engine();

        run(&engine, "B 1 AAPL 100 10");
        run(&engine, "C 1");

        let events: Vec<EngineEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], EngineEvent::OrderAdded { order_id: 1, seq: 1, .. }));
        assert!(matches!(
            events[1],
            EngineEvent::OrderDeleted {
                order_id: 1,
                accepted: true,
                seq: 2,
            }
        ));
        assert!(!engine.registry().get("AAPL").unwrap().contains(1));
    }

    #[test]
    fn test_cancel_unknown_id_emits_rejection() {
        let (engine, rx) = new_engine();

        run(&engine, "C 99");
        run(&engine, "C 99");

        // 未知订单的取消是幂等的负回报，每次消耗一个新序列号
        let events: Vec<EngineEvent> = rx.try_iter().collect();
        assert!(matches!(
            events[0],
            EngineEvent::OrderDeleted { order_id: 99, accepted: false, seq: 1 }
        ));
        assert!(matches!(
            events[1],
            EngineEvent::OrderDeleted { order_id: 99, accepted: false, seq: 2 }
        ));
    }

    #[test]
    fn test_cancel_after_full_match_is_rejected() {
        let (engine, rx) = new_engine();

        run(&engine, "B 1 AAPL 100 10");
        run(&engine, "S 2 AAPL 100 10");
        run(&engine, "C 1");

        let events: Vec<EngineEvent> = rx.try_iter().collect();
        assert!(matches!(events[0], EngineEvent::OrderAdded { order_id: 1, .. }));
        assert!(matches!(
            events[1],
            EngineEvent::OrderExecuted { resting_order_id: 1, taker_order_id: 2, .. }
        ));
        // 订单 1 已被完全成交，取消按拒绝回报
        assert!(matches!(
            events[2],
            EngineEvent::OrderDeleted { order_id: 1, accepted: false, .. }
        ));
    }

    #[test]
    fn test_instruments_are_independent() {
        let (engine, rx) = new_engine();

        run(&engine, "B 1 AAPL 100 10");
        run(&engine, "S 2 MSFT 100 10");

        // 不同标的互不交叉，两笔都挂入各自的簿
        let events: Vec<EngineEvent> = rx.try_iter().collect();
        assert!(events
            .iter()
            .all(|e| matches!(e, EngineEvent::OrderAdded { .. })));
        assert_eq!(engine.registry().get("AAPL").unwrap().best_bid(), Some(100));
        assert_eq!(engine.registry().get("MSFT").unwrap().best_ask(), Some(100));
    }
}
