use crate::order_index::OrderIndex;
use crate::protocol::{EngineEvent, Side};
use crate::sequencer::Sequencer;
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

/// 单次操作产生的事件集合，绝大多数订单的成交笔数不超过 8
pub type EventBatch = SmallVec<[EngineEvent; 8]>;

/// 簿内挂单
#[derive(Debug, Clone)]
pub struct RestingOrder {
    pub order_id: u32,
    pub price: u32,
    /// 剩余数量，挂单期间恒大于 0
    pub count: u32,
    /// 针对该挂单的下一个成交编号，从 1 开始
    pub execution_id: u32,
    /// 入簿时刻的序列号，等于其 A 事件的 seq；部分成交不会改变它
    pub arrival_seq: u64,
}

/// 一个价格层级的订单队列，队首先撮合
type PriceLevel = VecDeque<RestingOrder>;

/// 簿内状态，整体由外层互斥锁保护
#[derive(Debug, Default)]
struct BookInner {
    /// 买单侧，撮合时从最高价开始
    bids: BTreeMap<u32, PriceLevel>,
    /// 卖单侧，撮合时从最低价开始
    asks: BTreeMap<u32, PriceLevel>,
    /// order_id → (价格, 方向)，取消时定位挂单
    ids: HashMap<u32, (u32, Side)>,
}

/// 聚合深度快照，(价格, 数量合计)
#[derive(Debug, Clone, Default)]
pub struct BookDepth {
    /// 买侧，从高到低
    pub bids: Vec<(u32, u32)>,
    /// 卖侧，从低到高
    pub asks: Vec<(u32, u32)>,
}

/// 单个交易标的的订单簿
///
/// 同一标的上的所有操作由内部互斥锁串行化，不同标的并行撮合。
/// 价格优先级来自 BTreeMap 的键序，同价位的时间优先级来自
/// 队列顺序；arrival_seq 由同一个全局序列号发生器产生，
/// 不可能相同，因此优先级全序无歧义。
pub struct InstrumentBook {
    name: Arc<str>,
    inner: Mutex<BookInner>,
}

impl InstrumentBook {
    pub fn new(name: Arc<str>) -> Self {
        Self {
            name,
            inner: Mutex::new(BookInner::default()),
        }
    }

    /// 提交一笔买/卖单并撮合
    ///
    /// 依次吃掉对手侧价格最优、同价位最早的挂单，直到价格不再
    /// 交叉或数量耗尽；剩余数量挂入本方。每个产生的事件消耗一个
    /// 全局序列号，剩余挂单的 A 事件与其 arrival_seq 共用同一个。
    pub fn submit(
        self: &Arc<Self>,
        side: Side,
        order_id: u32,
        price: u32,
        count: u32,
        sequencer: &Sequencer,
        index: &OrderIndex,
    ) -> EventBatch {
        let mut events = EventBatch::new();

        // 数量为 0 的订单在上游即为非法，核心直接忽略
        if count == 0 {
            return events;
        }
        debug_assert!(price > 0, "price 0 is reserved");

        let mut inner = self.inner.lock();
        let BookInner { bids, asks, ids } = &mut *inner;
        debug_assert!(
            !ids.contains_key(&order_id),
            "duplicate order id {} in book {}",
            order_id,
            self.name
        );

        let (own, opposite) = match side {
            Side::Buy => (bids, asks),
            Side::Sell => (asks, bids),
        };

        let mut residual = count;
        while residual > 0 {
            // 对手侧最优价：买单吃最低卖价，卖单吃最高买价
            let best_price = match side {
                Side::Buy => opposite.keys().next().copied(),
                Side::Sell => opposite.keys().next_back().copied(),
            };
            let Some(best_price) = best_price else { break };
            let crossed = match side {
                Side::Buy => best_price <= price,
                Side::Sell => best_price >= price,
            };
            if !crossed {
                break;
            }

            let Some(level) = opposite.get_mut(&best_price) else {
                break;
            };
            while residual > 0 {
                let Some(maker) = level.front_mut() else { break };

                let fill = residual.min(maker.count);
                residual -= fill;
                maker.count -= fill;

                // 成交价取挂单方价格
                events.push(EngineEvent::OrderExecuted {
                    resting_order_id: maker.order_id,
                    taker_order_id: order_id,
                    execution_id: maker.execution_id,
                    price: maker.price,
                    count: fill,
                    seq: sequencer.next(),
                });
                maker.execution_id += 1;

                if maker.count > 0 {
                    // 对手单只部分成交，保留且时间优先级不变
                    break;
                }
                if let Some(done) = level.pop_front() {
                    ids.remove(&done.order_id);
                    index.remove(done.order_id);
                }
            }
            if level.is_empty() {
                opposite.remove(&best_price);
            }
        }

        if residual > 0 {
            // 入簿：A 事件的 seq 同时作为该挂单的 arrival_seq
            let arrival_seq = sequencer.next();
            own.entry(price).or_default().push_back(RestingOrder {
                order_id,
                price,
                count: residual,
                execution_id: 1,
                arrival_seq,
            });
            ids.insert(order_id, (price, side));
            // 先提交本地状态，再发布到全局索引（索引锁是叶子锁）
            index.publish(order_id, Arc::clone(self));
            events.push(EngineEvent::OrderAdded {
                order_id,
                instrument: Arc::clone(&self.name),
                price,
                count: residual,
                side,
                seq: arrival_seq,
            });
        }

        events
    }

    /// 取消挂单
    ///
    /// 调度器已先行摘除全局索引条目。本地索引中不存在该订单时
    ///（路由期间恰好被完全成交）按 accepted=false 回报。
    pub fn cancel(&self, order_id: u32, sequencer: &Sequencer) -> EngineEvent {
        let mut inner = self.inner.lock();

        let Some((price, side)) = inner.ids.remove(&order_id) else {
            return EngineEvent::OrderDeleted {
                order_id,
                accepted: false,
                seq: sequencer.next(),
            };
        };

        let book_side = match side {
            Side::Buy => &mut inner.bids,
            Side::Sell => &mut inner.asks,
        };
        let mut removed = false;
        if let Some(level) = book_side.get_mut(&price) {
            if let Some(pos) = level.iter().position(|o| o.order_id == order_id) {
                level.remove(pos);
                removed = true;
            }
            if level.is_empty() {
                book_side.remove(&price);
            }
        }
        // 本地索引与价位队列必须一致
        debug_assert!(removed, "order {} indexed but not resting", order_id);

        EngineEvent::OrderDeleted {
            order_id,
            accepted: true,
            seq: sequencer.next(),
        }
    }

    /// 订单是否仍在簿内
    pub fn contains(&self, order_id: u32) -> bool {
        self.inner.lock().ids.contains_key(&order_id)
    }

    /// 最优买价
    pub fn best_bid(&self) -> Option<u32> {
        self.inner.lock().bids.keys().next_back().copied()
    }

    /// 最优卖价
    pub fn best_ask(&self) -> Option<u32> {
        self.inner.lock().asks.keys().next().copied()
    }

    /// 前若干档聚合深度
    pub fn depth(&self, levels: usize) -> BookDepth {
        let inner = self.inner.lock();
        BookDepth {
            bids: inner
                .bids
                .iter()
                .rev()
                .take(levels)
                .map(|(price, level)| (*price, level.iter().map(|o| o.count).sum()))
                .collect(),
            asks: inner
                .asks
                .iter()
                .take(levels)
                .map(|(price, level)| (*price, level.iter().map(|o| o.count).sum()))
                .collect(),
        }
    }
}
