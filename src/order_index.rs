/// 全局订单索引
///
/// order_id → 当前持有该订单的订单簿，仅服务于取消命令的路由。
/// 提交路径在持有簿锁时发布条目（索引锁是叶子锁，其下不再取
/// 任何锁）；取消路径先原子摘除条目、再进入对应簿，两段临界区
/// 互不嵌套，与簿锁之间不存在环路。

use crate::orderbook::InstrumentBook;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct OrderIndex {
    entries: Mutex<HashMap<u32, Arc<InstrumentBook>>>,
}

impl OrderIndex {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// 发布挂单归属，仅在持有对应簿锁时调用
    pub fn publish(&self, order_id: u32, book: Arc<InstrumentBook>) {
        self.entries.lock().insert(order_id, book);
    }

    /// 挂单被完全成交后清除条目（同样在簿锁内调用）
    pub fn remove(&self, order_id: u32) {
        self.entries.lock().remove(&order_id);
    }

    /// 取消路由：原子地查找并摘除条目
    ///
    /// 返回 None 表示该订单从未挂过、已终结、或已被并发取消
    pub fn take(&self, order_id: u32) -> Option<Arc<InstrumentBook>> {
        self.entries.lock().remove(&order_id)
    }

    /// 当前在簿订单数
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
