/// 标的注册表
///
/// 名称 → 订单簿，名称按字节精确匹配。簿在首次出现时惰性创建，
/// 创建后永不销毁，因此对外分发的 Arc 引用在进程生命周期内始终
/// 有效，全局订单索引可以安全地长期持有。
///
/// 读路径只取读锁；创建路径取写锁并 double-check，
/// 与符号 intern 池的实现方式一致。

use crate::orderbook::InstrumentBook;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct InstrumentRegistry {
    books: RwLock<HashMap<Arc<str>, Arc<InstrumentBook>>>,
}

impl InstrumentRegistry {
    pub fn new() -> Self {
        Self {
            books: RwLock::new(HashMap::new()),
        }
    }

    /// 查找或创建标的的订单簿
    #[inline]
    pub fn get_or_create(&self, name: &str) -> Arc<InstrumentBook> {
        // 快速路径：读锁查找
        {
            let books = self.books.read();
            if let Some(book) = books.get(name) {
                return Arc::clone(book);
            }
        }

        // 慢速路径：写锁 + double-check，获取写锁期间可能已被其他线程创建
        let mut books = self.books.write();
        if let Some(book) = books.get(name) {
            return Arc::clone(book);
        }
        let key: Arc<str> = Arc::from(name);
        let book = Arc::new(InstrumentBook::new(Arc::clone(&key)));
        books.insert(key, Arc::clone(&book));
        book
    }

    /// 查找已存在的订单簿
    pub fn get(&self, name: &str) -> Option<Arc<InstrumentBook>> {
        self.books.read().get(name).map(Arc::clone)
    }

    /// 已注册的标的数量
    pub fn len(&self) -> usize {
        self.books.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.read().is_empty()
    }
}
