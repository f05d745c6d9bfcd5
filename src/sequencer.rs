/// 全局序列号发生器
///
/// 所有对外事件的唯一全序来源。序列号严格递增且无空洞：
/// 每次 next() 调用恰好对应一个输出事件，客户端只能通过
/// 序列号观察到跨标的的先后关系。

use std::sync::atomic::{AtomicU64, Ordering};

/// 单调递增的 64 位计数器，任意线程可并发调用
#[derive(Debug, Default)]
pub struct Sequencer {
    counter: AtomicU64,
}

impl Sequencer {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }

    /// 取下一个序列号，首个返回值为 1
    #[inline]
    pub fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// 已分配出去的最大序列号
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_strictly_increasing() {
        let sequencer = Sequencer::new();
        assert_eq!(sequencer.next(), 1);
        assert_eq!(sequencer.next(), 2);
        assert_eq!(sequencer.next(), 3);
        assert_eq!(sequencer.current(), 3);
    }

    #[test]
    fn test_concurrent_callers_produce_dense_values() {
        let sequencer = Arc::new(Sequencer::new());
        let mut handles = vec![];

        // 8个线程各取1000个序列号
        for _ in 0..8 {
            let sequencer = sequencer.clone();
            handles.push(thread::spawn(move || {
                (0..1000).map(|_| sequencer.next()).collect::<Vec<_>>()
            }));
        }

        let mut seen: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        seen.sort_unstable();

        // 无重复、无空洞
        assert_eq!(seen.len(), 8000);
        for (i, seq) in seen.iter().enumerate() {
            assert_eq!(*seq, i as u64 + 1);
        }
    }
}
