//! 引擎运行指标
//!
//! 基于 Prometheus 的计数与延迟观测，经可观测性服务器的
//! /metrics 端点导出。调用方通过语义化的记录方法更新指标，
//! 标签集合收敛在本模块内部，不对外暴露。

use crate::protocol::Side;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    /// 进程级指标集
    pub static ref METRICS: EngineMetrics = EngineMetrics::register();
}

/// 撮合引擎指标集
pub struct EngineMetrics {
    /// 进入核心的提交命令，按方向与标的
    submits: IntCounterVec,
    /// 撮合产生的成交笔数，按标的
    fills: IntCounterVec,
    /// 取消命令，按结果
    cancels: IntCounterVec,
    /// 单次簿内撮合耗时
    match_latency: HistogramVec,
    /// 当前连接的客户端数
    connections: IntGauge,
    /// 进入核心前被拒绝的命令，按拦截阶段
    rejected: IntCounterVec,
}

impl EngineMetrics {
    fn register() -> Self {
        Self {
            submits: register_int_counter_vec!(
                "clob_submits_total",
                "Buy/sell commands accepted into the matching core",
                &["side", "instrument"]
            )
            .unwrap(),

            fills: register_int_counter_vec!(
                "clob_fills_total",
                "Executions produced by matching",
                &["instrument"]
            )
            .unwrap(),

            cancels: register_int_counter_vec!(
                "clob_cancels_total",
                "Cancel commands by outcome",
                &["outcome"]
            )
            .unwrap(),

            match_latency: register_histogram_vec!(
                "clob_match_latency_seconds",
                "Time spent matching one submit inside a book",
                &["instrument"],
                prometheus::exponential_buckets(1e-6, 4.0, 8).unwrap()
            )
            .unwrap(),

            connections: register_int_gauge!(
                "clob_client_connections",
                "Currently connected clients"
            )
            .unwrap(),

            rejected: register_int_counter_vec!(
                "clob_rejected_commands_total",
                "Commands rejected before reaching a book",
                &["stage"]
            )
            .unwrap(),
        }
    }

    /// 一笔提交命令进入核心
    pub fn record_submit(&self, side: Side, instrument: &str) {
        self.submits
            .with_label_values(&[side.label(), instrument])
            .inc();
    }

    /// 一次撮合产生的成交笔数；零笔不产生时间序列
    pub fn record_fills(&self, instrument: &str, fills: u64) {
        if fills > 0 {
            self.fills.with_label_values(&[instrument]).inc_by(fills);
        }
    }

    /// 一条取消命令的结果
    pub fn record_cancel(&self, accepted: bool) {
        let outcome = if accepted { "accepted" } else { "rejected" };
        self.cancels.with_label_values(&[outcome]).inc();
    }

    /// 一次簿内撮合的耗时
    pub fn observe_match_latency(&self, instrument: &str, seconds: f64) {
        self.match_latency
            .with_label_values(&[instrument])
            .observe(seconds);
    }

    /// 客户端连接建立
    pub fn connection_opened(&self) {
        self.connections.inc();
    }

    /// 客户端连接断开
    pub fn connection_closed(&self) {
        self.connections.dec();
    }

    /// 命令在进入核心前被拦截（stage: parse / limits）
    pub fn record_reject(&self, stage: &str) {
        self.rejected.with_label_values(&[stage]).inc();
    }
}

/// 导出全部已注册指标的文本表示
pub fn export() -> String {
    let encoder = TextEncoder::new();
    match encoder.encode_to_string(&prometheus::gather()) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("指标导出失败: {}", e);
            String::new()
        }
    }
}
