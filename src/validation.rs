/// 入簿前的业务准入
///
/// 行协议解析只保证命令形状正确；这里拦截业务上非法的提交命令，
/// 被拒绝的命令不会进入任何订单簿。价格 0 是保留值，数量 0 是
/// 空订单，标的名限长（接入协议最多 8 字节）。取消命令只携带
/// 订单号，永远直接放行——未知订单号在下游是正常的否定回报，
/// 不是准入问题。

use crate::protocol::ClientCommand;
use std::fmt;

/// 拒绝原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reject {
    /// 价格为保留值 0
    ReservedPrice,
    /// 数量为 0 的空订单
    EmptyOrder,
    /// 数量超出单笔上限
    OversizedOrder { count: u32, limit: u32 },
    /// 标的名为空或超长
    BadInstrument { len: usize, limit: usize },
}

impl fmt::Display for Reject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reject::ReservedPrice => write!(f, "price 0 is reserved"),
            Reject::EmptyOrder => write!(f, "order with zero count"),
            Reject::OversizedOrder { count, limit } => {
                write!(f, "count {} exceeds per-order limit {}", count, limit)
            }
            Reject::BadInstrument { len, limit } => {
                write!(f, "instrument length {} outside 1..={}", len, limit)
            }
        }
    }
}

impl std::error::Error for Reject {}

/// 提交命令的业务限制
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// 单笔数量上限
    pub max_count: u32,
    /// 标的名最大字节数
    pub max_instrument_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_count: u32::MAX,
            max_instrument_len: 8,
        }
    }
}

impl Limits {
    /// 判定一条命令能否进入撮合核心
    pub fn admit(&self, command: &ClientCommand) -> Result<(), Reject> {
        let ClientCommand::Submit {
            instrument,
            price,
            count,
            ..
        } = command
        else {
            // 取消命令没有可校验的内容
            return Ok(());
        };

        if *price == 0 {
            return Err(Reject::ReservedPrice);
        }
        if *count == 0 {
            return Err(Reject::EmptyOrder);
        }
        if *count > self.max_count {
            return Err(Reject::OversizedOrder {
                count: *count,
                limit: self.max_count,
            });
        }
        if instrument.is_empty() || instrument.len() > self.max_instrument_len {
            return Err(Reject::BadInstrument {
                len: instrument.len(),
                limit: self.max_instrument_len,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parse_command;

    fn admit(line: &str) -> Result<(), Reject> {
        Limits::default().admit(&parse_command(line).unwrap())
    }

    #[test]
    fn test_default_limits_admit_normal_traffic() {
        for line in ["B 1 AAPL 100 10", "S 2 X 1 1", "C 7"] {
            assert_eq!(admit(line), Ok(()), "rejected {}", line);
        }
    }

    #[test]
    fn test_reserved_price_and_empty_order() {
        assert_eq!(admit("B 1 AAPL 0 10"), Err(Reject::ReservedPrice));
        assert_eq!(admit("S 1 AAPL 100 0"), Err(Reject::EmptyOrder));
        // 价格检查先于数量检查
        assert_eq!(admit("B 1 AAPL 0 0"), Err(Reject::ReservedPrice));
    }

    #[test]
    fn test_instrument_length_boundary() {
        // 8 字节恰好在限内
        assert_eq!(admit("B 1 ABCDEFGH 100 10"), Ok(()));
        assert_eq!(
            admit("B 1 ABCDEFGHI 100 10"),
            Err(Reject::BadInstrument { len: 9, limit: 8 })
        );
    }

    #[test]
    fn test_count_cap_applies_to_submits_only() {
        let limits = Limits {
            max_count: 100,
            ..Default::default()
        };

        let oversized = parse_command("B 1 AAPL 100 500").unwrap();
        assert_eq!(
            limits.admit(&oversized),
            Err(Reject::OversizedOrder {
                count: 500,
                limit: 100,
            })
        );

        // 取消命令不受数量上限约束
        let cancel = parse_command("C 500").unwrap();
        assert_eq!(limits.admit(&cancel), Ok(()));
    }
}
