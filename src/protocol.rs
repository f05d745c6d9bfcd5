use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// 订单方向，区分买单和卖单
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// 输出记录中的单字符表示
    pub fn as_char(self) -> char {
        match self {
            Side::Buy => 'B',
            Side::Sell => 'S',
        }
    }

    /// 指标标签用的小写名称
    pub fn label(self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// 客户端命令，由行协议解析而来
///
/// 价格和数量以无符号整数表示，避免浮点精度问题
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientCommand {
    /// `B <order_id> <instrument> <price> <count>` 或 `S ...`
    Submit {
        side: Side,
        order_id: u32,
        #[serde(with = "arc_str_serde")]
        instrument: Arc<str>,
        price: u32,
        count: u32,
    },
    /// `C <order_id>`
    Cancel { order_id: u32 },
}

impl fmt::Display for ClientCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientCommand::Submit {
                side,
                order_id,
                instrument,
                price,
                count,
            } => write!(f, "{} {} {} {} {}", side, order_id, instrument, price, count),
            ClientCommand::Cancel { order_id } => write!(f, "C {}", order_id),
        }
    }
}

/// 引擎对外事件，每个事件恰好消耗一个全局序列号
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
    /// 新挂单入簿：`A <order_id> <instrument> <price> <count> <B|S> <seq>`
    OrderAdded {
        order_id: u32,
        #[serde(with = "arc_str_serde")]
        instrument: Arc<str>,
        price: u32,
        count: u32,
        side: Side,
        seq: u64,
    },
    /// 成交回报：`E <resting_order_id> <taker_order_id> <execution_id> <price> <count> <seq>`
    ///
    /// 成交价取挂单方价格，execution_id 按挂单方计数
    OrderExecuted {
        resting_order_id: u32,
        taker_order_id: u32,
        execution_id: u32,
        price: u32,
        count: u32,
        seq: u64,
    },
    /// 取消回报：`D <order_id> <true|false> <seq>`
    OrderDeleted {
        order_id: u32,
        accepted: bool,
        seq: u64,
    },
}

impl EngineEvent {
    /// 事件携带的全局序列号
    pub fn seq(&self) -> u64 {
        match self {
            EngineEvent::OrderAdded { seq, .. }
            | EngineEvent::OrderExecuted { seq, .. }
            | EngineEvent::OrderDeleted { seq, .. } => *seq,
        }
    }
}

impl fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineEvent::OrderAdded {
                order_id,
                instrument,
                price,
                count,
                side,
                seq,
            } => write!(f, "A {} {} {} {} {} {}", order_id, instrument, price, count, side, seq),
            EngineEvent::OrderExecuted {
                resting_order_id,
                taker_order_id,
                execution_id,
                price,
                count,
                seq,
            } => write!(
                f,
                "E {} {} {} {} {} {}",
                resting_order_id, taker_order_id, execution_id, price, count, seq
            ),
            EngineEvent::OrderDeleted {
                order_id,
                accepted,
                seq,
            } => write!(f, "D {} {} {}", order_id, accepted, seq),
        }
    }
}

/// 行协议解析错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// 空行
    Empty,
    /// 未知命令字
    UnknownCommand(String),
    /// 缺少字段
    MissingField(&'static str),
    /// 数字字段无法解析
    InvalidNumber {
        field: &'static str,
        value: String,
    },
    /// 行尾有多余内容
    TrailingInput(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Empty => write!(f, "empty command line"),
            ParseError::UnknownCommand(tag) => write!(f, "unknown command '{}'", tag),
            ParseError::MissingField(field) => write!(f, "missing field '{}'", field),
            ParseError::InvalidNumber { field, value } => {
                write!(f, "invalid number '{}' for field '{}'", value, field)
            }
            ParseError::TrailingInput(rest) => write!(f, "trailing input '{}'", rest),
        }
    }
}

impl std::error::Error for ParseError {}

/// 解析一行客户端命令
///
/// 接受的格式：
/// - `B <order_id> <instrument> <price> <count>`
/// - `S <order_id> <instrument> <price> <count>`
/// - `C <order_id>`
pub fn parse_command(line: &str) -> Result<ClientCommand, ParseError> {
    let mut parts = line.split_ascii_whitespace();
    let tag = parts.next().ok_or(ParseError::Empty)?;

    let command = match tag {
        "B" | "S" => {
            let side = if tag == "B" { Side::Buy } else { Side::Sell };
            let order_id = next_u32(&mut parts, "order_id")?;
            let instrument = parts
                .next()
                .ok_or(ParseError::MissingField("instrument"))?;
            let price = next_u32(&mut parts, "price")?;
            let count = next_u32(&mut parts, "count")?;
            ClientCommand::Submit {
                side,
                order_id,
                instrument: Arc::from(instrument),
                price,
                count,
            }
        }
        "C" => ClientCommand::Cancel {
            order_id: next_u32(&mut parts, "order_id")?,
        },
        other => return Err(ParseError::UnknownCommand(other.to_string())),
    };

    if let Some(rest) = parts.next() {
        return Err(ParseError::TrailingInput(rest.to_string()));
    }
    Ok(command)
}

fn next_u32<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    field: &'static str,
) -> Result<u32, ParseError> {
    let raw = parts.next().ok_or(ParseError::MissingField(field))?;
    raw.parse().map_err(|_| ParseError::InvalidNumber {
        field,
        value: raw.to_string(),
    })
}

// Custom serde module for Arc<str>
mod arc_str_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::sync::Arc;

    pub fn serialize<S>(arc: &Arc<str>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        arc.as_ref().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Arc<str>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Arc::from(s))
    }
}
