//! Burn computation: block resolution, log aggregation and per-token records

mod calculator;
mod logs;
mod record;
mod resolver;
mod window;

pub use calculator::{Computation, TokenBurnCalculator};
pub use logs::{
    decode_transfer_value, sum_transfer_logs, BurnLogAggregator, TransferQuery, TRANSFER_TOPIC,
};
pub use record::{scale_amount, BurnRecord};
pub use resolver::BlockTimeResolver;
pub use window::BurnWindow;
