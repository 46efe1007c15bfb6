//! Shop domain: inventory, sales, trade-ins, buybacks, closing and reporting.

pub mod error;
pub mod money;
pub mod brand;
pub mod clock;
pub mod period;
pub mod stock;
pub mod sales;
pub mod trade;
pub mod buyback;
pub mod closing;
pub mod finance;
pub mod dashboard;
