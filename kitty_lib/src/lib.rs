pub mod accounts;
pub mod balances;
pub mod categories;
pub mod errors;
pub mod expenses;
pub mod formatters;
pub mod records;
pub mod session;
pub mod settings;
pub mod settlements;
pub mod shopping;
pub mod storage;
pub mod suggestions;
pub mod times;
mod utils;
pub mod verification;
