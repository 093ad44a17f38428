pub mod date;
pub mod money;
pub mod transaction;

pub use date::{normalize_date, parse_date, TxnDate};
pub use money::{normalize_amount, Money};
pub use transaction::{DebitCredit, Transaction, QUICKEN_COLUMNS, REQUIRED_COLUMNS};
