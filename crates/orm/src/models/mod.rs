//! Concrete entities backed by the active-record layer

pub mod credit_transaction;
pub mod plan;
pub mod user;

pub use credit_transaction::CreditTransaction;
pub use plan::Plan;
pub use user::User;
