//! Entity repositories

pub mod credit_transaction_repository;
pub mod plan_repository;
pub mod user_repository;

pub use credit_transaction_repository::{CreditTransactionRepository, TypeTotal};
pub use plan_repository::PlanRepository;
pub use user_repository::UserRepository;
