pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod export;
pub mod orchestration;
pub mod storage;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{Account, AccountId, Category, Currency, Decimal, Side};
pub use engine::{TaxError, TaxReport};
pub use error::AppError;
pub use orchestration::TaxService;
pub use storage::{MockStore, StoreError, TaxStore};
