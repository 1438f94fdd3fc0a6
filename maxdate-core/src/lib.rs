//! Domain core of the MaxDate backend.
//!
//! Stores are traits injected into services as `Arc<dyn ...>`; [`store::PgStore`]
//! backs them with PostgreSQL and [`store::MemoryStore`] keeps everything in process.

pub mod age;
pub mod cities;
pub mod mailer;
pub mod models;
pub mod schema;
pub mod services;
pub mod storage;
pub mod store;

pub use cities::{City, CityDirectory, CityRef};
pub use mailer::{LogMailer, Mailer};
pub use storage::{MemoryPhotoStorage, PhotoStorage};
pub use store::{MemoryStore, PgStore, Stores};
