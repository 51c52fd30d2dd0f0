// Service exports
pub mod appwrite;
pub mod generator;
pub mod postgres;
pub mod store;

pub use appwrite::{AppwriteClient, AppwriteError};
pub use generator::{GeneratorError, HttpGenerator, TextGenerator};
pub use postgres::{PostgresClient, PostgresError};
pub use store::{InMemoryProfileStore, ProfileStore, StoreError};
