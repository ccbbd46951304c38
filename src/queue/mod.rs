pub mod store;

pub use store::{MessageStore, StoreError};
