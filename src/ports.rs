mod clock;
mod store;

pub use clock::Clock;
pub use store::{DocumentStore, StoreError};
