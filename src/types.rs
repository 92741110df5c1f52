pub mod firestore;
pub mod records;
