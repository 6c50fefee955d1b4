pub mod ai;
pub mod blobs;
pub mod store;
