pub mod import;
pub mod extraction;
pub mod storage;
pub mod processor;
