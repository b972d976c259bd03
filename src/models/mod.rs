pub mod event;
pub mod insights;
pub mod repository;
pub mod stats;
pub mod window;
