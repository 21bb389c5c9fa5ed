pub mod plan;
pub mod session;
pub mod version;
