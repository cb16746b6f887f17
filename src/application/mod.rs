pub mod agent;
pub mod dispatch;
pub mod registry;
pub mod tooling;
