pub mod billing;
pub mod foundation;
