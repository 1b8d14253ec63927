pub mod erp;

pub use erp::*;
