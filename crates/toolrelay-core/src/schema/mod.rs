//! Schema repair for tool parameter schemas

mod sanitizer;

pub use sanitizer::{repair, repair_all, repair_tool, RepairReport, MAX_DEPTH};
