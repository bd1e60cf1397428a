//! 供应商寻源流程：需求解析 → 供应商搜索 → 资质校验 → 报告合成

pub mod context;
pub mod parser;
pub mod search;
pub mod synthesizer;
pub mod trace;
pub mod validator;
pub mod workflow;

pub use workflow::{SourcingWorkflow, launch};
