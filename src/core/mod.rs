//! 核心层：贯穿全系统的错误类型

pub mod error;

pub use error::PanelError;
