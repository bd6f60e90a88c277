//! 快速初始化模块
//!
//! # 使用示例
//!
//! ```no_run
//! // 最简单的用法 - 使用默认配置
//! rat_klog::fmt().init().unwrap();
//!
//! rat_klog::info!("启动完成");
//! ```
//!
//! ```no_run
//! // 全局 V=1，gopher 开头的文件 V=3
//! rat_klog::fmt()
//!     .with_verbosity(1)
//!     .with_vmodule("gopher*=3")
//!     .init()
//!     .unwrap();
//! ```

use crate::config::{Config, Level, Severity};
use crate::core::{InitError, LoggerBuilder};

/// 快速初始化器
#[derive(Debug, Clone, Default)]
pub struct FmtInitializer {
    config: Config,
    sync: bool,
}

impl FmtInitializer {
    /// 创建新的格式化初始化器
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置全局详细级别
    pub fn with_verbosity(mut self, level: impl Into<Level>) -> Self {
        self.config.verbosity = level.into();
        self
    }

    /// 设置 vmodule 规则
    pub fn with_vmodule(mut self, spec: &str) -> Self {
        self.config.vmodule = spec.to_string();
        self
    }

    /// 达到该级别的记录写标准错误；同时关闭 logtostderr
    pub fn with_stderr_threshold(mut self, severity: Severity) -> Self {
        self.config.stderr_threshold = severity;
        self.config.log_to_stderr = false;
        self
    }

    /// 同步模式
    pub fn with_sync(mut self, enabled: bool) -> Self {
        self.sync = enabled;
        self
    }

    /// 初始化全局日志器
    pub fn init(self) -> Result<(), InitError> {
        LoggerBuilder::new()
            .with_config(self.config)
            .with_sync(self.sync)
            .init()
    }
}

/// 创建快速初始化器
pub fn fmt() -> FmtInitializer {
    FmtInitializer::new()
}
