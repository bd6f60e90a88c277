//! 日志核心模块 - 严重级别路由、统计与全局日志器

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicI64, AtomicU8, Ordering};
use arc_swap::{ArcSwap, Guard};
use chrono::Local;
use crossbeam_channel::Sender;
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::config::{Config, ConfigError, Flag, Level, Record, Severity};
use crate::handler::Outputs;
use crate::handler::format::format_record;
use crate::producer_consumer::BatchConfig;
use crate::vmodule;

/// 全局日志器实例，未初始化时使用默认配置
static LOGGER: Lazy<ArcSwap<LoggerCore>> =
    Lazy::new(|| ArcSwap::from_pointee(LoggerBuilder::new().build()));

/// 是否已通过 `LoggerBuilder::init` 显式初始化
static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// 工作线程命令
#[derive(Debug, Clone)]
pub enum LogCommand {
    /// 写入已格式化的日志
    Write(Vec<u8>),
    /// 强制刷新，完成后回执
    Flush(Sender<()>),
    /// 停止工作线程
    Shutdown,
}

/// 日志器 trait - 门面函数只通过它访问日志核心
pub trait Logger: Send + Sync {
    fn log(&self, record: &Record);
    fn flush(&self);
    fn set_verbosity(&self, level: Level);
    fn verbosity(&self) -> Level;
}

/// 单个严重级别的输出统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputStats {
    pub lines: i64,
    pub bytes: i64,
}

/// 各严重级别的输出统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub info: OutputStats,
    pub warning: OutputStats,
    pub error: OutputStats,
}

/// FATAL 不计数
#[derive(Default)]
struct Counters {
    lines: [AtomicI64; 3],
    bytes: [AtomicI64; 3],
}

impl Counters {
    fn record(&self, severity: Severity, bytes: usize) {
        let index = severity.index();
        if index < self.lines.len() {
            self.lines[index].fetch_add(1, Ordering::Relaxed);
            self.bytes[index].fetch_add(bytes as i64, Ordering::Relaxed);
        }
    }

    fn get(&self, severity: Severity) -> OutputStats {
        OutputStats {
            lines: self.lines[severity.index()].load(Ordering::Relaxed),
            bytes: self.bytes[severity.index()].load(Ordering::Relaxed),
        }
    }

    fn snapshot(&self) -> Stats {
        Stats {
            info: self.get(Severity::Info),
            warning: self.get(Severity::Warning),
            error: self.get(Severity::Error),
        }
    }
}

/// 日志核心实现
pub struct LoggerCore {
    verbosity: AtomicI32,
    log_to_stderr: AtomicBool,
    also_log_to_stderr: AtomicBool,
    stderr_threshold: AtomicU8,
    outputs: Outputs,
    stats: Counters,
    sync: bool, // 同步模式：每条记录都等待写出
}

impl LoggerCore {
    /// 创建新的日志核心
    pub fn new(config: &Config, batch_config: BatchConfig, sync: bool) -> Self {
        Self {
            verbosity: AtomicI32::new(config.verbosity.value()),
            log_to_stderr: AtomicBool::new(config.log_to_stderr),
            also_log_to_stderr: AtomicBool::new(config.also_log_to_stderr),
            stderr_threshold: AtomicU8::new(config.stderr_threshold as u8),
            outputs: Outputs::new(batch_config),
            stats: Counters::default(),
            sync,
        }
    }

    /// 应用运行时配置项；vmodule 由过滤器自己维护，这里忽略
    pub fn apply(&self, flag: &Flag) -> Result<(), ConfigError> {
        match flag {
            Flag::Verbosity(level) => {
                if level.value() < 0 {
                    return Err(ConfigError::NegativeVerbosity(level.value()));
                }
                self.set_verbosity(*level);
            }
            Flag::LogToStderr(on) => self.log_to_stderr.store(*on, Ordering::Relaxed),
            Flag::AlsoLogToStderr(on) => self.also_log_to_stderr.store(*on, Ordering::Relaxed),
            Flag::StderrThreshold(severity) => self.stderr_threshold.store(*severity as u8, Ordering::Relaxed),
            Flag::VModule(_) => {}
        }
        Ok(())
    }

    /// 当前配置快照（不含 vmodule）
    pub fn config(&self) -> Config {
        Config {
            verbosity: self.verbosity(),
            vmodule: String::new(),
            log_to_stderr: self.log_to_stderr.load(Ordering::Relaxed),
            also_log_to_stderr: self.also_log_to_stderr.load(Ordering::Relaxed),
            stderr_threshold: self.stderr_threshold(),
        }
    }

    pub fn stderr_threshold(&self) -> Severity {
        Severity::from_index(self.stderr_threshold.load(Ordering::Relaxed))
    }

    /// 输出路由表
    pub fn outputs(&self) -> &Outputs {
        &self.outputs
    }

    /// 输出统计快照
    pub fn stats(&self) -> Stats {
        self.stats.snapshot()
    }

    /// 按严重级别分发已格式化的记录
    fn output(&self, severity: Severity, line: &[u8]) {
        if self.log_to_stderr.load(Ordering::Relaxed) {
            self.outputs.write_stderr(line);
            return;
        }

        if self.also_log_to_stderr.load(Ordering::Relaxed) || severity >= self.stderr_threshold() {
            self.outputs.write_stderr(line);
        }
        self.outputs.write(severity, line);
    }
}

impl Logger for LoggerCore {
    fn log(&self, record: &Record) {
        let line = format_record(record, Local::now(), std::process::id());
        self.stats.record(record.severity, line.len());
        self.output(record.severity, &line);

        if self.sync || record.severity == Severity::Fatal {
            self.flush();
        }
    }

    fn flush(&self) {
        self.outputs.flush();
    }

    fn set_verbosity(&self, level: Level) {
        self.verbosity.store(level.value(), Ordering::Relaxed);
    }

    fn verbosity(&self) -> Level {
        Level(self.verbosity.load(Ordering::Relaxed))
    }
}

/// 日志构建器
pub struct LoggerBuilder {
    config: Config,
    batch_config: BatchConfig,
    sync: bool,
}

impl LoggerBuilder {
    /// 创建新的日志构建器
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            batch_config: BatchConfig::default(),
            sync: false,
        }
    }

    /// 使用完整配置
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// 设置全局详细级别
    pub fn with_verbosity(mut self, level: impl Into<Level>) -> Self {
        self.config.verbosity = level.into();
        self
    }

    /// 设置 vmodule 规则，`init` 时写入全局过滤器
    pub fn with_vmodule(mut self, spec: &str) -> Self {
        self.config.vmodule = spec.to_string();
        self
    }

    /// 设置批量配置
    pub fn with_batch_config(mut self, config: BatchConfig) -> Self {
        self.batch_config = config;
        self
    }

    /// 启用同步模式（每条记录等待写出）
    pub fn with_sync(mut self, enabled: bool) -> Self {
        self.sync = enabled;
        self
    }

    /// 构建日志核心
    pub fn build(self) -> LoggerCore {
        if let Err(e) = self.config.validate() {
            panic!("LoggerBuilder 配置验证失败: {}\n请检查您的配置并修复上述问题后再重试。", e);
        }
        if let Err(e) = self.batch_config.validate() {
            panic!("LoggerBuilder 批量配置验证失败: {}\n请检查您的批量配置并修复上述问题后再重试。", e);
        }

        LoggerCore::new(&self.config, self.batch_config, self.sync)
    }

    /// 构建并初始化全局日志器，同时更新全局 vmodule 过滤器
    pub fn init(self) -> Result<(), InitError> {
        self.config.validate()?;
        if let Err(e) = self.batch_config.validate() {
            return Err(InitError::Batch(e));
        }

        let vmodule = self.config.vmodule.clone();
        set_logger(self.build())?;
        vmodule::global().update(&vmodule);
        Ok(())
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 当前全局日志器
pub fn logger() -> Guard<Arc<LoggerCore>> {
    LOGGER.load()
}

/// 设置全局日志器，只允许一次
pub fn set_logger(core: LoggerCore) -> Result<(), InitError> {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return Err(InitError::AlreadyInitialized);
    }
    // 旧的默认日志器在最后一个引用释放时写出积压数据
    LOGGER.store(Arc::new(core));
    Ok(())
}

/// 日志器初始化错误
#[derive(Debug, Error)]
pub enum InitError {
    #[error("全局日志器已经初始化")]
    AlreadyInitialized,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Batch(String),
}
