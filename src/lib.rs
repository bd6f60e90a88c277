//! rat_klog - glog/klog 风格的分级日志
//!
//! 提供 INFO/WARNING/ERROR/FATAL 日志和由 `-v`、`-vmodule` 控制的 V 日志，
//! 记录由生产者消费者架构的日志核心写出。
//!
//! ```no_run
//! use rat_klog::{info, vlog};
//!
//! rat_klog::set_flag("vmodule", "gopher*=3").unwrap();
//! info!("Prepare to repel boarders");
//! vlog!(2, "Processed {} elements", 10);
//! rat_klog::flush();
//! ```
//!
//! 需要报告上层调用位置的封装函数标注 `#[track_caller]` 即可，
//! 记录的文件和行号取自最外层未标注的调用者。

pub mod config;
pub mod core;
pub mod handler;
pub mod producer_consumer;
pub mod vmodule;
mod fmt_impl;
mod std_bridge;
mod verbose;

use std::fmt;
use std::io::Write;
use std::panic::Location;

pub use crate::config::{Config, ConfigError, Flag, Level, Record, Severity};
pub use crate::core::{InitError, Logger, LoggerBuilder, LoggerCore, OutputStats, Stats};
pub use crate::fmt_impl::{FmtInitializer, fmt};
pub use crate::std_bridge::copy_standard_log_to;
pub use crate::verbose::{Verbose, v};
pub use crate::vmodule::{CallSite, ModuleFilter, ModulePattern, parse_vmodule};

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => ($crate::info(format_args!($($arg)*)));
}

#[macro_export]
macro_rules! warning {
    ($($arg:tt)*) => ($crate::warning(format_args!($($arg)*)));
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => ($crate::error(format_args!($($arg)*)));
}

#[macro_export]
macro_rules! fatal {
    ($($arg:tt)*) => ($crate::fatal(format_args!($($arg)*)));
}

#[macro_export]
macro_rules! exit {
    ($($arg:tt)*) => ($crate::exit(format_args!($($arg)*)));
}

/// V 日志，参数只在启用时求值
#[macro_export]
macro_rules! vlog {
    ($level:expr, $($arg:tt)*) => {{
        let verbose = $crate::v($level);
        if verbose.enabled() {
            verbose.info(format_args!($($arg)*));
        }
    }};
}

/// 以调用者位置写一条日志
#[track_caller]
pub fn log(severity: Severity, args: fmt::Arguments<'_>) {
    log_at(severity, Location::caller(), args);
}

/// 以指定位置写一条日志
pub fn log_at(severity: Severity, location: &Location<'_>, args: fmt::Arguments<'_>) {
    crate::core::logger().log(&Record {
        severity,
        file: location.file(),
        line: location.line(),
        args,
    });
}

/// 写 INFO 日志
#[track_caller]
pub fn info(args: fmt::Arguments<'_>) {
    log(Severity::Info, args);
}

/// 写 WARNING 和 INFO 日志
#[track_caller]
pub fn warning(args: fmt::Arguments<'_>) {
    log(Severity::Warning, args);
}

/// 写 ERROR、WARNING 和 INFO 日志
#[track_caller]
pub fn error(args: fmt::Arguments<'_>) {
    log(Severity::Error, args);
}

/// 写 FATAL 及以下全部日志，刷新后以状态码 255 退出
#[track_caller]
pub fn fatal(args: fmt::Arguments<'_>) -> ! {
    log(Severity::Fatal, args);
    flush();
    std::process::exit(255)
}

/// 写 FATAL 及以下全部日志，刷新后以状态码 1 退出
#[track_caller]
pub fn exit(args: fmt::Arguments<'_>) -> ! {
    log(Severity::Fatal, args);
    flush();
    std::process::exit(1)
}

/// 等待所有积压日志写出
pub fn flush() {
    crate::core::logger().flush();
}

/// 所有严重级别写入 `writer`
pub fn set_output<W: Write + Send + 'static>(writer: W) {
    crate::core::logger().outputs().set_all(handler::writer::shared(writer));
}

/// 指定严重级别写入 `writer`
///
/// 有效名称为 INFO、WARNING、ERROR、FATAL；名称无法识别时 panic。
pub fn set_output_by_severity<W: Write + Send + 'static>(name: &str, writer: W) {
    let severity = severity_by_name("set_output_by_severity", name);
    crate::core::logger().outputs().set(severity, Some(handler::writer::shared(writer)));
}

/// 移除所有严重级别的自定义输出
pub fn clear_outputs() {
    crate::core::logger().outputs().clear();
}

/// 各严重级别的输出统计
pub fn stats() -> Stats {
    crate::core::logger().stats()
}

/// 按名称设置配置项，支持 v、vmodule、logtostderr、alsologtostderr、stderrthreshold
///
/// vmodule 的值永远不会报错，无法解析的部分被忽略。
pub fn set_flag(name: &str, value: &str) -> Result<(), ConfigError> {
    match Flag::parse(name, value)? {
        Flag::VModule(spec) => {
            vmodule::global().update(&spec);
            Ok(())
        }
        flag => crate::core::logger().apply(&flag),
    }
}

/// 按名称读取配置项
pub fn flag(name: &str) -> Option<String> {
    let mut config = crate::core::logger().config();
    config.vmodule = vmodule::global().spec();
    config.get(name)
}

/// 严重级别名称无法识别属于静态配置错误，直接 panic
pub(crate) fn severity_by_name(caller: &str, name: &str) -> Severity {
    match Severity::from_name(name) {
        Some(severity) => severity,
        None => panic!("{}({:?}): 无法识别的严重级别名称", caller, name),
    }
}
