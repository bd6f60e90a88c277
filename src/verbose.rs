//! V 风格的详细日志

use std::fmt;

use crate::config::{Level, Severity};
use crate::core::{self, Logger};
use crate::vmodule::{self, CallSite};

/// `v()` 的结果，为真时 `info` 才会写日志
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verbose(bool);

impl Verbose {
    pub fn enabled(&self) -> bool {
        self.0
    }

    /// 在启用时写一条 INFO 日志
    #[track_caller]
    pub fn info(&self, args: fmt::Arguments<'_>) {
        if self.0 {
            crate::log(Severity::Info, args);
        }
    }
}

impl From<Verbose> for bool {
    fn from(verbose: Verbose) -> bool {
        verbose.0
    }
}

impl PartialEq<bool> for Verbose {
    fn eq(&self, other: &bool) -> bool {
        self.0 == *other
    }
}

/// 调用点的详细级别是否不小于 `level`
///
/// 先比较全局 `-v`；不满足时再查 vmodule 过滤器，调用点由
/// `#[track_caller]` 确定。可以写成
///
/// ```no_run
/// if rat_klog::v(2).enabled() {
///     rat_klog::info!("expensive: {}", 42);
/// }
/// rat_klog::v(2).info(format_args!("cheap"));
/// ```
///
/// 前者在关闭时不会求值参数。
#[track_caller]
pub fn v(level: impl Into<Level>) -> Verbose {
    let level = level.into();
    if core::logger().verbosity() >= level {
        return Verbose(true);
    }

    Verbose(vmodule::global().should_log(level, &CallSite::caller()))
}
