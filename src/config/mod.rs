//! 配置模块

use serde::{Serialize, Deserialize};
use std::fmt;
use thiserror::Error;

/// 日志严重级别
///
/// 数值越大越严重；某一级别的记录同时写入所有更低级别的输出。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    /// 严重级别数量
    pub const COUNT: usize = 4;

    /// 按从低到高排列的全部级别
    pub const ALL: [Severity; Severity::COUNT] =
        [Severity::Info, Severity::Warning, Severity::Error, Severity::Fatal];

    /// 级别名称（INFO、WARNING、ERROR、FATAL）
    pub fn name(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    /// 根据名称查找级别，忽略大小写
    pub fn from_name(name: &str) -> Option<Severity> {
        Severity::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }

    /// 日志头部使用的单字符标记
    pub fn as_char(&self) -> char {
        match self {
            Severity::Info => 'I',
            Severity::Warning => 'W',
            Severity::Error => 'E',
            Severity::Fatal => 'F',
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub(crate) fn from_index(index: u8) -> Severity {
        match index {
            0 => Severity::Info,
            1 => Severity::Warning,
            2 => Severity::Error,
            _ => Severity::Fatal,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 详细级别（V 级别）
///
/// `v(level)` 在调用点的有效阈值不小于 `level` 时放行。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Level(pub i32);

impl Level {
    pub const fn new(level: i32) -> Self {
        Level(level)
    }

    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl From<i32> for Level {
    fn from(level: i32) -> Self {
        Level(level)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Level {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i32>().map(Level)
    }
}

/// 日志记录
#[derive(Clone, Copy, Debug)]
pub struct Record<'a> {
    pub severity: Severity,
    pub file: &'a str,
    pub line: u32,
    pub args: fmt::Arguments<'a>,
}

/// 配置错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("未知的配置项: {0}")]
    UnknownFlag(String),
    #[error("配置项 {name} 的值无效: {value:?}")]
    InvalidValue { name: String, value: String },
    #[error("配置错误: 全局详细级别不能为负数 ({0})")]
    NegativeVerbosity(i32),
}

/// 日志配置
///
/// 字段与传统的命令行参数一一对应，见 [`Flag`]。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `-v`：全局详细级别
    pub verbosity: Level,
    /// `-vmodule`：按源文件覆盖详细级别，例如 `recordio=2,gfs*=3`
    pub vmodule: String,
    /// `-logtostderr`：只写标准错误
    pub log_to_stderr: bool,
    /// `-alsologtostderr`：同时写标准错误
    pub also_log_to_stderr: bool,
    /// `-stderrthreshold`：达到该级别的记录同时写标准错误
    pub stderr_threshold: Severity,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verbosity: Level(0),
            vmodule: String::new(),
            log_to_stderr: true,
            also_log_to_stderr: false,
            stderr_threshold: Severity::Error,
        }
    }
}

impl Config {
    /// 验证配置的有效性
    ///
    /// vmodule 字符串不做校验，无法解析的部分在解析时直接忽略。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.verbosity.value() < 0 {
            return Err(ConfigError::NegativeVerbosity(self.verbosity.value()));
        }
        Ok(())
    }

    /// 按名称设置配置项
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(Flag::parse(name, value)?);
        Ok(())
    }

    /// 应用已解析的配置项
    pub fn apply(&mut self, flag: Flag) {
        match flag {
            Flag::Verbosity(level) => self.verbosity = level,
            Flag::VModule(spec) => self.vmodule = spec,
            Flag::LogToStderr(on) => self.log_to_stderr = on,
            Flag::AlsoLogToStderr(on) => self.also_log_to_stderr = on,
            Flag::StderrThreshold(severity) => self.stderr_threshold = severity,
        }
    }

    /// 按名称读取配置项的字符串形式
    pub fn get(&self, name: &str) -> Option<String> {
        let value = match name {
            Flag::VERBOSITY => self.verbosity.to_string(),
            Flag::VMODULE => self.vmodule.clone(),
            Flag::LOG_TO_STDERR => self.log_to_stderr.to_string(),
            Flag::ALSO_LOG_TO_STDERR => self.also_log_to_stderr.to_string(),
            Flag::STDERR_THRESHOLD => self.stderr_threshold.index().to_string(),
            _ => return None,
        };
        Some(value)
    }
}

/// 单个配置项
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flag {
    Verbosity(Level),
    VModule(String),
    LogToStderr(bool),
    AlsoLogToStderr(bool),
    StderrThreshold(Severity),
}

impl Flag {
    pub const VERBOSITY: &'static str = "v";
    pub const VMODULE: &'static str = "vmodule";
    pub const LOG_TO_STDERR: &'static str = "logtostderr";
    pub const ALSO_LOG_TO_STDERR: &'static str = "alsologtostderr";
    pub const STDERR_THRESHOLD: &'static str = "stderrthreshold";

    /// 解析 `name=value` 形式的配置项
    ///
    /// `vmodule` 的值原样保留，从不报错。
    pub fn parse(name: &str, value: &str) -> Result<Flag, ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        };

        match name {
            Self::VERBOSITY => value.parse::<Level>().map(Flag::Verbosity).map_err(|_| invalid()),
            Self::VMODULE => Ok(Flag::VModule(value.to_string())),
            Self::LOG_TO_STDERR => parse_bool(value).map(Flag::LogToStderr).ok_or_else(invalid),
            Self::ALSO_LOG_TO_STDERR => parse_bool(value).map(Flag::AlsoLogToStderr).ok_or_else(invalid),
            Self::STDERR_THRESHOLD => parse_severity(value).map(Flag::StderrThreshold).ok_or_else(invalid),
            _ => Err(ConfigError::UnknownFlag(name.to_string())),
        }
    }
}

/// 布尔值解析，接受 1/t/true/0/f/false 等写法
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// 严重级别解析，接受名称或数字
fn parse_severity(value: &str) -> Option<Severity> {
    if let Some(severity) = Severity::from_name(value) {
        return Some(severity);
    }
    match value.parse::<u8>() {
        Ok(n) if (n as usize) < Severity::COUNT => Some(Severity::from_index(n)),
        _ => None,
    }
}
