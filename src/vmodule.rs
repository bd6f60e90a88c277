//! vmodule 过滤器 - 按源文件覆盖详细级别
//!
//! 语法：`-vmodule=recordio=2,file=1,gfs*=3`。`pattern` 可以是去掉 `.rs`
//! 后缀的文件名，也可以是 glob 模式（`*`、`?`、`[...]`）。规则按声明顺序
//! 匹配，第一条命中的规则生效。
//!
//! 解析结果与调用点缓存由同一把互斥锁保护：更新规则时整体替换并清空缓存，
//! 读取方不会看到与当前规则不一致的缓存项。

use std::collections::HashMap;
use std::num::IntErrorKind;
use std::panic::Location;

use glob::Pattern;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::config::Level;

/// 进程内唯一的过滤器实例，由 `v()` 和 `set_flag("vmodule", ..)` 使用
static GLOBAL: Lazy<ModuleFilter> = Lazy::new(ModuleFilter::new);

/// 获取全局 vmodule 过滤器
pub fn global() -> &'static ModuleFilter {
    &GLOBAL
}

/// 单条 vmodule 规则
#[derive(Debug, Clone, PartialEq)]
pub struct ModulePattern {
    pattern: String,
    literal: bool,
    level: Level,
    glob: Option<Pattern>,
}

impl ModulePattern {
    /// 编译一条规则；glob 模式只在这里编译一次
    pub fn new(pattern: &str, level: Level) -> Self {
        let literal = is_literal(pattern);
        let glob = if literal {
            None
        } else {
            shell_glob(pattern).and_then(|glob| Pattern::new(&glob).ok())
        };
        Self {
            pattern: pattern.to_string(),
            literal,
            level,
            glob,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_literal(&self) -> bool {
        self.literal
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// 文件名（已去掉目录和后缀）是否匹配本规则
    ///
    /// 无法编译的 glob 模式永远不匹配。
    pub fn matches(&self, file: &str) -> bool {
        if self.literal {
            return file == self.pattern;
        }
        self.glob.as_ref().is_some_and(|glob| glob.matches(file))
    }
}

/// 模式中不含元字符时可以直接做字符串比较
pub fn is_literal(pattern: &str) -> bool {
    !pattern.contains(['\\', '*', '?', '[', ']'])
}

/// 把 shell 风格的模式改写成 `glob` 能接受的写法
///
/// 连续的 `*` 合并为一个，`\x` 转义写成 `[x]` 或字面字符，`[^...]` 写成
/// `[!...]`。以单个 `\` 结尾或含空字符集 `[]` 的模式无效，返回 `None`。
fn shell_glob(pattern: &str) -> Option<String> {
    let mut out = String::with_capacity(pattern.len() + 4);
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                while chars.next_if_eq(&'*').is_some() {}
                out.push('*');
            }
            '\\' => {
                let escaped = chars.next()?;
                if matches!(escaped, '*' | '?' | '[' | ']') {
                    out.push('[');
                    out.push(escaped);
                    out.push(']');
                } else {
                    out.push(escaped);
                }
            }
            '[' => {
                out.push('[');
                if chars.next_if(|c| *c == '^' || *c == '!').is_some() {
                    out.push('!');
                }
                // 空字符集无效
                if chars.peek() == Some(&']') {
                    return None;
                }
                while let Some(c) = chars.next() {
                    match c {
                        ']' => {
                            out.push(']');
                            break;
                        }
                        '\\' => out.push(chars.next()?),
                        c => out.push(c),
                    }
                }
            }
            c => out.push(c),
        }
    }
    Some(out)
}

/// 解析级别；超出 i32 范围的值截断到边界，其余无法解析的值视为 0
fn parse_level(level: &str) -> i32 {
    match level.parse::<i32>() {
        Ok(level) => level,
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => i32::MAX,
            IntErrorKind::NegOverflow => i32::MIN,
            _ => 0,
        },
    }
}

/// 解析 vmodule 字符串
///
/// 宽松解析，从不报错：空段跳过，缺少 `=` 的段跳过，无法解析的级别视为 0，
/// 超出范围的级别截断，级别为 0 的规则丢弃。
pub fn parse_vmodule(spec: &str) -> Vec<ModulePattern> {
    let mut filter = Vec::new();
    for segment in spec.split(',') {
        if segment.is_empty() {
            continue;
        }
        let mut parts = segment.split('=');
        let pattern = parts.next().unwrap_or_default();
        let Some(level) = parts.next() else {
            continue;
        };
        let level = parse_level(level);
        if level == 0 {
            continue;
        }
        filter.push(ModulePattern::new(pattern, Level(level)));
    }
    filter
}

/// 调用点
///
/// `id` 是调用点的稳定标识，`#[track_caller]` 捕获的 `Location` 地址在进程
/// 生命周期内不变，同一个调用表达式总是得到同一个 `id`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallSite {
    id: usize,
    file: &'static str,
    line: u32,
}

impl CallSite {
    /// 使用外部分配的标识创建调用点
    pub const fn new(id: usize, file: &'static str, line: u32) -> Self {
        Self { id, file, line }
    }

    /// 从源码位置创建调用点
    pub fn from_location(location: &'static Location<'static>) -> Self {
        Self {
            id: location as *const Location<'static> as usize,
            file: location.file(),
            line: location.line(),
        }
    }

    /// 当前调用者的调用点
    #[track_caller]
    pub fn caller() -> Self {
        Self::from_location(Location::caller())
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn file(&self) -> &'static str {
        self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }
}

/// 调用点解析器：把调用点映射为用于匹配的文件名
pub trait ResolveCallSite: Send + Sync {
    fn resolve(&self, site: &CallSite) -> String;
}

/// 默认解析器：取源文件名，去掉目录和 `.rs` 后缀
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceFileResolver;

impl ResolveCallSite for SourceFileResolver {
    fn resolve(&self, site: &CallSite) -> String {
        module_name(site.file()).to_string()
    }
}

/// `/a/b/c/d.rs` -> `d`
pub fn module_name(file: &str) -> &str {
    let file = file.strip_suffix(".rs").unwrap_or(file);
    match file.rfind(['/', '\\']) {
        Some(slash) => &file[slash + 1..],
        None => file,
    }
}

/// 规则集与调用点缓存，始终一起更新
#[derive(Default)]
struct FilterState {
    spec: String,
    filter: Vec<ModulePattern>,
    cache: HashMap<usize, Level>,
}

/// vmodule 过滤器
pub struct ModuleFilter<R = SourceFileResolver> {
    state: Mutex<FilterState>,
    resolver: R,
}

impl ModuleFilter {
    /// 创建空过滤器
    pub fn new() -> Self {
        Self::with_resolver(SourceFileResolver)
    }
}

impl Default for ModuleFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ResolveCallSite> ModuleFilter<R> {
    /// 使用自定义调用点解析器创建空过滤器
    pub fn with_resolver(resolver: R) -> Self {
        Self {
            state: Mutex::new(FilterState::default()),
            resolver,
        }
    }

    /// 替换规则集并清空缓存
    pub fn update(&self, spec: &str) {
        let filter = parse_vmodule(spec);
        let mut state = self.state.lock();
        state.spec = spec.to_string();
        state.filter = filter;
        state.cache = HashMap::new();
    }

    /// 调用点的 vmodule 级别；没有规则匹配时为 0
    pub fn get(&self, site: &CallSite) -> Level {
        let mut state = self.state.lock();
        if let Some(level) = state.cache.get(&site.id()) {
            return *level;
        }

        let file = self.resolver.resolve(site);
        let level = state
            .filter
            .iter()
            .find(|pattern| pattern.matches(&file))
            .map_or(Level(0), ModulePattern::level);
        state.cache.insert(site.id(), level);
        level
    }

    /// 调用点是否允许以 `level` 输出
    pub fn should_log(&self, level: Level, site: &CallSite) -> bool {
        self.get(site) >= level
    }

    /// 最近一次设置的原始 vmodule 字符串
    pub fn spec(&self) -> String {
        self.state.lock().spec.clone()
    }

    /// 当前生效的规则集
    pub fn patterns(&self) -> Vec<ModulePattern> {
        self.state.lock().filter.clone()
    }

    /// 缓存中的调用点数量
    pub fn cached_sites(&self) -> usize {
        self.state.lock().cache.len()
    }
}
