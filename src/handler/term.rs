//! 标准错误输出处理器

use std::io::{self, BufWriter, Write};

use crate::producer_consumer::LogProcessor;

/// 写标准错误的处理器
pub struct TermProcessor {
    stderr: BufWriter<io::Stderr>,
}

impl TermProcessor {
    /// 创建新的终端处理器
    pub fn new() -> Self {
        Self {
            stderr: BufWriter::with_capacity(64 * 1024, io::stderr()),
        }
    }
}

impl Default for TermProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl LogProcessor for TermProcessor {
    fn name(&self) -> &'static str {
        "term"
    }

    fn process(&mut self, data: &[u8]) -> Result<(), String> {
        self.stderr.write_all(data)
            .map_err(|e| format!("写入标准错误失败: {}", e))
    }

    fn flush(&mut self) -> Result<(), String> {
        self.stderr.flush()
            .map_err(|e| format!("刷新标准错误失败: {}", e))
    }
}
