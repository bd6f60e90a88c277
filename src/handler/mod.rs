//! 日志输出模块
//!
//! 每个严重级别可以单独指定输出；标准错误始终有一个固定的工作线程。

use std::sync::Arc;
use arc_swap::ArcSwapOption;

use crate::config::Severity;
use crate::producer_consumer::{BatchConfig, ProcessorWorker};

pub mod format;
pub mod term;
pub mod writer;

pub use term::TermProcessor;
pub use writer::{SharedWriter, WriterProcessor};

/// 按严重级别路由的输出表
pub struct Outputs {
    stderr: ProcessorWorker,
    by_severity: [ArcSwapOption<ProcessorWorker>; Severity::COUNT],
    batch_config: BatchConfig,
}

impl Outputs {
    /// 创建只有标准错误输出的路由表
    pub fn new(batch_config: BatchConfig) -> Self {
        Self {
            stderr: ProcessorWorker::new(TermProcessor::new(), batch_config.clone()),
            by_severity: std::array::from_fn(|_| ArcSwapOption::empty()),
            batch_config,
        }
    }

    fn worker(&self, writer: SharedWriter) -> Arc<ProcessorWorker> {
        Arc::new(ProcessorWorker::new(WriterProcessor::new(writer), self.batch_config.clone()))
    }

    /// 设置单个级别的输出，`None` 表示移除
    pub fn set(&self, severity: Severity, writer: Option<SharedWriter>) {
        let worker = writer.map(|writer| self.worker(writer));
        self.by_severity[severity.index()].store(worker);
    }

    /// 所有级别写同一个输出
    pub fn set_all(&self, writer: SharedWriter) {
        let worker = self.worker(writer);
        for slot in &self.by_severity {
            slot.store(Some(Arc::clone(&worker)));
        }
    }

    /// 移除所有级别的输出
    pub fn clear(&self) {
        for slot in &self.by_severity {
            slot.store(None);
        }
    }

    /// 是否为该级别设置了输出
    pub fn has(&self, severity: Severity) -> bool {
        self.by_severity[severity.index()].load().is_some()
    }

    /// 写标准错误
    pub fn write_stderr(&self, line: &[u8]) {
        if let Err(e) = self.stderr.send_write(line.to_vec()) {
            eprintln!("{}", e);
        }
    }

    /// 写入 `severity` 及所有更低级别的输出
    ///
    /// 多个级别共享同一输出时只写一次。
    pub fn write(&self, severity: Severity, line: &[u8]) {
        let mut written: Vec<Arc<ProcessorWorker>> = Vec::with_capacity(Severity::COUNT);
        for slot in self.by_severity[..=severity.index()].iter().rev() {
            let Some(worker) = slot.load_full() else {
                continue;
            };
            if written.iter().any(|w| Arc::ptr_eq(w, &worker)) {
                continue;
            }
            if let Err(e) = worker.send_write(line.to_vec()) {
                eprintln!("{}", e);
            }
            written.push(worker);
        }
    }

    /// 等待所有输出写出积压数据
    pub fn flush(&self) {
        if let Err(e) = self.stderr.flush_blocking() {
            eprintln!("{}", e);
        }

        let mut flushed: Vec<Arc<ProcessorWorker>> = Vec::with_capacity(Severity::COUNT);
        for slot in &self.by_severity {
            let Some(worker) = slot.load_full() else {
                continue;
            };
            if flushed.iter().any(|w| Arc::ptr_eq(w, &worker)) {
                continue;
            }
            if let Err(e) = worker.flush_blocking() {
                eprintln!("{}", e);
            }
            flushed.push(worker);
        }
    }
}
