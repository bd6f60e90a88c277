//! 生产者消费者模式实现
//! 记录在调用线程格式化，每个输出由独立的工作线程批量写入

use std::thread;
use std::time::{Duration, Instant};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};

pub use crate::core::LogCommand;

/// 批量处理配置
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// 批量条数阈值
    pub batch_size: usize,
    /// 批量时间间隔（毫秒）
    pub batch_interval_ms: u64,
    /// 缓冲区初始容量（条）
    pub buffer_size: usize,
}

impl BatchConfig {
    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("配置错误: 批量大小不能为 0".to_string());
        }
        if self.batch_size > 1024 * 1024 {
            return Err("配置错误: 批量大小过大 (最大 1M 条)".to_string());
        }

        if self.batch_interval_ms == 0 {
            return Err("配置错误: 批量间隔不能为 0".to_string());
        }
        if self.batch_interval_ms > 60000 {
            return Err("配置错误: 批量间隔过长 (最大 60秒)".to_string());
        }

        if self.buffer_size < self.batch_size {
            return Err(format!("配置错误: 缓冲区大小 ({}) 必须大于等于批量大小 ({})", self.buffer_size, self.batch_size));
        }

        Ok(())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            batch_interval_ms: 25,
            buffer_size: 256,
        }
    }
}

/// 处理器 trait - 各个输出实现具体的写入逻辑
pub trait LogProcessor: Send + 'static {
    /// 处理器名称
    fn name(&self) -> &'static str;

    /// 处理单条已格式化的日志
    fn process(&mut self, data: &[u8]) -> Result<(), String>;

    /// 批量处理日志数据
    fn process_batch(&mut self, batch: &[Vec<u8>]) -> Result<(), String> {
        for data in batch {
            self.process(data)?;
        }
        Ok(())
    }

    /// 刷新操作
    fn flush(&mut self) -> Result<(), String>;

    /// 清理资源
    fn cleanup(&mut self) -> Result<(), String> {
        Ok(())
    }
}

/// 单个处理器的工作线程
pub struct ProcessorWorker {
    sender: Sender<LogCommand>,
    worker_thread: Option<thread::JoinHandle<()>>,
    name: &'static str,
}

impl ProcessorWorker {
    /// 创建新的处理器工作线程
    pub fn new<P>(processor: P, config: BatchConfig) -> Self
    where
        P: LogProcessor,
    {
        // 配置错误属于编程错误，直接panic
        if let Err(e) = config.validate() {
            panic!("BatchConfig 验证失败: {}\n请检查您的配置并修复上述问题后再重试。", e);
        }

        let (sender, receiver) = unbounded();
        let name = processor.name();

        let worker_thread = thread::Builder::new()
            .name(format!("rat_klog-{}", name))
            .spawn(move || Self::worker_thread(processor, receiver, config, name))
            .unwrap_or_else(|e| panic!("[{}] 启动工作线程失败: {}", name, e));

        Self {
            sender,
            worker_thread: Some(worker_thread),
            name,
        }
    }

    /// 工作线程实现
    fn worker_thread<P>(
        mut processor: P,
        receiver: Receiver<LogCommand>,
        config: BatchConfig,
        processor_name: &'static str,
    ) where
        P: LogProcessor,
    {
        let mut batch_buffer: Vec<Vec<u8>> = Vec::with_capacity(config.buffer_size);
        let mut last_flush = Instant::now();
        let flush_interval = Duration::from_millis(config.batch_interval_ms);

        loop {
            let command = match receiver.recv_timeout(flush_interval) {
                Ok(command) => command,
                Err(RecvTimeoutError::Timeout) => {
                    // 空闲时写出积压数据
                    if !batch_buffer.is_empty() {
                        if let Err(e) = Self::process_batch(&mut processor, &mut batch_buffer) {
                            eprintln!("[{}] 定时批量处理失败: {}", processor_name, e);
                        }
                        if let Err(e) = processor.flush() {
                            eprintln!("[{}] 定时刷新失败: {}", processor_name, e);
                        }
                        last_flush = Instant::now();
                    }
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            };

            match command {
                LogCommand::Write(data) => {
                    batch_buffer.push(data);

                    if batch_buffer.len() >= config.batch_size ||
                       last_flush.elapsed() >= flush_interval {
                        if let Err(e) = Self::process_batch(&mut processor, &mut batch_buffer) {
                            eprintln!("[{}] 批量处理失败: {}", processor_name, e);
                        }
                        last_flush = Instant::now();
                    }
                }

                LogCommand::Flush(ack) => {
                    if let Err(e) = Self::process_batch(&mut processor, &mut batch_buffer) {
                        eprintln!("[{}] 刷新时批量处理失败: {}", processor_name, e);
                    }
                    if let Err(e) = processor.flush() {
                        eprintln!("[{}] 处理器刷新失败: {}", processor_name, e);
                    }
                    last_flush = Instant::now();

                    let _ = ack.send(());
                }

                LogCommand::Shutdown => {
                    if let Err(e) = Self::process_batch(&mut processor, &mut batch_buffer) {
                        eprintln!("[{}] 关闭时批量处理失败: {}", processor_name, e);
                    }
                    if let Err(e) = processor.flush() {
                        eprintln!("[{}] 关闭时处理器刷新失败: {}", processor_name, e);
                    }
                    if let Err(e) = processor.cleanup() {
                        eprintln!("[{}] 处理器清理失败: {}", processor_name, e);
                    }
                    break;
                }
            }
        }
    }

    /// 处理批量数据
    fn process_batch<P>(processor: &mut P, batch: &mut Vec<Vec<u8>>) -> Result<(), String>
    where
        P: LogProcessor,
    {
        if batch.is_empty() {
            return Ok(());
        }

        let result = processor.process_batch(batch);
        batch.clear();
        result
    }

    /// 发送写入命令
    pub fn send_write(&self, data: Vec<u8>) -> Result<(), String> {
        self.sender.send(LogCommand::Write(data))
            .map_err(|e| format!("[{}] 发送写入命令失败: {}", self.name, e))
    }

    /// 发送刷新命令并等待工作线程写出全部数据
    pub fn flush_blocking(&self) -> Result<(), String> {
        let (ack, done) = bounded(1);
        self.sender.send(LogCommand::Flush(ack))
            .map_err(|e| format!("[{}] 发送刷新命令失败: {}", self.name, e))?;
        done.recv()
            .map_err(|e| format!("[{}] 等待刷新完成失败: {}", self.name, e))
    }

    /// 发送停止命令
    pub fn send_shutdown(&self) -> Result<(), String> {
        self.sender.send(LogCommand::Shutdown)
            .map_err(|e| format!("[{}] 发送停止命令失败: {}", self.name, e))
    }
}

impl Drop for ProcessorWorker {
    fn drop(&mut self) {
        let _ = self.send_shutdown();

        if let Some(thread) = self.worker_thread.take() {
            let _ = thread.join();
        }
    }
}
