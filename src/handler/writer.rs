//! 自定义输出处理器 - 写入调用方提供的 `Write`

use std::io::Write;
use std::sync::Arc;
use parking_lot::Mutex;

use crate::producer_consumer::LogProcessor;

/// 可在多个严重级别之间共享的输出
pub type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// 包装一个 `Write` 为共享输出
pub fn shared<W: Write + Send + 'static>(writer: W) -> SharedWriter {
    Arc::new(Mutex::new(Box::new(writer)))
}

/// 写入共享输出的处理器
pub struct WriterProcessor {
    writer: SharedWriter,
}

impl WriterProcessor {
    pub fn new(writer: SharedWriter) -> Self {
        Self { writer }
    }
}

impl LogProcessor for WriterProcessor {
    fn name(&self) -> &'static str {
        "writer"
    }

    fn process(&mut self, data: &[u8]) -> Result<(), String> {
        self.writer.lock().write_all(data)
            .map_err(|e| format!("写入输出失败: {}", e))
    }

    fn process_batch(&mut self, batch: &[Vec<u8>]) -> Result<(), String> {
        let mut writer = self.writer.lock();
        for data in batch {
            writer.write_all(data)
                .map_err(|e| format!("批量写入输出失败: {}", e))?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), String> {
        self.writer.lock().flush()
            .map_err(|e| format!("刷新输出失败: {}", e))
    }
}
