//! 日志头部格式
//!
//! `Lmmdd hh:mm:ss.uuuuuu pid file:line] msg`，L 为严重级别的首字母。

use std::io::{self, Write};
use chrono::{DateTime, Local};

use crate::config::Record;

/// 格式化一条记录，缺少换行时补上
pub fn format_record(record: &Record, now: DateTime<Local>, pid: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128);
    if let Err(e) = write_record(&mut buf, record, now, pid) {
        // 写入 Vec 只会在 Display 实现出错时失败
        eprintln!("[format] 格式化日志失败: {}", e);
    }
    if buf.last() != Some(&b'\n') {
        buf.push(b'\n');
    }
    buf
}

fn write_record(buf: &mut Vec<u8>, record: &Record, now: DateTime<Local>, pid: u32) -> io::Result<()> {
    write!(
        buf,
        "{}{} {:>7} {}:{}] {}",
        record.severity.as_char(),
        now.format("%m%d %H:%M:%S%.6f"),
        pid,
        base_name(record.file),
        record.line,
        record.args
    )
}

fn base_name(file: &str) -> &str {
    match file.rfind(['/', '\\']) {
        Some(slash) => &file[slash + 1..],
        None => file,
    }
}
