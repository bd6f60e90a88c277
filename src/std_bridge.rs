//! `log` 门面桥接

use std::sync::Once;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::config::{Record, Severity};
use crate::core::{self, Logger};

static BRIDGE: StdLogBridge = StdLogBridge {
    severity: AtomicU8::new(Severity::Info as u8),
};

static INSTALL: Once = Once::new();

/// 把 `log` 的记录转发到指定严重级别
struct StdLogBridge {
    severity: AtomicU8,
}

impl log::Log for StdLogBridge {
    fn enabled(&self, _metadata: &log::Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        let severity = Severity::from_index(self.severity.load(Ordering::Relaxed));
        core::logger().log(&Record {
            severity,
            file: record.file().unwrap_or("???"),
            line: record.line().unwrap_or(1),
            args: *record.args(),
        });
    }

    fn flush(&self) {
        core::logger().flush();
    }
}

/// 让 `log` 门面的记录同时出现在 `name` 及更低级别的输出中
///
/// 有效名称为 INFO、WARNING、ERROR、FATAL；名称无法识别时 panic。
/// 通过本桥接写入的 FATAL 记录不会退出进程。
pub fn copy_standard_log_to(name: &str) {
    let severity = crate::severity_by_name("copy_standard_log_to", name);
    BRIDGE.severity.store(severity as u8, Ordering::Relaxed);

    INSTALL.call_once(|| match log::set_logger(&BRIDGE) {
        Ok(()) => log::set_max_level(log::LevelFilter::Trace),
        Err(e) => eprintln!("[std_bridge] 安装 log 桥接失败: {}", e),
    });
}
