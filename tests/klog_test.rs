//! 全局门面的集成测试
//!
//! 各测试共享全局日志器和 vmodule 过滤器，通过 `setup` 串行执行。
//! 本文件名去掉后缀为 `klog_test`，vmodule 规则按这个名字匹配。

use std::io::Write;
use std::panic::Location;
use std::sync::Arc;
use std::thread;

use parking_lot::{Mutex, MutexGuard};
use rat_klog::{Level, Severity, error, info, v, vlog, warning};

static SERIAL: Mutex<()> = parking_lot::const_mutex(());

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Capture {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

/// 每个严重级别一个捕获输出，析构时恢复默认配置
struct Setup {
    outputs: Vec<Capture>,
    _serial: MutexGuard<'static, ()>,
}

impl Setup {
    fn contents(&self, severity: Severity) -> String {
        rat_klog::flush();
        self.outputs[severity.index()].contents()
    }

    fn contains(&self, severity: Severity, text: &str) -> bool {
        self.contents(severity).contains(text)
    }
}

impl Drop for Setup {
    fn drop(&mut self) {
        rat_klog::clear_outputs();
        for (name, value) in [
            ("v", "0"),
            ("vmodule", ""),
            ("logtostderr", "true"),
            ("alsologtostderr", "false"),
            ("stderrthreshold", "ERROR"),
        ] {
            if let Err(e) = rat_klog::set_flag(name, value) {
                panic!("error resetting {}={:?}: {}", name, value, e);
            }
        }
    }
}

fn setup(flags: &[(&str, &str)]) -> Setup {
    let serial = SERIAL.lock();

    rat_klog::set_flag("logtostderr", "false").unwrap();
    rat_klog::set_flag("stderrthreshold", "FATAL").unwrap();

    let outputs: Vec<Capture> = Severity::ALL.iter().map(|_| Capture::default()).collect();
    for (severity, capture) in Severity::ALL.iter().zip(&outputs) {
        rat_klog::set_output_by_severity(severity.name(), capture.clone());
    }

    for (name, value) in flags {
        if let Err(e) = rat_klog::set_flag(name, value) {
            panic!("error setting {}={:?}: {}", name, value, e);
        }
    }

    Setup { outputs, _serial: serial }
}

#[test]
fn test_info() {
    let setup = setup(&[]);
    info!("test");
    assert!(setup.contents(Severity::Info).starts_with('I'), "Info has wrong character: {:?}", setup.contents(Severity::Info));
    assert!(setup.contains(Severity::Info, "test"));
    assert!(setup.contains(Severity::Info, "klog_test.rs:"));
}

/// 封装函数，日志位置取自它的调用者
#[track_caller]
fn info_from_caller(msg: &str) {
    info!("{}", msg);
}

#[test]
fn test_info_reports_outer_caller() {
    let setup = setup(&[]);
    let line = line!() + 1;
    info_from_caller("depth-test1");
    info!("depth-test0");

    let contents = setup.contents(Severity::Info);
    let want = format!("klog_test.rs:{}] depth-test1", line);
    assert!(contents.contains(&want), "missing {:?}: {:?}", want, contents);
    let want = format!("klog_test.rs:{}] depth-test0", line + 1);
    assert!(contents.contains(&want), "missing {:?}: {:?}", want, contents);
}

#[test]
fn test_log_at_explicit_location() {
    let setup = setup(&[]);
    let location = Location::caller();
    let line = location.line();

    rat_klog::log_at(Severity::Warning, location, format_args!("placed"));
    rat_klog::log_at(Severity::Info, location, format_args!("placed again"));

    let want = format!("klog_test.rs:{}] placed", line);
    assert!(setup.contains(Severity::Warning, &want));
    assert!(setup.contains(Severity::Info, &format!("klog_test.rs:{}] placed again", line)));
}

#[test]
fn test_error_goes_to_lower_severities() {
    let setup = setup(&[]);
    error!("boom {}", 7);

    assert!(setup.contents(Severity::Error).starts_with('E'));
    assert!(setup.contains(Severity::Error, "boom 7"));
    assert!(setup.contains(Severity::Warning, "boom 7"));
    assert!(setup.contains(Severity::Info, "boom 7"));
    assert_eq!(setup.contents(Severity::Fatal), "");
}

#[test]
fn test_warning_does_not_reach_error() {
    let setup = setup(&[]);
    warning!("careful");

    assert!(setup.contents(Severity::Warning).starts_with('W'));
    assert!(setup.contains(Severity::Info, "careful"));
    assert_eq!(setup.contents(Severity::Error), "");
}

#[test]
fn test_set_output_shared_by_all_severities() {
    let _setup = setup(&[]);
    let capture = Capture::default();
    rat_klog::set_output(capture.clone());

    error!("once");
    rat_klog::flush();

    assert_eq!(capture.contents().matches("once").count(), 1);
}

#[test]
fn test_v() {
    let setup = setup(&[("v", "2")]);
    v(2).info(format_args!("test"));
    assert!(setup.contents(Severity::Info).starts_with('I'));
    assert!(setup.contains(Severity::Info, "test"));
}

#[test]
fn test_vmodule_on() {
    let setup = setup(&[("vmodule", "klog_test=2")]);
    assert!(v(1).enabled(), "V not enabled for 1");
    assert!(v(2).enabled(), "V not enabled for 2");
    assert!(!v(3).enabled(), "V enabled for 3");

    vlog!(2, "test");
    assert!(setup.contents(Severity::Info).starts_with('I'));
    assert!(setup.contains(Severity::Info, "test"));
}

#[test]
fn test_vmodule_off() {
    let setup = setup(&[("vmodule", "notthisfile=2")]);
    for i in 1..=3 {
        assert!(!v(i).enabled(), "V enabled for {}", i);
    }
    vlog!(2, "test");
    assert_eq!(setup.contents(Severity::Info), "", "V logged incorrectly");
}

#[test]
fn test_vlog_skips_argument_evaluation() {
    let _setup = setup(&[]);
    let mut evaluated = false;
    vlog!(5, "{}", {
        evaluated = true;
        "never"
    });
    assert!(!evaluated);
}

/// 这些模式在 V=2 时匹配或不匹配本文件
const V_GLOBS: &[(&str, bool)] = &[
    ("klog_test=1", false), // vmodule 设为 1 时 v(2) 失败
    ("klog_test=2", true),
    ("klog_test=3", true),
    ("*=2", true),
    ("?l*=2", true),
    ("????_*=2", true),
    ("??[mno]?_*t=2", true),
    ("*x=2", false),
    ("m*=2", false),
    ("??_*=2", false),
    ("?[abc]?_*t=2", false),
];

fn check_vmodule_glob(pattern: &str, matched: bool) {
    let _setup = setup(&[("vmodule", pattern)]);
    assert_eq!(v(2), matched, "incorrect match for {:?}", pattern);
}

#[test]
fn test_vmodule_glob() {
    for (pattern, matched) in V_GLOBS {
        check_vmodule_glob(pattern, *matched);
    }
}

#[test]
fn test_first_match_wins() {
    let _setup = setup(&[("vmodule", "klog*=1,klog_test=5")]);
    assert!(v(1).enabled());
    assert!(!v(2).enabled());
}

/// 固定的调用点，用于观察缓存失效
fn gate(level: i32) -> bool {
    v(level).enabled()
}

/// 封装 `v()`，调用点取自它的调用者
#[track_caller]
fn verbose_from_caller(level: i32) -> bool {
    v(level).enabled()
}

#[test]
fn test_v_through_wrapper_uses_outer_site() {
    let _setup = setup(&[("vmodule", "klog_test=2")]);
    let filter = rat_klog::vmodule::global();
    assert_eq!(filter.cached_sites(), 0);

    assert!(verbose_from_caller(2));
    assert!(!verbose_from_caller(3));
    assert_eq!(filter.cached_sites(), 2);

    // 同一个外层调用点只缓存一次
    for _ in 0..3 {
        assert!(verbose_from_caller(1));
    }
    assert_eq!(filter.cached_sites(), 3);

    // 普通函数内的 v() 始终是同一个调用点
    assert!(gate(2));
    assert!(!gate(3));
    assert_eq!(filter.cached_sites(), 4);
}

#[test]
fn test_vmodule_update_invalidates_cache() {
    let _setup = setup(&[("vmodule", "klog_test=1")]);
    assert!(gate(1));
    assert!(!gate(3));

    rat_klog::set_flag("vmodule", "klog_test=3").unwrap();
    assert!(gate(3));

    rat_klog::set_flag("vmodule", "klog_test=0").unwrap();
    assert!(!gate(1));

    rat_klog::set_flag("vmodule", "klog_test=bar").unwrap();
    assert!(!gate(1));
}

#[test]
fn test_global_verbosity_wins_over_vmodule() {
    let _setup = setup(&[("v", "4"), ("vmodule", "klog_test=1")]);
    assert!(v(4).enabled());
    assert!(!v(5).enabled());
}

#[test]
fn test_flags_read_back() {
    let _setup = setup(&[("vmodule", "gopher*=3,"), ("v", "1")]);
    assert_eq!(rat_klog::flag("vmodule").as_deref(), Some("gopher*=3,"));
    assert_eq!(rat_klog::flag("v").as_deref(), Some("1"));
    assert_eq!(rat_klog::flag("log_dir"), None);

    assert!(rat_klog::set_flag("v", "two").is_err());
    assert!(rat_klog::set_flag("log_dir", "/tmp").is_err());
    assert!(rat_klog::set_flag("vmodule", "foo=bar,,=,x").is_ok());
}

#[test]
fn test_stats() {
    let _setup = setup(&[]);
    let before = rat_klog::stats();
    info!("counted");
    error!("counted");
    let after = rat_klog::stats();

    assert_eq!(after.info.lines - before.info.lines, 1);
    assert_eq!(after.error.lines - before.error.lines, 1);
    assert!(after.info.bytes - before.info.bytes >= "counted".len() as i64);
}

#[test]
fn test_copy_standard_log_to() {
    let setup = setup(&[]);
    rat_klog::copy_standard_log_to("WARNING");
    log::info!("from the log facade");

    assert!(setup.contains(Severity::Warning, "from the log facade"));
    assert!(setup.contains(Severity::Info, "from the log facade"));
    assert_eq!(setup.contents(Severity::Error), "");
}

#[test]
#[should_panic(expected = "无法识别的严重级别名称")]
fn test_set_output_by_severity_unknown_name() {
    rat_klog::set_output_by_severity("DEBUG", Capture::default());
}

#[test]
#[should_panic(expected = "无法识别的严重级别名称")]
fn test_copy_standard_log_to_unknown_name() {
    rat_klog::copy_standard_log_to("VERBOSE");
}

#[test]
fn test_init_only_once() {
    let _serial = SERIAL.lock();
    let first = rat_klog::fmt().with_vmodule("klog_test=2").init();
    assert!(first.is_ok());
    assert!(gate(2));
    assert!(!gate(3));

    let second = rat_klog::fmt().init();
    assert!(matches!(second, Err(rat_klog::InitError::AlreadyInitialized)));
    rat_klog::set_flag("vmodule", "").unwrap();
    assert!(!gate(2));
}

#[test]
fn test_concurrent_v_and_set_flag() {
    let _setup = setup(&[]);
    let handles: Vec<_> = (0..8)
        .map(|i| {
            thread::spawn(move || {
                for _ in 0..200 {
                    if i % 2 == 0 {
                        let _ = v(Level(2)).enabled();
                        rat_klog::flush();
                    } else {
                        rat_klog::set_flag("vmodule", "klog_test=2").unwrap();
                        rat_klog::set_output_by_severity("INFO", std::io::sink());
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    rat_klog::set_flag("vmodule", "klog_test=2").unwrap();
    assert!(v(2).enabled());
}
