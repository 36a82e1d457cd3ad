use env_logger::{Builder, Env};
use std::io::Write;

/// 初始化日志系统
///
/// `RUST_LOG` 优先于配置文件中的级别。
pub fn init(level: &str) -> Result<(), log::SetLoggerError> {
    Builder::from_env(Env::default().default_filter_or(level))
        .format(|buf, record| writeln!(buf, "{} - {}", record.level(), record.args()))
        .target(env_logger::Target::Stderr)
        .try_init()
}
