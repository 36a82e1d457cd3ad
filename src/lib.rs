#![allow(unknown_lints)]

pub mod bootstrap;
pub mod chroot;
pub mod commands;
pub mod config;
pub mod devices;
pub mod errors;
pub mod guard;
pub mod host;
pub mod logger;
pub mod mounts;
pub mod symlinks;
pub mod validate;

// 重新导出主要的类型和函数
pub use bootstrap::{Bootstrap, BootstrapReport, Outcome, Phase};
pub use config::BootstrapConfig;
pub use errors::{ErrorKind, Result, Stage};
pub use host::{Host, LinuxHost};
