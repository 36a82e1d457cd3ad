//! 启动流程访问内核与文件系统的唯一入口。
//!
//! 所有特权操作都经过 [`Host`]，流程本身只根据返回的 `io::Result`
//! 决定下一步，不读取全局 errno。

pub mod linux;
#[cfg(test)]
pub mod mock;

use crate::errors::Result;
use caps::Capability;
use nix::mount::MsFlags;
use std::collections::HashSet;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

pub use linux::LinuxHost;

pub trait Host {
    /// 当前进程的有效用户 ID
    fn effective_uid(&self) -> u32;

    /// 当前进程的有效 capability 集合
    fn effective_capabilities(&self) -> Result<HashSet<Capability>>;

    /// 只读访问环境变量
    fn env_var(&self, key: &str) -> Option<OsString>;

    /// 以目录方式打开路径，成功即说明路径存在且可读
    fn open_dir(&self, path: &Path) -> io::Result<()>;

    /// 列出目录中的条目名称
    fn list_dir(&self, path: &Path) -> io::Result<Vec<OsString>>;

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    fn mkdir(&mut self, path: &Path, mode: u32) -> io::Result<()>;

    fn chroot(&mut self, path: &Path) -> io::Result<()>;

    fn chdir(&mut self, path: &Path) -> io::Result<()>;

    fn mount(
        &mut self,
        source: Option<&str>,
        target: &Path,
        fstype: Option<&str>,
        flags: MsFlags,
        data: Option<&str>,
    ) -> io::Result<()>;

    /// 保留现有挂载标志重新挂载，同时清除 nosuid、noexec 和 nodev
    fn remount_permissive(&mut self, target: &Path) -> io::Result<()>;

    fn mknod_char(&mut self, path: &Path, mode: u32, major: u64, minor: u64) -> io::Result<()>;

    fn chown(&mut self, path: &Path, uid: u32, gid: u32) -> io::Result<()>;

    fn chmod(&mut self, path: &Path, mode: u32) -> io::Result<()>;

    fn symlink(&mut self, target: &Path, link: &Path) -> io::Result<()>;

    /// 删除文件、符号链接或空目录
    fn remove(&mut self, path: &Path) -> io::Result<()>;
}

/// 创建目录，已存在不算错误
pub fn ensure_dir<H: Host + ?Sized>(host: &mut H, path: &Path, mode: u32) -> io::Result<()> {
    match host.mkdir(path, mode) {
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        other => other,
    }
}
