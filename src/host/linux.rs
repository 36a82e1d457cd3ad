use super::Host;
use crate::errors::Result;
use caps::{CapSet, Capability};
use log::debug;
use nix::mount::{mount, MsFlags};
use nix::sys::stat::{makedev, mknod, Mode, SFlag};
use nix::sys::statvfs::{statvfs, FsFlags};
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs::{self, DirBuilder, Permissions};
use std::io;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};

/// 直接调用内核的实现
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxHost;

impl LinuxHost {
    pub fn new() -> Self {
        Self
    }
}

// statvfs 标志到 mount 标志的映射，remount 时需要保留
const KEPT_FLAGS: [(FsFlags, MsFlags); 6] = [
    (FsFlags::ST_RDONLY, MsFlags::MS_RDONLY),
    (FsFlags::ST_SYNCHRONOUS, MsFlags::MS_SYNCHRONOUS),
    (FsFlags::ST_MANDLOCK, MsFlags::MS_MANDLOCK),
    (FsFlags::ST_NOATIME, MsFlags::MS_NOATIME),
    (FsFlags::ST_NODIRATIME, MsFlags::MS_NODIRATIME),
    (FsFlags::ST_RELATIME, MsFlags::MS_RELATIME),
];

fn kept_flags(current: FsFlags) -> MsFlags {
    KEPT_FLAGS
        .iter()
        .filter(|(st, _)| current.contains(*st))
        .fold(MsFlags::empty(), |acc, (_, ms)| acc | *ms)
}

impl Host for LinuxHost {
    fn effective_uid(&self) -> u32 {
        nix::unistd::geteuid().as_raw()
    }

    fn effective_capabilities(&self) -> Result<HashSet<Capability>> {
        Ok(caps::read(None, CapSet::Effective)?)
    }

    fn env_var(&self, key: &str) -> Option<OsString> {
        std::env::var_os(key)
    }

    fn open_dir(&self, path: &Path) -> io::Result<()> {
        fs::read_dir(path).map(drop)
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
        fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect()
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }

    fn mkdir(&mut self, path: &Path, mode: u32) -> io::Result<()> {
        DirBuilder::new().mode(mode).create(path)
    }

    fn chroot(&mut self, path: &Path) -> io::Result<()> {
        nix::unistd::chroot(path).map_err(io::Error::from)
    }

    fn chdir(&mut self, path: &Path) -> io::Result<()> {
        nix::unistd::chdir(path).map_err(io::Error::from)
    }

    fn mount(
        &mut self,
        source: Option<&str>,
        target: &Path,
        fstype: Option<&str>,
        flags: MsFlags,
        data: Option<&str>,
    ) -> io::Result<()> {
        debug!(
            "mount {:?} -> {} (类型: {:?}, 标志: {:?}, 数据: {:?})",
            source,
            target.display(),
            fstype,
            flags,
            data
        );
        mount(source, target, fstype, flags, data).map_err(io::Error::from)
    }

    fn remount_permissive(&mut self, target: &Path) -> io::Result<()> {
        let current = statvfs(target).map_err(io::Error::from)?;
        let flags = MsFlags::MS_REMOUNT | kept_flags(current.flags());
        debug!("重新挂载 {}，标志: {:?}", target.display(), flags);
        mount(None::<&str>, target, None::<&str>, flags, None::<&str>).map_err(io::Error::from)
    }

    fn mknod_char(&mut self, path: &Path, mode: u32, major: u64, minor: u64) -> io::Result<()> {
        let perm = Mode::from_bits_truncate(mode as libc::mode_t);
        mknod(path, SFlag::S_IFCHR, perm, makedev(major, minor)).map_err(io::Error::from)
    }

    fn chown(&mut self, path: &Path, uid: u32, gid: u32) -> io::Result<()> {
        std::os::unix::fs::chown(path, Some(uid), Some(gid))
    }

    fn chmod(&mut self, path: &Path, mode: u32) -> io::Result<()> {
        fs::set_permissions(path, Permissions::from_mode(mode))
    }

    fn symlink(&mut self, target: &Path, link: &Path) -> io::Result<()> {
        std::os::unix::fs::symlink(target, link)
    }

    fn remove(&mut self, path: &Path) -> io::Result<()> {
        if fs::symlink_metadata(path)?.is_dir() {
            fs::remove_dir(path)
        } else {
            fs::remove_file(path)
        }
    }
}
