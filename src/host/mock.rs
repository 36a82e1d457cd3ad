//! 内存中的 [`Host`] 实现，记录每一次调用并模拟最小的文件系统语义。

use super::Host;
use crate::errors::Result;
use caps::Capability;
use nix::mount::MsFlags;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Dir,
    File,
    CharDev { major: u64, minor: u64, mode: u32, uid: u32, gid: u32 },
    Symlink(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Env(String),
    OpenDir(PathBuf),
    ListDir(PathBuf),
    Canonicalize(PathBuf),
    Mkdir(PathBuf),
    Chroot(PathBuf),
    Chdir(PathBuf),
    Mount {
        source: Option<String>,
        target: PathBuf,
        fstype: Option<String>,
        flags: MsFlags,
        data: Option<String>,
    },
    Remount(PathBuf),
    Mknod(PathBuf),
    Chown(PathBuf),
    Chmod(PathBuf),
    Symlink(PathBuf),
    Remove(PathBuf),
}

impl Call {
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Call::Env(_) | Call::OpenDir(_) | Call::ListDir(_) | Call::Canonicalize(_)
        )
    }

    pub fn touches_filesystem(&self) -> bool {
        !matches!(self, Call::Env(_))
    }
}

fn errno(code: i32) -> io::Error {
    io::Error::from_raw_os_error(code)
}

const PROC_ENTRIES: [&str; 9] = [
    "/proc/bus",
    "/proc/fs",
    "/proc/irq",
    "/proc/sys",
    "/proc/asound",
    "/proc/scsi",
    "/proc/self",
    "/proc/self/fd",
    "/proc/mounts",
];

const SYS_ENTRIES: [&str; 2] = ["/sys/kernel", "/sys/firmware"];

#[derive(Debug)]
pub struct MockHost {
    pub uid: u32,
    pub caps: HashSet<Capability>,
    pub env: HashMap<String, String>,
    /// chroot 之前可见的宿主目录
    pub host_dirs: BTreeSet<PathBuf>,
    /// 宿主路径到真实路径的映射，用于模拟指向 `/` 的符号链接
    pub aliases: HashMap<PathBuf, PathBuf>,
    /// chroot 之后可见的容器文件系统
    pub rootfs: BTreeMap<PathBuf, Node>,
    pub chrooted: bool,
    calls: RefCell<Vec<Call>>,
    pub fail_chroot: bool,
    pub fail_mounts: HashSet<PathBuf>,
    pub fail_mknod: HashSet<PathBuf>,
    /// 内核不提供的 proc/sys 条目
    pub absent_kernel_paths: HashSet<PathBuf>,
}

impl MockHost {
    /// 以 root 身份、拥有全部 capability、宿主上存在 `target` 的主机
    pub fn privileged(target: &str) -> Self {
        let mut host_dirs = BTreeSet::new();
        host_dirs.insert(PathBuf::from("/"));
        host_dirs.insert(PathBuf::from(target));

        let mut rootfs = BTreeMap::new();
        for dir in ["/", "/etc", "/bin", "/usr"] {
            rootfs.insert(PathBuf::from(dir), Node::Dir);
        }

        Self {
            uid: 0,
            caps: caps::all(),
            env: HashMap::new(),
            host_dirs,
            aliases: HashMap::new(),
            rootfs,
            chrooted: false,
            calls: RefCell::new(Vec::new()),
            fail_chroot: false,
            fail_mounts: HashSet::new(),
            fail_mknod: HashSet::new(),
            absent_kernel_paths: HashSet::new(),
        }
    }

    /// 模拟同一根目录上的下一次进程调用：回到宿主视图并清空调用记录
    pub fn relaunch(&mut self) {
        self.chrooted = false;
        self.calls.borrow_mut().clear();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn mount_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Mount { .. }))
            .collect()
    }

    pub fn mount_at(&self, target: &str) -> Option<Call> {
        self.calls().into_iter().find(|c| match c {
            Call::Mount { target: t, .. } => t == Path::new(target),
            _ => false,
        })
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    pub fn node(&self, path: &str) -> Option<&Node> {
        self.rootfs.get(Path::new(path))
    }

    fn parent_is_dir(&self, path: &Path) -> bool {
        match path.parent() {
            Some(parent) => matches!(self.rootfs.get(parent), Some(Node::Dir)),
            None => true,
        }
    }

    fn populate(&mut self, entries: &[&str]) {
        for entry in entries {
            let path = PathBuf::from(entry);
            if self.absent_kernel_paths.contains(&path) {
                continue;
            }
            let node = if *entry == "/proc/mounts" { Node::File } else { Node::Dir };
            self.rootfs.insert(path, node);
        }
    }
}

impl Host for MockHost {
    fn effective_uid(&self) -> u32 {
        self.uid
    }

    fn effective_capabilities(&self) -> Result<HashSet<Capability>> {
        Ok(self.caps.clone())
    }

    fn env_var(&self, key: &str) -> Option<OsString> {
        self.record(Call::Env(key.to_string()));
        self.env.get(key).map(OsString::from)
    }

    fn open_dir(&self, path: &Path) -> io::Result<()> {
        self.record(Call::OpenDir(path.to_path_buf()));
        let exists = if self.chrooted {
            matches!(self.rootfs.get(path), Some(Node::Dir))
        } else {
            self.host_dirs.contains(path)
        };
        if exists {
            Ok(())
        } else {
            Err(errno(libc::ENOENT))
        }
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
        self.record(Call::ListDir(path.to_path_buf()));
        if !matches!(self.rootfs.get(path), Some(Node::Dir)) || !self.chrooted {
            return Err(errno(libc::ENOENT));
        }
        Ok(self
            .rootfs
            .keys()
            .filter(|p| p.parent() == Some(path))
            .filter_map(|p| p.file_name().map(OsString::from))
            .collect())
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        self.record(Call::Canonicalize(path.to_path_buf()));
        if !self.host_dirs.contains(path) {
            return Err(errno(libc::ENOENT));
        }
        Ok(self.aliases.get(path).cloned().unwrap_or_else(|| path.to_path_buf()))
    }

    fn mkdir(&mut self, path: &Path, _mode: u32) -> io::Result<()> {
        self.record(Call::Mkdir(path.to_path_buf()));
        if self.rootfs.contains_key(path) {
            return Err(errno(libc::EEXIST));
        }
        if !self.parent_is_dir(path) {
            return Err(errno(libc::ENOENT));
        }
        self.rootfs.insert(path.to_path_buf(), Node::Dir);
        Ok(())
    }

    fn chroot(&mut self, path: &Path) -> io::Result<()> {
        self.record(Call::Chroot(path.to_path_buf()));
        if self.fail_chroot {
            return Err(errno(libc::EPERM));
        }
        if !self.host_dirs.contains(path) {
            return Err(errno(libc::ENOENT));
        }
        self.chrooted = true;
        Ok(())
    }

    fn chdir(&mut self, path: &Path) -> io::Result<()> {
        self.record(Call::Chdir(path.to_path_buf()));
        Ok(())
    }

    fn mount(
        &mut self,
        source: Option<&str>,
        target: &Path,
        fstype: Option<&str>,
        flags: MsFlags,
        data: Option<&str>,
    ) -> io::Result<()> {
        self.record(Call::Mount {
            source: source.map(str::to_string),
            target: target.to_path_buf(),
            fstype: fstype.map(str::to_string),
            flags,
            data: data.map(str::to_string),
        });
        if self.fail_mounts.contains(target) {
            return Err(errno(libc::EINVAL));
        }
        if !matches!(self.rootfs.get(target), Some(Node::Dir)) {
            return Err(errno(libc::ENOENT));
        }
        if flags.contains(MsFlags::MS_BIND) && !flags.contains(MsFlags::MS_REMOUNT) {
            if let Some(src) = source {
                if !self.rootfs.contains_key(Path::new(src)) {
                    return Err(errno(libc::ENOENT));
                }
            }
        }
        match fstype {
            Some("proc") => self.populate(&PROC_ENTRIES),
            Some("sysfs") => self.populate(&SYS_ENTRIES),
            _ => {}
        }
        Ok(())
    }

    fn remount_permissive(&mut self, target: &Path) -> io::Result<()> {
        self.record(Call::Remount(target.to_path_buf()));
        if self.host_dirs.contains(target) {
            Ok(())
        } else {
            Err(errno(libc::ENOENT))
        }
    }

    fn mknod_char(&mut self, path: &Path, mode: u32, major: u64, minor: u64) -> io::Result<()> {
        self.record(Call::Mknod(path.to_path_buf()));
        if self.fail_mknod.contains(path) {
            return Err(errno(libc::ENXIO));
        }
        if self.rootfs.contains_key(path) {
            return Err(errno(libc::EEXIST));
        }
        if !self.parent_is_dir(path) {
            return Err(errno(libc::ENOENT));
        }
        self.rootfs.insert(
            path.to_path_buf(),
            Node::CharDev { major, minor, mode, uid: 0, gid: 0 },
        );
        Ok(())
    }

    fn chown(&mut self, path: &Path, new_uid: u32, new_gid: u32) -> io::Result<()> {
        self.record(Call::Chown(path.to_path_buf()));
        match self.rootfs.get_mut(path) {
            Some(Node::CharDev { uid, gid, .. }) => {
                *uid = new_uid;
                *gid = new_gid;
                Ok(())
            }
            Some(_) => Ok(()),
            None => Err(errno(libc::ENOENT)),
        }
    }

    fn chmod(&mut self, path: &Path, new_mode: u32) -> io::Result<()> {
        self.record(Call::Chmod(path.to_path_buf()));
        match self.rootfs.get_mut(path) {
            Some(Node::CharDev { mode, .. }) => {
                *mode = new_mode;
                Ok(())
            }
            Some(_) => Ok(()),
            None => Err(errno(libc::ENOENT)),
        }
    }

    fn symlink(&mut self, target: &Path, link: &Path) -> io::Result<()> {
        self.record(Call::Symlink(link.to_path_buf()));
        if self.rootfs.contains_key(link) {
            return Err(errno(libc::EEXIST));
        }
        if !self.parent_is_dir(link) {
            return Err(errno(libc::ENOENT));
        }
        self.rootfs.insert(link.to_path_buf(), Node::Symlink(target.to_path_buf()));
        Ok(())
    }

    fn remove(&mut self, path: &Path) -> io::Result<()> {
        self.record(Call::Remove(path.to_path_buf()));
        match self.rootfs.remove(path) {
            Some(_) => Ok(()),
            None => Err(errno(libc::ENOENT)),
        }
    }
}
