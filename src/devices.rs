use crate::errors::ErrorKind;
use crate::host::{ensure_dir, Host};
use log::{debug, info, warn};
use std::io;
use std::path::{Path, PathBuf};

/// tty 设备组
pub const TTY_GID: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceNode {
    pub path: &'static str,
    pub major: u64,
    pub minor: u64,
    pub uid: u32,
    pub gid: u32,
    pub mode: u32,
}

/// 主次设备号与内核驱动的标准分配一致
#[rustfmt::skip]
pub const STANDARD_DEVICES: [DeviceNode; 8] = [
    DeviceNode { path: "/dev/null",    major: 1,  minor: 3,   uid: 0, gid: 0,       mode: 0o666 },
    DeviceNode { path: "/dev/console", major: 5,  minor: 1,   uid: 0, gid: TTY_GID, mode: 0o622 },
    DeviceNode { path: "/dev/zero",    major: 1,  minor: 5,   uid: 0, gid: 0,       mode: 0o666 },
    DeviceNode { path: "/dev/ptmx",    major: 5,  minor: 2,   uid: 0, gid: TTY_GID, mode: 0o666 },
    DeviceNode { path: "/dev/tty",     major: 5,  minor: 0,   uid: 0, gid: TTY_GID, mode: 0o666 },
    DeviceNode { path: "/dev/random",  major: 1,  minor: 8,   uid: 0, gid: 0,       mode: 0o444 },
    DeviceNode { path: "/dev/urandom", major: 1,  minor: 9,   uid: 0, gid: 0,       mode: 0o444 },
    DeviceNode { path: "/dev/net/tun", major: 10, minor: 200, uid: 0, gid: 0,       mode: 0o666 },
];

const PARENT_DIR_MODE: u32 = 0o755;

fn mknod_dev<H: Host + ?Sized>(host: &mut H, dev: &DeviceNode) -> io::Result<()> {
    let path = Path::new(dev.path);
    if let Some(parent) = path.parent() {
        ensure_dir(host, parent, PARENT_DIR_MODE)?;
    }

    match host.mknod_char(path, dev.mode, dev.major, dev.minor) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            debug!("设备节点 {} 已存在", dev.path);
        }
        Err(e) => return Err(e),
    }

    // mknod 的权限会被 umask 削减，因此显式设置
    host.chown(path, dev.uid, dev.gid)?;
    host.chmod(path, dev.mode)
}

/// 在新的 /dev 中创建标准字符设备
///
/// 已存在的节点视为成功。其他失败只记录警告，并非每个内核都提供全部驱动。
pub fn provision<H: Host + ?Sized>(host: &mut H) -> Vec<ErrorKind> {
    let mut warnings = Vec::new();

    for dev in STANDARD_DEVICES.iter() {
        match mknod_dev(host, dev) {
            Ok(()) => debug!("创建设备节点 {} ({}:{})", dev.path, dev.major, dev.minor),
            Err(source) => {
                warn!("创建设备节点 {} 失败，但继续执行: {}", dev.path, source);
                warnings.push(ErrorKind::DeviceNodeFailed {
                    path: PathBuf::from(dev.path),
                    source,
                });
            }
        }
    }

    info!(
        "设备节点创建完成: {}/{}",
        STANDARD_DEVICES.len() - warnings.len(),
        STANDARD_DEVICES.len()
    );
    warnings
}
