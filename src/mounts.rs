use crate::errors::{ErrorKind, Result};
use crate::host::{ensure_dir, Host};
use lazy_static::lazy_static;
use log::{info, warn};
use nix::mount::MsFlags;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// 一个挂载步骤，选项使用 mount(8) 的文本写法
#[derive(Debug, Clone, Copy)]
pub struct MountSpec {
    pub stage: &'static str,
    pub source: &'static str,
    pub target: &'static str,
    pub fstype: Option<&'static str>,
    pub options: &'static [&'static str],
}

/// 按顺序执行，后面的挂载依赖前面的挂载点
#[rustfmt::skip]
pub const NAMESPACE_MOUNTS: [MountSpec; 7] = [
    // 部分发行版要求根目录本身是挂载点
    MountSpec { stage: "self-bind", source: "/",      target: "/",           fstype: None,           options: &["bind"] },
    MountSpec { stage: "proc",      source: "proc",   target: "/proc",       fstype: Some("proc"),   options: &["nosuid", "noexec", "nodev"] },
    MountSpec { stage: "sysfs",     source: "sysfs",  target: "/sys",        fstype: Some("sysfs"),  options: &["ro", "nosuid", "noexec", "nodev"] },
    MountSpec { stage: "dev",       source: "tmpfs",  target: "/dev",        fstype: Some("tmpfs"),  options: &["nosuid", "size=65536k", "mode=755"] },
    MountSpec { stage: "devpts",    source: "devpts", target: "/dev/pts",    fstype: Some("devpts"), options: &["gid=4", "mode=620"] },
    MountSpec { stage: "shm",       source: "tmpfs",  target: "/dev/shm",    fstype: Some("tmpfs"),  options: &["nosuid", "noexec", "nodev", "mode=1777"] },
    MountSpec { stage: "mqueue",    source: "mqueue", target: "/dev/mqueue", fstype: Some("mqueue"), options: &[] },
];

/// 以只读方式绑定到自身的内核接口目录
pub const PROTECTED_PATHS: [&str; 7] = [
    "/proc/bus",
    "/proc/fs",
    "/proc/irq",
    "/proc/sys",
    "/proc/asound",
    "/proc/scsi",
    "/sys/firmware",
];

const MOUNT_DIR_MODE: u32 = 0o755;

/// 绑定重新挂载会替换全部挂载标志，必须带上父挂载的限制
const PROTECTED_FLAGS: MsFlags = MsFlags::MS_NOSUID
    .union(MsFlags::MS_NOEXEC)
    .union(MsFlags::MS_NODEV);

#[rustfmt::skip]
lazy_static! {
    static ref OPTIONS: HashMap<&'static str, (bool, MsFlags)> = {
        let mut m = HashMap::new();
        m.insert("ro",     (false, MsFlags::MS_RDONLY));
        m.insert("rw",     (true,  MsFlags::MS_RDONLY));
        m.insert("suid",   (true,  MsFlags::MS_NOSUID));
        m.insert("nosuid", (false, MsFlags::MS_NOSUID));
        m.insert("dev",    (true,  MsFlags::MS_NODEV));
        m.insert("nodev",  (false, MsFlags::MS_NODEV));
        m.insert("exec",   (true,  MsFlags::MS_NOEXEC));
        m.insert("noexec", (false, MsFlags::MS_NOEXEC));
        m.insert("bind",   (false, MsFlags::MS_BIND));
        m
    };
}

/// 解析挂载选项，未知选项作为文件系统数据传给内核
pub fn parse_mount_options(options: &[&str]) -> (MsFlags, Option<String>) {
    let mut flags = MsFlags::empty();
    let mut data = Vec::new();

    for option in options {
        match OPTIONS.get(*option) {
            Some((clear, flag)) => {
                if *clear {
                    flags.remove(*flag);
                } else {
                    flags.insert(*flag);
                }
            }
            None => data.push(*option),
        }
    }

    let data = if data.is_empty() {
        None
    } else {
        Some(data.join(","))
    };
    (flags, data)
}

fn mount_entry<H: Host + ?Sized>(host: &mut H, spec: &MountSpec) -> Result<()> {
    let target = Path::new(spec.target);
    let fail = |source| ErrorKind::MountFailed {
        stage: spec.stage,
        target: target.to_path_buf(),
        source,
    };

    ensure_dir(host, target, MOUNT_DIR_MODE).map_err(fail)?;

    let (flags, data) = parse_mount_options(spec.options);
    host.mount(Some(spec.source), target, spec.fstype, flags, data.as_deref())
        .map_err(fail)?;

    info!(
        "成功挂载 {} -> {} (类型: {}, 标志: {:?})",
        spec.source,
        spec.target,
        spec.fstype.unwrap_or("bind"),
        flags
    );
    Ok(())
}

/// 建立最小的虚拟文件系统树
///
/// 任意一步失败都会中止启动，挂载了一半的 /dev 不能继续创建设备节点。
pub fn mount_namespace<H: Host + ?Sized>(host: &mut H) -> Result<()> {
    for spec in NAMESPACE_MOUNTS.iter() {
        mount_entry(host, spec)?;
    }
    info!("文件系统挂载完成");
    Ok(())
}

/// 先绑定到自身，再以只读方式重新挂载
fn readonly_path<H: Host + ?Sized>(host: &mut H, path: &Path) -> std::io::Result<()> {
    host.open_dir(path)?;

    let source = path.to_string_lossy();
    host.mount(
        Some(source.as_ref()),
        path,
        None,
        MsFlags::MS_BIND | MsFlags::MS_REC,
        None,
    )?;
    host.mount(
        Some(source.as_ref()),
        path,
        None,
        MsFlags::MS_BIND
            | MsFlags::MS_REC
            | MsFlags::MS_RDONLY
            | MsFlags::MS_REMOUNT
            | PROTECTED_FLAGS,
        None,
    )
}

/// 保护内核接口目录，每个目录独立处理，失败只产生警告
pub fn protect_paths<H: Host + ?Sized>(host: &mut H) -> Vec<ErrorKind> {
    let mut warnings = Vec::new();

    for path in PROTECTED_PATHS.iter() {
        match readonly_path(host, Path::new(path)) {
            Ok(()) => info!("成功设置只读路径: {}", path),
            Err(source) => {
                warn!("设置只读路径 {} 失败，但继续执行: {}", path, source);
                warnings.push(ErrorKind::BindProtectFailed {
                    path: PathBuf::from(path),
                    source,
                });
            }
        }
    }

    warnings
}
