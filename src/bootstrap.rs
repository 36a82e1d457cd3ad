use crate::chroot;
use crate::config::BootstrapConfig;
use crate::devices;
use crate::errors::{ErrorKind, Result, Stage};
use crate::guard;
use crate::host::Host;
use crate::mounts;
use crate::symlinks;
use crate::validate;
use log::{debug, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unvalidated,
    Validated,
    RootSwitched,
    AlreadyBootstrapped,
    Bootstrapping,
    Bootstrapped,
    Failed(Stage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    /// sysfs 标记已存在，只执行了切换根目录
    AlreadyBootstrapped,
    Bootstrapped,
}

#[derive(Debug)]
pub struct BootstrapReport {
    pub rootfs: PathBuf,
    pub outcome: Outcome,
    /// 被容忍的非致命错误
    pub warnings: Vec<ErrorKind>,
}

#[derive(Serialize)]
struct ReportView<'a> {
    rootfs: &'a Path,
    outcome: Outcome,
    warnings: Vec<String>,
}

impl BootstrapReport {
    pub fn to_json(&self) -> Result<String> {
        let view = ReportView {
            rootfs: &self.rootfs,
            outcome: self.outcome,
            warnings: self.warnings.iter().map(|w| w.to_string()).collect(),
        };
        Ok(serde_json::to_string_pretty(&view)?)
    }
}

/// 一次性的根目录初始化流程
///
/// 严格顺序执行，没有回滚：失败时已经完成的挂载留在内核中，
/// 由调用方通过挂载表处理。
pub struct Bootstrap<'a, H: Host + ?Sized> {
    host: &'a mut H,
    config: &'a BootstrapConfig,
    phase: Phase,
    warnings: Vec<ErrorKind>,
}

impl<'a, H: Host + ?Sized> Bootstrap<'a, H> {
    pub fn new(host: &'a mut H, config: &'a BootstrapConfig) -> Self {
        Self {
            host,
            config,
            phase: Phase::Unvalidated,
            warnings: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn transition(&mut self, next: Phase) {
        debug!("启动阶段: {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }

    /// 失败后 [`phase`](Self::phase) 停在 `Failed`，错误本身由调用方输出
    pub fn run(&mut self, target: Option<&str>) -> Result<BootstrapReport> {
        let result = self.steps(target);
        if let Err(ref e) = result {
            self.transition(Phase::Failed(e.stage()));
        }
        result
    }

    fn steps(&mut self, target: Option<&str>) -> Result<BootstrapReport> {
        let rootfs = validate::validate(&*self.host, target)?;
        self.transition(Phase::Validated);

        guard::remount_data_partition(&mut *self.host, self.config.data_dir.as_deref());

        chroot::switch_root(&mut *self.host, &rootfs)?;
        self.transition(Phase::RootSwitched);

        if guard::already_bootstrapped(&*self.host) {
            self.transition(Phase::AlreadyBootstrapped);
            info!("{} 已经初始化，跳过挂载", rootfs.display());
            return Ok(self.report(rootfs, Outcome::AlreadyBootstrapped));
        }

        self.transition(Phase::Bootstrapping);
        mounts::mount_namespace(&mut *self.host)?;

        let mut warnings = devices::provision(&mut *self.host);
        warnings.extend(mounts::protect_paths(&mut *self.host));
        warnings.extend(symlinks::fix_compat(&mut *self.host));
        self.warnings = warnings;

        self.transition(Phase::Bootstrapped);
        if self.warnings.is_empty() {
            info!("容器根目录 {} 初始化完成", rootfs.display());
        } else {
            warn!(
                "容器根目录 {} 初始化完成，{} 个非致命错误",
                rootfs.display(),
                self.warnings.len()
            );
        }
        Ok(self.report(rootfs, Outcome::Bootstrapped))
    }

    fn report(&mut self, rootfs: PathBuf, outcome: Outcome) -> BootstrapReport {
        BootstrapReport {
            rootfs,
            outcome,
            warnings: std::mem::take(&mut self.warnings),
        }
    }
}

pub fn exit_code<T>(result: &Result<T>) -> i32 {
    match result {
        Ok(_) => EXIT_SUCCESS,
        Err(_) => EXIT_FAILURE,
    }
}
