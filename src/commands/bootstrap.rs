use crate::bootstrap::{Bootstrap, BootstrapReport};
use crate::config::BootstrapConfig;
use crate::errors::Result;
use crate::host::{Host, LinuxHost};
use log::info;

pub struct BootstrapCommand {
    pub rootfs: Option<String>,
    pub config: BootstrapConfig,
    pub json: bool,
}

impl BootstrapCommand {
    pub fn new(rootfs: Option<String>, config: BootstrapConfig, json: bool) -> Self {
        Self {
            rootfs,
            config,
            json,
        }
    }

    pub fn run_with<H: Host + ?Sized>(&self, host: &mut H) -> Result<BootstrapReport> {
        info!("初始化容器根目录: {}", self.rootfs.as_deref().unwrap_or("<未设置>"));
        Bootstrap::new(host, &self.config).run(self.rootfs.as_deref())
    }
}

impl super::Command for BootstrapCommand {
    fn execute(&self) -> Result<()> {
        let mut host = LinuxHost::new();
        let report = self.run_with(&mut host)?;

        if self.json {
            println!("{}", report.to_json()?);
        }
        Ok(())
    }
}
