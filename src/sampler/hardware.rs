//! Host hardware samplers backed by `sysinfo`
//!
//! All reads are blocking and run through [`blocking`].

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use sysinfo::{Components, Disks, ProcessesToUpdate, System};

use super::render::{escape, fixed2, Table};
use super::{blocking, Fragment, Sampler, SamplerError};

const MEGABYTE: u64 = 1024 * 1024;
const GIGABYTE: u64 = MEGABYTE * 1024;

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// OS, host and memory overview
pub struct SystemSampler;

#[async_trait]
impl Sampler for SystemSampler {
    fn name(&self) -> &str {
        "system"
    }

    fn targets(&self) -> &[&'static str] {
        &["system-data"]
    }

    async fn sample(&self) -> Result<Vec<Fragment>, SamplerError> {
        let html = blocking(|| {
            let mut sys = System::new();
            sys.refresh_memory();
            sys.refresh_processes(ProcessesToUpdate::All, true);

            let total = sys.total_memory();
            if total == 0 {
                return Err(SamplerError::Unavailable("memory statistics".to_string()));
            }

            let platform = System::long_os_version()
                .or_else(System::name)
                .unwrap_or_else(|| "unknown".to_string());
            let hostname = System::host_name().unwrap_or_else(|| "unknown".to_string());

            let mut table = Table::new("system-data");
            table
                .row(["Operating System:".to_string(), escape(std::env::consts::OS)])
                .row(["Platform:".to_string(), escape(&platform)])
                .row(["Hostname:".to_string(), escape(&hostname)])
                .row([
                    "Number of processes running:".to_string(),
                    sys.processes().len().to_string(),
                ])
                .row(["Total memory:".to_string(), format!("{} MB", total / MEGABYTE)])
                .row([
                    "Free memory:".to_string(),
                    format!("{} MB", sys.free_memory() / MEGABYTE),
                ])
                .row([
                    "Percentage used memory:".to_string(),
                    format!("{}%", fixed2(percent(sys.used_memory(), total))),
                ]);
            Ok(table.render())
        })
        .await?;

        Ok(vec![Fragment::new("system-data", html)])
    }
}

/// Usage of the filesystem mounted at `mount_point`
pub struct DiskSampler {
    mount_point: PathBuf,
}

impl DiskSampler {
    pub fn new(mount_point: impl Into<PathBuf>) -> Self {
        Self {
            mount_point: mount_point.into(),
        }
    }
}

impl Default for DiskSampler {
    fn default() -> Self {
        Self::new("/")
    }
}

#[async_trait]
impl Sampler for DiskSampler {
    fn name(&self) -> &str {
        "disk"
    }

    fn targets(&self) -> &[&'static str] {
        &["disk-data"]
    }

    async fn sample(&self) -> Result<Vec<Fragment>, SamplerError> {
        let mount_point = self.mount_point.clone();
        let html = blocking(move || {
            let disks = Disks::new_with_refreshed_list();
            let disk = disks
                .list()
                .iter()
                .find(|disk| disk.mount_point() == mount_point.as_path())
                .ok_or_else(|| {
                    SamplerError::Unavailable(format!("filesystem {}", mount_point.display()))
                })?;

            let total = disk.total_space();
            let free = disk.available_space();
            let used = total.saturating_sub(free);

            let mut table = Table::new("disk-data");
            table
                .row(["Total disk space:".to_string(), format!("{} GB", total / GIGABYTE)])
                .row(["Used disk space:".to_string(), format!("{} GB", used / GIGABYTE)])
                .row(["Free disk space:".to_string(), format!("{} GB", free / GIGABYTE)])
                .row([
                    "Percentage disk space usage:".to_string(),
                    format!("{}%", fixed2(percent(used, total))),
                ]);
            Ok(table.render())
        })
        .await?;

        Ok(vec![Fragment::new("disk-data", html)])
    }
}

/// CPU model and per-core usage
///
/// Usage is the delta since the previous sample, so the `System` handle is
/// kept between cycles.
pub struct CpuSampler {
    system: Arc<Mutex<System>>,
}

impl CpuSampler {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_all();

        Self {
            system: Arc::new(Mutex::new(system)),
        }
    }
}

impl Default for CpuSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Render per-core usage as two side-by-side columns
fn core_columns(usages: &[f32]) -> String {
    let half = usages.len() / 2;
    let (first, second) = usages.split_at(half);

    let column = |cores: &[f32], offset: usize| {
        let mut html = String::from("<div class='col-md-6'><table class='table table-sm'><tbody>");
        for (idx, usage) in cores.iter().enumerate() {
            html.push_str(&format!(
                "<tr><td>CPU [{}]: {}%</td></tr>",
                idx + offset,
                fixed2(*usage as f64)
            ));
        }
        html.push_str("</tbody></table></div>");
        html
    };

    format!(
        "<div class='row mb-4'>{}{}</div>",
        column(first, 0),
        column(second, half)
    )
}

#[async_trait]
impl Sampler for CpuSampler {
    fn name(&self) -> &str {
        "cpu"
    }

    fn targets(&self) -> &[&'static str] {
        &["cpu-data"]
    }

    async fn sample(&self) -> Result<Vec<Fragment>, SamplerError> {
        let system = Arc::clone(&self.system);
        let html = blocking(move || {
            let mut sys = system.lock().unwrap_or_else(PoisonError::into_inner);
            sys.refresh_cpu_all();

            let cpus = sys.cpus();
            let first = cpus
                .first()
                .ok_or_else(|| SamplerError::Unavailable("CPU information".to_string()))?;
            let usages: Vec<f32> = cpus.iter().map(|cpu| cpu.cpu_usage()).collect();

            let mut table = Table::new("cpu-data");
            table
                .row(["Model Name:".to_string(), escape(first.brand())])
                .row(["Vendor:".to_string(), escape(first.vendor_id())])
                .row(["Speed:".to_string(), format!("{} MHz", first.frequency())])
                .row(["Cores: ".to_string(), core_columns(&usages)]);
            Ok(table.render())
        })
        .await?;

        Ok(vec![Fragment::new("cpu-data", html)])
    }
}

/// 1, 5 and 15 minute load averages
pub struct LoadSampler;

#[async_trait]
impl Sampler for LoadSampler {
    fn name(&self) -> &str {
        "load"
    }

    fn targets(&self) -> &[&'static str] {
        &["load"]
    }

    async fn sample(&self) -> Result<Vec<Fragment>, SamplerError> {
        let load = System::load_average();

        let mut table = Table::new("load");
        table.row([
            "Average Load: ".to_string(),
            fixed2(load.one),
            fixed2(load.five),
            fixed2(load.fifteen),
        ]);

        Ok(vec![Fragment::new("load", table.render())])
    }
}

/// Temperature sensors
///
/// Sensors that cannot be read are skipped rather than failing the section;
/// many hosts expose at least one broken sensor.
pub struct SensorSampler;

#[async_trait]
impl Sampler for SensorSampler {
    fn name(&self) -> &str {
        "sensors"
    }

    fn targets(&self) -> &[&'static str] {
        &["systemp"]
    }

    async fn sample(&self) -> Result<Vec<Fragment>, SamplerError> {
        let html = blocking(|| {
            let components = Components::new_with_refreshed_list();

            let mut table = Table::new("system-data").header(&["Device", "Temp", "Threshold"]);
            for component in components.list() {
                let Some(temperature) = component.temperature() else {
                    continue;
                };
                let threshold = component
                    .critical()
                    .map(|t| fixed2(t as f64))
                    .unwrap_or_default();

                table.row([escape(component.label()), fixed2(temperature as f64), threshold]);
            }
            Ok(table.render())
        })
        .await?;

        Ok(vec![Fragment::new("systemp", html)])
    }
}
