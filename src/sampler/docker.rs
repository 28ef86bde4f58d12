//! Docker container status via the `docker` CLI
//!
//! The current user needs access to the Docker daemon; without it every
//! sample fails and the section is published blank.

use async_trait::async_trait;
use tokio::process::Command;

use super::render::{escape, Table};
use super::{Fragment, Sampler, SamplerError};

const PS_FORMAT: &str = "{{.Names}}\t{{.Status}}\t{{.State}}";

/// One row of `docker ps -a`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerStatus {
    pub name: String,
    pub status: String,
    pub running: bool,
}

/// Lists all containers with their status
pub struct DockerSampler {
    program: String,
}

impl DockerSampler {
    /// Use a specific docker binary
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for DockerSampler {
    fn default() -> Self {
        Self::with_program("docker")
    }
}

/// Parse `docker ps` output in [`PS_FORMAT`]
fn parse_ps(output: &str) -> Vec<ContainerStatus> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let mut fields = line.splitn(3, '\t');
            let name = fields.next().unwrap_or_default().to_string();
            let status = fields.next().unwrap_or_default().to_string();
            let running = fields.next().map(str::trim) == Some("running");
            ContainerStatus {
                name,
                status,
                running,
            }
        })
        .collect()
}

fn render(containers: &[ContainerStatus]) -> String {
    let mut table = Table::new("system-data").header(&["Name", "Status", "Running"]);
    for container in containers {
        table.row([
            escape(&container.name),
            escape(&container.status),
            container.running.to_string(),
        ]);
    }
    table.render()
}

#[async_trait]
impl Sampler for DockerSampler {
    fn name(&self) -> &str {
        "docker"
    }

    fn targets(&self) -> &[&'static str] {
        &["dock"]
    }

    async fn sample(&self) -> Result<Vec<Fragment>, SamplerError> {
        let output = Command::new(&self.program)
            .args(["ps", "-a", "--format", PS_FORMAT])
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SamplerError::Command(format!(
                "{} ps exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let containers = parse_ps(&String::from_utf8_lossy(&output.stdout));
        Ok(vec![Fragment::new("dock", render(&containers))])
    }
}
