//! Docker control panel commands
//!
//! Stateless: docker commands run in the login directory and never read or
//! change the session path.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::RemoteError;
use super::path::shell_escape;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DockerOperation {
    ListContainers,
    ListImages,
    Pull,
    Launch,
    Start,
    Stop,
    Remove,
}

impl DockerOperation {
    pub const ALL: [DockerOperation; 7] = [
        DockerOperation::ListContainers,
        DockerOperation::ListImages,
        DockerOperation::Pull,
        DockerOperation::Launch,
        DockerOperation::Start,
        DockerOperation::Stop,
        DockerOperation::Remove,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DockerOperation::ListContainers => "List All Containers",
            DockerOperation::ListImages => "List Images",
            DockerOperation::Pull => "Pull Image",
            DockerOperation::Launch => "Launch New Container",
            DockerOperation::Start => "Start Container",
            DockerOperation::Stop => "Stop Container",
            DockerOperation::Remove => "Remove Container",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DockerRequest {
    pub operation: Option<DockerOperation>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Container names, image references and IDs
static REFERENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.:/@-]*$").expect("docker reference pattern")
});

fn require<'a>(value: Option<&'a str>, what: &'static str) -> Result<&'a str, RemoteError> {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(RemoteError::MissingField(what));
    }
    if !REFERENCE_PATTERN.is_match(value) {
        return Err(RemoteError::InvalidTarget(format!(
            "'{}' is not a valid container or image name",
            value
        )));
    }
    Ok(value)
}

/// Render the docker command for `operation`
pub fn build_docker_command(
    operation: DockerOperation,
    name: Option<&str>,
    image: Option<&str>,
) -> Result<String, RemoteError> {
    let command = match operation {
        DockerOperation::ListContainers => "docker ps -a".to_string(),
        DockerOperation::ListImages => "docker images".to_string(),
        DockerOperation::Pull => {
            let name = require(name, "an image name to pull")?;
            format!("docker pull {}", shell_escape(name))
        }
        DockerOperation::Launch => {
            const BOTH: &str = "both a container name and an image name";
            let name = require(name, BOTH)?;
            let image = require(image, BOTH)?;
            format!(
                "docker run -dit --name {} {}",
                shell_escape(name),
                shell_escape(image)
            )
        }
        DockerOperation::Start => {
            format!("docker start {}", shell_escape(require(name, "a container name or ID")?))
        }
        DockerOperation::Stop => {
            format!("docker stop {}", shell_escape(require(name, "a container name or ID")?))
        }
        DockerOperation::Remove => {
            format!("docker rm -f {}", shell_escape(require(name, "a container name or ID")?))
        }
    };
    Ok(command)
}
