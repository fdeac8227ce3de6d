//! Cron job discovery.
//!
//! Scans every stack directory for a compose file and collects services
//! carrying a schedule label.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::DiscoveryError;
use crate::job::JobDescriptor;
use crate::labels::LabelMap;

/// Label holding the cron expression. Required for a service to be a job.
pub const SCHEDULE_LABEL: &str = "stackhand.cron.schedule";

/// Optional boolean label: also run the job once whenever the scheduler starts.
pub const RUN_ON_DEPLOY_LABEL: &str = "stackhand.cron.run_on_deploy";

#[derive(Debug, Default, Deserialize)]
struct ComposeDocument {
    #[serde(default)]
    services: Option<BTreeMap<String, Option<ComposeService>>>,
}

#[derive(Debug, Default, Deserialize)]
struct ComposeService {
    #[serde(default)]
    labels: LabelMap,
    #[serde(default)]
    profiles: Vec<String>,
}

/// Discover cron jobs under `stacks_dir`.
///
/// Stacks without `compose_file` are skipped. Any other read error, or a
/// compose file that fails to parse, aborts the whole pass. Results are
/// sorted by stack then service.
pub fn discover(stacks_dir: &Path, compose_file: &str) -> Result<Vec<JobDescriptor>, DiscoveryError> {
    let read_dir_err = |source| DiscoveryError::ReadStacksDir {
        path: stacks_dir.to_path_buf(),
        source,
    };

    let mut stacks = Vec::new();
    for entry in fs::read_dir(stacks_dir).map_err(read_dir_err)? {
        let entry = entry.map_err(read_dir_err)?;
        if entry.file_type().map_err(read_dir_err)?.is_dir() {
            stacks.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    stacks.sort();

    let mut jobs = Vec::new();
    for stack in stacks {
        let path = stacks_dir.join(&stack).join(compose_file);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(stack = %stack, "No compose file, skipping");
                continue;
            }
            Err(source) => return Err(DiscoveryError::ReadCompose { path, source }),
        };

        let document = parse_compose(&content).map_err(|source| DiscoveryError::ParseCompose {
            path: path.clone(),
            source,
        })?;

        for (service_name, service) in document.services.unwrap_or_default() {
            let service = service.unwrap_or_default();
            let schedule = service.labels.get(SCHEDULE_LABEL).unwrap_or("").trim();
            if schedule.is_empty() {
                continue;
            }

            let profile = match service.profiles.as_slice() {
                [only] if !only.trim().is_empty() => Some(only.trim().to_string()),
                _ => None,
            };

            let run_on_deploy = match service.labels.get(RUN_ON_DEPLOY_LABEL).map(str::trim) {
                None | Some("") => false,
                Some(raw) => parse_bool(raw).unwrap_or_else(|| {
                    warn!(
                        stack = %stack,
                        service = %service_name,
                        value = %raw,
                        "Invalid {} value, treating as false",
                        RUN_ON_DEPLOY_LABEL
                    );
                    false
                }),
            };

            jobs.push(JobDescriptor {
                stack: stack.clone(),
                service: service_name,
                schedule: schedule.to_string(),
                profile,
                run_on_deploy,
                compose_file: path.clone(),
            });
        }
    }

    Ok(jobs)
}

fn parse_compose(content: &str) -> Result<ComposeDocument, serde_yml::Error> {
    match serde_yml::from_str::<serde_yml::Value>(content)? {
        serde_yml::Value::Null => Ok(ComposeDocument::default()),
        value => serde_yml::from_value(value),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" => Some(true),
        "false" | "f" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
