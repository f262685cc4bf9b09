use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// One (EPIC identifier, K2 campaign) pair the pipeline processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub epic_id: u64,
    pub campaign: u32,
    /// Prefix for artifact file names; defaults to `c{campaign}`.
    #[serde(default)]
    pub label: Option<String>,
}

impl Target {
    pub fn new(epic_id: u64, campaign: u32) -> Self {
        Self {
            epic_id,
            campaign,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("c{}", self.campaign))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPIC {} (campaign {})", self.epic_id, self.campaign)
    }
}

#[derive(Debug, Clone)]
pub struct TargetDescriptor {
    pub target: Target,
    pub common_name: &'static str,
    pub description: &'static str,
}

static DEFAULT_TARGETS: Lazy<Vec<TargetDescriptor>> = Lazy::new(|| {
    vec![
        TargetDescriptor {
            target: Target::new(212573842, 6),
            common_name: "Spica",
            description: "Spica, K2 campaign 6 long-cadence pixel data",
        },
        TargetDescriptor {
            target: Target::new(200213067, 17),
            common_name: "Spica",
            description: "Spica, K2 campaign 17 long-cadence pixel data",
        },
    ]
});

pub fn default_target_descriptors() -> &'static [TargetDescriptor] {
    DEFAULT_TARGETS.as_slice()
}

pub fn default_targets() -> Vec<Target> {
    DEFAULT_TARGETS
        .iter()
        .map(|descriptor| descriptor.target.clone())
        .collect()
}
