//! CLI command handlers.

pub mod check;
pub mod start;

use std::path::PathBuf;

use clap::Args;
use lensbot_config::{KnowledgeConfig, LensbotConfig};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Merged configuration from all discovered layers.
    pub config: LensbotConfig,
    /// Config files that contributed, lowest precedence first.
    pub config_files: Vec<PathBuf>,
    /// Verbose output enabled.
    pub verbose: bool,
}

/// Knowledge file locations (override config).
#[derive(Args, Debug, Clone, Default)]
pub struct KnowledgeArgs {
    /// FAQ JSON file
    #[arg(long)]
    pub faqs: Option<PathBuf>,

    /// Myth JSON file
    #[arg(long)]
    pub myths: Option<PathBuf>,
}

impl KnowledgeArgs {
    pub fn apply(&self, config: &mut LensbotConfig) {
        if self.faqs.is_none() && self.myths.is_none() {
            return;
        }
        let defaults = config.knowledge_config();
        config.knowledge = Some(KnowledgeConfig {
            faqs: self.faqs.clone().unwrap_or(defaults.faqs),
            myths: self.myths.clone().unwrap_or(defaults.myths),
        });
    }
}
