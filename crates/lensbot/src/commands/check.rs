//! Check command - validates configuration and knowledge files.

use anyhow::Result;
use clap::Args;

use super::{Context, KnowledgeArgs};
use crate::setup;

/// Arguments for the check command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub knowledge: KnowledgeArgs,
}

/// Run the check command.
///
/// Fails (non-zero exit) on an invalid config or a missing/malformed
/// knowledge file.
pub async fn run(args: CheckArgs, ctx: &Context) -> Result<()> {
    let mut config = ctx.config.clone();
    args.knowledge.apply(&mut config);
    config.validate()?;

    let paths = config.knowledge_config();
    let knowledge = setup::load_knowledge(&config)?;

    println!("Configuration OK");
    if ctx.config_files.is_empty() {
        println!("  Config:   defaults");
    } else {
        let files: Vec<String> = ctx
            .config_files
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        println!("  Config:   {}", files.join(", "));
    }
    println!(
        "  FAQs:     {} ({})",
        knowledge.faqs.len(),
        paths.faqs.display()
    );
    println!(
        "  Myths:    {} ({})",
        knowledge.myths.len(),
        paths.myths.display()
    );
    println!("  Strategy: {}", config.matching_config().strategy);
    println!(
        "  API key:  {}",
        if setup::report_api_key(&config) {
            "set"
        } else {
            "missing"
        }
    );

    if ctx.verbose {
        let llm = config.llm_config();
        println!("  Model:    {} via {}", llm.model, llm.base_url);
    }

    Ok(())
}
