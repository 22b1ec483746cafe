use std::io::{self, BufRead as _, Write as _};

use anyhow::Context as _;
use clap::Args;
use squall_evaluator::SearchParams;
use squall_pilot::{DecisionPipeline, EngineRequest};

use super::{ProfileArg, SkillArg};

/// Serves engine requests over stdin/stdout, one JSON document per line.
///
/// Each input line is one `EngineRequest`; each output line is the matching
/// reply. The process exits when stdin closes.
#[derive(Debug, Clone, Args)]
pub struct DecideArg {
    /// Compute inline instead of on a worker thread
    #[clap(long)]
    inline: bool,
    /// Initial skill level (individual requests may override it)
    #[clap(long, value_enum, default_value_t = SkillArg::Hurricane)]
    skill: SkillArg,
    /// Evaluation profile
    #[clap(long, value_enum, default_value_t = ProfileArg::Standard)]
    profile: ProfileArg,
}

pub fn run(arg: &DecideArg) -> anyhow::Result<()> {
    let params = SearchParams::default();
    let mut pipeline = if arg.inline {
        DecisionPipeline::inline(arg.skill.into(), arg.profile.into(), params)
    } else {
        DecisionPipeline::new(arg.skill.into(), arg.profile.into(), params)
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read request line")?;
        if line.trim().is_empty() {
            continue;
        }
        let request: EngineRequest =
            serde_json::from_str(&line).with_context(|| format!("malformed request: {line}"))?;
        let reply = pipeline.handle(request)?;
        serde_json::to_writer(&mut stdout, &reply)?;
        writeln!(stdout)?;
    }
    Ok(())
}
