use clap::{Parser, Subcommand, ValueEnum};
use squall_engine::SkillLevel;
use squall_evaluator::StrategyProfile;

use self::{decide::DecideArg, simulate::SimulateArg};

mod decide;
mod simulate;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Answer engine requests read as JSON lines from stdin
    Decide(#[clap(flatten)] DecideArg),
    /// Run a seeded self-play session and print a summary
    Simulate(#[clap(flatten)] SimulateArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Decide(arg) => decide::run(&arg)?,
        Mode::Simulate(arg) => simulate::run(&arg)?,
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SkillArg {
    Breeze,
    Tempest,
    Maelstrom,
    Hurricane,
}

impl From<SkillArg> for SkillLevel {
    fn from(arg: SkillArg) -> Self {
        match arg {
            SkillArg::Breeze => SkillLevel::Breeze,
            SkillArg::Tempest => SkillLevel::Tempest,
            SkillArg::Maelstrom => SkillLevel::Maelstrom,
            SkillArg::Hurricane => SkillLevel::Hurricane,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ProfileArg {
    Standard,
    Simple,
}

impl From<ProfileArg> for StrategyProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Standard => StrategyProfile::Standard,
            ProfileArg::Simple => StrategyProfile::Simple,
        }
    }
}
