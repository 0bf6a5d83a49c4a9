//! # List Config Command Implementation
//!
//! Prints every configured host section, then whether the external tools
//! some commands rely on (`git`, `poetry`) can be run.

use std::process::Command;

use anyhow::Result;
use clap::Args;

use git_mirror::config::ConfigStore;
use git_mirror::output::{emoji, Report, Tone};

use super::Context;

/// Show configured hosts and available external tools
#[derive(Args, Debug)]
pub struct ListConfigArgs {
    /// Skip the external tool checks
    #[arg(long)]
    pub no_tools: bool,
}

pub fn execute(args: ListConfigArgs, ctx: &Context) -> Result<()> {
    let store = ctx.store();
    let console = ctx.console();
    let mut report = Report::new();

    report.push(
        Tone::Info,
        format!("Config file: {}", ctx.config_path.display()),
    );
    let hosts = store.list_configured_hosts()?;
    if hosts.is_empty() {
        report.warn("No hosts configured. Run 'git-mirror init' to add one.");
    }
    for host in &hosts {
        let Some(config) = store.load(host)? else {
            continue;
        };
        report.plain(format!("[{host}]"));
        for line in toml::to_string(&config)?.lines() {
            report.plain(format!("  {line}"));
        }
    }

    if !args.no_tools {
        for tool in ["git", "poetry"] {
            match tool_version(tool) {
                Some(version) => report.success(format!(
                    "{} {tool}: {version}",
                    emoji(console.config(), "✅", "[ok]")
                )),
                None => report.warn(format!(
                    "{} {tool} is not available",
                    emoji(console.config(), "⚠️", "[missing]")
                )),
            }
        }
    }

    console.emit(&report);
    Ok(())
}

/// First line of `<tool> --version`, or `None` when the tool cannot run.
fn tool_version(tool: &str) -> Option<String> {
    let output = Command::new(tool).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|line| line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool_is_none() {
        assert_eq!(tool_version("git-mirror-no-such-tool"), None);
    }
}
