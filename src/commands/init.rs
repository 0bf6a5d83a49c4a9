//! # Init Command Implementation
//!
//! Interactive wizard that creates or updates one host's section of the
//! config file. Existing values are offered as defaults, so running it again
//! edits rather than replaces. Sections for other hosts, and tables that
//! belong to other tools, are left alone.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};

use git_mirror::config::{ConfigStore, HostConfig};
use git_mirror::defaults::token_variable;
use git_mirror::host::HostKind;

use super::Context;

/// Create or update a host's section in the config file
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Host section to edit (github, gitlab, selfhosted, ...)
    #[arg(long, value_name = "NAME")]
    pub host: Option<String>,
}

pub fn execute(args: InitArgs, ctx: &Context) -> Result<()> {
    let theme = ColorfulTheme::default();
    let store = ctx.store();

    println!("Configuring {}", ctx.config_path.display());

    let host: String = match args.host {
        Some(host) => host,
        None => Input::with_theme(&theme)
            .with_prompt("Host name")
            .default("github".to_string())
            .interact_text()?,
    };
    let existing = store.load(&host)?.unwrap_or_default();
    let config = prompt_host_config(&theme, &host, existing)?;

    store.save(&host, &config)?;
    println!("✅ Saved configuration for {host}");
    println!(
        "💡 Export {} with an access token before running other commands",
        token_variable(&host)
    );
    Ok(())
}

fn prompt_host_config(theme: &ColorfulTheme, host: &str, existing: HostConfig) -> Result<HostConfig> {
    let kinds = [HostKind::Github, HostKind::Gitlab];
    let current_kind = existing.kind(host);
    let kind_index = Select::with_theme(theme)
        .with_prompt("Host type")
        .items(&["GitHub", "GitLab"])
        .default(kinds.iter().position(|k| *k == current_kind).unwrap_or(0))
        .interact()?;
    let kind = kinds[kind_index];

    let host_url = if kind == HostKind::Gitlab {
        let url: String = Input::with_theme(theme)
            .with_prompt("Host URL")
            .default(
                existing
                    .host_url
                    .clone()
                    .unwrap_or_else(|| "https://gitlab.com".to_string()),
            )
            .interact_text()?;
        Some(url)
    } else {
        existing.host_url.clone()
    };

    let user_name: String = Input::with_theme(theme)
        .with_prompt("User name")
        .with_initial_text(existing.user_name.clone().unwrap_or_default())
        .interact_text()?;

    let target_dir: String = Input::with_theme(theme)
        .with_prompt("Directory for the clones")
        .default(
            existing
                .target_dir
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| format!("~/{host}")),
        )
        .interact_text()?;

    let include_private = Confirm::with_theme(theme)
        .with_prompt("Include private repositories?")
        .default(existing.include_private)
        .interact()?;
    let include_forks = Confirm::with_theme(theme)
        .with_prompt("Include forks?")
        .default(existing.include_forks)
        .interact()?;

    let pypi_owner_name = optional_input(theme, "PyPI owner name (optional)", &existing.pypi_owner_name)?;
    let template_dir = optional_input(
        theme,
        "Template directory for cross-repo commands (optional)",
        &existing.global_template_dir.as_ref().map(|p| p.display().to_string()),
    )?;

    Ok(HostConfig {
        host_type: Some(kind),
        host_url,
        user_name: Some(user_name.trim().to_string()),
        target_dir: Some(PathBuf::from(target_dir.trim())),
        include_private,
        include_forks,
        pypi_owner_name,
        global_template_dir: template_dir.map(PathBuf::from),
        ..existing
    })
}

/// Empty input means "not set".
fn optional_input(theme: &ColorfulTheme, prompt: &str, current: &Option<String>) -> Result<Option<String>> {
    let value: String = Input::with_theme(theme)
        .with_prompt(prompt)
        .with_initial_text(current.clone().unwrap_or_default())
        .allow_empty(true)
        .interact_text()?;
    let value = value.trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}
