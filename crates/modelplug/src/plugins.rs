// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subcommand implementations and their terminal output.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use modelplug_config::ModelplugConfig;
use modelplug_core::{PluginInfo, PluginStatus};
use modelplug_runtime::{IconService, InstallOptions, PluginAdmin, PluginStats, PluginStatusView};
use serde::Serialize;

/// How results are printed.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    json: bool,
    color: bool,
}

impl Output {
    pub fn new(json: bool, plain: bool) -> Self {
        Self {
            json,
            color: !plain && std::io::stdout().is_terminal(),
        }
    }

    fn json<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    fn status_label(&self, status: PluginStatus) -> String {
        let text = status.to_string();
        if !self.color {
            return text;
        }
        use colored::Colorize;
        match status {
            PluginStatus::InstalledEnabled => text.green().to_string(),
            PluginStatus::Failed => text.red().to_string(),
            _ => text.yellow().to_string(),
        }
    }

    fn ok(&self, message: &str) {
        if self.color {
            use colored::Colorize;
            println!("{} {message}", "✓".green());
        } else {
            println!("[OK] {message}");
        }
    }
}

/// Exactly one install source, as chosen on the command line.
#[derive(Debug, PartialEq, Eq)]
pub enum SourceArg {
    Path(PathBuf),
    File(PathBuf),
    Url { url: String, sha256: Option<String> },
    Marketplace(String),
}

impl SourceArg {
    pub fn from_flags(
        path: Option<PathBuf>,
        file: Option<PathBuf>,
        url: Option<String>,
        sha256: Option<String>,
        marketplace: Option<String>,
    ) -> anyhow::Result<Self> {
        match (path, file, url, marketplace) {
            (Some(path), None, None, None) => Ok(SourceArg::Path(path)),
            (None, Some(file), None, None) => Ok(SourceArg::File(file)),
            (None, None, Some(url), None) => Ok(SourceArg::Url { url, sha256 }),
            (None, None, None, Some(reference)) => Ok(SourceArg::Marketplace(reference)),
            _ => bail!("exactly one of --path, --file, --url or --marketplace is required"),
        }
    }
}

pub async fn list(admin: &PluginAdmin<'_>, output: &Output, enabled_only: bool) -> anyhow::Result<()> {
    let plugins = if enabled_only {
        admin.list_enabled().await?
    } else {
        admin.list().await?
    };
    if output.json {
        return output.json(&plugins);
    }
    if plugins.is_empty() {
        println!("no plugins installed");
        return Ok(());
    }
    println!("{:<32} {:<10} {:<6} STATUS", "PLUGIN", "VERSION", "TYPE");
    for plugin in &plugins {
        println!(
            "{:<32} {:<10} {:<6} {}",
            plugin.plugin_id,
            plugin.version,
            plugin.plugin_type.to_string(),
            output.status_label(plugin.status)
        );
    }
    Ok(())
}

pub async fn get(admin: &PluginAdmin<'_>, output: &Output, plugin_id: &str) -> anyhow::Result<()> {
    let plugin = admin.get(plugin_id).await?;
    if output.json {
        return output.json(&plugin);
    }
    print_record(output, &plugin);
    Ok(())
}

pub async fn install(
    admin: &PluginAdmin<'_>,
    output: &Output,
    source: SourceArg,
    replace: bool,
) -> anyhow::Result<()> {
    let options = InstallOptions { replace };
    let installed = match source {
        SourceArg::Path(path) => admin.install_path(path, options).await?,
        SourceArg::File(file) => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("cannot read {}", file.display()))?;
            admin.install_upload(bytes, &file_name(&file)?, options).await?
        }
        SourceArg::Url { url, sha256 } => admin.install_url(&url, sha256.as_deref(), options).await?,
        SourceArg::Marketplace(reference) => admin.install_marketplace(&reference).await?,
    };
    if output.json {
        return output.json(&installed);
    }
    output.ok(&format!("installed {} {}", installed.plugin_id, installed.version));
    Ok(())
}

pub async fn uninstall(admin: &PluginAdmin<'_>, output: &Output, plugin_id: &str) -> anyhow::Result<()> {
    let removed = admin.uninstall(plugin_id).await?;
    if output.json {
        return output.json(&serde_json::json!({ "plugin_id": plugin_id, "removed": removed }));
    }
    if removed {
        output.ok(&format!("uninstalled {plugin_id}"));
    } else {
        println!("{plugin_id} is not installed");
    }
    Ok(())
}

pub async fn enable(admin: &PluginAdmin<'_>, output: &Output, plugin_id: &str) -> anyhow::Result<()> {
    let record = admin.enable(plugin_id).await?;
    toggled(output, plugin_id, record, "enabled")
}

pub async fn disable(admin: &PluginAdmin<'_>, output: &Output, plugin_id: &str) -> anyhow::Result<()> {
    let record = admin.disable(plugin_id).await?;
    toggled(output, plugin_id, record, "disabled")
}

fn toggled(output: &Output, plugin_id: &str, record: Option<PluginInfo>, verb: &str) -> anyhow::Result<()> {
    if output.json {
        return output.json(&record);
    }
    match record {
        Some(record) => output.ok(&format!("{verb} {plugin_id} ({})", record.status)),
        None => println!("{plugin_id} is not installed"),
    }
    Ok(())
}

pub async fn status(admin: &PluginAdmin<'_>, output: &Output, plugin_id: &str) -> anyhow::Result<()> {
    let view = admin.status(plugin_id).await?;
    if output.json {
        return output.json(&view);
    }
    print_status(output, &view);
    Ok(())
}

pub async fn stats(admin: &PluginAdmin<'_>, output: &Output) -> anyhow::Result<()> {
    let stats = admin.stats().await?;
    if output.json {
        return output.json(&stats);
    }
    print!("{}", format_stats(&stats));
    Ok(())
}

pub async fn icon(
    admin: &PluginAdmin<'_>,
    output: &Output,
    plugin_id: &str,
    target: Option<PathBuf>,
) -> anyhow::Result<()> {
    let asset = admin.icon(plugin_id).await?;
    let target = target.unwrap_or_else(|| {
        PathBuf::from(format!("{plugin_id}-icon.{}", extension_for(asset.content_type)))
    });
    tokio::fs::write(&target, &asset.bytes)
        .await
        .with_context(|| format!("cannot write {}", target.display()))?;
    if output.json {
        return output.json(&serde_json::json!({
            "plugin_id": plugin_id,
            "content_type": asset.content_type,
            "bytes": asset.bytes.len(),
            "path": target,
        }));
    }
    output.ok(&format!(
        "wrote {} ({}, {} bytes)",
        target.display(),
        asset.content_type,
        asset.bytes.len()
    ));
    Ok(())
}

pub async fn icon_path(admin: &PluginAdmin<'_>, output: &Output, plugin_id: &str) -> anyhow::Result<()> {
    let path = admin.icon_path(plugin_id).await?;
    if output.json {
        return output.json(&serde_json::json!({ "plugin_id": plugin_id, "icon_path": path }));
    }
    match path {
        Some(path) => println!("{path}"),
        None => println!("{plugin_id} has no icon"),
    }
    Ok(())
}

pub fn show_config(config: &ModelplugConfig) -> anyhow::Result<()> {
    let rendered = modelplug_config::render_config(config)?;
    print!("{rendered}");
    Ok(())
}

fn print_record(output: &Output, plugin: &PluginInfo) {
    println!("  {} {}", plugin.plugin_id, plugin.version);
    println!("  {}", "-".repeat(35));
    println!("    Name:      {}", plugin.name);
    println!("    Type:      {}", plugin.plugin_type);
    println!("    Status:    {}", output.status_label(plugin.status));
    println!("    Bundle:    {}", plugin.bundle_path.display());
    if let Some(main) = &plugin.main_implementation {
        println!("    Main:      {main}");
    }
    if plugin.icon_path.is_some() {
        println!("    Icon:      {}", IconService::access_path(&plugin.plugin_id));
    }
    println!("    Installed: {}", plugin.installed_at.to_rfc3339());
    if let Some(at) = plugin.enabled_at {
        println!("    Enabled:   {}", at.to_rfc3339());
    }
    if let Some(at) = plugin.disabled_at {
        println!("    Disabled:  {}", at.to_rfc3339());
    }
    if let Some(reason) = &plugin.last_error {
        println!("    Error:     {reason}");
    }
}

fn print_status(output: &Output, view: &PluginStatusView) {
    println!("  {} {}", view.plugin_id, view.version);
    println!("    Type:      {}", view.plugin_type);
    println!("    Status:    {}", output.status_label(view.status));
    println!("    Available: {}", if view.available { "yes" } else { "no" });
}

fn format_stats(stats: &PluginStats) -> String {
    let mut out = format!(
        "total {}  enabled {}  disabled {}  failed {}\n",
        stats.total, stats.enabled, stats.disabled, stats.failed
    );
    for (plugin_type, count) in &stats.by_type {
        let name = plugin_type.to_string();
        out.push_str(&format!("  {name:<6} {count}\n"));
    }
    out
}

fn file_name(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/svg+xml" => "svg",
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/x-icon" => "ico",
        _ => "bin",
    }
}
