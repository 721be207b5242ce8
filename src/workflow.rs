use anyhow::{Result, bail};
use apkup::config::UpdaterConfig;
use apkup::coordinator::UpdateCoordinator;
use apkup::state::{UpdateState, format_file_size};
use apkup::version::is_newer_version;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};

/// Execute the check workflow (no download)
pub async fn execute_check(config: UpdaterConfig) -> Result<()> {
    println!("{}", "Checking for updates...".cyan().bold());

    let coordinator = UpdateCoordinator::from_config(config)?;
    let state = coordinator.check_for_updates().await;

    if let Some(error) = state.error {
        bail!(error);
    }

    print_release(&state);
    Ok(())
}

/// Execute the full update workflow
pub async fn execute_update(config: UpdaterConfig, yes: bool, no_install: bool) -> Result<()> {
    println!("{}", "Starting update process...".cyan().bold());
    let coordinator = UpdateCoordinator::from_config(config)?;

    // Step 1: Ask the release service
    println!("\n{}", "1. Checking for updates...".yellow());
    let state = coordinator.check_for_updates().await;
    if let Some(error) = state.error {
        bail!(error);
    }
    print_release(&state);

    if !state.is_update_available {
        return Ok(());
    }

    // Step 2: Download and verify
    println!("\n{}", "2. Downloading update...".yellow());
    println!(
        "   Saving to {}",
        coordinator.config().download_dir.display().to_string().dimmed()
    );
    let state = download_with_progress(&coordinator).await?;
    if !state.is_download_complete {
        bail!(
            state
                .error
                .unwrap_or_else(|| "download did not complete".to_string())
        );
    }
    println!(
        "{}",
        format!(
            "✓ Downloaded and verified {} ({})",
            state.downloaded_file_path,
            format_file_size(state.total_bytes)
        )
        .green()
    );

    if no_install {
        println!("\n{}", "Skipping installation (--no-install)".yellow());
        return Ok(());
    }

    // Step 3: Hand off to the installer
    println!("\n{}", "3. Installing update...".yellow());
    if !yes && !confirm_install(&state.latest_version)? {
        println!("{}", "Installation skipped.".dimmed());
        return Ok(());
    }

    let state = coordinator.install_update().await;
    if let Some(error) = state.error {
        bail!(error);
    }
    println!("{}", "✓ Installer launched".green());

    println!(
        "\n{}",
        "✨ Update process completed successfully!".green().bold()
    );
    Ok(())
}

/// Compare two versions the way the update check does
pub fn execute_compare(candidate: &str, current: &str) -> Result<()> {
    if is_newer_version(candidate, current) {
        println!(
            "{} {} {}",
            candidate.green().bold(),
            "is newer than".dimmed(),
            current
        );
    } else {
        println!(
            "{} {} {}",
            candidate.yellow(),
            "is not newer than".dimmed(),
            current
        );
    }
    Ok(())
}

async fn download_with_progress(coordinator: &UpdateCoordinator) -> Result<UpdateState> {
    let mut rx = coordinator.subscribe();
    let state = coordinator.download_update().await;
    if !state.is_downloading {
        return Ok(state);
    }

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  [{bar:40}] {bytes}/{total_bytes} {msg}")?
            .progress_chars("=>-"),
    );

    loop {
        {
            let s = rx.borrow_and_update();
            pb.set_length(s.total_bytes);
            pb.set_position(s.downloaded_bytes);
            pb.set_message(s.error.clone().unwrap_or_default());
            if !s.is_downloading {
                break;
            }
        }

        if rx.changed().await.is_err() {
            break;
        }
    }

    pb.finish_and_clear();
    Ok(coordinator.state())
}

fn print_release(state: &UpdateState) {
    if state.is_update_available {
        println!(
            "{} {} {} {}",
            "Update available:".green().bold(),
            state.current_version.red(),
            "→".dimmed(),
            state.latest_version.green().bold()
        );
        println!("   Released on {}", state.publish_date.bright_cyan());
        if state.download_url.is_empty() {
            println!("   {}", "No installable package attached to this release".red());
        } else {
            println!("   {}", state.download_url.dimmed());
        }
        if !state.release_notes.trim().is_empty() {
            println!("\n{}", "Release notes:".bold());
            for line in state.release_notes.lines() {
                println!("   {line}");
            }
        }
    } else {
        println!(
            "{}",
            format!(
                "✓ Current version {} is the latest version",
                state.current_version
            )
            .green()
        );
    }
}

fn confirm_install(version: &str) -> Result<bool> {
    read_confirmation(&mut io::stdin().lock(), version)
}

/// End of input counts as "no".
fn read_confirmation(input: &mut impl BufRead, version: &str) -> Result<bool> {
    loop {
        print!("{}", format!("Install version {version} now? [Y/n]: ").bold());
        io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            println!();
            return Ok(false);
        }

        match line.trim().to_lowercase().as_str() {
            "" | "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => println!("{}", "Please answer with y(es) or n(o).".red()),
        }
    }
}
