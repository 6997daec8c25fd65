use tasknest_core::util::normalize_text_option;

use crate::cli::ConfigCommands;
use crate::config_profiles::{normalize_remote_url, CliProfile, CliProfilesConfig};
use crate::error::CliError;

pub struct ProfileInit {
    pub remote_url: Option<String>,
    pub remote_token: Option<String>,
    pub probe_addr: Option<String>,
}

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            remote_url,
            remote_token,
            probe_addr,
            no_activate,
        } => run_config_init(
            profile.as_deref().or(global_profile),
            ProfileInit {
                remote_url,
                remote_token,
                probe_addr,
            },
            no_activate,
        ),
    }
}

/// Explicit values win; unset ones keep what the profile already had.
pub fn merge_profile(existing: &CliProfile, init: ProfileInit) -> Result<CliProfile, CliError> {
    let remote_url = match normalize_remote_url(init.remote_url).map_err(CliError::Config)? {
        Some(url) => Some(url),
        None => existing.remote_url.clone(),
    };
    let probe_addr = normalize_text_option(init.probe_addr).or_else(|| existing.probe_addr.clone());
    if let Some(addr) = probe_addr.as_deref() {
        if !addr.contains(':') {
            return Err(CliError::Config(format!(
                "Probe address must be host:port: {addr}"
            )));
        }
    }

    Ok(CliProfile {
        remote_url,
        remote_token: normalize_text_option(init.remote_token)
            .or_else(|| existing.remote_token.clone()),
        probe_addr,
    })
}

pub fn run_config_init(
    profile_name: Option<&str>,
    init: ProfileInit,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let existing_profile = config.profile(&profile_name).cloned().unwrap_or_default();

    let profile = merge_profile(&existing_profile, init)?;
    if profile.remote_url.is_none() {
        println!(
            "Profile '{profile_name}' has no remote URL; records stay local until one is set."
        );
    }
    *config.profile_mut_or_default(&profile_name) = profile;

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!("Saved profile '{profile_name}' to {}", path.display());
    Ok(())
}
