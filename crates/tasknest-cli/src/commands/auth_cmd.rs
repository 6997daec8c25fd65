use std::sync::Arc;

use tasknest_core::auth::AuthSession;
use tasknest_core::SessionAuth;

use crate::cli::AuthCommands;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;
use crate::session_store::KeyringSessionStore;

fn profile_auth(profile_name: &str) -> Result<SessionAuth, CliError> {
    Ok(SessionAuth::with_persistence(Arc::new(
        KeyringSessionStore::new(profile_name),
    ))?)
}

fn resolve_profile_name(
    profile: Option<&str>,
    global_profile: Option<&str>,
) -> Result<String, CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    Ok(config.resolve_profile_name(profile.or(global_profile)))
}

pub fn build_session(owner: &str, email: Option<String>, token: Option<String>) -> AuthSession {
    let mut session = AuthSession::new(owner.trim());
    if let Some(email) = email {
        session = session.with_email(email);
    }
    if let Some(token) = token {
        session = session.with_access_token(token);
    }
    session
}

pub fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        AuthCommands::Login {
            profile,
            owner,
            email,
            token,
        } => {
            let profile_name = resolve_profile_name(profile.as_deref(), global_profile)?;
            let auth = profile_auth(&profile_name)?;
            let session = build_session(&owner, email, token);
            let owner_id = session.owner_id.clone();
            auth.sign_in(session)?;
            println!("Signed in profile '{profile_name}' as {owner_id}");
            Ok(())
        }
        AuthCommands::Status { profile } => {
            let profile_name = resolve_profile_name(profile.as_deref(), global_profile)?;
            let auth = profile_auth(&profile_name)?;
            if let Some(session) = auth.session() {
                let email_label = session.email.as_deref().unwrap_or("(no email)");
                let token_label = if session.access_token.is_some() {
                    "token stored"
                } else {
                    "no token"
                };
                println!(
                    "Profile '{profile_name}' is signed in as {} <{email_label}>, {token_label}",
                    session.owner_id
                );
            } else {
                println!("Profile '{profile_name}' is not signed in.");
            }
            Ok(())
        }
        AuthCommands::Logout { profile } => {
            let profile_name = resolve_profile_name(profile.as_deref(), global_profile)?;
            profile_auth(&profile_name)?.sign_out()?;
            println!("Signed out profile '{profile_name}'");
            Ok(())
        }
    }
}
