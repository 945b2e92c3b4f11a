//! Subcommand drivers: build the view-model, drive it, render what it publishes.

use std::io::Write;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use staffdir_engine::{
    DirectoryState, DirectoryViewModel, LoadRequest, LoginAttempt, LoginViewModel, Subscription,
};
use staffdir_providers::{
    HttpAssetSource, HttpClient, HttpLoginService, HttpRecordSource, HttpSettings,
};
use tokio::time::Instant;

use crate::render;

pub const DEFAULT_WAIT_SECS: u64 = 30;

pub async fn login(
    settings: HttpSettings,
    email: String,
    password: String,
    out: &mut impl Write,
) -> Result<()> {
    let client = HttpClient::new(settings).context("building HTTP client")?;
    let vm = LoginViewModel::new(HttpLoginService::new(client));
    vm.update_email(email);
    vm.update_password(password);

    match vm.login().await {
        LoginAttempt::Succeeded => {
            render::login(&vm.snapshot(), out)?;
            Ok(())
        }
        LoginAttempt::InvalidForm => bail!("{}", render::form_problems(&vm.snapshot())),
        LoginAttempt::Failed(message) => bail!("Login failed: {message}"),
        LoginAttempt::InFlight => bail!("A login is already in progress"),
    }
}

pub async fn directory(
    settings: HttpSettings,
    max_concurrent_assets: Option<NonZeroUsize>,
    wait: Duration,
    out: &mut impl Write,
) -> Result<()> {
    let client = HttpClient::new(settings).context("building HTTP client")?;
    let vm = DirectoryViewModel::with_asset_limit(
        HttpRecordSource::new(client.clone()),
        HttpAssetSource::new(client),
        max_concurrent_assets,
    );
    let mut sub = vm.subscribe();

    if let LoadRequest::ShutDown = vm.load_directory() {
        bail!("directory view-model is shut down");
    }
    let outcome = follow(&mut sub, wait, out).await;
    vm.shutdown();

    let state = outcome?;
    if state.has_error() {
        bail!("{}", state.error_message);
    }
    Ok(())
}

/// Render every snapshot observed after the listing lands, until every avatar
/// has resolved or `wait` runs out. Returns the last snapshot observed.
///
/// Loading snapshots carry nothing to show and are skipped. A failed listing
/// renders nothing.
async fn follow(
    sub: &mut Subscription<DirectoryState>,
    wait: Duration,
    out: &mut impl Write,
) -> Result<Arc<DirectoryState>> {
    let mut state = sub
        .wait_for(|state| !state.is_loading)
        .await
        .context("directory closed before the listing arrived")?;
    if state.has_error() {
        return Ok(state);
    }

    let deadline = Instant::now() + wait;
    let mut rendered = 0_usize;
    loop {
        if rendered > 0 {
            writeln!(out)?;
        }
        render::directory(&state, out)?;
        out.flush()?;
        rendered += 1;

        if state.is_settled() {
            return Ok(state);
        }
        state = match tokio::time::timeout_at(deadline, sub.changed()).await {
            Ok(Some(next)) => next,
            Ok(None) => bail!("directory closed before avatars finished loading"),
            Err(_) => {
                tracing::warn!(
                    pending = state.pending_assets(),
                    wait_secs = wait.as_secs(),
                    "Stopped waiting for avatars"
                );
                return Ok(state);
            }
        };
        tracing::debug!(rendered, pending = state.pending_assets(), "Snapshot observed");
    }
}
