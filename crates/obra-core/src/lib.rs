pub mod cli;
pub mod commands;
pub mod composer;
pub mod config;
pub mod datetime;
pub mod drag;
pub mod grid;
pub mod intent;
pub mod kanban;
pub mod queue;
pub mod render;
pub mod status;
pub mod store;
pub mod task;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting obra CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.obrarc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let settings =
    config::PlannerSettings::from_config(
      &cfg
    )
    .context(
      "invalid planning configuration"
    )?;

  let tasks_path =
    config::resolve_tasks_file(
      &cfg,
      cli.tasks.as_deref()
    )
    .context(
      "failed to resolve task file"
    )?;
  let store =
    store::TaskFile::new(&tasks_path);

  let today = settings.zone.today();
  let reference =
    cli.date.unwrap_or(today);
  debug!(
    %today,
    %reference,
    zone = %settings.zone,
    "resolved reference date"
  );

  let renderer =
    render::Renderer::new(
      settings.color
    );

  commands::dispatch(
    &store,
    &settings,
    &renderer,
    cli.command,
    reference,
    today
  )?;

  info!("done");
  Ok(())
}
