pub mod agent_log;
pub mod capability;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod error;
pub mod export;
pub mod generator;
pub mod notify;
pub mod project;
pub mod render;
pub mod route;
pub mod seed;
pub mod session;
pub mod task;

use std::ffi::OsString;
use std::io::Write;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use error::{
  AgentError,
  BoardError,
  GenerateError
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args);
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
    "starting pmboard"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.rc_file.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let seed = match cfg
    .seed_location(cli.seed.as_deref())
  {
    | Some(path) => {
      seed::Seed::load(&path)?
    }
    | None => seed::Seed::builtin()
      .context(
        "failed to build built-in seed \
         data"
      )?
  };

  let settings = cfg
    .session_settings()
    .context(
      "invalid session configuration"
    )?;
  let mut session =
    session::Session::new(seed, settings);
  let renderer =
    render::Renderer::new(&cfg)?;

  let command = match cli.command {
    | Some(command) => command,
    | None => {
      let default = cfg
        .get("default.command")
        .unwrap_or_else(|| {
          "board".to_string()
        });
      debug!(command = %default, "no explicit command, using default");
      cli::CommandLine::parse_words(
        default.split_whitespace()
      )
      .with_context(|| {
        format!(
          "invalid default.command: \
           {default}"
        )
      })?
    }
  };

  let mut out = std::io::stdout().lock();
  commands::dispatch(
    &mut session,
    &renderer,
    &mut out,
    command
  )?;
  out.flush()?;

  info!("done");
  Ok(())
}
