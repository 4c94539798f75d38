use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use sgw_host::{HostConfig, SceneHost};
use sgw_scene::GltfJsonExporter;
use sgw_worklet::{BridgeEvent, FileFetcher, ScriptElement};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("sgw-host")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Run a scene-graph worklet against a sequence of glTF models")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("run")
                .about("Attach a worklet, load each model in turn and print host events as JSON lines")
                .arg(
                    Arg::new("model")
                        .long("model")
                        .required(true)
                        .action(ArgAction::Append)
                        .value_parser(value_parser!(PathBuf))
                        .help("glTF JSON model; repeat to swap models in order"),
                )
                .arg(
                    Arg::new("script")
                        .long("script")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Worklet script (rhai)"),
                )
                .arg(
                    Arg::new("allow")
                        .long("allow")
                        .help("Capability list, e.g. \"material-properties; messaging\""),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Host configuration (TOML)"),
                )
                .arg(
                    Arg::new("settle-ms")
                        .long("settle-ms")
                        .default_value("200")
                        .value_parser(value_parser!(u64))
                        .help("Time given to the worklet after each model load"),
                )
                .arg(
                    Arg::new("export")
                        .long("export")
                        .value_parser(value_parser!(PathBuf))
                        .help("Write the final scene as glTF JSON"),
                ),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("run", args)) => run(args).await,
        _ => Ok(()),
    }
}

async fn run(args: &ArgMatches) -> Result<()> {
    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => HostConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => HostConfig::default(),
    };
    let script = args
        .get_one::<PathBuf>("script")
        .context("--script is required")?;
    let allow = args.get_one::<String>("allow").cloned().unwrap_or_default();
    let settle = Duration::from_millis(args.get_one::<u64>("settle-ms").copied().unwrap_or(200));
    let models: Vec<PathBuf> = args
        .get_many::<PathBuf>("model")
        .map(|paths| paths.cloned().collect())
        .unwrap_or_default();

    let host = SceneHost::new(config, FileFetcher::new("."));
    let printer = tokio::spawn(print_events(host.subscribe()));

    let element = ScriptElement::external(allow, script.display().to_string());
    host.attach_script(&element)
        .await
        .with_context(|| format!("attaching worklet {}", script.display()))?;

    for path in &models {
        let document = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading model {}", path.display()))?;
        host.load_gltf(&document, Some(path.display().to_string()))
            .await
            .with_context(|| format!("loading model {}", path.display()))?;
        tokio::time::sleep(settle).await;
    }

    if let Some(path) = args.get_one::<PathBuf>("export") {
        let bytes = host.export_scene(&GltfJsonExporter::new().pretty())?;
        tokio::fs::write(path, bytes)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(path = %path.display(), "scene exported");
    }

    host.shutdown().await;
    drop(host);
    // printer ends once every event sender is gone
    let _ = tokio::time::timeout(Duration::from_secs(1), printer).await;
    Ok(())
}

async fn print_events(mut events: broadcast::Receiver<BridgeEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, event = event.name(), "unprintable event"),
            },
            Err(RecvError::Lagged(skipped)) => tracing::warn!(skipped, "event printer lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn run_collects_repeated_models() {
        let matches = cli()
            .try_get_matches_from([
                "sgw-host", "run", "--model", "a.gltf", "--model", "b.gltf", "--script", "w.rhai",
                "--allow", "messaging",
            ])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        let models: Vec<&PathBuf> = args.get_many::<PathBuf>("model").unwrap().collect();
        assert_eq!(models.len(), 2);
        assert_eq!(args.get_one::<u64>("settle-ms"), Some(&200));
    }
}
