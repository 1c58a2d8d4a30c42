use anyhow::Context;
use gsolve_cycle::CycleOutcome;
use gsolve_viewer::cli::{command, GlobalArgs, SolveArgs};
use gsolve_viewer::{Session, ViewerConfig};
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn solve(config: ViewerConfig, args: &SolveArgs) -> anyhow::Result<bool> {
    let session = Session::open(&config).await?;
    let result = session.solve().await;

    let ok = match result {
        Ok(CycleOutcome::Applied(report)) => {
            println!(
                "Solved {}: {} object(s) in {} ms",
                report.generation,
                report.objects,
                report.timings.total().as_millis()
            );
            if let Some(target) = &args.export {
                let artifact = session
                    .export(target)
                    .await
                    .with_context(|| format!("exporting to {}", target.display()))?;
                println!("Exported {} bytes", artifact.bytes.len());
            }
            true
        }
        Ok(CycleOutcome::Superseded { generation, latest }) => {
            println!("Cycle {generation} superseded by {latest}");
            false
        }
        Err(e) => {
            tracing::error!("Solve failed: {e}");
            eprintln!("error: {e}");
            false
        }
    };

    session.close();
    Ok(ok)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = command().get_matches();
    let global = GlobalArgs::from_matches(&matches);
    init_tracing(global.log_json);

    let config = global.load_config().context("loading configuration")?;

    match matches.subcommand() {
        Some(("solve", sub)) => {
            let args = SolveArgs::from_matches(sub);
            let config = args.apply(config)?.with_env();
            let ok = solve(config, &args).await?;
            std::process::exit(if ok { 0 } else { 1 });
        }
        Some(("check-config", _)) => {
            let config = config.with_env();
            let rendered =
                toml::to_string_pretty(&config.redacted()).context("rendering configuration")?;
            println!("{rendered}");
            config
                .transport
                .connect()
                .context("endpoint configuration")?;
            println!("# configuration ok");
            Ok(())
        }
        _ => {
            command().print_help()?;
            std::process::exit(2);
        }
    }
}
