use std::{error::Error, sync::Arc, time::Duration};

use tracing::info;
use tracing_subscriber::EnvFilter;

use clusterctl::{
    ci::GitlabGate,
    cleanup::ClusterTargets,
    cli::{Cli, Commands, SelectArgs, parse_args},
    config::{Config, load_config},
    connector::RetryPolicy,
    control::HttpControlPlane,
    db::{CqlShellOpener, SessionProvider},
    maintenance::{Maintainer, Maintenance, MaintenanceRequest},
    selection::{Selection, SelectionInput},
    vcs::SshBuildServer,
};

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = parse_args();
    init_logging(&args);

    let config = load_config(Some(&args.config))?;

    match &args.command {
        Commands::Stop { select, clean } => {
            info!("stopping services");
            let maintainer = build_maintainer(
                &config,
                selection_input(&args, Some(select), &[], clean),
                None,
                None,
            )?;
            maintainer.stop()?;
        }
        Commands::Start { select } => {
            info!("starting services");
            let maintainer = build_maintainer(
                &config,
                selection_input(&args, Some(select), &[], &[]),
                None,
                None,
            )?;
            maintainer.start()?;
        }
        Commands::Restart { select, clean } => {
            info!("restarting services");
            let maintainer = build_maintainer(
                &config,
                selection_input(&args, Some(select), &[], clean),
                None,
                None,
            )?;
            maintainer.restart()?;
        }
        Commands::Cleanup { clean } => {
            info!("running cleanup");
            let maintainer =
                build_maintainer(&config, selection_input(&args, None, &[], clean), None, None)?;
            maintainer.cleanup()?;
        }
        Commands::MakeBinary {
            binaries,
            build_num,
        } => {
            info!("building binaries");
            let maintainer = build_maintainer(
                &config,
                selection_input(&args, None, binaries, &[]),
                None,
                build_num.clone(),
            )?;
            maintainer.make_binary()?;
        }
        Commands::MakeImage { build_num } => {
            info!("making image");
            let mut maintainer = build_maintainer(
                &config,
                selection_input(&args, None, &[], &[]),
                None,
                build_num.clone(),
            )?;
            maintainer.make_image()?;
            if let Some(image) = maintainer.image() {
                println!("{image}");
            }
        }
        Commands::ApplyImage { select, image } => {
            info!(image = %image, "applying image");
            let maintainer = build_maintainer(
                &config,
                selection_input(&args, Some(select), &[], &[]),
                Some(image.clone()),
                None,
            )?;
            maintainer.apply_image()?;
        }
        Commands::Upgrade { select, build_num } => {
            info!("upgrading core services");
            let mut maintainer = build_maintainer(
                &config,
                selection_input(&args, Some(select), &[], &[]),
                None,
                build_num.clone(),
            )?;
            maintainer.upgrade_core()?;
        }
    }

    Ok(())
}

fn init_logging(args: &Cli) {
    let filter = if let Some(level) = args.log_level {
        EnvFilter::new(level.as_str())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn selection_input(
    args: &Cli,
    select: Option<&SelectArgs>,
    binaries: &[String],
    clean: &[String],
) -> SelectionInput {
    let (services, exclude_services) = match select {
        Some(s) => (s.services.clone(), s.exclude_services.clone()),
        None => (Vec::new(), Vec::new()),
    };
    SelectionInput {
        services,
        exclude_services,
        binaries: binaries.to_vec(),
        clean: clean.to_vec(),
        strict: args.strict,
    }
}

fn build_maintainer(
    config: &Config,
    input: SelectionInput,
    image: Option<String>,
    build_num: Option<String>,
) -> Result<Maintenance, Box<dyn Error>> {
    let selection = Selection::resolve(&input)?;
    let retry: RetryPolicy = config.retry.into();

    let control = HttpControlPlane::new(&config.control_plane)?;
    let sessions = Arc::new(SessionProvider::new(
        config.database.clone(),
        retry,
        Box::new(CqlShellOpener),
    ));
    let targets = ClusterTargets::new(
        &config.control_plane.endpoint,
        Duration::from_secs(config.control_plane.timeout_secs),
        sessions,
        config.cleanup.clone(),
    )?;
    let vcs = SshBuildServer::new(
        &config.build.server,
        &config.build.user,
        config.build.key_file.as_deref(),
    );
    let gate = GitlabGate::new(&config.ci)?;

    let mut build = config.build.clone();
    if build_num.is_some() {
        build.build_num = build_num;
    }

    let request = MaintenanceRequest {
        selection,
        image,
        build,
        registry: config.registry.clone(),
        ci_project: config.ci.project_id,
        retry,
    };

    Ok(Maintenance::new(
        request,
        Box::new(control),
        Box::new(targets),
        Box::new(vcs),
        Box::new(gate),
    ))
}
