mod cli;

use propsub::config::BuildConfig;
use propsub::properties::Properties;
use propsub::resolver::Resolver;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("PROPSUB_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Replace(replace_cli) => replace(replace_cli),
        cli::Command::Resolve(resolve_cli) => resolve(resolve_cli),
        cli::Command::Properties(properties_cli) => properties(properties_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn replace(cli: cli::ReplaceCommand) -> anyhow::Result<()> {
    let mut config = load_config(&cli.properties)?;

    if !cli.source_directories.is_empty() {
        config.source_directories = cli.source_directories;
    }
    if cli.output_directory.is_some() {
        config.output_directory = cli.output_directory;
    }
    config.includes.extend(cli.includes);
    config.excludes.extend(cli.excludes);
    if let Some(line_ending) = cli.line_ending {
        config.line_ending = line_ending;
    }
    if cli.scratch_directory.is_some() {
        config.scratch_directory = cli.scratch_directory;
    }

    let Some(output_directory) = config.output_directory.clone() else {
        anyhow::bail!("No output directory given (use -o/--output-dir or outputDirectory)");
    };

    let properties = config.property_store()?.build()?;
    let files = config.resource_files(&output_directory)?;
    tracing::info!(count = files.len(), "candidate files found");

    let summary = config
        .rewriter()
        .process_all(&Resolver::new(&properties), &files)?;

    eprintln!(
        "{} replaced, {} unchanged, {} unverified",
        summary.replaced,
        summary.unchanged,
        summary.unverified.len()
    );
    for path in &summary.unverified {
        eprintln!("needs manual follow-up: {}", path.display());
    }

    anyhow::ensure!(
        !cli.fail_on_unverified || summary.unverified.is_empty(),
        "{} file(s) could not be verified",
        summary.unverified.len()
    );

    Ok(())
}

pub fn resolve(cli: cli::ResolveCommand) -> anyhow::Result<()> {
    let properties = load_properties(&cli.properties)?;
    let resolution = Resolver::new(&properties).resolve(&cli.line);

    println!("{}", resolution.resolved);
    Ok(())
}

pub fn properties(cli: cli::PropertiesCommand) -> anyhow::Result<()> {
    let properties = load_properties(&cli.properties)?;
    output(&cli.output, &properties)
}

fn load_config(args: &cli::PropertyArgs) -> anyhow::Result<BuildConfig> {
    let mut config = match &args.config {
        Some(path) => BuildConfig::load(path)?,
        None => BuildConfig::default(),
    };

    config.properties.extend(args.definitions.iter().cloned());
    if args.properties_file.is_some() {
        config.properties_file = args.properties_file.clone();
    }
    if args.encoding.is_some() {
        config.encoding = args.encoding.clone();
    }
    if args.no_system_properties {
        config.include_system_properties = false;
    }
    if args.no_project_properties {
        config.include_project_properties = false;
    }

    // fail on a bad encoding before anything is loaded
    config.encoding()?;
    Ok(config)
}

fn load_properties(args: &cli::PropertyArgs) -> anyhow::Result<Properties> {
    let config = load_config(args)?;
    Ok(config.property_store()?.build()?)
}

fn output(output: &cli::OutputArgs, properties: &Properties) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), properties)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), properties)?,
    };

    Ok(())
}
