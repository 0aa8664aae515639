mod cli;

use convertaphile::{config, server};
use convertaphile_av::{analyze, check_tools as probe_tools, convert, ToolPaths};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "convertaphile=debug,convertaphile_av=debug,tower_http=debug".to_string()
        } else {
            "convertaphile=info,convertaphile_av=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Serve { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(serve(host, port, cli.config.as_deref()))
        }
        Commands::Convert { input, to, output } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert_file(&input, &to, output, cli.config.as_deref()))
        }
        Commands::Probe { file, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_file(&file, json))
        }
        Commands::CheckTools => check_tools(),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("convertaphile {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn serve(host: String, port: u16, config_path: Option<&Path>) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    config.server.host = host;
    config.server.port = port;

    tracing::info!("Starting convertaphile server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    server::start_server(config).await
}

async fn convert_file(
    input: &Path,
    target_extension: &str,
    output: Option<PathBuf>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    if !input.exists() {
        anyhow::bail!("Input file does not exist: {:?}", input);
    }

    let extension = target_extension.trim_start_matches('.').to_ascii_lowercase();
    let output = output.unwrap_or_else(|| input.with_extension(&extension));

    let tools = ToolPaths {
        ffmpeg: convertaphile_av::get_tool_path("ffmpeg", config.tools.ffmpeg_path.as_deref())?,
        ffprobe: convertaphile_av::get_tool_path("ffprobe", config.tools.ffprobe_path.as_deref())?,
    };

    let result = convert(input, &output, &tools, config.conversion.timeout_secs).await?;
    if result.success {
        println!("Converted {:?} -> {:?}", input, output);
        Ok(())
    } else {
        anyhow::bail!("Conversion failed:\n{}", result.stderr)
    }
}

async fn probe_file(file: &Path, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let ffprobe = convertaphile_av::get_tool_path("ffprobe", None)?;
    let report = analyze(file, &ffprobe)
        .await
        .ok_or_else(|| anyhow::anyhow!("ffprobe could not analyze {:?}", file))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("File: {}", file.display());
        println!("Container: {}", report.format_name());
        println!("Streams: {}", report.streams.len());
        for (i, stream) in report.streams.iter().enumerate() {
            let codec_type = stream.codec_type.as_deref().unwrap_or("unknown");
            let codec_name = stream.codec_name.as_deref().unwrap_or("unknown");
            println!("  [{}] {} ({})", i, codec_type, codec_name);
        }

        let fallback_ext = file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match convertaphile_av::classify(&report, &fallback_ext) {
            Some(format) => println!("Detected format: {} ({:?})", format, format.family()),
            None => println!("Detected format: unsupported"),
        }
    }

    Ok(())
}

fn check_tools() -> Result<()> {
    println!("Checking external tools...\n");

    let tools = probe_tools();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable all features.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Conversion timeout: {}s", config.conversion.timeout_secs);
            println!("  Retention: {}s", config.storage.retention_secs);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
        }
    }

    Ok(())
}
