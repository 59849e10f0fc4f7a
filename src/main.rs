//! kioskflow CLI
//!
//! Usage:
//!   kioskflow                                   # Interactive scripted mode
//!   kioskflow --serve --frame-dir ./frames      # Sampling loop + HTTP API
//!   kioskflow --config kiosk.toml --serve       # With a config file
//!   kioskflow --json                            # JSON views

use anyhow::{bail, Context};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use kioskflow::config::KioskConfig;
use kioskflow::core::{
    run_server, Collaborators, DirectoryFrameSource, Kiosk, KioskOutput, NoOverlay,
    RecognitionClient, SamplingLoop,
};
use kioskflow::types::{BoxId, Detection, FlowEvent, FlowInput, Gender, SessionView, VipId};
use kioskflow::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "kioskflow",
    version = VERSION,
    about = "Recycling kiosk session and flow engine",
    long_about = "Tracks who is in front of the kiosk camera, keeps one interaction\n\
                  flow per recognised VIP, and suspends/restores flows as people\n\
                  come and go.\n\n\
                  Modes:\n  \
                  --interactive  Scripted mode driven from stdin (default)\n  \
                  --serve        Sampling loop + HTTP API\n\n\
                  Interactive commands:\n  \
                  vip <age> <male|female>   face in view\n  \
                  none                      nobody in view\n  \
                  select <box>              pick a box\n  \
                  yes | no                  learn more / photo answer\n  \
                  play                      finish the game\n  \
                  star <n>                  choose a rating\n  \
                  submit                    submit the rating\n  \
                  wait <ms>                 advance the clock\n  \
                  clear <id>                forget a VIP\n  \
                  quit"
)]
struct Args {
    /// Interactive scripted mode - read commands from stdin
    #[arg(short, long)]
    interactive: bool,

    /// Run the sampling loop and HTTP API
    #[arg(short, long)]
    serve: bool,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Recognition service URL (overrides config)
    #[arg(long)]
    service_url: Option<String>,

    /// Server address (overrides config, default 127.0.0.1:3000)
    #[arg(long)]
    addr: Option<String>,

    /// Directory of still images used as camera frames (overrides config)
    #[arg(long)]
    frame_dir: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,
}

/// One line of the interactive script
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Face { age: u32, gender: Gender },
    NoFace,
    Input(FlowInput),
    Wait(Duration),
    Clear(VipId),
    Quit,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.serve);

    if args.no_color {
        colored::control::set_override(false);
    }

    let mut config = match &args.config {
        Some(path) => KioskConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => KioskConfig::default(),
    };
    if let Some(url) = &args.service_url {
        config.service_url = url.clone();
    }
    if let Some(addr) = &args.addr {
        config.bind_addr = addr.clone();
    }
    if let Some(dir) = &args.frame_dir {
        config.frame_dir = Some(dir.clone());
    }

    if args.interactive || !args.serve {
        run_interactive(&config, &args)
    } else {
        run_serve(&config).await
    }
}

fn init_tracing(serve: bool) {
    let default = if serve { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Run the scripted mode on a virtual clock
fn run_interactive(config: &KioskConfig, args: &Args) -> anyhow::Result<()> {
    let mut kiosk = config.build_kiosk();
    let mut clock = Instant::now();

    if !args.json {
        print_header("Interactive", args.no_color);
        println!("Type 'vip 22 male', 'select 1', 'wait 5000', ... Type 'quit' to exit.");
        println!();
        print_view(&kiosk.view(), args);
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if !args.json {
            print!("> ");
            stdout.flush()?;
        }

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let command = match parse_command(line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        let output = match contextualize(command, &kiosk) {
            Command::Quit => break,
            Command::Face { age, gender } => {
                kiosk.on_detection(Detection::face(gender, age), clock)
            }
            Command::NoFace => kiosk.on_detection(Detection::NoFace, clock),
            Command::Input(input) => kiosk.on_input(input, clock),
            Command::Wait(delay) => {
                clock += delay;
                kiosk.advance(clock)
            }
            Command::Clear(vip_id) => kiosk.clear(vip_id),
        };
        print_output(&kiosk, &output, args)?;
    }

    if !args.json {
        println!("\nSession ended. Ticks: {}", kiosk.tick_count());
    }
    Ok(())
}

fn parse_command(line: &str) -> Result<Command, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let arg = |i: usize| parts.get(i).copied().ok_or_else(|| format!("'{}' needs an argument", parts[0]));

    let command = match parts[0].to_ascii_lowercase().as_str() {
        "vip" | "face" => {
            let age = arg(1)?.parse().map_err(|_| "age must be a number".to_string())?;
            let gender = arg(2)?.parse()?;
            Command::Face { age, gender }
        }
        "none" => Command::NoFace,
        "select" => Command::Input(FlowInput::SelectBox {
            box_id: BoxId::new(arg(1)?),
        }),
        "yes" => Command::Input(FlowInput::LearnMore { yes: true }),
        "no" => Command::Input(FlowInput::LearnMore { yes: false }),
        "play" => Command::Input(FlowInput::ProceedToFeedback),
        "star" => {
            let rating = arg(1)?.parse().map_err(|_| "rating must be 1-5".to_string())?;
            Command::Input(FlowInput::SetRating { rating })
        }
        "submit" => Command::Input(FlowInput::SubmitRating),
        "wait" => {
            let ms = arg(1)?.parse().map_err(|_| "wait takes milliseconds".to_string())?;
            Command::Wait(Duration::from_millis(ms))
        }
        "clear" => {
            let id = arg(1)?.parse().map_err(|_| "clear takes a VIP number".to_string())?;
            Command::Clear(VipId(id))
        }
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command '{}'", other)),
    };
    Ok(command)
}

/// `yes`/`no` mean "learn more" or "take photo" depending on the panel
fn contextualize(command: Command, kiosk: &Kiosk) -> Command {
    use kioskflow::types::FlowState;
    match command {
        Command::Input(FlowInput::LearnMore { yes }) => {
            let on_photo = kiosk
                .registry()
                .active_flow()
                .is_some_and(|f| f.state() == FlowState::PhotoPrompt);
            if on_photo {
                Command::Input(FlowInput::Photo { yes })
            } else {
                Command::Input(FlowInput::LearnMore { yes })
            }
        }
        other => other,
    }
}

fn print_output(kiosk: &Kiosk, output: &KioskOutput, args: &Args) -> anyhow::Result<()> {
    if args.json {
        println!("{}", serde_json::to_string(&output.view)?);
        return Ok(());
    }
    for event in &output.events {
        match event {
            FlowEvent::CountdownTick { remaining } => println!("  ... {}", remaining),
            FlowEvent::RatingRequired => println!("  Please select a rating first"),
            FlowEvent::RatingSubmitted { rating } => println!("  Rating saved: {} stars", rating),
            FlowEvent::PhotoRequested => println!("  Photo taken"),
            FlowEvent::StateEntered { .. } => {}
        }
    }
    print_view(&output.view, args);
    if !output.photos.is_empty() || !output.ratings.is_empty() {
        println!("  (suspended sessions: {})", kiosk.registry().suspended_len());
    }
    Ok(())
}

fn print_view(view: &SessionView, args: &Args) {
    if args.no_color {
        println!("{}", view.to_parseable_string());
    } else {
        println!("{}", view.to_terminal_string());
    }
}

/// Print header
fn print_header(mode: &str, no_color: bool) {
    if no_color {
        println!("========================================");
        println!("  kioskflow v{} - {}", VERSION, mode);
        println!("========================================");
    } else {
        println!("\x1b[1m╔════════════════════════════════════════╗\x1b[0m");
        println!("\x1b[1m║  kioskflow v{} - {:<22}  ║\x1b[0m", VERSION, mode);
        println!("\x1b[1m╚════════════════════════════════════════╝\x1b[0m");
    }
    println!();
}

/// Run the sampling loop and HTTP API until Ctrl-C
async fn run_serve(config: &KioskConfig) -> anyhow::Result<()> {
    let Some(frame_dir) = &config.frame_dir else {
        bail!("--serve needs a frame directory (--frame-dir or frame_dir in the config)");
    };

    let source = DirectoryFrameSource::load(frame_dir)?;
    let client = RecognitionClient::new(&config.service_url, config.classifier_timeout())
        .context("building recognition client")?;
    if !client.health().await {
        warn!("Recognition service at {} is not answering yet", client.base_url());
    }
    let client = Arc::new(client);

    let collaborators = Collaborators {
        source: Arc::new(source),
        classifier: client.clone(),
        sink: client,
        overlay: Arc::new(NoOverlay),
    };
    let mut sampler = SamplingLoop::new(config.build_kiosk(), config.sample_interval(), collaborators);
    let handle = sampler.handle();
    sampler.start();

    info!("kioskflow v{} serving on {}", VERSION, config.bind_addr);
    let result = tokio::select! {
        served = run_server(&config.bind_addr, handle) => served.context("API server failed"),
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            Ok(())
        }
    };

    sampler.stop().await?;
    result
}
