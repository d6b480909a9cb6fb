//! callflow
//!
//! Drives the event dispatcher and the IVR engine from the command line:
//! 1. `dispatch` feeds saved webhook bodies through the dispatcher
//! 2. `press` presents the main menu and presses tones against a logging backend

mod calling;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use callflow_call_automation::ivr::parse_tone_sequence;
use callflow_call_automation::prelude::*;
use callflow_infra_common::{LoggingConfig, setup_logging};

use calling::LoggingCallingOperations;

#[derive(Parser, Debug)]
#[command(author, version, about = "Call automation event dispatch and IVR tool", long_about = None)]
struct Cli {
    /// Configuration file (.json or .toml)
    #[arg(short, long, env = "CALLFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Default log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dispatch webhook payload files to logging subscribers
    Dispatch {
        /// Files each holding one webhook request body
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Subscription as <EventKind>:<callLegId>, repeatable
        #[arg(short, long = "subscribe")]
        subscriptions: Vec<String>,
    },

    /// Press tones on the main menu
    Press {
        /// Keypad string, e.g. "2" or "19#"
        tones: String,

        /// Call connection id
        #[arg(long, default_value = "cli-call")]
        call: String,

        /// Server call id of the same call, when known
        #[arg(long)]
        server_call_id: Option<String>,

        /// Raw id of the participant pressing the keys
        #[arg(long, default_value = "8:acs:cli-caller")]
        target: String,

        /// Raw ids reported as the call's participants
        #[arg(long = "participant")]
        participants: Vec<String>,

        /// Digits returned when a choice collects a phone number
        #[arg(long)]
        number: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AutomationConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => AutomationConfig::default(),
    };
    let config = config.from_env()?;

    let mut logging = LoggingConfig::from_level_str(&cli.log_level, config.service_name.clone())?;
    if cli.json_logs {
        logging = logging.with_json();
    }
    setup_logging(logging)?;

    match cli.command {
        Command::Dispatch { files, subscriptions } => dispatch(&config, &files, &subscriptions).await,
        Command::Press {
            tones,
            call,
            server_call_id,
            target,
            participants,
            number,
        } => {
            let call = call_connection(&call, server_call_id.as_deref());
            press(&config, &tones, &call, &target, &participants, number.as_deref()).await
        }
    }
}

fn parse_subscription(spec: &str) -> anyhow::Result<(EventKind, String)> {
    let Some((kind, leg)) = spec.split_once(':') else {
        bail!("subscription '{}' is not <EventKind>:<callLegId>", spec);
    };
    let Some(kind) = EventKind::from_type_name(kind) else {
        bail!("unknown event kind '{}'", kind);
    };
    if leg.is_empty() {
        bail!("subscription '{}' has an empty call leg id", spec);
    }
    Ok((kind, leg.to_string()))
}

async fn dispatch(config: &AutomationConfig, files: &[PathBuf], subscriptions: &[String]) -> anyhow::Result<()> {
    let dispatcher = EventDispatcher::new(config.dispatcher.clone());

    for spec in subscriptions {
        let (kind, leg) = parse_subscription(spec)?;
        let callback = NotificationCallback::from_fn(move |event| {
            info!(
                "📬 {} on {} (failure: {}, tones: {:?})",
                event.kind,
                event.call_leg_id().unwrap_or("-"),
                event.kind.is_failure(),
                event.collected_tones()
            );
        });
        if !dispatcher.subscribe(kind, &leg, callback) {
            warn!("⚠️ Duplicate subscription {}:{} ignored", kind, leg);
        }
    }

    for file in files {
        let payload = tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("reading {}", file.display()))?;
        let scheduled = dispatcher.process_notification(&payload);
        info!("📄 {} -> {} callbacks scheduled", file.display(), scheduled);
    }

    dispatcher.shutdown().await?;

    let stats = dispatcher.stats();
    println!(
        "received={} dispatched={} unmatched={} dropped={} rejected={}",
        stats.received, stats.dispatched, stats.unmatched, stats.dropped_unparsed, stats.rejected
    );
    Ok(())
}

fn call_connection(call_connection_id: &str, server_call_id: Option<&str>) -> CallConnection {
    let call = CallConnection::new(call_connection_id);
    match server_call_id {
        Some(id) => call.with_server_call_id(id),
        None => call,
    }
}

fn build_main_menu(config: &AutomationConfig, calling: Arc<dyn CallingOperations>) -> Result<IvrMenu> {
    let ivr = &config.ivr;
    let mut builder = IvrMenuBuilder::new(config.main_menu_name.clone(), Arc::clone(&calling))
        .with_configuration(ivr.clone())
        .add_choice(
            DtmfTone::One,
            Arc::new(AddParticipantChoice::new(
                Arc::clone(&calling),
                ivr.prompt_uri.clone(),
                ivr.hold_music_uri.clone(),
                &ivr.phone_number,
            )),
        )
        .add_choice(
            DtmfTone::Two,
            Arc::new(RemovePstnParticipantsChoice::new(Arc::clone(&calling))),
        )
        .add_choice(
            DtmfTone::Three,
            Arc::new(TransferChoice::new(
                Arc::clone(&calling),
                ivr.prompt_uri.clone(),
                &ivr.phone_number,
            )),
        )
        .add_choice(DtmfTone::Four, Arc::new(HangUpChoice::new(Arc::clone(&calling))));

    if let Some(prompt) = &ivr.prompt_uri {
        builder = builder.add_choice(
            DtmfTone::Asterisk,
            Arc::new(PlayPromptChoice::new(Arc::clone(&calling), prompt.clone())),
        );
    }

    builder.build()
}

async fn press(
    config: &AutomationConfig,
    tones: &str,
    call: &CallConnection,
    target: &str,
    participants: &[String],
    number: Option<&str>,
) -> anyhow::Result<()> {
    let tones = parse_tone_sequence(tones);
    if tones.is_empty() {
        bail!("no DTMF tones given");
    }

    let calling: Arc<dyn CallingOperations> = Arc::new(LoggingCallingOperations::new(participants, number));
    let mut menus = IvrMenuRegistry::new();
    let menu = menus.register(build_main_menu(config, calling)?)?;

    let target = CommunicationIdentifier::from_raw_id(target);
    let cancel = CancellationToken::new();

    for tone in tones {
        match menu.on_press(tone, call, &target, &cancel).await {
            Ok(()) => println!("{} -> ok", tone),
            Err(e) if e.is_invalid_entry() => println!("{} -> invalid entry", tone),
            Err(e) => println!("{} -> failed: {}", tone, e),
        }
    }
    Ok(())
}
