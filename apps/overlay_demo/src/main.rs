use std::{path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use capture_integration::{MediaDevices, MissingMediaDevices};
use clap::Parser;
use overlay_core::{load_config, CaptureStreamController, NavigationSync, SlideTree, SyncCommand};
use shared::{domain::CaptureDeviceId, protocol::HostEvent};
use tokio::{sync::mpsc, time::sleep};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod simulated;

use simulated::{Navigation, RecordingSurface, ScriptedHost, SimulatedMediaDevices};

#[derive(Parser, Debug)]
#[command(about = "Drive the slide camera overlay through a scripted presentation")]
struct Args {
    /// TOML overlay config; environment overrides still apply.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Comma-separated style tags per slide; `-` marks an untagged slide.
    #[arg(long, default_value = "left,-,right")]
    slides: String,
    /// Comma-separated camera ids; empty runs without a capture backend.
    #[arg(long, default_value = "front,rear")]
    devices: String,
    /// Comma-separated actions: next, prev, goto:N, toggle, cycle, retry.
    #[arg(long, default_value = "next,next,cycle,toggle,toggle")]
    script: String,
    #[arg(long)]
    enabled: bool,
    #[arg(long)]
    persistent: bool,
    #[arg(long, default_value_t = 50)]
    acquire_delay_ms: u64,
    #[arg(long, default_value_t = 120)]
    step_delay_ms: u64,
    /// Refuse every capture request, as if permission was denied.
    #[arg(long)]
    deny: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScriptAction {
    Navigate(Navigation),
    Toggle,
    Cycle,
    Retry,
}

impl FromStr for ScriptAction {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let action = match raw.trim() {
            "next" => ScriptAction::Navigate(Navigation::Next),
            "prev" => ScriptAction::Navigate(Navigation::Prev),
            "toggle" => ScriptAction::Toggle,
            "cycle" => ScriptAction::Cycle,
            "retry" => ScriptAction::Retry,
            other => {
                let index = other
                    .strip_prefix("goto:")
                    .ok_or_else(|| anyhow!("unknown script action '{other}'"))?;
                let index = index
                    .parse::<usize>()
                    .with_context(|| format!("invalid slide index in '{other}'"))?;
                ScriptAction::Navigate(Navigation::Goto(index))
            }
        };
        Ok(action)
    }
}

fn parse_slides(raw: &str) -> Vec<Option<String>> {
    raw.split(',')
        .map(str::trim)
        .map(|tag| match tag {
            "" | "-" => None,
            tag => Some(tag.to_string()),
        })
        .collect()
}

fn parse_devices(raw: &str) -> Vec<CaptureDeviceId> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(CaptureDeviceId::new)
        .collect()
}

fn parse_script(raw: &str) -> Result<Vec<ScriptAction>> {
    raw.split(',')
        .filter(|action| !action.trim().is_empty())
        .map(ScriptAction::from_str)
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if args.enabled {
        config.enabled = true;
    }
    if args.persistent {
        config.persistent = true;
    }
    info!(
        enabled = config.enabled,
        persistent = config.persistent,
        stylesheet = %config.stylesheet_path().display(),
        "overlay: configuration loaded"
    );

    let script = parse_script(&args.script)?;
    let tree = Arc::new(SlideTree::from_annotations(&parse_slides(&args.slides)));
    let host = Arc::new(ScriptedHost::new(tree.len()));
    let surface = Arc::new(RecordingSurface::default());
    let step_delay = Duration::from_millis(args.step_delay_ms);
    let acquire_delay = Duration::from_millis(args.acquire_delay_ms);

    let devices = parse_devices(&args.devices);
    let media: Arc<dyn MediaDevices> = if devices.is_empty() {
        warn!("overlay: no cameras configured, capture will fail");
        Arc::new(MissingMediaDevices)
    } else {
        Arc::new(SimulatedMediaDevices::new(devices, acquire_delay, args.deny))
    };

    let controller = CaptureStreamController::new(media, surface.clone(), config.persistent);
    let sync = NavigationSync::new(
        Arc::clone(&controller),
        host.clone(),
        tree,
        surface.clone(),
        &config,
    );

    let (command_tx, command_rx) = mpsc::channel::<SyncCommand>(32);
    let runner = tokio::spawn(sync.run(command_rx));
    command_tx
        .send(HostEvent::Ready.into())
        .await
        .context("overlay event loop stopped")?;

    for action in script {
        sleep(step_delay).await;
        let command: SyncCommand = match action {
            ScriptAction::Navigate(navigation) => match host.navigate(navigation) {
                Some(event) => event.into(),
                None => {
                    warn!("overlay: navigation {navigation:?} leaves the deck, skipped");
                    continue;
                }
            },
            ScriptAction::Toggle => HostEvent::KeyPressed {
                key_code: config.toggle_key_code,
            }
            .into(),
            ScriptAction::Cycle => HostEvent::KeyPressed {
                key_code: config.cycle_key_code,
            }
            .into(),
            ScriptAction::Retry => SyncCommand::Retry,
        };
        command_tx
            .send(command)
            .await
            .context("overlay event loop stopped")?;
    }

    sleep(step_delay + acquire_delay).await;
    drop(command_tx);
    runner.await.context("overlay event loop panicked")?;

    let snapshot = controller.snapshot().await;
    info!(
        status = %snapshot.status,
        device = ?snapshot.current_device_id,
        known_devices = snapshot.device_list.len(),
        key_bindings = host.bindings().len(),
        "overlay: final state"
    );
    if let Some(err) = snapshot.last_error {
        warn!("overlay: capture error outstanding error={err}");
    }

    println!("{}", serde_json::to_string_pretty(&surface.history())?);
    Ok(())
}
