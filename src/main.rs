use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use fred_drawers::config::Config;
use fred_drawers::device::{DeviceLink, SerialLink};
use fred_drawers::kernel::{FileSignal, TagWatcher};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    fred_drawers::logging::init();
    info!("Fred booting...");

    let config = Config::from_env().context("invalid configuration")?;

    let serial = SerialLink::open(&config.serial_port, config.serial_baud, config.serial_read_timeout)
        .with_context(|| format!("failed to open serial port {}", config.serial_port))?;
    let link = Arc::new(DeviceLink::new(serial));

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Keyboard Interrupt");
            }
            shutdown.cancel();
        });
    }

    let tag_task = match &config.tag_file {
        Some(path) => {
            let watcher = TagWatcher::new(link.clone(), FileSignal::new(path), config.tag_poll_interval);
            let token = shutdown.clone();
            Some(tokio::spawn(async move { watcher.run(token).await }))
        }
        None => {
            warn!("NFC_FILE_PATH not set, tag unlock disabled");
            None
        }
    };

    info!("Fred active. Press Ctrl+C to stop.");
    let voice = voice::run(&config, link, shutdown.clone()).await;

    // A fatal voice fault takes the tag watcher down with it.
    shutdown.cancel();
    if let Some(task) = tag_task {
        if let Err(e) = task.await {
            error!("Tag watcher task failed: {}", e);
        }
    }

    voice
}

#[cfg(all(feature = "audio-io", feature = "wake-word"))]
mod voice {
    use anyhow::Result;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    use fred_drawers::audio::{AudioCapture, ListenerConfig, UtteranceListener, WakeWordEngine};
    use fred_drawers::audio::wake::RustpotterEngine;
    use fred_drawers::config::Config;
    use fred_drawers::device::{DeviceLink, SerialLink};
    use fred_drawers::kernel::{SessionConfig, WakeLoop};
    use fred_drawers::services::stt::HttpRecognizer;

    pub async fn run(config: &Config, link: Arc<DeviceLink<SerialLink>>, shutdown: CancellationToken) -> Result<()> {
        let engine = RustpotterEngine::new(&config.keyword_paths, config.sample_rate)?;
        let source = AudioCapture::open(engine.sample_rate())?;
        let recognizer = HttpRecognizer::new(config.stt_url.clone(), config.stt_key.clone(), config.stt_timeout);
        let session = SessionConfig {
            language: config.language.clone(),
            ..SessionConfig::default()
        };

        WakeLoop::new(source, engine, recognizer, UtteranceListener::new(ListenerConfig::default()), link, session)?
            .run(shutdown)
            .await?;
        Ok(())
    }
}

#[cfg(not(all(feature = "audio-io", feature = "wake-word")))]
mod voice {
    use anyhow::Result;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;
    use tracing::warn;

    use fred_drawers::config::Config;
    use fred_drawers::device::{DeviceLink, SerialLink};

    pub async fn run(_config: &Config, _link: Arc<DeviceLink<SerialLink>>, shutdown: CancellationToken) -> Result<()> {
        warn!("Voice control disabled (built without 'audio-io' and 'wake-word' features)");
        shutdown.cancelled().await;
        Ok(())
    }
}
