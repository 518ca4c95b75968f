use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use excuse_core::{
    audio::AudioEngine,
    intro::{IntroScript, IntroSequence},
    load_settings, load_settings_from,
    orchestrator::{CopyOutcome, ExcuseOrchestrator, TriggerOutcome},
    ExcuseClient,
};
use shared::domain::SoundCue;
use tokio::io::{stdin, stdout, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

mod clipboard;
mod sound;
mod terminal;

use clipboard::ArboardClipboard;

#[derive(Parser, Debug)]
#[command(name = "get_me_out", version, about = "Charming excuses for awkward situations")]
struct Args {
    #[arg(long, help = "Skip the intro sequence")]
    skip_intro: bool,
    #[arg(long, help = "Disable sound cues")]
    mute: bool,
    #[arg(long, help = "Settings file (defaults to ./get_me_out.toml when present)")]
    config: Option<PathBuf>,
    #[arg(long, help = "Generate one excuse for this situation and exit")]
    situation: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let settings = match args.config.as_deref() {
        Some(path) => load_settings_from(path)?,
        None => load_settings(),
    };
    let client = ExcuseClient::from_settings(&settings);
    let configured = client.is_configured();

    let audio = Arc::new(if args.mute || !settings.sound_enabled {
        AudioEngine::muted()
    } else {
        AudioEngine::new(sound::open_speakers)
    });
    let orchestrator = ExcuseOrchestrator::new(client, Some(audio.clone()));
    let mut out = stdout();

    if let Some(situation) = args.situation {
        orchestrator.set_situation(situation);
        if orchestrator.trigger() == TriggerOutcome::Started {
            terminal::show_pending(&orchestrator, &mut out).await?;
        }
        terminal::render_state(&orchestrator.state(), &mut out).await?;
        audio.shutdown();
        return Ok(());
    }

    let mut lines = BufReader::new(stdin()).lines();

    if settings.intro_enabled && !args.skip_intro {
        let intro = IntroSequence::start(IntroScript::default(), Some(audio.clone()));
        terminal::run_intro(intro, &mut lines, &mut out).await?;
    }

    terminal::print_banner(configured, &mut out).await?;

    loop {
        out.write_all(terminal::PROMPT.as_bytes()).await?;
        out.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        audio.play(SoundCue::Typing);

        match line.trim() {
            ":quit" | ":q" => break,
            ":copy" | ":c" => {
                let message = match orchestrator.copy_result(&ArboardClipboard) {
                    Ok(CopyOutcome::Copied) => "Copied!".to_string(),
                    Ok(CopyOutcome::AlreadyCopied) => "Already copied.".to_string(),
                    Ok(CopyOutcome::NothingToCopy) => "Nothing to copy yet.".to_string(),
                    Err(err) => format!("error: {err}"),
                };
                out.write_all(format!("{message}\n").as_bytes()).await?;
            }
            _ => {
                orchestrator.set_situation(line);
                if orchestrator.trigger() == TriggerOutcome::Started {
                    terminal::show_pending(&orchestrator, &mut out).await?;
                }
                terminal::render_state(&orchestrator.state(), &mut out).await?;
            }
        }
    }

    audio.shutdown();
    out.flush().await?;
    Ok(())
}
