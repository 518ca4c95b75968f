
use std::time::Duration;

use anyhow::Result;
use excuse_core::{
    intro::{IntroEvent, IntroSequence},
    orchestrator::ExcuseOrchestrator,
    typing::TypingReveal,
};
use shared::domain::RequestState;
use tokio::{
    io::{AsyncBufRead, AsyncWrite, AsyncWriteExt, Lines},
    time::interval,
};

pub const PROMPT: &str = "\nWhat did you do? > ";
const CLEAR_LINE: &str = "\r\x1b[2K";
const SPINNER_FRAMES: [char; 4] = ['|', '/', '-', '\\'];
const SPINNER_TICK: Duration = Duration::from_millis(100);
const TITLE_DELAY: Duration = Duration::from_millis(200);
const TITLE_STAGGER: Duration = Duration::from_millis(100);

/// Plays the intro until it completes or the user presses Enter.
pub async fn run_intro<R, W>(
    mut intro: IntroSequence,
    lines: &mut Lines<R>,
    out: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut stdin_open = true;
    let mut skipped = false;

    'intro: loop {
        tokio::select! {
            event = intro.next_event() => match event {
                Some(IntroEvent::Phrase { text, .. }) => {
                    out.write_all(format!("{CLEAR_LINE}{text}").as_bytes()).await?;
                    out.flush().await?;
                }
                Some(IntroEvent::TitleRevealed(title)) => {
                    out.write_all(CLEAR_LINE.as_bytes()).await?;
                    let reveal = TypingReveal::new(&title).with_timing(TITLE_DELAY, TITLE_STAGGER);
                    let typing = reveal.play_to(out);
                    tokio::pin!(typing);
                    loop {
                        tokio::select! {
                            written = &mut typing => {
                                written?;
                                break;
                            }
                            line = lines.next_line(), if stdin_open => match line? {
                                Some(_) => {
                                    skipped = true;
                                    break 'intro;
                                }
                                None => stdin_open = false,
                            },
                        }
                    }
                }
                Some(IntroEvent::Completed) | None => break,
            },
            line = lines.next_line(), if stdin_open => match line? {
                Some(_) => {
                    skipped = true;
                    break;
                }
                None => stdin_open = false,
            },
        }
    }

    if skipped {
        intro.dismiss();
    }
    out.write_all(format!("{CLEAR_LINE}\n").as_bytes()).await?;
    out.flush().await?;
    Ok(())
}

pub async fn print_banner<W>(configured: bool, out: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut banner = String::from(
        "Get Me Out\nFor when you're in a bit of a pickle...\n\
         Describe the situation (e.g. 'Forgot our anniversary'). \
         Commands: :copy, :quit\n",
    );
    if !configured {
        banner.push_str("warning: no API key configured; set API_KEY to generate excuses\n");
    }
    out.write_all(banner.as_bytes()).await?;
    out.flush().await?;
    Ok(())
}

pub async fn show_pending<W>(orchestrator: &ExcuseOrchestrator, out: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let settled = orchestrator.wait_settled();
    tokio::pin!(settled);
    let mut ticker = interval(SPINNER_TICK);
    let mut frame = 0;

    loop {
        tokio::select! {
            _ = &mut settled => break,
            _ = ticker.tick() => {
                let glyph = SPINNER_FRAMES[frame % SPINNER_FRAMES.len()];
                out.write_all(format!("{CLEAR_LINE}{glyph} Generating...").as_bytes()).await?;
                out.flush().await?;
                frame += 1;
            }
        }
    }

    out.write_all(CLEAR_LINE.as_bytes()).await?;
    out.flush().await?;
    Ok(())
}

pub async fn render_state<W>(state: &RequestState, out: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    match state {
        RequestState::Succeeded(excuse) => {
            out.write_all(b"\nYour Perfect Excuse:\n").await?;
            TypingReveal::quoted(excuse).play_to(out).await?;
            out.write_all(b"\n").await?;
        }
        RequestState::Failed(message) => {
            out.write_all(format!("\nerror: {message}\n").as_bytes()).await?;
        }
        RequestState::Idle | RequestState::Pending => {}
    }
    out.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use excuse_core::intro::IntroScript;
    use tokio::{
        io::{AsyncBufReadExt, BufReader},
        time::{sleep, Instant},
    };

    #[tokio::test(start_paused = true)]
    async fn renders_result_in_quotes() {
        let mut out = Vec::new();
        render_state(&RequestState::Succeeded("Blame the moon.".into()), &mut out)
            .await
            .expect("render");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("Your Perfect Excuse:"));
        assert!(text.contains("\"Blame the moon.\""));
    }

    #[tokio::test]
    async fn renders_failures_in_error_region() {
        let mut out = Vec::new();
        render_state(&RequestState::Failed("API Key is missing.".into()), &mut out)
            .await
            .expect("render");
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "\nerror: API Key is missing.\n"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn intro_runs_to_completion_when_stdin_is_closed() {
        let mut lines = BufReader::new(&b""[..]).lines();
        let mut out = Vec::new();
        let script = IntroScript {
            phrases: vec!["Stuck?".into()],
            ..IntroScript::default()
        };

        run_intro(IntroSequence::start(script, None), &mut lines, &mut out)
            .await
            .expect("intro");

        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("Stuck?"));
        assert!(text.contains("Get Me Out"));
    }

    #[tokio::test(start_paused = true)]
    async fn enter_skips_the_intro() {
        let mut lines = BufReader::new(&b"\n"[..]).lines();
        let mut out = Vec::new();

        run_intro(
            IntroSequence::start(IntroScript::default(), None),
            &mut lines,
            &mut out,
        )
        .await
        .expect("intro");

        let text = String::from_utf8(out).expect("utf8");
        assert!(!text.contains("Get Me Out"));
    }

    #[tokio::test(start_paused = true)]
    async fn enter_skips_while_the_title_is_typing() {
        let (mut keyboard, input) = tokio::io::duplex(16);
        let mut lines = BufReader::new(input).lines();
        let mut out = Vec::new();
        let script = IntroScript {
            phrases: vec!["Stuck?".into()],
            ..IntroScript::default()
        };
        let started = Instant::now();

        tokio::spawn(async move {
            sleep(Duration::from_millis(1_350)).await;
            keyboard.write_all(b"\n").await.expect("press enter");
        });
        run_intro(IntroSequence::start(script, None), &mut lines, &mut out)
            .await
            .expect("intro");

        assert_eq!(started.elapsed(), Duration::from_millis(1_350));
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("Ge"));
        assert!(!text.contains("Get Me Out"));
    }
}
