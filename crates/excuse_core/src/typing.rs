use std::time::Duration;

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    time::{sleep_until, Instant},
};

pub const REVEAL_DELAY: Duration = Duration::from_millis(200);
pub const CHAR_STAGGER: Duration = Duration::from_millis(15);

/// Character-by-character reveal of a piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingReveal {
    chars: Vec<char>,
    delay: Duration,
    stagger: Duration,
}

impl TypingReveal {
    pub fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            delay: REVEAL_DELAY,
            stagger: CHAR_STAGGER,
        }
    }

    pub fn quoted(excuse: &str) -> Self {
        Self::new(&format!("\"{excuse}\""))
    }

    pub fn with_timing(mut self, delay: Duration, stagger: Duration) -> Self {
        self.delay = delay;
        self.stagger = stagger;
        self
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn char_offset(&self, index: usize) -> Duration {
        self.delay + self.stagger * index as u32
    }

    pub fn total_duration(&self) -> Duration {
        self.char_offset(self.len().saturating_sub(1))
    }

    pub fn visible_count(&self, elapsed: Duration) -> usize {
        if elapsed < self.delay {
            return 0;
        }
        if self.stagger.is_zero() {
            return self.len();
        }
        let steps = (elapsed - self.delay).as_nanos() / self.stagger.as_nanos();
        (steps as usize).saturating_add(1).min(self.len())
    }

    pub fn visible_at(&self, elapsed: Duration) -> String {
        self.chars[..self.visible_count(elapsed)].iter().collect()
    }

    pub async fn play_to<W>(&self, writer: &mut W) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let started = Instant::now();
        let mut buf = [0_u8; 4];
        for (index, ch) in self.chars.iter().enumerate() {
            sleep_until(started + self.char_offset(index)).await;
            writer.write_all(ch.encode_utf8(&mut buf).as_bytes()).await?;
            writer.flush().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_the_excuse() {
        assert_eq!(TypingReveal::quoted("Sorry").text(), "\"Sorry\"");
    }

    #[test]
    fn nothing_shows_before_the_initial_delay() {
        let reveal = TypingReveal::new("abc");
        assert_eq!(reveal.visible_at(Duration::from_millis(199)), "");
        assert_eq!(reveal.visible_at(Duration::from_millis(200)), "a");
    }

    #[test]
    fn one_character_per_stagger() {
        let reveal = TypingReveal::new("héllo");
        assert_eq!(reveal.visible_at(Duration::from_millis(215)), "hé");
        assert_eq!(reveal.visible_at(Duration::from_millis(229)), "hé");
        assert_eq!(reveal.visible_at(Duration::from_millis(260)), "héllo");
        assert_eq!(reveal.visible_at(Duration::from_secs(10)), "héllo");
        assert_eq!(reveal.total_duration(), Duration::from_millis(260));
    }

    #[test]
    fn zero_stagger_reveals_everything_after_delay() {
        let reveal = TypingReveal::new("instant").with_timing(Duration::ZERO, Duration::ZERO);
        assert_eq!(reveal.visible_at(Duration::ZERO), "instant");
    }

    #[tokio::test(start_paused = true)]
    async fn streams_text_on_schedule() {
        let reveal = TypingReveal::quoted("Oops");
        let started = Instant::now();
        let mut out = Vec::new();

        reveal.play_to(&mut out).await.expect("write");

        assert_eq!(String::from_utf8(out).expect("utf8"), "\"Oops\"");
        assert_eq!(started.elapsed(), reveal.total_duration());
    }
}
