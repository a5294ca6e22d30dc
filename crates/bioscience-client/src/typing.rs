//! Character-by-character reveal for generated summaries.

use std::time::Duration;

pub const DEFAULT_SPEED: Duration = Duration::from_millis(15);
pub const FINDING_STAGGER: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingAnimation {
    text: String,
    speed: Duration,
    chars: usize,
}

impl TypingAnimation {
    pub fn new(text: impl Into<String>, speed: Duration) -> Self {
        let text = text.into();
        let chars = text.chars().count();
        Self { text, speed, chars }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn duration(&self) -> Duration {
        self.speed * self.chars as u32
    }

    fn visible_chars(&self, elapsed: Duration) -> usize {
        if self.speed.is_zero() {
            return self.chars;
        }
        let ticks = elapsed.as_nanos() / self.speed.as_nanos();
        (ticks.min(self.chars as u128)) as usize
    }

    /// Visible prefix after `elapsed`. Always ends on a char boundary.
    pub fn frame(&self, elapsed: Duration) -> &str {
        let n = self.visible_chars(elapsed);
        match self.text.char_indices().nth(n) {
            Some((idx, _)) => &self.text[..idx],
            None => &self.text,
        }
    }

    pub fn is_typing(&self, elapsed: Duration) -> bool {
        self.visible_chars(elapsed) < self.chars
    }

    /// Drives the animation in real time, handing each new frame to `sink`.
    pub async fn play<F: FnMut(&str)>(&self, mut sink: F) {
        let start = tokio::time::Instant::now();
        for n in 1..=self.chars {
            tokio::time::sleep_until(start + self.speed * n as u32).await;
            sink(self.frame(self.speed * n as u32));
        }
    }
}

/// How many of `count` items are shown after `elapsed`, with item `i`
/// appearing at `i * stagger`.
pub fn staggered_reveal(count: usize, stagger: Duration, elapsed: Duration) -> usize {
    if count == 0 {
        return 0;
    }
    if stagger.is_zero() {
        return count;
    }
    let shown = (elapsed.as_nanos() / stagger.as_nanos()) as usize + 1;
    shown.min(count)
}
