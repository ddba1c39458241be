//! Reading-time estimation

use super::post::ContentSection;

/// Average reading speed used when none is configured
pub const WORDS_PER_MINUTE: usize = 200;

/// Estimate reading time in whole minutes at 200 words per minute
///
/// Empty content yields 0; callers decide whether to display a minimum.
pub fn estimate(content: &[ContentSection]) -> u32 {
    estimate_with_rate(content, WORDS_PER_MINUTE)
}

/// Estimate reading time at a custom rate (0 falls back to the default)
pub fn estimate_with_rate(content: &[ContentSection], words_per_minute: usize) -> u32 {
    let rate = if words_per_minute == 0 {
        WORDS_PER_MINUTE
    } else {
        words_per_minute
    };

    let minutes = count_words(content).div_ceil(rate);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}

/// Whitespace-delimited tokens across every heading and body text
pub fn count_words(content: &[ContentSection]) -> usize {
    content
        .iter()
        .map(|section| {
            let heading = section.heading.split_whitespace().count();
            let body: usize = section
                .body
                .texts()
                .iter()
                .map(|t| t.split_whitespace().count())
                .sum();
            heading + body
        })
        .sum()
}
