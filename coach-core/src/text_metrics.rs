//! Deterministic speech metrics computed from a transcript
//!
//! Filler words are found with a single Aho-Corasick pass that reports overlapping
//! matches, so every listed pattern is counted on its own: a span that matches two
//! listed phrases counts toward both.

use std::sync::LazyLock;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::types::FillerWordCount;

/// Verbal habits counted as filler, in reporting order
pub const FILLER_WORDS: &[&str] = &[
    "um",
    "uh",
    "like",
    "you know",
    "actually",
    "basically",
    "literally",
    "sort of",
    "kind of",
    "i mean",
    "right",
    "okay",
    "so",
    "well",
];

pub const SLOW_WPM_MAX: u32 = 120;
pub const OPTIMAL_WPM_MIN: u32 = 150;
pub const OPTIMAL_WPM_MAX: u32 = 170;
pub const FAST_WPM_MIN: u32 = 180;

static DEFAULT_DETECTOR: LazyLock<FillerDetector> =
    LazyLock::new(|| FillerDetector::new(FILLER_WORDS));

/// Result of filler word detection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillerAnalysis {
    /// Sum of all per-word counts
    pub count: u32,
    /// Non-zero counts only, in filler list order
    pub per_word: Vec<FillerWordCount>,
}

/// All deterministic metrics for one transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMetrics {
    pub fillers: FillerAnalysis,
    pub word_count: usize,
    pub words_per_minute: u32,
    pub question_ratio: f64,
}

/// Whole-word, case-insensitive multi-pattern filler matcher
pub struct FillerDetector {
    automaton: Option<AhoCorasick>,
    patterns: Vec<String>,
}

impl FillerDetector {
    /// Build a detector over the given phrases
    pub fn new<S: AsRef<str>>(words: &[S]) -> Self {
        let patterns: Vec<String> = words.iter().map(|w| w.as_ref().to_lowercase()).collect();

        // overlapping search requires standard match semantics
        let automaton = if patterns.is_empty() {
            None
        } else {
            AhoCorasickBuilder::new()
                .match_kind(MatchKind::Standard)
                .ascii_case_insensitive(true)
                .build(&patterns)
                .map_err(|e| warn!("Failed to build filler automaton: {}", e))
                .ok()
        };

        Self {
            automaton,
            patterns,
        }
    }

    /// Count every whole-word occurrence of every pattern
    pub fn detect(&self, text: &str) -> FillerAnalysis {
        let Some(ref ac) = self.automaton else {
            return FillerAnalysis::default();
        };

        let bytes = text.as_bytes();
        let mut counts = vec![0u32; self.patterns.len()];

        for mat in ac.find_overlapping_iter(text) {
            let starts_clean = mat.start() == 0 || !is_word_byte(bytes[mat.start() - 1]);
            let ends_clean = mat.end() == bytes.len() || !is_word_byte(bytes[mat.end()]);
            if starts_clean && ends_clean {
                counts[mat.pattern().as_usize()] += 1;
            }
        }

        let per_word: Vec<FillerWordCount> = self
            .patterns
            .iter()
            .zip(counts)
            .filter(|(_, count)| *count > 0)
            .map(|(word, count)| FillerWordCount {
                word: word.clone(),
                count,
            })
            .collect();

        FillerAnalysis {
            count: per_word.iter().map(|w| w.count).sum(),
            per_word,
        }
    }
}

impl Default for FillerDetector {
    fn default() -> Self {
        Self::new(FILLER_WORDS)
    }
}

/// ASCII word characters, matching what a `\b` boundary looks at
fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Detect filler words using the standard list
pub fn detect_filler_words(transcript: &str) -> FillerAnalysis {
    DEFAULT_DETECTOR.detect(transcript)
}

/// Number of whitespace-delimited words
pub fn word_count(transcript: &str) -> usize {
    transcript.split_whitespace().count()
}

/// Words per minute, rounded to the nearest integer
///
/// Fails with `InvalidInput` when the duration is not a positive number.
pub fn words_per_minute(transcript: &str, duration_seconds: f64) -> Result<u32> {
    if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "duration must be positive to compute words per minute, got {}",
            duration_seconds
        )));
    }

    let minutes = duration_seconds / 60.0;
    Ok((word_count(transcript) as f64 / minutes).round() as u32)
}

/// Percentage of sentences that are questions, rounded to one decimal
///
/// Sentences come from splitting on `.`, `!` and `?`; the numerator is the raw
/// number of `?` characters.
pub fn question_ratio(transcript: &str) -> f64 {
    let sentences = transcript
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count();

    if sentences == 0 {
        return 0.0;
    }

    let questions = transcript.chars().filter(|c| *c == '?').count();
    round_to_tenth(questions as f64 / sentences as f64 * 100.0)
}

/// Compute every metric at once. A non-positive duration yields zero WPM.
pub fn analyze(transcript: &str, duration_seconds: f64) -> TranscriptMetrics {
    let words_per_minute = match words_per_minute(transcript, duration_seconds) {
        Ok(wpm) => wpm,
        Err(e) => {
            warn!("Defaulting words per minute to 0: {}", e);
            0
        }
    };

    TranscriptMetrics {
        fillers: detect_filler_words(transcript),
        word_count: word_count(transcript),
        words_per_minute,
        question_ratio: question_ratio(transcript),
    }
}

pub(crate) fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Speaking rate classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacingBand {
    Slow,
    Moderate,
    Optimal,
    Fast,
}

impl PacingBand {
    pub fn from_wpm(wpm: u32) -> Self {
        match wpm {
            w if w <= SLOW_WPM_MAX => Self::Slow,
            w if w >= FAST_WPM_MIN => Self::Fast,
            OPTIMAL_WPM_MIN..=OPTIMAL_WPM_MAX => Self::Optimal,
            _ => Self::Moderate,
        }
    }
}

/// Score quality classification on the 0-10 scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl ScoreBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 8.0 {
            Self::Excellent
        } else if score >= 6.0 {
            Self::Good
        } else if score >= 4.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_for(analysis: &FillerAnalysis, word: &str) -> u32 {
        analysis
            .per_word
            .iter()
            .find(|w| w.word == word)
            .map(|w| w.count)
            .unwrap_or(0)
    }

    #[test]
    fn test_fillers_case_insensitive_whole_word() {
        let analysis = detect_filler_words("Um, UM, umbrella. So also, so.");
        assert_eq!(count_for(&analysis, "um"), 2);
        assert_eq!(count_for(&analysis, "so"), 2);
        assert_eq!(analysis.count, 4);
    }

    #[test]
    fn test_multi_word_fillers() {
        let analysis = detect_filler_words("You know, it was sort of fine, I mean kind of.");
        assert_eq!(count_for(&analysis, "you know"), 1);
        assert_eq!(count_for(&analysis, "sort of"), 1);
        assert_eq!(count_for(&analysis, "i mean"), 1);
        assert_eq!(count_for(&analysis, "kind of"), 1);
        assert_eq!(analysis.count, 4);
    }

    #[test]
    fn test_overlapping_patterns_both_count() {
        let detector = FillerDetector::new(&["you know", "know"]);
        let analysis = detector.detect("you know what I know");
        assert_eq!(count_for(&analysis, "you know"), 1);
        assert_eq!(count_for(&analysis, "know"), 2);
        assert_eq!(analysis.count, 3);
    }

    #[test]
    fn test_count_is_sum_of_per_word() {
        let analysis = detect_filler_words(
            "Okay so basically, like, I literally, um, actually think it's right, well.",
        );
        let sum: u32 = analysis.per_word.iter().map(|w| w.count).sum();
        assert_eq!(analysis.count, sum);
        assert_eq!(analysis.count, 9);
    }

    #[test]
    fn test_per_word_follows_list_order() {
        let analysis = detect_filler_words("well so um");
        let words: Vec<&str> = analysis.per_word.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(words, vec!["um", "so", "well"]);
    }

    #[test]
    fn test_no_fillers() {
        let analysis = detect_filler_words("The quarterly numbers look strong.");
        assert_eq!(analysis, FillerAnalysis::default());
        assert_eq!(detect_filler_words(""), FillerAnalysis::default());
    }

    #[test]
    fn test_empty_detector() {
        let detector = FillerDetector::new::<&str>(&[]);
        assert_eq!(detector.detect("um uh"), FillerAnalysis::default());
    }

    #[test]
    fn test_words_per_minute() {
        // 30 words over 15 seconds
        let transcript = vec!["word"; 30].join(" ");
        assert_eq!(words_per_minute(&transcript, 15.0).unwrap(), 120);

        // 7 words / (9 / 60) = 46.67
        assert_eq!(
            words_per_minute("one two  three\tfour\nfive six seven", 9.0).unwrap(),
            47
        );
        assert_eq!(words_per_minute("", 30.0).unwrap(), 0);
    }

    #[test]
    fn test_words_per_minute_rejects_bad_duration() {
        assert!(matches!(
            words_per_minute("hello there", 0.0),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            words_per_minute("hello there", -4.0),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            words_per_minute("hello there", f64::NAN),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_question_ratio() {
        assert_eq!(question_ratio("Are you sure? Yes. Really?"), 66.7);
        assert_eq!(question_ratio("Fine. Good!"), 0.0);
        assert_eq!(question_ratio("What?!"), 100.0);
        assert_eq!(question_ratio(""), 0.0);
        assert_eq!(question_ratio("  ...  "), 0.0);
    }

    #[test]
    fn test_question_ratio_counts_raw_question_marks() {
        // "Why??" is one sentence with two question marks
        assert_eq!(question_ratio("Why?? Because."), 100.0);
    }

    #[test]
    fn test_analyze_end_to_end_transcript() {
        let transcript = "Um, so, I think, uh, we should meet tomorrow. Right?";
        let metrics = analyze(transcript, 10.0);

        assert!(metrics.fillers.count >= 3);
        assert_eq!(count_for(&metrics.fillers, "um"), 1);
        assert_eq!(count_for(&metrics.fillers, "so"), 1);
        assert_eq!(count_for(&metrics.fillers, "uh"), 1);
        assert_eq!(count_for(&metrics.fillers, "right"), 1);
        assert_eq!(metrics.word_count, 10);
        assert_eq!(metrics.words_per_minute, 60);
        assert_eq!(metrics.question_ratio, 50.0);
    }

    #[test]
    fn test_analyze_zero_duration_defaults_wpm() {
        let metrics = analyze("hello there friend", 0.0);
        assert_eq!(metrics.words_per_minute, 0);
        assert_eq!(metrics.word_count, 3);
    }

    #[test]
    fn test_pacing_bands() {
        assert_eq!(PacingBand::from_wpm(0), PacingBand::Slow);
        assert_eq!(PacingBand::from_wpm(120), PacingBand::Slow);
        assert_eq!(PacingBand::from_wpm(135), PacingBand::Moderate);
        assert_eq!(PacingBand::from_wpm(160), PacingBand::Optimal);
        assert_eq!(PacingBand::from_wpm(175), PacingBand::Moderate);
        assert_eq!(PacingBand::from_wpm(180), PacingBand::Fast);
    }

    #[test]
    fn test_score_bands() {
        assert_eq!(ScoreBand::from_score(9.5), ScoreBand::Excellent);
        assert_eq!(ScoreBand::from_score(8.0), ScoreBand::Excellent);
        assert_eq!(ScoreBand::from_score(6.5), ScoreBand::Good);
        assert_eq!(ScoreBand::from_score(4.0), ScoreBand::Fair);
        assert_eq!(ScoreBand::from_score(1.0), ScoreBand::Poor);
    }
}
