//! Plain-text rendering of a diarization run.

use talkturn_diarize::{Diarization, LabeledSpan};
use talkturn_labels::rate_label;

/// Renders labeled spans as a transcript with one paragraph per speaker turn.
///
/// Word-level runs come back as one span per word; grouping consecutive
/// spans of one speaker reassembles them into readable turns either way.
pub fn render(run: &Diarization, language: &str, rates: bool) -> String {
    let mut out = String::new();
    let mut turn: Vec<&LabeledSpan> = Vec::new();

    for span in &run.spans {
        if let Some(first) = turn.first() {
            if first.speaker != span.speaker {
                write_turn(&mut out, &turn, language, rates);
                turn.clear();
            }
        }
        turn.push(span);
    }
    write_turn(&mut out, &turn, language, rates);

    if run.cancelled {
        out.push_str("[cancelled: partial transcript]\n");
    }
    out
}

fn write_turn(out: &mut String, turn: &[&LabeledSpan], language: &str, rates: bool) {
    let Some(first) = turn.first() else {
        return;
    };
    let last = turn[turn.len() - 1];

    out.push_str(&format!("{} [{}]", first.label, timestamp(first.start)));
    if rates {
        let words: usize = turn
            .iter()
            .map(|s| s.text.split_whitespace().count())
            .sum();
        let duration = (last.end - first.start).max(0.1);
        out.push_str(&format!(
            " ({})",
            rate_label(language, words as f64 / duration)
        ));
    }
    out.push_str(":\n");

    let mut text = String::new();
    for span in turn {
        let trimmed = span.text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(trimmed);
    }
    out.push_str(&text);
    out.push_str("\n\n");
}

/// Formats seconds as M:SS, or H:MM:SS past the hour.
fn timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use talkturn_diarize::{SpeakerId, Strategy};

    fn span(text: &str, start: f64, end: f64, speaker: u32) -> LabeledSpan {
        LabeledSpan {
            text: text.to_string(),
            start,
            end,
            speaker: SpeakerId(speaker),
            label: format!("Speaker {speaker}"),
            confidence: 0.9,
        }
    }

    fn run_of(spans: Vec<LabeledSpan>) -> Diarization {
        Diarization {
            strategy: Strategy::EnhancedSegment,
            speakers: 2,
            spans,
            cancelled: false,
        }
    }

    #[test]
    fn timestamps() {
        assert_eq!(timestamp(0.0), "0:00");
        assert_eq!(timestamp(65.4), "1:05");
        assert_eq!(timestamp(3661.0), "1:01:01");
    }

    #[test]
    fn groups_consecutive_spans_of_one_speaker() {
        let run = run_of(vec![
            span("hello", 0.0, 0.5, 1),
            span("there", 0.5, 1.0, 1),
            span("hi", 1.5, 2.0, 2),
            span("back again", 2.5, 3.5, 1),
        ]);
        let text = render(&run, "en", false);
        assert_eq!(
            text,
            "Speaker 1 [0:00]:\nhello there\n\nSpeaker 2 [0:01]:\nhi\n\nSpeaker 1 [0:02]:\nback again\n\n"
        );
    }

    #[test]
    fn rate_annotation_uses_turn_words_and_duration() {
        let run = run_of(vec![
            span("one two", 0.0, 1.0, 1),
            span("three four", 1.0, 2.0, 1),
        ]);
        let text = render(&run, "en", true);
        // 4 words over 2 seconds.
        assert!(text.contains("(rate: 2.0 w/s)"), "got: {text}");
    }

    #[test]
    fn cancelled_run_is_marked() {
        let mut run = run_of(vec![span("partial", 0.0, 1.0, 1)]);
        run.cancelled = true;
        let text = render(&run, "en", false);
        assert!(text.ends_with("[cancelled: partial transcript]\n"));
    }

    #[test]
    fn empty_run_renders_empty() {
        let run = run_of(Vec::new());
        assert_eq!(render(&run, "en", false), "");
    }
}
