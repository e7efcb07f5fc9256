//! Localized speaker and speaking-rate labels.
//!
//! Diarization output refers to speakers by number; this crate turns those
//! numbers into display labels in the language of the transcript
//! (`"Speaker 2"`, `"Hablante 2"`, ...).
//!
//! Lookup never fails: unknown codes, the empty string, and `"auto"` all
//! resolve to the English bundle, and region codes fall back to their base
//! language (`"pt-BR"` -> `"pt"`).
//!
//! # Example
//!
//! ```rust
//! use talkturn_labels::{bundle, speaker_label};
//!
//! assert_eq!(speaker_label("es", 2), "Hablante 2");
//! assert_eq!(speaker_label("x-klingon", 1), "Speaker 1");
//! assert_eq!(bundle("de").speaker, "Sprecher");
//! ```

/// Display words for one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelBundle {
    /// Word prefixed to speaker numbers (e.g. "Speaker").
    pub speaker: &'static str,
    /// Word for speaking rate (e.g. "rate").
    pub rate: &'static str,
    /// Unit suffix for words-per-second (e.g. "w/s").
    pub rate_unit: &'static str,
}

const EN: LabelBundle = LabelBundle { speaker: "Speaker", rate: "rate", rate_unit: "w/s" };

/// Returns the label bundle for an ISO 639-1 language code.
///
/// Resolution order: exact match on the lowercased code, then the base
/// language of a region code, then English.
pub fn bundle(code: &str) -> &'static LabelBundle {
    let code = code.trim();
    if code.is_empty() || code.eq_ignore_ascii_case("auto") {
        return &EN;
    }
    let lower = code.to_ascii_lowercase();
    if let Some(b) = lookup(&lower) {
        return b;
    }
    // Region codes fall back to the base language ("en-US" -> "en").
    if let Some((base, _)) = lower.split_once('-') {
        if let Some(b) = lookup(base) {
            return b;
        }
    }
    &EN
}

/// Formats a numbered speaker label, e.g. `speaker_label("fr", 3)` ->
/// `"Intervenant 3"`.
pub fn speaker_label(code: &str, number: u32) -> String {
    format!("{} {}", bundle(code).speaker, number)
}

/// Formats a speaking-rate annotation, e.g. `rate_label("en", 2.5)` ->
/// `"rate: 2.5 w/s"`.
pub fn rate_label(code: &str, rate: f64) -> String {
    let b = bundle(code);
    format!("{}: {:.1} {}", b.rate, rate, b.rate_unit)
}

fn lookup(code: &str) -> Option<&'static LabelBundle> {
    macro_rules! b {
        ($speaker:expr, $rate:expr, $unit:expr) => {
            Some(&LabelBundle { speaker: $speaker, rate: $rate, rate_unit: $unit })
        };
    }
    match code {
        "en" => Some(&EN),
        "es" => b!("Hablante", "velocidad", "p/s"),
        "fr" => b!("Intervenant", "débit", "m/s"),
        "de" => b!("Sprecher", "Tempo", "W/s"),
        "it" => b!("Parlante", "velocità", "p/s"),
        "pt" => b!("Falante", "velocidade", "p/s"),
        "ru" => b!("Говорящий", "скорость", "сл/с"),
        "pl" => b!("Mówca", "tempo", "sł/s"),
        "nl" => b!("Spreker", "tempo", "w/s"),
        "el" => b!("Ομιλητής", "ρυθμός", "λ/δ"),
        "sv" => b!("Talare", "takt", "o/s"),
        "da" => b!("Taler", "hastighed", "o/s"),
        "no" => b!("Taler", "tempo", "o/s"),
        "fi" => b!("Puhuja", "nopeus", "s/s"),
        "cs" => b!("Řečník", "tempo", "s/s"),
        "hu" => b!("Beszélő", "sebesség", "sz/mp"),
        "sk" => b!("Rečník", "tempo", "s/s"),
        "ro" => b!("Vorbitor", "viteză", "c/s"),
        "bg" => b!("Говорител", "скорост", "д/с"),
        "hr" => b!("Govornik", "brzina", "r/s"),
        "sl" => b!("Govorec", "hitrost", "b/s"),
        "et" => b!("Kõneleja", "kiirus", "s/s"),
        "lv" => b!("Runātājs", "ātrums", "v/s"),
        "lt" => b!("Kalbėtojas", "greitis", "ž/s"),
        "mt" => b!("Kelliem", "rata", "k/s"),
        "tr" => b!("Konuşmacı", "hız", "k/sn"),
        "uk" => b!("Мовець", "швидкість", "сл/с"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speaker_label_spanish() {
        assert_eq!(speaker_label("es", 2), "Hablante 2");
    }

    #[test]
    fn speaker_label_unknown_falls_back_to_english() {
        assert_eq!(speaker_label("unknown-code", 1), "Speaker 1");
        assert_eq!(speaker_label("zz", 4), "Speaker 4");
    }

    #[test]
    fn auto_and_empty_resolve_to_english() {
        assert_eq!(bundle("auto").speaker, "Speaker");
        assert_eq!(bundle("").speaker, "Speaker");
        assert_eq!(bundle("AUTO").speaker, "Speaker");
    }

    #[test]
    fn region_code_falls_back_to_base_language() {
        assert_eq!(bundle("pt-BR").speaker, "Falante");
        assert_eq!(bundle("en-US").speaker, "Speaker");
        assert_eq!(bundle("de-AT").speaker, "Sprecher");
    }

    #[test]
    fn case_insensitive_lookup() {
        assert_eq!(bundle("ES").speaker, "Hablante");
        assert_eq!(bundle("Fr").speaker, "Intervenant");
    }

    #[test]
    fn rate_label_format() {
        assert_eq!(rate_label("en", 2.53), "rate: 2.5 w/s");
        assert_eq!(rate_label("de", 1.0), "Tempo: 1.0 W/s");
    }

    #[test]
    fn all_bundles_nonempty() {
        for code in [
            "en", "es", "fr", "de", "it", "pt", "ru", "pl", "nl", "el", "sv", "da", "no", "fi",
            "cs", "hu", "sk", "ro", "bg", "hr", "sl", "et", "lv", "lt", "mt", "tr", "uk",
        ] {
            let b = bundle(code);
            assert!(!b.speaker.is_empty(), "{code}: empty speaker word");
            assert!(!b.rate.is_empty(), "{code}: empty rate word");
            assert!(!b.rate_unit.is_empty(), "{code}: empty rate unit");
        }
    }
}
