//! Lexical-similarity tie-break helper (`spec.md` §4.7 tie-break rule 3):
//! how closely a column name resembles the words in a question.

use std::collections::HashSet;

/// Splits `text` into lowercase alphanumeric tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_ascii_lowercase())
        .collect()
}

/// Sorensen-Dice coefficient over character bigrams; `1.0` for an exact
/// match, `0.0` for no shared bigrams. Cheap and dependency-free, which is
/// all a tie-break needs — this never drives primary ranking.
pub fn dice_similarity(a: &str, b: &str) -> f64 {
    let bigrams_a = bigrams(a);
    let bigrams_b = bigrams(b);
    if bigrams_a.is_empty() || bigrams_b.is_empty() {
        return if a.eq_ignore_ascii_case(b) { 1.0 } else { 0.0 };
    }
    let intersection = bigrams_a.intersection(&bigrams_b).count();
    (2.0 * intersection as f64) / (bigrams_a.len() + bigrams_b.len()) as f64
}

/// Best similarity between `name` and any token in `question_tokens`.
pub fn best_similarity(name: &str, question_tokens: &[String]) -> f64 {
    question_tokens
        .iter()
        .map(|token| dice_similarity(&name.to_ascii_lowercase(), token))
        .fold(0.0, f64::max)
}

fn bigrams(s: &str) -> HashSet<(char, char)> {
    let chars: Vec<char> = s.to_ascii_lowercase().chars().collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(dice_similarity("vendor", "vendor"), 1.0);
    }

    #[test]
    fn unrelated_strings_score_low() {
        assert!(dice_similarity("vendor", "zzz") < 0.2);
    }

    #[test]
    fn best_similarity_picks_closest_token() {
        let tokens = tokenize("how many vendors do we have");
        assert!(best_similarity("vendor", &tokens) > 0.5);
    }
}
