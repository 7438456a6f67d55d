//! # Market Lexicon
//!
//! Term weights for rule-based scoring: a generic AFINN-style word list
//! (integer weights from -5 to 5) merged with market slang. Market terms
//! replace generic weights for the same word and may span several words.

use std::collections::HashMap;

/// Generic opinion words
const BASE_TERMS: &[(&str, i32)] = &[
    // positive
    ("good", 3),
    ("great", 3),
    ("excellent", 3),
    ("amazing", 4),
    ("awesome", 4),
    ("fantastic", 4),
    ("outstanding", 5),
    ("superb", 5),
    ("best", 3),
    ("better", 2),
    ("love", 3),
    ("like", 2),
    ("happy", 3),
    ("glad", 3),
    ("excited", 3),
    ("exciting", 3),
    ("optimistic", 2),
    ("confident", 2),
    ("win", 4),
    ("winner", 4),
    ("winning", 4),
    ("success", 2),
    ("successful", 3),
    ("gain", 2),
    ("gains", 2),
    ("profit", 2),
    ("profits", 2),
    ("growth", 2),
    ("grow", 2),
    ("strong", 2),
    ("stronger", 2),
    ("boost", 1),
    ("improve", 2),
    ("improved", 2),
    ("improvement", 2),
    ("positive", 2),
    ("opportunity", 2),
    ("opportunities", 2),
    ("rally", 2),
    ("recover", 2),
    ("recovery", 2),
    ("upgrade", 1),
    ("upgraded", 1),
    ("beat", 1),
    ("solid", 2),
    ("robust", 2),
    ("impressive", 3),
    ("favorable", 2),
    ("benefit", 2),
    ("reward", 2),
    ("safe", 1),
    ("stable", 2),
    ("surge", 1),
    ("thrilled", 5),
    ("wow", 4),
    ("yes", 1),
    ("agree", 1),
    ("support", 2),
    ("trust", 1),
    ("wealth", 3),
    ("rich", 2),
    ("hope", 2),
    ("hopeful", 2),
    // negative
    ("bad", -3),
    ("worse", -3),
    ("worst", -3),
    ("terrible", -3),
    ("awful", -3),
    ("horrible", -3),
    ("poor", -2),
    ("hate", -3),
    ("sad", -2),
    ("angry", -3),
    ("fear", -2),
    ("fears", -2),
    ("afraid", -2),
    ("panic", -3),
    ("worry", -3),
    ("worried", -3),
    ("concern", -2),
    ("concerned", -2),
    ("concerns", -2),
    ("risk", -2),
    ("risky", -2),
    ("danger", -2),
    ("dangerous", -2),
    ("lose", -3),
    ("loser", -3),
    ("losing", -3),
    ("lost", -3),
    ("loss", -3),
    ("losses", -3),
    ("fail", -2),
    ("failed", -2),
    ("failure", -2),
    ("weak", -2),
    ("weakness", -2),
    ("decline", -1),
    ("declined", -1),
    ("drop", -1),
    ("dropped", -1),
    ("fall", -1),
    ("falling", -1),
    ("plunge", -2),
    ("plunged", -2),
    ("slump", -2),
    ("crisis", -3),
    ("collapse", -2),
    ("crash", -2),
    ("disaster", -2),
    ("negative", -2),
    ("downgrade", -2),
    ("downgraded", -2),
    ("miss", -2),
    ("missed", -2),
    ("disappointed", -2),
    ("disappointing", -2),
    ("disappointment", -2),
    ("problem", -2),
    ("problems", -2),
    ("trouble", -2),
    ("uncertain", -1),
    ("uncertainty", -1),
    ("volatile", -2),
    ("scam", -2),
    ("fraud", -4),
    ("fraudulent", -4),
    ("debt", -2),
    ("bankrupt", -3),
    ("bankruptcy", -3),
    ("lawsuit", -2),
    ("sue", -2),
    ("warning", -3),
    ("threat", -2),
    ("struggle", -2),
    ("struggling", -2),
    ("pessimistic", -2),
    ("doubt", -1),
    ("cut", -1),
    ("cuts", -1),
    ("layoffs", -2),
];

/// Market slang and finance phrases
const DOMAIN_TERMS: &[(&str, i32)] = &[
    ("bullish", 5),
    ("moon", 5),
    ("rocket", 4),
    ("diamond hands", 5),
    ("hodl", 3),
    ("buy the dip", 4),
    ("strong buy", 5),
    ("outperform", 4),
    ("beat expectations", 5),
    ("revenue growth", 4),
    ("profit margin", 3),
    ("market leader", 4),
    ("innovation", 3),
    ("breakthrough", 4),
    ("partnership", 3),
    ("expansion", 3),
    ("acquisition", 3),
    ("bearish", -5),
    ("crash", -5),
    ("dump", -4),
    ("paper hands", -3),
    ("sell off", -4),
    ("overvalued", -4),
    ("bubble", -5),
    ("recession", -5),
    ("bear market", -5),
    ("downturn", -4),
    ("loss", -3),
    ("decline", -3),
    ("disappointed", -4),
    ("miss expectations", -5),
    ("lawsuit", -4),
    ("investigation", -4),
    ("bankruptcy", -5),
    ("debt", -3),
    ("volatility", -2),
];

/// Words that flip the sign of the following term
const NEGATORS: &[&str] = &[
    "not", "no", "never", "neither", "nor", "nobody", "nothing", "none", "cannot", "cant", "can't",
    "dont", "don't", "doesnt", "doesn't", "didnt", "didn't", "isnt", "isn't", "arent", "aren't",
    "wasnt", "wasn't", "werent", "weren't", "wont", "won't", "wouldnt", "wouldn't", "shouldnt",
    "shouldn't", "hardly", "barely",
];

/// How many tokens after a negator a term is still negated
const NEGATION_REACH: usize = 3;

/// One lexicon hit in a text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermMatch {
    pub term: String,
    /// Weight after negation
    pub weight: i32,
    pub negated: bool,
}

/// Term -> weight table
#[derive(Debug, Clone)]
pub struct Lexicon {
    terms: HashMap<String, i32>,
    /// Longest entry in words
    max_phrase_len: usize,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::new()
    }
}

impl Lexicon {
    /// Generic words merged with market terms
    pub fn new() -> Self {
        Self::generic().with_terms(
            DOMAIN_TERMS
                .iter()
                .map(|(term, weight)| (term.to_string(), *weight)),
        )
    }

    /// Generic words only
    pub fn generic() -> Self {
        let mut lexicon = Self {
            terms: HashMap::new(),
            max_phrase_len: 1,
        };
        for (term, weight) in BASE_TERMS {
            lexicon.insert(term, *weight);
        }
        lexicon
    }

    /// Add or override entries
    pub fn with_terms<I>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = (String, i32)>,
    {
        for (term, weight) in terms {
            self.insert(&term, weight);
        }
        self
    }

    fn insert(&mut self, term: &str, weight: i32) {
        let key = tokenize(term).join(" ");
        if key.is_empty() {
            return;
        }
        self.max_phrase_len = self.max_phrase_len.max(key.split(' ').count());
        self.terms.insert(key, weight);
    }

    /// Weight of a word or phrase
    pub fn weight(&self, term: &str) -> Option<i32> {
        self.terms.get(&tokenize(term).join(" ")).copied()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn is_negator(word: &str) -> bool {
        NEGATORS.contains(&word)
    }

    /// Find lexicon terms in a token stream
    ///
    /// Phrases are matched greedily, longest first, and their tokens are
    /// consumed. A negator flips the next match within a few tokens.
    pub fn find_matches(&self, tokens: &[String]) -> Vec<TermMatch> {
        let mut matches = Vec::new();
        let mut negator_at: Option<usize> = None;
        let mut i = 0;

        while i < tokens.len() {
            if Self::is_negator(&tokens[i]) {
                negator_at = Some(i);
                i += 1;
                continue;
            }

            let longest = self.max_phrase_len.min(tokens.len() - i);
            let hit = (1..=longest).rev().find_map(|len| {
                let phrase = tokens[i..i + len].join(" ");
                self.terms.get(&phrase).map(|&weight| (phrase, weight, len))
            });

            match hit {
                Some((term, weight, len)) => {
                    let negated = negator_at.map_or(false, |at| i - at <= NEGATION_REACH);
                    if negated {
                        negator_at = None;
                    }
                    matches.push(TermMatch {
                        term,
                        weight: if negated { -weight } else { weight },
                        negated,
                    });
                    i += len;
                }
                None => i += 1,
            }
        }

        matches
    }
}

/// Lowercase word tokens; apostrophes stay inside words
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|token| token.trim_matches('\''))
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<String> {
        tokenize(text)
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Buy the DIP!! Don't panic."),
            vec!["buy", "the", "dip", "don't", "panic"]
        );
        assert!(tokenize("  ...  ").is_empty());
    }

    #[test]
    fn test_domain_overrides_generic() {
        let lexicon = Lexicon::new();
        assert_eq!(Lexicon::generic().weight("crash"), Some(-2));
        assert_eq!(lexicon.weight("crash"), Some(-5));
        assert_eq!(lexicon.weight("Bear Market"), Some(-5));
        assert_eq!(lexicon.weight("good"), Some(3));
    }

    #[test]
    fn test_phrase_longest_first() {
        let lexicon = Lexicon::new();
        let matches = lexicon.find_matches(&tokens("strong buy signal"));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].term, "strong buy");
        assert_eq!(matches[0].weight, 5);
    }

    #[test]
    fn test_negation_flips_next_term() {
        let lexicon = Lexicon::new();
        let matches = lexicon.find_matches(&tokens("this is not good at all, great"));
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].weight, -3);
        assert!(matches[0].negated);
        assert_eq!(matches[1].weight, 3);
    }

    #[test]
    fn test_extra_terms() {
        let lexicon = Lexicon::new().with_terms(vec![("to the moon".to_string(), 5)]);
        let matches = lexicon.find_matches(&tokens("going to the moon"));
        assert_eq!(matches[0].term, "to the moon");
    }
}
