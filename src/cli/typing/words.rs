use std::collections::HashSet;

use rand::{seq::SliceRandom, Rng};

use crate::daemon::storage::settings::{TestType, TypingSettings, WordLanguage};

const ENGLISH_COMMON: &str = include_str!("../../../assets/words/english_common.txt");
const EFF_WORDS: &str = include_str!("../../../assets/words/eff_words.txt");
const PROGRAMMING: &str = include_str!("../../../assets/words/programming.txt");

pub const DEFAULT_WORD_COUNT: u32 = 25;
pub const PUNCTUATION_MARKS: [&str; 6] = [".", ",", "!", "?", ";", ":"];
const SENTENCE_ENDS: [&str; 3] = [".", "!", "?"];
/// Chance that a word inside the text is followed by a mark.
const INNER_PUNCTUATION_CHANCE: f64 = 0.12;
const CUSTOM_TEXT_SEPARATOR: &str = "---";

fn parse_list(content: &str, max_len: usize) -> impl Iterator<Item = &str> {
    content
        .lines()
        .map(str::trim)
        .filter(move |word| word.len() >= 4 && word.len() <= max_len)
}

/// Combined embedded word lists, lowercased and deduplicated. Words shorter than 4 characters are
/// skipped since the lists contain abbreviations.
pub fn embedded_words() -> Vec<String> {
    let mut seen = HashSet::new();
    parse_list(ENGLISH_COMMON, 15)
        .chain(parse_list(EFF_WORDS, usize::MAX))
        .chain(parse_list(PROGRAMMING, usize::MAX))
        .map(str::to_lowercase)
        .filter(|word| seen.insert(word.clone()))
        .collect()
}

pub fn words_for_language(language: WordLanguage) -> Vec<String> {
    let words = embedded_words();
    match language {
        WordLanguage::Us => words,
        WordLanguage::Au => words.iter().map(|w| to_au_spelling(w)).collect(),
    }
}

/// Short stems are left alone so `size` and `prize` keep their spelling.
fn replace_suffix(word: &str, suffix: &str, replacement: &str) -> Option<String> {
    word.strip_suffix(suffix)
        .filter(|stem| stem.len() >= 3)
        .map(|stem| format!("{stem}{replacement}"))
}

/// US to Australian spelling: `-ize` family and the common `-or`, `-er`, `-og` words.
pub fn to_au_spelling(word: &str) -> String {
    const SUFFIXES: [(&str, &str); 4] = [
        ("ization", "isation"),
        ("izing", "ising"),
        ("ized", "ised"),
        ("ize", "ise"),
    ];
    const WHOLE_WORDS: [(&str, &str); 50] = [
        ("color", "colour"),
        ("colors", "colours"),
        ("colored", "coloured"),
        ("coloring", "colouring"),
        ("favor", "favour"),
        ("favors", "favours"),
        ("favored", "favoured"),
        ("favorite", "favourite"),
        ("honor", "honour"),
        ("honors", "honours"),
        ("honored", "honoured"),
        ("honoring", "honouring"),
        ("labor", "labour"),
        ("labors", "labours"),
        ("labored", "laboured"),
        ("laboring", "labouring"),
        ("humor", "humour"),
        ("humors", "humours"),
        ("neighbor", "neighbour"),
        ("neighbors", "neighbours"),
        ("behavior", "behaviour"),
        ("behaviors", "behaviours"),
        ("flavor", "flavour"),
        ("flavors", "flavours"),
        ("center", "centre"),
        ("centers", "centres"),
        ("centered", "centred"),
        ("theater", "theatre"),
        ("theaters", "theatres"),
        ("meter", "metre"),
        ("meters", "metres"),
        ("liter", "litre"),
        ("liters", "litres"),
        ("fiber", "fibre"),
        ("fibers", "fibres"),
        ("catalog", "catalogue"),
        ("catalogs", "catalogues"),
        ("dialog", "dialogue"),
        ("dialogs", "dialogues"),
        ("analog", "analogue"),
        ("analogs", "analogues"),
        ("prolog", "prologue"),
        ("prologs", "prologues"),
        ("epilog", "epilogue"),
        ("epilogs", "epilogues"),
        ("harbor", "harbour"),
        ("harbors", "harbours"),
        ("armor", "armour"),
        ("rumor", "rumour"),
        ("vapor", "vapour"),
    ];

    if let Some(word) = SUFFIXES
        .iter()
        .find_map(|(suffix, replacement)| replace_suffix(word, suffix, replacement))
    {
        return word;
    }
    WHOLE_WORDS
        .iter()
        .find(|(us, _)| *us == word)
        .map_or_else(|| word.to_owned(), |(_, au)| (*au).to_owned())
}

/// Splits stored custom texts on `---` lines, dropping blank entries.
pub fn split_custom_texts(texts: &[String]) -> Vec<String> {
    texts
        .iter()
        .flat_map(|text| {
            text.split(CUSTOM_TEXT_SEPARATOR)
                .map(|part| part.split_whitespace().collect::<Vec<_>>().join(" "))
                .collect::<Vec<_>>()
        })
        .filter(|text| !text.is_empty())
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Produces target texts for the typing test.
pub struct TextGenerator {
    words: Vec<String>,
    language: WordLanguage,
}

impl TextGenerator {
    pub fn new(language: WordLanguage) -> Self {
        Self {
            words: words_for_language(language),
            language,
        }
    }

    pub fn with_words(words: Vec<String>) -> Self {
        Self {
            words,
            language: WordLanguage::Us,
        }
    }

    pub fn language(&self) -> WordLanguage {
        self.language
    }

    pub fn generate(&self, settings: &TypingSettings, rng: &mut impl Rng) -> String {
        if settings.test_type == TestType::Custom {
            let custom = split_custom_texts(&settings.custom_texts);
            if let Some(text) = custom.choose(rng) {
                return text.clone();
            }
        }
        let count = match settings.word_count {
            0 => DEFAULT_WORD_COUNT,
            n => n,
        };
        self.random_words(count as usize, settings.punctuation, rng)
    }

    fn random_words(&self, count: usize, punctuation: bool, rng: &mut impl Rng) -> String {
        let mut words = Vec::with_capacity(count);
        let mut capitalize_next = punctuation;
        for index in 0..count {
            let Some(word) = self.words.choose(rng) else {
                break;
            };
            let mut word = if capitalize_next {
                capitalize(word)
            } else {
                word.clone()
            };
            capitalize_next = false;

            if punctuation {
                if index + 1 == count {
                    word.push_str(SENTENCE_ENDS.choose(rng).unwrap_or(&"."));
                } else if rng.gen_bool(INNER_PUNCTUATION_CHANCE) {
                    let mark = PUNCTUATION_MARKS.choose(rng).unwrap_or(&",");
                    capitalize_next = SENTENCE_ENDS.contains(mark);
                    word.push_str(mark);
                }
            }
            words.push(word);
        }
        words.join(" ")
    }
}
