//! Naming utilities for converting argument names between case conventions
//!
//! Word boundaries follow the rules Appium's JavaScript tooling applies (lodash `words`):
//! - any non-alphanumeric character separates words (`no-reset`, `some_arg`)
//! - a lowercase letter followed by an uppercase one (`someArg` -> `some`, `Arg`)
//! - the last capital of an acronym starts a new word (`XMLParser` -> `XML`, `Parser`)
//! - letters and digits are split apart (`port2x` -> `port`, `2`, `x`)
//!
//! Apostrophes are dropped without splitting (`don't` -> `dont`). Both case conversions
//! deburr first, so Latin-1 and Latin Extended-A letters lose their diacritics
//! (`caféPort` -> `cafe-port`) and combining marks are removed.

/// Split an identifier into its words
pub fn words(input: &str) -> Vec<String> {
    let chars: Vec<char> = input.chars().filter(|c| !is_apostrophe(*c)).collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &ch) in chars.iter().enumerate() {
        if !ch.is_alphanumeric() {
            flush(&mut current, &mut words);
            continue;
        }

        let prev = i.checked_sub(1).and_then(|p| chars.get(p)).copied();
        let next = chars.get(i + 1).copied();

        if let Some(prev) = prev {
            if prev.is_alphanumeric() && starts_new_word(prev, ch, next) {
                flush(&mut current, &mut words);
            }
        }

        current.push(ch);
    }

    flush(&mut current, &mut words);
    words
}

/// Convert an argument name to kebab-case
///
/// - someArg -> some-arg
/// - XMLParser -> xml-parser
/// - already-kebab -> already-kebab
pub fn kebab_case(input: &str) -> String {
    words(&deburr(input))
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

/// Convert an argument name to camelCase
///
/// - some-arg -> someArg
/// - XMLParser -> xmlParser
/// - fooBAR -> fooBar
pub fn camel_case(input: &str) -> String {
    let mut result = String::new();
    for (i, word) in words(&deburr(input)).iter().enumerate() {
        if i == 0 {
            result.push_str(&word.to_lowercase());
        } else {
            result.push_str(&capitalize(word));
        }
    }
    result
}

/// Replace accented Latin letters with their basic Latin equivalents
///
/// - déjà vu -> deja vu
/// - Straße -> Strasse
pub fn deburr(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars().filter(|c| !is_combining_mark(*c)) {
        match deburred(ch) {
            Some(replacement) => out.push_str(replacement),
            None => out.push(ch),
        }
    }
    out
}

fn deburred(ch: char) -> Option<&'static str> {
    let replacement = match ch {
        // Latin-1 Supplement
        '\u{c0}'..='\u{c5}' => "A",
        '\u{e0}'..='\u{e5}' => "a",
        '\u{c7}' => "C",
        '\u{e7}' => "c",
        '\u{d0}' => "D",
        '\u{f0}' => "d",
        '\u{c8}'..='\u{cb}' => "E",
        '\u{e8}'..='\u{eb}' => "e",
        '\u{cc}'..='\u{cf}' => "I",
        '\u{ec}'..='\u{ef}' => "i",
        '\u{d1}' => "N",
        '\u{f1}' => "n",
        '\u{d2}'..='\u{d6}' | '\u{d8}' => "O",
        '\u{f2}'..='\u{f6}' | '\u{f8}' => "o",
        '\u{d9}'..='\u{dc}' => "U",
        '\u{f9}'..='\u{fc}' => "u",
        '\u{dd}' => "Y",
        '\u{fd}' | '\u{ff}' => "y",
        '\u{c6}' => "Ae",
        '\u{e6}' => "ae",
        '\u{de}' => "Th",
        '\u{fe}' => "th",
        '\u{df}' => "ss",
        // Latin Extended-A
        '\u{100}' | '\u{102}' | '\u{104}' => "A",
        '\u{101}' | '\u{103}' | '\u{105}' => "a",
        '\u{106}' | '\u{108}' | '\u{10a}' | '\u{10c}' => "C",
        '\u{107}' | '\u{109}' | '\u{10b}' | '\u{10d}' => "c",
        '\u{10e}' | '\u{110}' => "D",
        '\u{10f}' | '\u{111}' => "d",
        '\u{112}' | '\u{114}' | '\u{116}' | '\u{118}' | '\u{11a}' => "E",
        '\u{113}' | '\u{115}' | '\u{117}' | '\u{119}' | '\u{11b}' => "e",
        '\u{11c}' | '\u{11e}' | '\u{120}' | '\u{122}' => "G",
        '\u{11d}' | '\u{11f}' | '\u{121}' | '\u{123}' => "g",
        '\u{124}' | '\u{126}' => "H",
        '\u{125}' | '\u{127}' => "h",
        '\u{128}' | '\u{12a}' | '\u{12c}' | '\u{12e}' | '\u{130}' => "I",
        '\u{129}' | '\u{12b}' | '\u{12d}' | '\u{12f}' | '\u{131}' => "i",
        '\u{134}' => "J",
        '\u{135}' => "j",
        '\u{136}' => "K",
        '\u{137}' | '\u{138}' => "k",
        '\u{139}' | '\u{13b}' | '\u{13d}' | '\u{13f}' | '\u{141}' => "L",
        '\u{13a}' | '\u{13c}' | '\u{13e}' | '\u{140}' | '\u{142}' => "l",
        '\u{143}' | '\u{145}' | '\u{147}' | '\u{14a}' => "N",
        '\u{144}' | '\u{146}' | '\u{148}' | '\u{14b}' => "n",
        '\u{14c}' | '\u{14e}' | '\u{150}' => "O",
        '\u{14d}' | '\u{14f}' | '\u{151}' => "o",
        '\u{154}' | '\u{156}' | '\u{158}' => "R",
        '\u{155}' | '\u{157}' | '\u{159}' => "r",
        '\u{15a}' | '\u{15c}' | '\u{15e}' | '\u{160}' => "S",
        '\u{15b}' | '\u{15d}' | '\u{15f}' | '\u{161}' | '\u{17f}' => "s",
        '\u{162}' | '\u{164}' | '\u{166}' => "T",
        '\u{163}' | '\u{165}' | '\u{167}' => "t",
        '\u{168}' | '\u{16a}' | '\u{16c}' | '\u{16e}' | '\u{170}' | '\u{172}' => "U",
        '\u{169}' | '\u{16b}' | '\u{16d}' | '\u{16f}' | '\u{171}' | '\u{173}' => "u",
        '\u{174}' => "W",
        '\u{175}' => "w",
        '\u{176}' | '\u{178}' => "Y",
        '\u{177}' => "y",
        '\u{179}' | '\u{17b}' | '\u{17d}' => "Z",
        '\u{17a}' | '\u{17c}' | '\u{17e}' => "z",
        '\u{132}' => "IJ",
        '\u{133}' => "ij",
        '\u{152}' => "Oe",
        '\u{153}' => "oe",
        '\u{149}' => "'n",
        _ => return None,
    };
    Some(replacement)
}

/// Combining diacritical marks, half marks and marks for symbols
fn is_combining_mark(ch: char) -> bool {
    matches!(ch, '\u{300}'..='\u{36f}' | '\u{fe20}'..='\u{fe2f}' | '\u{20d0}'..='\u{20ff}')
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn starts_new_word(prev: char, ch: char, next: Option<char>) -> bool {
    // "some" -> "A" in "someArg"
    let lower_to_upper = prev.is_lowercase() && ch.is_uppercase();
    // "L" -> "P" in "XMLParser"
    let end_of_acronym = prev.is_uppercase()
        && ch.is_uppercase()
        && next.map(char::is_lowercase).unwrap_or(false);
    let digit_boundary = prev.is_numeric() != ch.is_numeric();

    lower_to_upper || end_of_acronym || digit_boundary
}

fn flush(current: &mut String, words: &mut Vec<String>) {
    if !current.is_empty() {
        words.push(std::mem::take(current));
    }
}

fn is_apostrophe(ch: char) -> bool {
    ch == '\'' || ch == '\u{2019}'
}
