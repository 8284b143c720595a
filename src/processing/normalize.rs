use std::sync::OnceLock;

use regex::Regex;

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex is valid"))
}

fn numbered_period_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]\s*\.\s*").expect("numbered period regex is valid"))
}

/// Clean common recognition artifacts out of a recognized string.
///
/// Collapses whitespace, turns bullet glyphs into `-`, forces a single space
/// after a list number's period (`1.Text` -> `1. Text`), straightens curly
/// quotes and trims. Never fails.
pub fn normalize(text: &str) -> String {
    let collapsed = whitespace_re().replace_all(text, " ");
    let debulleted: String = collapsed
        .chars()
        .map(|ch| match ch {
            '•' | '·' => '-',
            other => other,
        })
        .collect();
    let spaced = space_numbered_periods(&debulleted);

    spaced
        .chars()
        .map(|ch| match ch {
            '\u{2018}' | '\u{2019}' | '\u{201B}' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{201F}' => '"',
            other => other,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// `digit . word` -> `digit. word`, only when a word character follows.
fn space_numbered_periods(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut last = 0;

    for found in numbered_period_re().find_iter(text) {
        let followed_by_word = text[found.end()..]
            .chars()
            .next()
            .is_some_and(is_word_char);
        if !followed_by_word {
            continue;
        }
        // The match starts with its ASCII digit.
        let digit = &found.as_str()[..1];
        out.push_str(&text[last..found.start()]);
        out.push_str(digit);
        out.push_str(". ");
        last = found.end();
    }

    out.push_str(&text[last..]);
    out
}

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}
