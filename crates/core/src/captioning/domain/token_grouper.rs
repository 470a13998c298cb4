use crate::captioning::domain::word::{is_punctuation, Token, Word};

const CONTRACTION_SUFFIXES: &[&str] = &["re", "ll", "ve", "s", "t", "d", "m"];

fn is_apostrophe(text: &str) -> bool {
    text == "'" || text == "\u{2019}"
}

fn is_contraction_suffix(text: &str) -> bool {
    let lower = text.to_lowercase();
    CONTRACTION_SUFFIXES.contains(&lower.as_str())
}

/// Merges raw words into display tokens.
///
/// Single-character punctuation attaches to the token in progress with no
/// separator. An apostrophe followed by a contraction suffix (`re`, `ll`,
/// `ve`, `s`, `t`, `d`, `m`) folds both words into the token in progress.
/// Punctuation with nothing before it becomes a standalone token. Words
/// that are empty after trimming are dropped.
pub fn group_tokens(words: &[Word]) -> Vec<Token> {
    let words: Vec<Token> = words
        .iter()
        .map(Token::from)
        .filter(|t| !t.text.is_empty())
        .collect();

    let mut tokens = Vec::with_capacity(words.len());
    let mut current: Option<Token> = None;
    let mut i = 0;

    while i < words.len() {
        let word = &words[i];

        if !is_punctuation(&word.text) {
            if let Some(done) = current.replace(word.clone()) {
                tokens.push(done);
            }
            i += 1;
            continue;
        }

        match current.as_mut() {
            Some(token) => {
                let suffix = words
                    .get(i + 1)
                    .filter(|next| is_apostrophe(&word.text) && is_contraction_suffix(&next.text));
                token.text.push_str(&word.text);
                token.end = word.end;
                if let Some(next) = suffix {
                    token.text.push_str(&next.text);
                    token.end = next.end;
                    i += 1;
                }
            }
            None => tokens.push(word.clone()),
        }
        i += 1;
    }

    tokens.extend(current);
    tokens
}
