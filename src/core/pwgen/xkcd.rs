//! Passphrases of random dictionary words.

use rand::seq::SliceRandom;

use crate::error::{Result, ValidationError};

const EN: &str = include_str!("wordlists/en.txt");
const DE: &str = include_str!("wordlists/de.txt");

fn wordlist(lang: &str) -> Result<Vec<&'static str>> {
    let text = match lang {
        "en" => EN,
        "de" => DE,
        other => return Err(ValidationError::UnknownLanguage(other.to_string()).into()),
    };
    Ok(text.lines().map(str::trim).filter(|w| !w.is_empty()).collect())
}

/// Options for an xkcd-style passphrase.
#[derive(Debug, Clone)]
pub struct Xkcd {
    pub words: usize,
    pub separator: String,
    pub capitalize: bool,
    pub lang: String,
}

impl Default for Xkcd {
    fn default() -> Self {
        Self {
            words: 4,
            separator: " ".to_string(),
            capitalize: false,
            lang: "en".to_string(),
        }
    }
}

impl Xkcd {
    /// # Errors
    ///
    /// Returns `ValidationError::UnknownLanguage` when there is no wordlist
    /// for `lang`, and `ValidationError::InvalidLength` for zero words.
    pub fn password(&self) -> Result<String> {
        if self.words == 0 {
            return Err(ValidationError::InvalidLength("a passphrase needs at least one word".into()).into());
        }
        let list = wordlist(&self.lang)?;
        let mut rng = rand::thread_rng();
        let words: Vec<String> = (0..self.words)
            .filter_map(|_| list.choose(&mut rng))
            .map(|w| if self.capitalize { capitalize(w) } else { (*w).to_string() })
            .collect();
        Ok(words.join(&self.separator))
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
