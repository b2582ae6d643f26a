use include_dir::{include_dir, Dir};
use rand::Rng;
use serde::Deserialize;

static PASSAGE_DIR: Dir = include_dir!("src/passages");

/// A fixed pool of canned paragraphs embedded in the binary.
#[derive(Deserialize, Clone, Debug)]
pub struct PassagePool {
    pub name: String,
    pub paragraphs: Vec<String>,
}

impl PassagePool {
    pub fn load() -> Self {
        let file = PASSAGE_DIR
            .get_file("english.json")
            .expect("Passage file not found");

        let file_as_str = file
            .contents_utf8()
            .expect("Unable to interpret file as a string");

        serde_json::from_str(file_as_str).expect("Unable to deserialize passage json")
    }

    /// Pick one paragraph uniformly at random.
    pub fn random_passage(&self) -> Passage {
        let idx = rand::thread_rng().gen_range(0..self.paragraphs.len());
        Passage::from_text(&self.paragraphs[idx])
    }
}

/// The text a session types against, immutable once selected.
#[derive(Debug, Clone, PartialEq)]
pub struct Passage {
    pub words: Vec<String>,
    pub text: String,
}

impl Passage {
    pub fn from_text(text: &str) -> Self {
        let words = text
            .split_whitespace()
            .map(|w| w.to_string())
            .collect::<Vec<_>>();
        Self {
            text: words.join(" "),
            words,
        }
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn word(&self, idx: usize) -> &str {
        &self.words[idx]
    }

    pub fn is_last_word(&self, idx: usize) -> bool {
        idx + 1 == self.words.len()
    }
}
