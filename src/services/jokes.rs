//! Feedback prompts ("jokes") kept in a flat JSON file.
//!
//! Concurrent requests coordinate through advisory locks on the file itself:
//! shared for reads, exclusive for writes. A vote holds the exclusive lock
//! across its whole read-modify-write.

use fs4::fs_std::FileExt;
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const JOKES_FILE: &str = "jokes.json";

const PROMPTS: &[&str] = &[
    "How did you feel about the character choices and the naming conventions? \
     Was the morning routine level too difficult?",
    "How did you feel about the extra challenge in the work maze, being unable to take the same path twice?",
    "How did you feel about the speed that whack-a-candy ran at?",
    "Was the dialogue in the dialogue level engaging enough to keep your interest?",
    "Was the interactablilty of the launch party level sufficient?",
    "Was the pacing of the game appropriate?",
    "Was the UI experience good?",
    "Would you play the game again?",
    "Would you recommend the game to a friend?",
    "Did you encounter any bugs or glitches?",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Joke {
    pub id: usize,
    pub joke: String,
    pub haha: u32,
    pub boohoo: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Haha,
    Boohoo,
}

#[derive(Debug, Error)]
pub enum JokeError {
    #[error("joke {0} not found")]
    NotFound(usize),
    #[error("joke file io: {0}")]
    Io(#[from] io::Error),
    #[error("joke file is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct JokeStore {
    path: PathBuf,
}

impl JokeStore {
    pub fn new(data_folder: impl AsRef<Path>) -> Self {
        Self {
            path: data_folder.as_ref().join(JOKES_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the default prompts with a few primed votes. Leaves an existing
    /// file alone and returns `false` in that case.
    pub fn init(&self) -> Result<bool, JokeError> {
        if self.path.exists() {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut jokes: Vec<Joke> = PROMPTS
            .iter()
            .enumerate()
            .map(|(id, text)| Joke {
                id,
                joke: (*text).to_string(),
                haha: 0,
                boohoo: 0,
            })
            .collect();

        let mut rng = rand::thread_rng();
        for _ in 0..10 {
            let i = rng.gen_range(0..jokes.len());
            jokes[i].haha += 1;
        }
        for _ in 0..5 {
            let i = rng.gen_range(0..jokes.len());
            jokes[i].boohoo += 1;
        }

        self.write_all(&jokes)?;
        tracing::info!(path = %self.path.display(), "Initialized joke store");
        Ok(true)
    }

    /// All jokes. A missing or unreadable file reads as empty.
    pub fn all(&self) -> Result<Vec<Joke>, JokeError> {
        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        file.lock_shared()?;
        let mut raw = String::new();
        let read = file.read_to_string(&mut raw);
        FileExt::unlock(&file)?;
        read?;

        match serde_json::from_str(&raw) {
            Ok(jokes) => Ok(jokes),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Unparseable joke file: {}", e);
                Ok(Vec::new())
            }
        }
    }

    pub fn get(&self, id: usize) -> Result<Joke, JokeError> {
        self.all()?
            .into_iter()
            .find(|j| j.id == id)
            .ok_or(JokeError::NotFound(id))
    }

    pub fn random(&self) -> Result<Option<Joke>, JokeError> {
        let jokes = self.all()?;
        Ok(jokes.choose(&mut rand::thread_rng()).cloned())
    }

    pub fn count(&self) -> Result<usize, JokeError> {
        Ok(self.all()?.len())
    }

    pub fn favorite(&self) -> Result<Option<Joke>, JokeError> {
        Ok(top_by(self.all()?, |j| j.haha))
    }

    pub fn jeered(&self) -> Result<Option<Joke>, JokeError> {
        Ok(top_by(self.all()?, |j| j.boohoo))
    }

    /// Adds one vote and returns the new tally.
    pub fn vote(&self, id: usize, reaction: Reaction) -> Result<u32, JokeError> {
        let mut file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        file.lock_exclusive()?;
        let result = apply_vote(&mut file, id, reaction);
        FileExt::unlock(&file)?;
        result
    }

    fn write_all(&self, jokes: &[Joke]) -> Result<(), JokeError> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.path)?;
        file.lock_exclusive()?;
        let result = overwrite(&mut file, jokes);
        FileExt::unlock(&file)?;
        result
    }
}

fn apply_vote(file: &mut File, id: usize, reaction: Reaction) -> Result<u32, JokeError> {
    let mut raw = String::new();
    file.read_to_string(&mut raw)?;
    let mut jokes: Vec<Joke> = serde_json::from_str(&raw)?;

    let joke = jokes
        .iter_mut()
        .find(|j| j.id == id)
        .ok_or(JokeError::NotFound(id))?;
    let tally = match reaction {
        Reaction::Haha => {
            joke.haha += 1;
            joke.haha
        }
        Reaction::Boohoo => {
            joke.boohoo += 1;
            joke.boohoo
        }
    };

    overwrite(file, &jokes)?;
    Ok(tally)
}

/// Truncates under the caller's lock, then writes.
fn overwrite(file: &mut File, jokes: &[Joke]) -> Result<(), JokeError> {
    file.seek(SeekFrom::Start(0))?;
    file.set_len(0)?;
    serde_json::to_writer(&mut *file, jokes)?;
    file.flush()?;
    Ok(())
}

/// Joke with the strictly highest positive score; earlier ids win ties.
fn top_by(jokes: Vec<Joke>, score: impl Fn(&Joke) -> u32) -> Option<Joke> {
    let mut best: Option<Joke> = None;
    for joke in jokes {
        let current = best.as_ref().map(&score).unwrap_or(0);
        if score(&joke) > current {
            best = Some(joke);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, JokeStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JokeStore::new(dir.path().join("data"));
        (dir, store)
    }

    #[test]
    fn init_seeds_prompts_once() {
        let (_dir, store) = store();
        assert!(store.init().unwrap());
        let jokes = store.all().unwrap();
        assert_eq!(jokes.len(), PROMPTS.len());
        assert_eq!(jokes.iter().map(|j| j.haha).sum::<u32>(), 10);
        assert_eq!(jokes.iter().map(|j| j.boohoo).sum::<u32>(), 5);

        store.vote(0, Reaction::Haha).unwrap();
        assert!(!store.init().unwrap());
        assert_eq!(store.all().unwrap().iter().map(|j| j.haha).sum::<u32>(), 11);
    }

    #[test]
    fn missing_or_corrupt_file_reads_empty() {
        let (_dir, store) = store();
        assert!(store.all().unwrap().is_empty());
        assert_eq!(store.random().unwrap(), None);

        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{not json").unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn votes_persist_and_return_tally() {
        let (_dir, store) = store();
        store.init().unwrap();
        let before = store.get(3).unwrap();

        assert_eq!(store.vote(3, Reaction::Haha).unwrap(), before.haha + 1);
        assert_eq!(store.vote(3, Reaction::Boohoo).unwrap(), before.boohoo + 1);

        let after = store.get(3).unwrap();
        assert_eq!(after.haha, before.haha + 1);
        assert_eq!(after.boohoo, before.boohoo + 1);
        assert_eq!(store.count().unwrap(), PROMPTS.len());
    }

    #[test]
    fn unknown_id_is_not_found() {
        let (_dir, store) = store();
        store.init().unwrap();
        assert!(matches!(store.get(99), Err(JokeError::NotFound(99))));
        assert!(matches!(store.vote(99, Reaction::Haha), Err(JokeError::NotFound(99))));
    }

    #[test]
    fn concurrent_votes_are_not_lost() {
        let (_dir, store) = store();
        store.init().unwrap();
        let before = store.get(0).unwrap().haha;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..5 {
                        store.vote(0, Reaction::Haha).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.get(0).unwrap().haha, before + 40);
    }

    #[test]
    fn favorite_and_jeered_need_positive_scores() {
        let joke = |id, haha, boohoo| Joke { id, joke: format!("j{id}"), haha, boohoo };
        let jokes = vec![joke(0, 2, 0), joke(1, 5, 0), joke(2, 5, 1)];
        assert_eq!(top_by(jokes.clone(), |j| j.haha).map(|j| j.id), Some(1));
        assert_eq!(top_by(jokes.clone(), |j| j.boohoo).map(|j| j.id), Some(2));
        assert_eq!(top_by(vec![joke(0, 0, 0)], |j| j.haha), None);
    }
}
