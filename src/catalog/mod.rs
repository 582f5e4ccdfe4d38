// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Question catalog.
//!
//! Questions are loaded once at startup from a semicolon-delimited text
//! file (`themes;difficulty;kind;prompt;options;correct;explanation`) and
//! are immutable afterwards. Themes are registered on first sight during
//! the load, with dense ids starting at 0.

use std::{fmt, path::Path};

use anyhow::{Context, Result, ensure};
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::{models::request::AnswerValue, utils::str_equals};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Accepts both the English and the legacy French vocabulary, the way
    /// existing catalog files and clients spell them. Unknown input falls
    /// back to medium.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.eq_ignore_ascii_case("easy") || s.eq_ignore_ascii_case("facile") {
            Self::Easy
        } else if s.eq_ignore_ascii_case("hard") || s.eq_ignore_ascii_case("difficile")
        {
            Self::Hard
        } else {
            Self::Medium
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    MultiChoice,
    Boolean,
    FreeText,
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MultiChoice => "qcm",
            Self::Boolean => "boolean",
            Self::FreeText => "text",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Question {
    /// Catalog id, dense from 1 in file order.
    pub id: u32,
    pub theme_ids: Vec<u32>,
    pub difficulty: Difficulty,
    pub kind: QuestionKind,
    pub prompt: String,
    /// Exactly four entries for multi-choice, empty otherwise.
    pub options: Vec<String>,
    /// Correct option index for multi-choice, 0/1 for boolean.
    pub correct_index: i32,
    /// Accepted answers for free-text, up to four.
    pub accepted: Vec<String>,
    pub explanation: Option<String>,
}

impl Question {
    /// Checks a player's answer. Kind mismatches (a number sent for a
    /// boolean question and so on) are simply wrong.
    pub fn check(&self, answer: &AnswerValue) -> bool {
        match self.kind {
            QuestionKind::MultiChoice => {
                answer.as_index().is_some_and(|i| i == self.correct_index)
            },
            QuestionKind::Boolean => {
                answer.as_bool().unwrap_or(false) == (self.correct_index == 1)
            },
            QuestionKind::FreeText => {
                let given = answer.as_text().unwrap_or_default();
                self.accepted.iter().any(|a| str_equals(given, a))
            },
        }
    }
}

/// Points for a correct answer: a difficulty-based value, plus a speed
/// bonus when the answer arrived within the first half of the window.
pub fn score(difficulty: Difficulty, response_time: f64, time_limit: u32) -> i64 {
    let (base, bonus) = match difficulty {
        Difficulty::Easy => (5, 1),
        Difficulty::Medium => (10, 3),
        Difficulty::Hard => (15, 6),
    };

    if response_time <= f64::from(time_limit) / 2.0 {
        base + bonus
    } else {
        base
    }
}

#[derive(Debug)]
pub struct Catalog {
    questions: Vec<Question>,
    themes: Vec<Theme>,
}

impl Catalog {
    /// Parses the catalog file. Blank lines and `#` comments are skipped;
    /// malformed records are logged and dropped. An unreadable file or an
    /// empty catalog aborts startup.
    pub fn load<P: AsRef<Path>>(
        path: P,
        max_questions: usize,
        max_themes: usize,
    ) -> Result<Self> {
        let contents = std::fs::read_to_string(&path).with_context(|| {
            format!("cannot open questions file {:?}", path.as_ref())
        })?;

        let catalog = Self::parse(&contents, max_questions, max_themes);
        ensure!(
            !catalog.questions.is_empty(),
            "questions file {:?} contains no usable questions",
            path.as_ref()
        );

        info!(
            questions = catalog.questions.len(),
            themes = catalog.themes.len(),
            "catalog loaded"
        );
        for t in &catalog.themes {
            debug!(id = t.id, name = %t.name, "theme");
        }
        Ok(catalog)
    }

    fn parse(contents: &str, max_questions: usize, max_themes: usize) -> Self {
        let mut themes: Vec<Theme> = Vec::new();
        let mut questions: Vec<Question> = Vec::new();

        for (line_num, raw) in contents.lines().enumerate() {
            if questions.len() >= max_questions {
                warn!(max = max_questions, "question capacity reached, rest ignored");
                break;
            }
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let id = questions.len() as u32 + 1;
            match parse_question(line, id, &mut themes, max_themes) {
                Some(q) => questions.push(q),
                None => warn!(line = line_num + 1, "skipping malformed question"),
            }
        }

        Self { questions, themes }
    }

    pub fn themes(&self) -> &[Theme] {
        &self.themes
    }

    pub fn get(&self, id: u32) -> Option<&Question> {
        // Ids are dense from 1 in load order.
        self.questions.get(id.checked_sub(1)? as usize)
    }

    /// Draws `n` distinct question ids matching the difficulty and at
    /// least one of the requested themes, in shuffled order. Returns
    /// `None` when fewer than `n` questions match.
    pub fn select(
        &self,
        difficulty: Difficulty,
        theme_ids: &[u32],
        n: usize,
    ) -> Option<Vec<u32>> {
        let mut matching: Vec<u32> = self
            .questions
            .iter()
            .filter(|q| q.difficulty == difficulty)
            .filter(|q| q.theme_ids.iter().any(|t| theme_ids.contains(t)))
            .map(|q| q.id)
            .collect();

        if matching.len() < n {
            debug!(
                matching = matching.len(),
                needed = n,
                "not enough questions for session"
            );
            return None;
        }

        matching.shuffle(&mut rand::rng());
        matching.truncate(n);
        Some(matching)
    }
}

fn get_or_create_theme(
    themes: &mut Vec<Theme>,
    name: &str,
    max_themes: usize,
) -> Option<u32> {
    if let Some(t) = themes.iter().find(|t| t.name == name) {
        return Some(t.id);
    }
    if themes.len() >= max_themes {
        warn!(name, max = max_themes, "theme capacity reached");
        return None;
    }
    let id = themes.len() as u32;
    themes.push(Theme {
        id,
        name: name.to_string(),
    });
    Some(id)
}

fn parse_question(
    line: &str,
    id: u32,
    themes: &mut Vec<Theme>,
    max_themes: usize,
) -> Option<Question> {
    let mut fields = line.split(';');

    let theme_field = fields.next()?;
    let difficulty = Difficulty::parse(fields.next()?);
    let kind = match fields.next()?.trim() {
        "qcm" => QuestionKind::MultiChoice,
        "boolean" => QuestionKind::Boolean,
        _ => QuestionKind::FreeText,
    };
    let prompt = fields.next()?.trim().to_string();
    let options_field = fields.next()?;
    let correct_field = fields.next()?;
    let explanation = fields
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);

    let theme_ids: Vec<u32> = theme_field
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .filter_map(|t| get_or_create_theme(themes, t, max_themes))
        .collect();

    let mut options = Vec::new();
    let mut correct_index = 0;
    let mut accepted = Vec::new();

    match kind {
        QuestionKind::MultiChoice => {
            options = options_field
                .split(',')
                .take(4)
                .map(|s| s.trim().to_string())
                .collect();
            correct_index = correct_field.trim().parse().unwrap_or(0);
            // The fifty joker and the wire format both assume exactly
            // four options.
            if options.len() != 4 || !(0..4).contains(&correct_index) {
                return None;
            }
        },
        QuestionKind::Boolean => {
            correct_index = correct_field.trim().parse().unwrap_or(0);
        },
        QuestionKind::FreeText => {
            accepted = correct_field
                .split(',')
                .take(4)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if accepted.is_empty() {
                return None;
            }
        },
    }

    Some(Question {
        id,
        theme_ids,
        difficulty,
        kind,
        prompt,
        options,
        correct_index,
        accepted,
        explanation,
    })
}
