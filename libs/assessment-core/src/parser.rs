//! Heuristic extractor for question/answer pairs in OCR text.
//!
//! Scanned worksheets rarely follow a strict format, so the extractor is
//! permissive: it splits the text into blocks at anything that looks like the
//! start of a question, then guesses the question type and where the answer
//! begins.
//!
//! ```text
//! 1. Choose the capital of France:
//! a) Berlin
//! b) Madrid
//! c) Paris
//! Answer: c
//!
//! 2. The sky is blue. True/False
//! Ans: True
//! ```

use crate::config::ExtractorConfig;
use crate::types::{QuestionRecord, QuestionType};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static NUMBERED_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[.)](?:\s|$)").unwrap());
static Q_NUMBERED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^q\s*\d+").unwrap());
static PAREN_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\(\s*\d+\s*\)").unwrap());
static ROMAN_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[IVX]+[.)](?:\s|$)").unwrap());
static OPTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-dA-D])[.)](?:\s+(.*))?$").unwrap());
static FILL_BLANK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_{2,}|\[\s*\]").unwrap());
static TRUE_FALSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:true|false)\s*/\s*(?:true|false)\b").unwrap());
static NUMBER_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());
static DASHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\u{2013}\u{2014}]+").unwrap());
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

// A bare "answer" only counts as a marker at the start of a line or when
// followed by ':' or '.', so "What is the answer?" stays part of the question.
static ANSWER_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)(?:^(?:answer|ans)\b\.?[ \t]*[:.]?|\b(?:answer|ans)\b\.?[ \t]*[:.])[ \t]*")
        .unwrap()
});
static TRUE_FALSE_ANSWER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:answer|ans)\b\.?[ \t]*[:.]?[ \t]*(true|false)\b").unwrap()
});
static OPTION_ANSWER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\b(?:answer|ans)\b\.?[ \t]*[:.]?|\bcorrect[ \t]*:)[ \t]*\(?([a-d])\b").unwrap()
});

const QUESTION_WORDS: [&str; 12] = [
    "who", "what", "when", "where", "why", "how", "solve", "find", "prove", "define", "explain",
    "list",
];

/// Which rule recognised a line as the start of a question, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMarker {
    Numbered,
    QNumbered,
    ParenNumber,
    Roman,
    TrailingQuestionMark,
    QuestionWord,
}

/// Parse OCR text into question records using default heuristics.
pub fn parse(raw: &str) -> Vec<QuestionRecord> {
    parse_with(raw, &ExtractorConfig::default())
}

/// Parse OCR text into question records.
///
/// Empty or whitespace-only input yields no records. Output order follows the
/// order in which blocks appear in the text.
pub fn parse_with(raw: &str, config: &ExtractorConfig) -> Vec<QuestionRecord> {
    if raw.trim().is_empty() {
        return vec![];
    }

    let normalized = normalize(raw);
    let mut segmenter = Segmenter::new(config);
    for line in normalized.lines() {
        segmenter.process_line(line);
    }
    let blocks = segmenter.finish();

    let records: Vec<QuestionRecord> = blocks
        .iter()
        .filter_map(|block| parse_block(block, config))
        .collect();

    debug!(blocks = blocks.len(), records = records.len(), "parsed OCR text");
    records
}

/// Clean up OCR noise line by line.
///
/// Whitespace runs (including non-breaking spaces) become one space, dash
/// variants become `-`, and blank lines are dropped. Applying it twice gives
/// the same result as applying it once.
pub fn normalize(text: &str) -> String {
    text.lines()
        .map(|line| {
            let line = DASHES.replace_all(line, "-");
            SPACES.replace_all(&line, " ").trim().to_string()
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Check whether a normalized line opens a new question.
pub fn question_start(line: &str, config: &ExtractorConfig) -> Option<StartMarker> {
    let len = line.chars().count();
    if len < 2 {
        return None;
    }
    if NUMBERED_START.is_match(line) {
        return Some(StartMarker::Numbered);
    }
    if Q_NUMBERED.is_match(line) {
        return Some(StartMarker::QNumbered);
    }
    if PAREN_NUMBER.is_match(line) {
        return Some(StartMarker::ParenNumber);
    }
    if ROMAN_START.is_match(line) {
        return Some(StartMarker::Roman);
    }
    if line.ends_with('?') && (config.min_question_line..=config.max_question_line).contains(&len) {
        return Some(StartMarker::TrailingQuestionMark);
    }
    let lower = line.to_lowercase();
    let starts_with_word = QUESTION_WORDS.iter().any(|word| {
        lower
            .strip_prefix(word)
            .is_some_and(|rest| rest.starts_with(' ') || rest.starts_with('?'))
    });
    if starts_with_word {
        return Some(StartMarker::QuestionWord);
    }
    None
}

/// Groups lines into blocks, one per question.
struct Segmenter<'c> {
    config: &'c ExtractorConfig,
    current: Vec<String>,
    blocks: Vec<Vec<String>>,
}

impl<'c> Segmenter<'c> {
    fn new(config: &'c ExtractorConfig) -> Self {
        Self {
            config,
            current: Vec::new(),
            blocks: Vec::new(),
        }
    }

    fn process_line(&mut self, line: &str) {
        // Lines before the first recognised start form their own leading block.
        if question_start(line, self.config).is_some() && !self.current.is_empty() {
            self.flush();
        }
        self.current.push(line.to_string());
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.blocks.push(std::mem::take(&mut self.current));
        }
    }

    fn finish(mut self) -> Vec<Vec<String>> {
        self.flush();
        self.blocks
    }
}

fn parse_block(lines: &[String], config: &ExtractorConfig) -> Option<QuestionRecord> {
    let text = lines.join("\n");

    let mut question_type = detect_type(&text, config);
    let mut options = None;
    if question_type == QuestionType::MultipleChoice {
        let cutoff = [
            OPTION_ANSWER.find(&text).map(|m| m.start()),
            find_answer_marker(&text).map(|(start, _)| start),
        ]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(text.len());
        options = extract_options(&text[..cutoff]);
        if options.is_none() {
            question_type = length_type(&text, config);
        }
    }

    let (question, answer) = split_question_answer(&text, question_type, config);
    let question = collapse(&question);
    if question.is_empty() {
        return None;
    }

    Some(QuestionRecord {
        question_text: question,
        answer_text: collapse(&answer),
        question_type,
        options,
        subject: None,
        chapter: None,
    })
}

fn detect_type(text: &str, config: &ExtractorConfig) -> QuestionType {
    if TRUE_FALSE.is_match(text) {
        return QuestionType::TrueFalse;
    }
    if FILL_BLANK.is_match(text) {
        return QuestionType::FillBlank;
    }
    let option_lines = text.lines().filter(|line| OPTION_LINE.is_match(line)).count();
    if option_lines >= 2 {
        return QuestionType::MultipleChoice;
    }
    length_type(text, config)
}

fn length_type(text: &str, config: &ExtractorConfig) -> QuestionType {
    let len = text.chars().count();
    if len > config.essay_min_chars {
        QuestionType::Essay
    } else if len > config.short_min_chars {
        QuestionType::Short
    } else if NUMBER_TOKEN.is_match(text) {
        QuestionType::Numeric
    } else {
        QuestionType::Short
    }
}

fn split_question_answer(
    text: &str,
    question_type: QuestionType,
    config: &ExtractorConfig,
) -> (String, String) {
    let token_marker = match question_type {
        QuestionType::TrueFalse => Some(&*TRUE_FALSE_ANSWER),
        QuestionType::MultipleChoice => Some(&*OPTION_ANSWER),
        _ => None,
    };

    if let Some(caps) = token_marker.and_then(|re| re.captures(text)) {
        let (Some(whole), Some(token)) = (caps.get(0), caps.get(1)) else {
            return (text.to_string(), String::new());
        };
        return (text[..whole.start()].to_string(), token.as_str().to_string());
    }

    if let Some((start, end)) = find_answer_marker(text) {
        return (text[..start].to_string(), text[end..].to_string());
    }

    if let Some(pos) = text.find('?') {
        let (question, rest) = text.split_at(pos + 1);
        // Option lines after the question mark are choices, not an answer.
        let trailing = rest
            .lines()
            .take_while(|line| !OPTION_LINE.is_match(line.trim()))
            .collect::<Vec<_>>()
            .join("\n");
        let answer: String = trailing
            .trim()
            .chars()
            .take(config.max_trailing_answer_chars)
            .collect();
        return (question.to_string(), answer);
    }

    (text.to_string(), String::new())
}

/// Locate a generic answer marker as `(marker_start, answer_start)`.
///
/// A marker in the middle of a line with nothing after it ("Choose the
/// correct answer:") is a prompt, not a marker.
fn find_answer_marker(text: &str) -> Option<(usize, usize)> {
    ANSWER_MARKER
        .find_iter(text)
        .find(|m| {
            let line_start = text[..m.start()].rfind('\n').map_or(0, |i| i + 1);
            let at_line_start = text[line_start..m.start()].trim().is_empty();
            let rest_of_line = text[m.end()..].lines().next().unwrap_or("");
            at_line_start || !rest_of_line.trim().is_empty()
        })
        .map(|m| (m.start(), m.end()))
}

/// Collect option texts from `a.`/`b)`-style lines. Needs two distinct letters.
fn extract_options(text: &str) -> Option<Vec<String>> {
    let mut options: Vec<(char, String)> = Vec::new();
    let mut current: Option<usize> = None;

    for line in text.lines() {
        if let Some(caps) = OPTION_LINE.captures(line) {
            let letter = caps
                .get(1)
                .and_then(|m| m.as_str().chars().next())
                .map(|c| c.to_ascii_lowercase());
            let body = caps.get(2).map_or("", |m| m.as_str()).trim().to_string();
            current = match letter {
                Some(letter) if !options.iter().any(|(seen, _)| *seen == letter) => {
                    options.push((letter, body));
                    Some(options.len() - 1)
                }
                // Repeated letter: OCR echo, ignore it and its continuation.
                _ => None,
            };
        } else if let Some(idx) = current {
            let entry = &mut options[idx].1;
            if !entry.is_empty() {
                entry.push(' ');
            }
            entry.push_str(line.trim());
        }
    }

    let options: Vec<String> = options
        .into_iter()
        .map(|(_, body)| body)
        .filter(|body| !body.is_empty())
        .collect();

    if options.len() >= 2 {
        Some(options)
    } else {
        None
    }
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
