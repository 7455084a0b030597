//! Prompt Library — the criteria document, the reviewer instructions, and the
//! bundled case submissions, read from plain-text resource files at startup.
//!
//! Layout of a prompts directory:
//!
//! ```text
//! prompts/
//!   criteria.txt       system message
//!   instructions.txt   trailing assistant message
//!   cases/*.txt        one case submission per file, listed in file-name order
//! ```
//!
//! The same texts are compiled into the binary, so an installed copy without
//! the source tree still has a library to fall back on.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::IntakeError;

pub const CRITERIA_FILE: &str = "criteria.txt";
pub const INSTRUCTIONS_FILE: &str = "instructions.txt";
pub const CASES_DIR: &str = "cases";
/// Prompts directory of the source tree the binary was built from.
pub const SOURCE_PROMPTS_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/prompts");

const BUNDLED_CRITERIA: &str = include_str!("../../prompts/criteria.txt");
const BUNDLED_INSTRUCTIONS: &str = include_str!("../../prompts/instructions.txt");
const BUNDLED_CASES: &[(&str, &str)] = &[
    (
        "01_eligible_nightclub_altercation",
        include_str!("../../prompts/cases/01_eligible_nightclub_altercation.txt"),
    ),
    (
        "02_consent_transaction",
        include_str!("../../prompts/cases/02_consent_transaction.txt"),
    ),
    (
        "03_self_defense",
        include_str!("../../prompts/cases/03_self_defense.txt"),
    ),
    (
        "04_missing_information",
        include_str!("../../prompts/cases/04_missing_information.txt"),
    ),
];

/// One applicant's case text. `name` is the file stem it was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseSubmission {
    pub name: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct PromptLibrary {
    pub criteria: String,
    pub instructions: String,
    pub cases: Vec<CaseSubmission>,
}

impl PromptLibrary {
    /// Picks the library to use at startup.
    ///
    /// An explicit directory must load. Without one, the source tree's
    /// `prompts/` is used when present, else the compiled-in copy.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, IntakeError> {
        resolve_from(explicit, Path::new(SOURCE_PROMPTS_DIR))
    }

    /// The prompt texts compiled into the binary.
    pub fn bundled() -> Self {
        Self {
            criteria: BUNDLED_CRITERIA.to_string(),
            instructions: BUNDLED_INSTRUCTIONS.to_string(),
            cases: BUNDLED_CASES
                .iter()
                .map(|(name, text)| CaseSubmission {
                    name: name.to_string(),
                    text: text.to_string(),
                })
                .collect(),
        }
    }

    pub fn load(dir: &Path) -> Result<Self, IntakeError> {
        let criteria = read_prompt_file(&dir.join(CRITERIA_FILE))?;
        let instructions = read_prompt_file(&dir.join(INSTRUCTIONS_FILE))?;
        let cases = load_cases(&dir.join(CASES_DIR))?;

        info!(
            "Loaded prompt library from {} ({} cases)",
            dir.display(),
            cases.len()
        );

        Ok(Self {
            criteria,
            instructions,
            cases,
        })
    }

    /// Looks a bundled case up by 1-based position or by name.
    ///
    /// Names match the full file stem (`03_self_defense`) or the stem with its
    /// numeric ordering prefix dropped (`self_defense`).
    pub fn find_case(&self, selector: &str) -> Result<&CaseSubmission, IntakeError> {
        let selector = selector.trim();

        if let Ok(position) = selector.parse::<usize>() {
            return position
                .checked_sub(1)
                .and_then(|idx| self.cases.get(idx))
                .ok_or_else(|| IntakeError::UnknownCase(selector.to_string()));
        }

        self.cases
            .iter()
            .find(|c| c.name == selector || strip_order_prefix(&c.name) == selector)
            .ok_or_else(|| IntakeError::UnknownCase(selector.to_string()))
    }
}

fn resolve_from(explicit: Option<&Path>, source_dir: &Path) -> Result<PromptLibrary, IntakeError> {
    match explicit {
        Some(dir) => PromptLibrary::load(dir),
        None if source_dir.is_dir() => PromptLibrary::load(source_dir),
        None => {
            info!(
                "No prompts directory at {}; using compiled-in prompt library",
                source_dir.display()
            );
            Ok(PromptLibrary::bundled())
        }
    }
}

/// Reads a single case submission from an arbitrary file.
pub fn load_case_file(path: &Path) -> Result<CaseSubmission, IntakeError> {
    let text = read_prompt_file(path)?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(CaseSubmission { name, text })
}

fn load_cases(dir: &Path) -> Result<Vec<CaseSubmission>, IntakeError> {
    let entries = std::fs::read_dir(dir).map_err(|source| IntakeError::PromptLibrary {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| IntakeError::PromptLibrary {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
            paths.push(path);
        } else {
            debug!("Skipping non-case entry {}", path.display());
        }
    }
    paths.sort();

    paths.iter().map(|p| load_case_file(p)).collect()
}

fn read_prompt_file(path: &Path) -> Result<String, IntakeError> {
    std::fs::read_to_string(path).map_err(|source| IntakeError::PromptLibrary {
        path: path.to_path_buf(),
        source,
    })
}

fn strip_order_prefix(name: &str) -> &str {
    match name.split_once('_') {
        Some((prefix, rest)) if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()) => {
            rest
        }
        _ => name,
    }
}
