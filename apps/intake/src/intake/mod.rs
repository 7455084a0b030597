// Intake review: prompt resources and the request dispatcher.
// All model calls go through llm_client — nothing here talks HTTP directly.

pub mod dispatcher;
pub mod library;

pub use dispatcher::IntakeReviewer;
pub use library::{load_case_file, CaseSubmission, PromptLibrary};
