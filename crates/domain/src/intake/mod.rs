/// Intake aggregate (wizard state machine)
pub mod aggregate;

/// Commands
pub mod commands;

/// Events
pub mod events;

/// Input DTOs
pub mod inputs;

/// Candidate and wizard items
pub mod items;

/// Destination phone composition
pub mod phone;

/// Submission payload reconciliation
pub mod payload;

/// Extraction service client
pub mod extractor;

/// Submission sink
pub mod sink;

/// View (read model)
pub mod view;

/// View caching and in-memory view storage
pub mod view_cache;

/// CQRS setup
pub mod cqrs;

/// Orchestration of the wizard with its collaborators
pub mod wizard;

pub use aggregate::{Intake, Services, WizardStep, AGGREGATE_TYPE};
pub use commands::Command;
pub use events::Event;
pub use extractor::{Extractor, HttpExtractor};
pub use items::{CandidateItem, Confidence, ItemChange, ItemId, ItemType, WizardItem};
pub use payload::{SubmissionItem, SubmissionPayload};
pub use sink::{HttpSubmissionSink, SubmissionSink};
pub use view::{Query, View};
pub use wizard::IntakeWizard;
