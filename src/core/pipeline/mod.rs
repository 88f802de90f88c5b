//! Story Generation Pipeline
//!
//! Five ordered phases (fairy tale selection, skeleton generation,
//! character matching, story finalization, image generation) executed
//! strictly sequentially per run, each appending a durable phase log
//! the scoring engine later consumes.

pub mod context;
pub mod errors;
pub mod logs;
pub mod orchestrator;
pub mod phase;
pub mod prompts;
pub mod skeleton;

pub use context::{ChildProfile, StoryConfig, StoryContext, StoryLength, StoryRequest};
pub use errors::{PipelineError, PipelineResult};
pub use logs::{reconstruct_logs, LogProvenance, PhaseLog};
pub use orchestrator::{PipelineServices, StoryPipeline, StoryRunResult};
pub use phase::GenerationPhase;
pub use skeleton::{
    ChapterImage, ChapterOutline, FairyTaleSelection, FinalChapter, FinalStory, ImageManifest,
    StorySkeleton,
};
