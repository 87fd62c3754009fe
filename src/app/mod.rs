// Application layer - Use case interactors

pub mod container;
pub mod pipeline_interactor;
pub mod region_interactor;
pub mod resolve_interactor;
pub mod runner;
pub mod trim_interactor;

// Re-export interactors
pub use pipeline_interactor::{PipelineOrchestrator, PipelineRequest};
pub use region_interactor::{RegionSelection, RegionSelector};
pub use resolve_interactor::{SourceResolver, SourceSettings};
pub use runner::{PipelineRunner, RunHandle};
pub use trim_interactor::Trimmer;
