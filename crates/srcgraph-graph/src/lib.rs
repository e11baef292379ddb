pub mod builder;
pub mod memory;
pub mod report;

pub use builder::GraphBuilder;
pub use memory::MemoryGraph;
pub use report::{
    CallGraphEntry, DependencyLayer, NodeWithRelations, ProjectStatistics, ReportService,
};
