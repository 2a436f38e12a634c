//! On-demand compilation and module resolution
//!
//! Sources are compiled into a private staging tree only when stale. Staged
//! artifacts resolve relative imports inside the staging tree and library
//! imports from the original project root.

pub mod compiler;
pub mod imports;
pub mod materializer;
pub mod resolver;

pub use compiler::{CommandCompiler, Compiler, PassthroughCompiler, compiler_from_config};
pub use materializer::{CachePolicy, MaterializedArtifact, Materializer};
pub use resolver::{
    DualRootResolver, ModuleResolver, ProjectRootResolver, Resolution, StagingResolver,
};
