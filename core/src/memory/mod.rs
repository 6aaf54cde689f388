pub mod store;
pub mod categorizer;
pub mod graph;
pub mod entries;

pub use store::VectorStore;
pub use categorizer::MemoryCategorizer;
pub use entries::{AgentMemoryManager, MemoryEntry, MemoryEntryType, MemoryMetadata};
