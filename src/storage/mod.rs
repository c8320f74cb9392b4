//! Storage implementations for event records

pub mod in_memory;

pub use in_memory::InMemoryEventRepository;
