//! In-process collaborators for tests, replays and the CLI.

pub mod mock;

pub use mock::{
    BagOfWordsEmbedder, EchoResponder, FailingEmbedder, InMemoryStore, ScriptedResponder,
};
