//! Question storage: the data model and the bounded pending store.

pub mod model;
pub mod store;

pub use model::{ChatKind, Question, qualifies};
pub use store::PendingQuestionStore;
