//! Knowledge sources queried by the pipeline.

pub mod documentation;
pub mod local_index;
pub mod source;

pub use documentation::{DOCUMENTATION_SOURCE, DocumentationSource, ExtractedPage, extract_page};
pub use local_index::{IndexedDocument, LOCAL_INDEX_SOURCE, LocalIndexSource};
pub use source::{KnowledgeError, KnowledgeResult, KnowledgeSource};
