//! 模型调用层：后端描述表、三类传输（标准云端 / 特殊信封 / 本地回环）、路由与 Mock

pub mod backend;
pub mod envelope;
pub mod mock;
pub mod openai;
pub mod router;
pub mod traits;

pub use backend::{BackendDescriptor, BackendRegistry, Quirks, Transport};
pub use mock::{MockModel, RecordedCall};
pub use router::ModelRouter;
pub use traits::{display_text, Generation, GenerationError, ModelInvoker};
