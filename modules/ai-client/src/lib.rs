pub mod error;
pub mod openai;
pub mod traits;
pub mod util;

pub use error::AiError;
pub use openai::{OpenAi, OpenAiPromptBuilder, GROQ_API_URL, OPENAI_API_URL};
pub use traits::PromptBuilder;
pub use util::{extract_json_object, parse_json_lenient, strip_code_blocks, truncate_to_char_boundary};
