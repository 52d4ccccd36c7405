pub mod google;
pub mod openai;
pub mod replicate;

pub use google::Google;
pub use openai::OpenAi;
pub use replicate::Replicate;
