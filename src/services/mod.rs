pub mod completion_client;
pub mod generation_pipeline;
pub mod grading_service;
pub mod prompt_templater;
pub mod quiz_assembler;
pub mod quiz_parser;
pub mod quiz_service;
pub mod source_acquirer;
