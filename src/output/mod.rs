//! Command output: schema-versioned JSON envelopes and response payloads.

pub mod command;

pub use command::{
    generate_execution_id, output_json, ErrorResponse, JsonResponse, OutputFormat, RollbackResponse,
    RunResponse, StatusResponse, SEQUESTER_JSON_SCHEMA_VERSION,
};
