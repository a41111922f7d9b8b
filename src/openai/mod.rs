pub mod core;

pub use self::core::{
    AssistantReply, CompletionClient, CompletionError, RequestPayload, build_payload,
    parse_reply, select_last_user_turn,
};
