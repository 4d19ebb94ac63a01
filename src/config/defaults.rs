pub fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

pub fn default_initial_greeting() -> String {
    "고객님, 안녕하세요.\n무엇을 도와드릴까요?".to_string()
}

pub fn default_session_ttl_secs() -> u64 {
    3600 // one hour
}

pub fn default_stream_timeout_secs() -> u64 {
    120 // knowledge-base lookups can stay silent for a minute or more
}
