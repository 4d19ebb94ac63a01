use agentchat::conversation::Conversation;
use agentchat::stream::{TurnProcessor, FAILURE_MESSAGE};
use agentchat::{ChatError, TraceKind, TurnOutcome};
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use pretty_assertions::assert_eq;
use std::io;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

fn chunks(parts: Vec<Vec<u8>>) -> impl futures::Stream<Item = Result<Bytes, io::Error>> + Unpin {
    stream::iter(parts.into_iter().map(|p| Ok(Bytes::from(p))))
}

fn split_every(body: &[u8], size: usize) -> Vec<Vec<u8>> {
    body.chunks(size).map(|c| c.to_vec()).collect()
}

async fn run_turn(parts: Vec<Vec<u8>>) -> (Result<TurnOutcome, ChatError>, Conversation) {
    let mut conversation = Conversation::new("greeting");
    let mut turn = TurnProcessor::new(conversation.generation());
    turn.submit("question", &mut conversation);
    let outcome = turn.run(chunks(parts), TIMEOUT, &mut conversation).await;
    (outcome, conversation)
}

#[tokio::test]
async fn test_korean_text_split_at_every_byte() {
    let body = "data: {\"chunk\":\"안녕\"}\n\ndata: {\"chunk\":\"하세요\"}\n\ndata: {\"done\":true}\n\n";
    let (outcome, conversation) = run_turn(split_every(body.as_bytes(), 1)).await;

    assert_eq!(outcome.unwrap(), TurnOutcome::Completed);
    assert_eq!(conversation.log().last().unwrap().content, "안녕하세요");
}

#[tokio::test]
async fn test_record_split_across_chunks_is_not_lost() {
    let body = "data: {\"chunk\":\"Hello, \"}\ndata: {\"chunk\":\"world\"}\ndata: {\"done\":true}\n";
    for size in [3, 7, 16, 40] {
        let (outcome, conversation) = run_turn(split_every(body.as_bytes(), size)).await;
        assert_eq!(outcome.unwrap(), TurnOutcome::Completed);
        assert_eq!(
            conversation.log().last().unwrap().content,
            "Hello, world",
            "chunk size {}",
            size
        );
    }
}

#[tokio::test]
async fn test_unparseable_records_are_skipped() {
    let body = concat!(
        "data: {\"chunk\":\"a\"}\n",
        "data: {\"chunk\": \n",
        "data: not json at all\n",
        "data: {\"chunk\":\"b\"}\n",
        "data: {\"done\":true}\n",
    );
    let (outcome, conversation) = run_turn(vec![body.as_bytes().to_vec()]).await;

    assert_eq!(outcome.unwrap(), TurnOutcome::Completed);
    assert_eq!(conversation.log().last().unwrap().content, "ab");
}

#[tokio::test]
async fn test_stream_without_done_is_incomplete() {
    let body = "data: {\"chunk\":\"half an ans\"}\n";
    let (outcome, conversation) = run_turn(vec![body.as_bytes().to_vec()]).await;

    assert_eq!(outcome.unwrap(), TurnOutcome::Incomplete);
    assert!(!conversation.is_streaming());
    assert_eq!(conversation.log().last().unwrap().content, "half an ans");
}

#[tokio::test]
async fn test_trailing_final_record_without_newline() {
    let body = "data: {\"chunk\":\"x\"}\ndata: {\"done\":true,\"fullResponse\":\"final\"}";
    let (outcome, conversation) = run_turn(vec![body.as_bytes().to_vec()]).await;

    assert_eq!(outcome.unwrap(), TurnOutcome::Completed);
    assert_eq!(conversation.log().last().unwrap().content, "final");
}

#[tokio::test]
async fn test_transport_error_mid_stream_records_failure() {
    let mut conversation = Conversation::new("greeting");
    let mut turn = TurnProcessor::new(0);
    turn.submit("question", &mut conversation);

    let parts = stream::iter(vec![
        Ok(Bytes::from_static(b"data: {\"chunk\":\"par\"}\n")),
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
    ]);
    let result = turn.run(parts, TIMEOUT, &mut conversation).await;

    assert!(matches!(result, Err(ChatError::IoError(_))));
    assert_eq!(conversation.log().last().unwrap().content, FAILURE_MESSAGE);
}

#[tokio::test]
async fn test_silent_stream_times_out() {
    let mut conversation = Conversation::new("greeting");
    let mut turn = TurnProcessor::new(0);
    turn.submit("question", &mut conversation);

    let parts = chunks(vec![b"data: {\"chunk\":\"a\"}\n".to_vec()]).chain(stream::pending());
    let result = turn
        .run(parts, Duration::from_millis(50), &mut conversation)
        .await;

    assert!(matches!(result, Err(ChatError::Timeout)));
    assert_eq!(conversation.log().last().unwrap().content, FAILURE_MESSAGE);
    assert!(!conversation.is_streaming());
}

#[tokio::test]
async fn test_code_interpreter_and_observation_traces() {
    let body = concat!(
        "data: {\"trace\":{\"trace\":{\"orchestrationTrace\":{\"invocationInput\":",
        "{\"codeInterpreterInvocationInput\":{\"code\":\"print(1)\"}}}}}}\n",
        "data: {\"trace\":{\"trace\":{\"orchestrationTrace\":{\"observation\":",
        "{\"codeInterpreterInvocationOutput\":{\"executionOutput\":\"1\"}}}}}}\n",
        "data: {\"done\":true,\"fullResponse\":\"done\"}\n",
    );
    let (outcome, conversation) = run_turn(vec![body.as_bytes().to_vec()]).await;

    assert_eq!(outcome.unwrap(), TurnOutcome::Completed);
    let answer = conversation.log().last().unwrap();
    let kinds: Vec<TraceKind> = answer.traces.iter().map(|t| t.kind).collect();
    assert_eq!(kinds, vec![TraceKind::CodeInterpreter, TraceKind::Observation]);
    assert_eq!(answer.traces[0].content, "print(1)");
    assert_eq!(answer.traces[1].content, "1");
}
