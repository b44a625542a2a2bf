use std::sync::Arc;

use agent_builder_bridge::observability::init_observability;
use agent_builder_bridge::prelude::*;
use agent_builder_bridge::{ConverseRequest, ConverseTransport as _, abort_pair};
use futures::StreamExt as _;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), HarnessError> {
    let _ = dotenvy::from_filename(".env.local");
    let _logs = init_observability()?;

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let one_shot = args.first().is_some_and(|a| a == "--one-shot");
    if one_shot {
        args.remove(0);
    }
    let input = if args.is_empty() {
        "Which indices do I have?".to_string()
    } else {
        args.join(" ")
    };

    let client = Arc::new(AgentBuilderClient::from_env()?);
    let config = client.config().clone();

    let events = if one_shot {
        client.converse(&input, &config.agent_id, None).await?
    } else {
        let (_abort, signal) = abort_pair();
        let request = ConverseRequest::new(input, &config.agent_id, &config.connector_id);
        let mut stream = client.converse_stream(request, signal).await?;
        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            let event = event?;
            println!("event: {}", event.kind());
            events.push(event);
        }
        events
    };

    for event in &events {
        match event {
            Event::ConversationIdSet(body) => println!("conversation id: {}", body.conversation_id),
            Event::MessageComplete(body) => println!("message {}: {}", body.message_id, body.message_content),
            Event::ToolProgress(body) => println!("progress: {}", body.message),
            Event::Error(err) => println!("error {}: {}", err.code, err.message),
            other => println!("{}", other.kind()),
        }
    }
    println!("{} events", events.len());
    Ok(())
}
