use std::io::{BufRead as _, Write as _};
use std::sync::Arc;

use agent_builder_bridge::observability::init_observability;
use agent_builder_bridge::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), HarnessError> {
    let _ = dotenvy::from_filename(".env.local");
    let _logs = init_observability()?;

    let client = AgentBuilderClient::from_env()?;
    let config = client.config().clone();
    let mut llm = AgentBuilderLlm::builder(Arc::new(client))
        .config(&config)
        .build()?;
    println!("{} ({}) - empty line to quit", llm.label(), llm.model());

    let mut ctx = ChatContext::new();
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 || line.trim().is_empty() {
            break;
        }
        ctx.add_message(ChatRole::User, line.trim());

        let mut reply = String::new();
        let mut stream = llm.chat(&ctx)?;
        while let Some(chunk) = stream.next_chunk().await {
            match chunk {
                Ok(chunk) => {
                    print!("{}", chunk.content);
                    let _ = std::io::stdout().flush();
                    reply.push_str(&chunk.content);
                }
                Err(err) => eprintln!("\nturn failed: {err}"),
            }
        }
        println!();
        ctx.add_message(ChatRole::Assistant, reply);
    }

    if let Some(id) = llm.conversation_id() {
        println!("conversation: {id}");
    }
    Ok(())
}
