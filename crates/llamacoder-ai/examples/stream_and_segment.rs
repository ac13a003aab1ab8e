use futures::StreamExt as _;
use llamacoder_ai::vendors::openai::{
    OpenAiClientConfig, OpenAiProvider, OpenAiRequestExt as _, OpenAiRequestOptions,
};
use llamacoder_ai::{
    ChatMessage, CompletionProvider, CompletionRequest, ProviderConfig, ProviderKind, chunk_text,
};
use llamacoder_core::{Segment, segment};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ProviderConfig::from_env(ProviderKind::OpenRouter, None)?;
    let provider = OpenAiProvider::new(OpenAiClientConfig::default())?;
    let request = CompletionRequest::new(
        "qwen/qwen3-coder:free",
        vec![
            ChatMessage::system(
                "Reply with one fenced code block whose first line is the filename.",
            ),
            ChatMessage::user("A tiny counter component in React."),
        ],
    )
    .openai_options(OpenAiRequestOptions::helicone_from_env("example"));

    let mut chunks = provider.start_stream(&config, request).await?;
    let mut text = String::new();
    let mut generating = false;
    while let Some(chunk) = chunks.next().await {
        if let Some(delta) = chunk_text(&chunk?) {
            text.push_str(delta);
        }
        let now_generating = matches!(segment(&text).last(), Some(Segment::CodeGenerating));
        if now_generating != generating {
            if now_generating {
                eprintln!("[generating code...]");
            } else {
                eprintln!("[code block closed]");
            }
            generating = now_generating;
        }
    }

    for part in segment(&text) {
        match part {
            Segment::Text { content } => println!("{content}"),
            Segment::CodeComplete { filename, content } => {
                let label = filename.version_label(1);
                println!("--- {label} ({}) ---\n{content}", filename.title());
            }
            Segment::CodeGenerating => println!("[incomplete code block]"),
        }
    }
    Ok(())
}
