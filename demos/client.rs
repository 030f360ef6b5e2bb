//! Chat and event client demo
//!
//! Run with: cargo run --example chat_client -- [OPTIONS] <COMMAND>
//!
//! Examples:
//!   cargo run --example chat_client -- chat hello world
//!   cargo run --example chat_client -- subscribe --user-id 1
//!   cargo run --example chat_client -- --token secret create "Groceries" "milk, eggs"
//!   cargo run --example chat_client -- --token secret list --user-id 1

use std::time::Duration;

use clap::{Parser, Subcommand};

use notes_rt::client::{
    ChatClient, ChatEvent, ClientConfig, EventSubscriber, NotesClient, SubscriberEvent,
};

#[derive(Debug, Parser)]
#[command(name = "chat_client", about = "Client for the realtime notes server")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:50051")]
    addr: String,

    /// Bearer token for note calls
    #[arg(long, env = "NOTES_AUTH_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send messages on a chat stream and print what comes back
    Chat {
        /// Messages to send, one per second
        messages: Vec<String>,

        /// Keep listening this many seconds after the last message
        #[arg(long, default_value_t = 3)]
        linger: u64,
    },
    /// Print note events and heartbeats until interrupted
    Subscribe {
        #[arg(long, default_value_t = 1)]
        user_id: i64,
    },
    /// Create a note
    Create { title: String, content: String },
    /// Fetch one note
    Get { note_id: i64 },
    /// List a user's notes
    List {
        #[arg(long, default_value_t = 1)]
        user_id: i64,
    },
    /// Delete a note
    Delete { note_id: i64 },
    /// Upload view counters and print their sum
    Metrics {
        /// Upload the counters 0..count
        #[arg(long, default_value_t = 10)]
        count: i64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = ClientConfig::new(args.addr);
    if let Some(token) = &args.token {
        config = config.bearer_token(token);
    }

    match args.command {
        Command::Chat { messages, linger } => chat(config, messages, linger).await?,
        Command::Subscribe { user_id } => subscribe(config, user_id).await?,
        Command::Create { title, content } => {
            let note = NotesClient::new(config).create_note(title, content).await?;
            println!("{:#?}", note);
        }
        Command::Get { note_id } => {
            let note = NotesClient::new(config).get_note(note_id).await?;
            println!("{:#?}", note);
        }
        Command::List { user_id } => {
            for note in NotesClient::new(config).get_notes(user_id).await? {
                println!("{:>4}  {}", note.id, note.title);
            }
        }
        Command::Delete { note_id } => {
            NotesClient::new(config).delete_note(note_id).await?;
            println!("Deleted note {}", note_id);
        }
        Command::Metrics { count } => {
            let summary = NotesClient::new(config).upload_metrics(0..count).await?;
            println!("Total views: {}", summary.total_view);
        }
    }

    Ok(())
}

async fn chat(
    config: ClientConfig,
    messages: Vec<String>,
    linger: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let (mut chat, mut events) = ChatClient::connect(config).await?;

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                ChatEvent::Message(text) => println!("server: {}", text),
                ChatEvent::Ack(id) => println!("ack:    {}", id),
                ChatEvent::Closed => break,
                ChatEvent::Error(e) => {
                    eprintln!("error:  {}", e);
                    break;
                }
            }
        }
    });

    for message in messages {
        let id = chat.send(message.as_str()).await?;
        println!("sent:   {} ({})", message, id);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    tokio::time::sleep(Duration::from_secs(linger)).await;
    chat.close().await?;
    printer.abort();
    Ok(())
}

async fn subscribe(config: ClientConfig, user_id: i64) -> Result<(), Box<dyn std::error::Error>> {
    let (mut subscriber, mut events) = EventSubscriber::connect(config, user_id).await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Some(SubscriberEvent::HealthCheck(at)) => println!("heartbeat at {}", at),
                Some(SubscriberEvent::NoteCreated(note)) => {
                    println!("note created: {} {:?}", note.id, note.title)
                }
                Some(SubscriberEvent::Error(e)) => {
                    eprintln!("error: {}", e);
                    break;
                }
                Some(SubscriberEvent::Closed) | None => break,
            }
        }
    }

    subscriber.unsubscribe().await?;
    Ok(())
}
