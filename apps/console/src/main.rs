//! Interactive console front-end for the event assistant. Stands in
//! for the real messaging transport: type text or commands, press
//! buttons with `press <n>`.

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use bot_core::{
    AdminList, Controller, EventService, PrivilegeChecker, RegistrationService, UserService,
};
use clap::Parser;
use shared::{
    domain::{ChatId, User, UserId},
    update::{ButtonPress, InboundUpdate, TextMessage},
};
use storage::Storage;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

mod channel;
mod config;

use channel::ConsoleChannel;
use config::load_settings;

const CHAT: ChatId = ChatId(1);

#[derive(Parser, Debug)]
struct Args {
    /// Path to a TOML config file (defaults to ./eventbot.toml).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Identity to act as.
    #[arg(long, default_value_t = 1)]
    user_id: i64,
    /// Display name for the acting identity.
    #[arg(long, default_value = "Console")]
    name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if settings.admin_ids.is_empty() {
        // A console session without admins cannot create anything.
        settings.admin_ids.push(args.user_id);
    }

    let storage = Arc::new(Storage::new(&settings.database_url).await?);
    storage.health_check().await?;

    let channel = Arc::new(ConsoleChannel::default());
    let privileges: Arc<dyn PrivilegeChecker> = Arc::new(AdminList::new(
        settings.admin_ids.iter().map(|&id| UserId(id)),
    ));
    let controller = Controller::new(
        channel.clone(),
        storage.clone(),
        EventService::new(storage.clone(), privileges.clone()),
        RegistrationService::new(storage.clone(), storage.clone()),
        UserService::new(storage.clone()),
        privileges,
    );

    let me = User {
        id: UserId(args.user_id),
        first_name: args.name.clone(),
        username: args.name.to_lowercase(),
    };

    println!("eventbot console — acting as {} (id {})", me.first_name, me.id.0);
    println!("type /help for commands, `press <n>` to press a button, `quit` to exit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut interaction_seq = 0u64;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }

        let update = if let Some(raw_index) = line.strip_prefix("press ") {
            let Ok(index) = raw_index.trim().parse::<usize>() else {
                println!("(console) usage: press <button number>");
                continue;
            };
            let Some((message_id, payload)) = channel.button(index) else {
                println!("(console) no such button: {index}");
                continue;
            };
            interaction_seq += 1;
            InboundUpdate::Button(ButtonPress {
                presser: me.clone(),
                chat_id: CHAT,
                message_id,
                interaction_id: format!("console-{interaction_seq}"),
                payload,
            })
        } else {
            InboundUpdate::Text(TextMessage {
                sender: me.clone(),
                chat_id: CHAT,
                text: line,
            })
        };

        if let Err(err) = controller.handle(update).await {
            // One bad update must not take the loop down.
            error!(error = %err, "failed to handle update");
        }
    }

    Ok(())
}
