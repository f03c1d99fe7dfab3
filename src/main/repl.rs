// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::io::{self, Write};
use std::path::PathBuf;

use crossterm::{
    style::{Color, ResetColor, SetForegroundColor},
    ExecutableCommand,
};

use lexi::chat::transcript::PLACEHOLDER;
use lexi::chat::{AbortHandle, ChatController, ChatView, Message, SendOutcome, Sender};
use lexi::cli::ChatArgs;
use lexi::config::Settings;
use lexi::error::{LexiError, Result};

use super::runtime::{apply_overrides, build_controller, Overrides};

/// One line of REPL input
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum ReplCommand {
    Message(String),
    Attach(PathBuf),
    Detach,
    Record,
    Stop,
    New,
    Load(String),
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub(super) fn parse_command(line: &str) -> ReplCommand {
    let line = line.trim();
    if line.is_empty() {
        return ReplCommand::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return ReplCommand::Message(line.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    match (name, arg.is_empty()) {
        ("attach", false) => ReplCommand::Attach(PathBuf::from(arg)),
        ("load", false) => ReplCommand::Load(arg.to_string()),
        ("detach", _) => ReplCommand::Detach,
        ("record", _) => ReplCommand::Record,
        ("stop", _) => ReplCommand::Stop,
        ("new", _) => ReplCommand::New,
        ("help" | "?", _) => ReplCommand::Help,
        ("quit" | "exit" | "q", _) => ReplCommand::Quit,
        _ => ReplCommand::Unknown(line.to_string()),
    }
}

/// Prints the streamed reply incrementally
#[derive(Debug, Default)]
pub(super) struct StreamPrinter {
    printed: String,
}

impl StreamPrinter {
    /// Text to write for the reply's new `content`, given what was printed
    pub(super) fn delta(&mut self, content: &str) -> Option<String> {
        if content == PLACEHOLDER || content == self.printed {
            return None;
        }
        let out = match content.strip_prefix(self.printed.as_str()) {
            Some(suffix) => suffix.to_string(),
            // Replaced wholesale, e.g. by the tool follow-up or the failure notice.
            None => format!("\n{}", content),
        };
        self.printed = content.to_string();
        Some(out)
    }

    fn render(&mut self, view: &ChatView, from: usize) -> Result<()> {
        let reply = view
            .messages
            .iter()
            .skip(from)
            .rfind(|m| m.role == Sender::Assistant);
        if let Some(reply) = reply {
            if let Some(text) = self.delta(&reply.content) {
                let mut stdout = io::stdout();
                write!(stdout, "{}", text)?;
                stdout.flush()?;
            }
        }
        Ok(())
    }
}

fn print_colored(color: Color, text: &str) -> Result<()> {
    let mut stdout = io::stdout();
    stdout.execute(SetForegroundColor(color))?;
    print!("{}", text);
    stdout.execute(ResetColor)?;
    stdout.flush()?;
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  /attach <path>  attach a file to the next message");
    println!("  /detach         drop the pending attachment");
    println!("  /record         start a voice recording");
    println!("  /stop           stop recording and attach the clip");
    println!("  /new            start a new chat");
    println!("  /load <id>      load a stored chat");
    println!("  /quit           exit");
    println!("Ctrl-C stops the reply being streamed.");
}

/// Ctrl-C aborts the in-flight send instead of killing the process
fn spawn_interrupt_handler(handle: AbortHandle) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !handle.abort() {
                eprintln!("\n(nothing to stop; type /quit to exit)");
            }
        }
    });
}

async fn read_line() -> Result<Option<String>> {
    let line = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        io::stdin().read_line(&mut line).map(|n| (n, line))
    })
    .await
    .map_err(|e| LexiError::InvalidInput(format!("input reader failed: {}", e)))??;

    Ok(match line {
        (0, _) => None,
        (_, text) => Some(text),
    })
}

/// Send the staged message and print the reply as it streams
pub(super) async fn send_and_render(controller: &ChatController) -> Result<SendOutcome> {
    let from = controller.messages().len();
    let mut rx = controller.subscribe();
    let mut printer = StreamPrinter::default();

    print_colored(Color::Cyan, "lexi> ")?;
    let send = controller.send_message();
    tokio::pin!(send);

    let outcome = loop {
        tokio::select! {
            outcome = &mut send => break outcome,
            changed = rx.changed() => {
                if changed.is_err() {
                    break (&mut send).await;
                }
                let view = rx.borrow_and_update().clone();
                printer.render(&view, from)?;
            }
        }
    };

    printer.render(&controller.view(), from)?;
    println!();
    if outcome == SendOutcome::Aborted {
        print_colored(Color::Yellow, "(stopped)\n")?;
    }
    Ok(outcome)
}

pub(super) async fn run_chat(args: ChatArgs, mut settings: Settings) -> Result<()> {
    apply_overrides(
        &mut settings,
        Overrides {
            model: args.model,
            tools: args.tools,
        },
    );
    let controller = build_controller(&settings)?;
    spawn_interrupt_handler(controller.abort_handle());

    print_colored(Color::Green, "Lexi")?;
    println!(" - legislative assistant ({}). Type /help for commands.", settings.provider.model);

    if let Some(chat_id) = args.resume {
        load_and_print(&controller, &chat_id).await;
    }

    loop {
        let prompt = match controller.attachment_name() {
            Some(name) => format!("you [{}]> ", name),
            None => "you> ".to_string(),
        };
        print_colored(Color::Blue, &prompt)?;

        let Some(line) = read_line().await? else {
            println!();
            break;
        };

        match parse_command(&line) {
            ReplCommand::Empty => {
                if controller.attachment_name().is_some() {
                    send_and_render(&controller).await?;
                }
            }
            ReplCommand::Message(text) => {
                controller.set_input(text);
                send_and_render(&controller).await?;
            }
            ReplCommand::Attach(path) => match controller.attach_path(&path).await {
                Ok(()) => println!("Attached {}", path.display()),
                Err(e) => print_colored(Color::Red, &format!("Cannot attach: {}\n", e))?,
            },
            ReplCommand::Detach => {
                controller.clear_attachment();
                println!("Attachment removed");
            }
            ReplCommand::Record => match controller.start_recording().await {
                Ok(()) => println!("Recording... type /stop to finish"),
                Err(e) => print_colored(Color::Red, &format!("Cannot record: {}\n", e))?,
            },
            ReplCommand::Stop => {
                let elapsed = controller.subscribe_recording().borrow().elapsed_label();
                match controller.stop_recording().await {
                    Ok(true) => println!("Recorded {}; press enter to send it or type a message", elapsed),
                    Ok(false) => println!("Not recording"),
                    Err(e) => print_colored(Color::Red, &format!("Recording failed: {}\n", e))?,
                }
            }
            ReplCommand::New => {
                controller.new_chat();
                println!("Started a new chat");
            }
            ReplCommand::Load(chat_id) => load_and_print(&controller, &chat_id).await,
            ReplCommand::Help => print_help(),
            ReplCommand::Quit => break,
            ReplCommand::Unknown(line) => {
                println!("Unknown command: {} (try /help)", line);
            }
        }
    }

    Ok(())
}

async fn load_and_print(controller: &ChatController, chat_id: &str) {
    match controller.load_chat(chat_id).await {
        Ok(()) => {
            for message in controller.messages() {
                print_message(&message);
            }
        }
        Err(e) => eprintln!("Could not load chat {}: {}", chat_id, e),
    }
}

pub(super) fn print_message(message: &Message) {
    let who = match message.role {
        Sender::User => "you",
        Sender::Assistant => "lexi",
    };
    match &message.attachment {
        Some(file) if message.content.is_empty() => println!("{}> [{}]", who, file.display_name),
        Some(file) => println!("{}> [{}] {}", who, file.display_name, message.content),
        None => println!("{}> {}", who, message.content),
    }
}
