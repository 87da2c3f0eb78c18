//! Interactive chat.
//!
//! By default we use `rustyline` for line editing; a minimal stdin-based
//! fallback exists behind `--no-default-features`.

use anyhow::Result;
#[cfg(feature = "repl-rustyline")]
use anyhow::anyhow;
use colored::Colorize;
#[cfg(not(feature = "repl-rustyline"))]
use std::io::{self, Write};
use tokio::runtime::Runtime;

use askgraph_pipeline::{ConversationHistory, Pipeline};

const PRIVACY_NOTICE: &str = "Your questions are sent to an external language model provider to \
generate queries and summaries. Do not enter personal or confidential information.";

const PROMPT: &str = "askgraph> ";

enum ChatControl {
    Continue,
    Exit,
}

struct ChatSession<'a> {
    rt: &'a Runtime,
    pipeline: &'a Pipeline,
    history: ConversationHistory,
}

impl ChatSession<'_> {
    fn handle_line(&mut self, line: &str) -> ChatControl {
        match line {
            "exit" | "quit" | ":q" => return ChatControl::Exit,
            "/clear" => {
                self.history = ConversationHistory::new();
                println!("{}", "history cleared".dimmed());
                return ChatControl::Continue;
            }
            "help" | "/help" => {
                println!("Ask a question about the knowledge graph.");
                println!("  /clear   forget the conversation so far");
                println!("  exit     leave the chat");
                return ChatControl::Continue;
            }
            _ => {}
        }

        let answer = self
            .rt
            .block_on(self.pipeline.answer_or_apology(line, &self.history));
        println!("{answer}\n");

        let turns = self.pipeline.context().settings.history_turns;
        self.history.record_exchange(line, answer, turns);
        ChatControl::Continue
    }
}

fn print_banner() {
    println!("{}", "askgraph chat".green().bold());
    println!("{} {PRIVACY_NOTICE}", "note:".yellow().bold());
    println!("Type `help` for commands. Type `exit` to quit.\n");
}

pub fn cmd_chat(rt: &Runtime, pipeline: &Pipeline) -> Result<()> {
    let mut session = ChatSession {
        rt,
        pipeline,
        history: ConversationHistory::new(),
    };
    print_banner();

    #[cfg(feature = "repl-rustyline")]
    {
        return chat_rustyline(&mut session);
    }
    #[cfg(not(feature = "repl-rustyline"))]
    {
        return chat_simple(&mut session);
    }
}

#[cfg(feature = "repl-rustyline")]
fn chat_rustyline(session: &mut ChatSession<'_>) -> Result<()> {
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    let mut rl = DefaultEditor::new().map_err(|e| anyhow!("failed to init rustyline: {e}"))?;
    loop {
        let line = match rl.readline(PROMPT) {
            Ok(l) => l,
            Err(ReadlineError::Eof) => break,
            Err(ReadlineError::Interrupted) => continue,
            Err(e) => return Err(anyhow!("readline error: {e}")),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        rl.add_history_entry(line)
            .map_err(|e| anyhow!("failed to record history: {e}"))?;

        if let ChatControl::Exit = session.handle_line(line) {
            break;
        }
    }
    Ok(())
}

#[cfg(not(feature = "repl-rustyline"))]
fn chat_simple(session: &mut ChatSession<'_>) -> Result<()> {
    let stdin = io::stdin();
    loop {
        print!("{}", PROMPT.cyan().bold());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let ChatControl::Exit = session.handle_line(line) {
            break;
        }
    }
    Ok(())
}
