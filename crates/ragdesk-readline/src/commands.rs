//! REPL command parsing.

use ragdesk_core::conversation::Conversation;

/// Slash commands offered for completion, with their argument placeholder.
pub const COMMANDS: &[(&str, &str)] = &[
    ("/new", ""),
    ("/list", ""),
    ("/open", " <number|id>"),
    ("/delete", " <number|id>"),
    ("/search", " <prefix>"),
    ("/docs", ""),
    ("/rmdoc", " <filename>"),
    ("/upload", " <path>"),
    ("/tasks", ""),
    ("/ingest", ""),
    ("/help", ""),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Send(&'a str),
    New,
    List,
    Open(&'a str),
    Delete(&'a str),
    Search(&'a str),
    Docs,
    RemoveDocument(&'a str),
    Upload(&'a str),
    Tasks,
    Ingest,
    Help,
    Quit,
    /// A known command used without its required argument.
    Usage(&'static str),
    Unknown(&'a str),
}

pub fn parse<'a>(line: &'a str) -> Command<'a> {
    let line = line.trim();
    if line == "quit" || line == "exit" {
        return Command::Quit;
    }
    if !line.starts_with('/') {
        return Command::Send(line);
    }

    let (name, arg) = match line.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (line, ""),
    };
    let required = |usage: &'static str, build: fn(&'a str) -> Command<'a>| {
        if arg.is_empty() {
            Command::Usage(usage)
        } else {
            build(arg)
        }
    };

    match name {
        "/new" => Command::New,
        "/list" => Command::List,
        "/open" => required("/open <number|id>", Command::Open),
        "/delete" => required("/delete <number|id>", Command::Delete),
        "/search" => Command::Search(arg),
        "/docs" => Command::Docs,
        "/rmdoc" => required("/rmdoc <filename>", Command::RemoveDocument),
        "/upload" => required("/upload <path>", Command::Upload),
        "/tasks" => Command::Tasks,
        "/ingest" => Command::Ingest,
        "/help" => Command::Help,
        other => Command::Unknown(other),
    }
}

/// Resolves a 1-based position from `/list` or a literal conversation id.
pub fn resolve_conversation(conversations: &[Conversation], reference: &str) -> Option<String> {
    if let Some(found) = conversations.iter().find(|c| c.id == reference) {
        return Some(found.id.clone());
    }
    reference
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| conversations.get(index))
        .map(|c| c.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse("  what is a relay? "), Command::Send("what is a relay?"));
        assert_eq!(parse("/open 2"), Command::Open("2"));
        assert_eq!(parse("/upload  ./docs/manual.pdf "), Command::Upload("./docs/manual.pdf"));
        assert_eq!(parse("/search"), Command::Search(""));
        assert_eq!(parse("/rmdoc"), Command::Usage("/rmdoc <filename>"));
        assert_eq!(parse("/frobnicate x"), Command::Unknown("/frobnicate"));
        assert_eq!(parse("exit"), Command::Quit);
    }

    #[test]
    fn test_resolve_conversation() {
        let first = Conversation::create("a", Vec::new(), Utc::now(), &[]);
        let second = Conversation::create("b", Vec::new(), Utc::now(), std::slice::from_ref(&first));
        let list = vec![second.clone(), first.clone()];

        assert_eq!(resolve_conversation(&list, "1"), Some(second.id.clone()));
        assert_eq!(resolve_conversation(&list, &first.id), Some(first.id.clone()));
        assert_eq!(resolve_conversation(&list, "0"), None);
        assert_eq!(resolve_conversation(&list, "3"), None);
    }
}
