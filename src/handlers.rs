//! Command handlers and table wiring
//!
//! Builds the four command tables (control, IRC protocol, public chat,
//! privileged chat) and implements every handler. Handlers run
//! synchronously inside the event loop and may write to sessions, tear
//! sessions down, or create new ones through the session factory.

use futures_util::future::BoxFuture;
use tracing::{debug, warn};

use crate::bot::Bot;
use crate::command::{matches_prefix, CommandTable, Dispatch};
use crate::error::AppError;
use crate::proto::{self, IrcMessage};
use crate::session::Behavior;
use crate::types::SessionId;

type HandlerResult<'a> = BoxFuture<'a, Result<(), AppError>>;

/// Handler for one control-channel command
pub type ControlHandler =
    for<'a> fn(&'a mut Bot, &'a Tables, SessionId, &'a str) -> HandlerResult<'a>;

/// Handler for one parsed IRC message (protocol or chat command)
pub type IrcHandler =
    for<'a> fn(&'a mut Bot, &'a Tables, SessionId, &'a IrcMessage) -> HandlerResult<'a>;

/// All command tables, built once at startup and passed by reference
/// into the event loop
pub struct Tables {
    /// Control-connection commands
    pub control: CommandTable<ControlHandler>,
    /// IRC protocol commands (keyed on the parsed command word)
    pub irc: CommandTable<IrcHandler>,
    /// In-chat commands anyone may issue in a channel
    pub chat_public: CommandTable<IrcHandler>,
    /// In-chat commands gated on the controller identity and secret key
    pub chat_privileged: CommandTable<IrcHandler>,
}

impl Tables {
    /// The standard wiring
    pub fn standard() -> Self {
        let mut control = CommandTable::new();
        control.register("list", ctrl_list as ControlHandler);
        control.register("help", ctrl_help as ControlHandler);
        control.register("quit", ctrl_quit as ControlHandler);
        control.register("connect", ctrl_connect as ControlHandler);

        let mut irc = CommandTable::new();
        irc.register("join", irc_join as IrcHandler);
        irc.register("part", irc_part as IrcHandler);
        irc.register("privmsg", irc_privmsg as IrcHandler);

        let mut chat_public = CommandTable::new();
        chat_public.register("@help", chat_help as IrcHandler);

        let mut chat_privileged = CommandTable::new();
        chat_privileged.register("@quit", chat_quit as IrcHandler);

        Self {
            control,
            irc,
            chat_public,
            chat_privileged,
        }
    }
}

/// Dispatch one line read from a control connection
pub(crate) async fn control_line(
    bot: &mut Bot,
    tables: &Tables,
    id: SessionId,
    line: &str,
) -> Result<(), AppError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }

    match tables.control.lookup(line) {
        Some(handler) => handler(bot, tables, id, line).await,
        None => {
            warn!("unknown control command '{}' from {}", line, id);
            Ok(())
        }
    }
}

/// Dispatch one line read from an IRC session
pub(crate) async fn irc_line(
    bot: &mut Bot,
    tables: &Tables,
    id: SessionId,
    line: &str,
) -> Result<(), AppError> {
    // Keep-alive probes bypass the tables entirely
    if proto::is_keepalive(line) {
        return bot.send_to(id, &proto::pong()).await;
    }

    let Some(msg) = IrcMessage::parse(line) else {
        debug!("unparsed protocol line: '{}'", line);
        return Ok(());
    };

    match dispatch(&tables.irc, bot, tables, id, &msg.command, &msg).await? {
        Dispatch::Handled => Ok(()),
        Dispatch::Unmatched => {
            debug!("no handler for protocol command '{}'", msg.command);
            Ok(())
        }
    }
}

/// Run the first matching handler of a table, reporting the outcome
async fn dispatch(
    table: &CommandTable<IrcHandler>,
    bot: &mut Bot,
    tables: &Tables,
    id: SessionId,
    input: &str,
    msg: &IrcMessage,
) -> Result<Dispatch, AppError> {
    match table.lookup(input) {
        Some(handler) => {
            handler(bot, tables, id, msg).await?;
            Ok(Dispatch::Handled)
        }
        None => Ok(Dispatch::Unmatched),
    }
}

// ---- Control commands -------------------------------------------------

fn ctrl_help<'a>(
    bot: &'a mut Bot,
    _tables: &'a Tables,
    id: SessionId,
    _line: &'a str,
) -> HandlerResult<'a> {
    Box::pin(async move {
        bot.send_to(id, "< Command list:").await?;
        bot.send_to(id, "< connect host nick channel master").await?;
        bot.send_to(id, "< list").await?;
        bot.send_to(id, "< quit").await?;
        Ok(())
    })
}

/// One line per live outbound IRC session
fn ctrl_list<'a>(
    bot: &'a mut Bot,
    _tables: &'a Tables,
    id: SessionId,
    _line: &'a str,
) -> HandlerResult<'a> {
    Box::pin(async move {
        let lines: Vec<String> = bot
            .sessions()
            .filter(|(_, s)| s.behavior == Behavior::ProtocolMessage)
            .map(|(_, s)| {
                format!(
                    "< [{}@{}] : Master <{}>",
                    s.display_name, s.remote_host, s.controller
                )
            })
            .collect();

        for line in lines {
            bot.send_to(id, &line).await?;
        }
        Ok(())
    })
}

/// Close the issuing control connection, not the process
fn ctrl_quit<'a>(
    bot: &'a mut Bot,
    _tables: &'a Tables,
    id: SessionId,
    _line: &'a str,
) -> HandlerResult<'a> {
    Box::pin(async move {
        bot.teardown(id);
        Ok(())
    })
}

fn ctrl_connect<'a>(
    bot: &'a mut Bot,
    _tables: &'a Tables,
    id: SessionId,
    line: &'a str,
) -> HandlerResult<'a> {
    Box::pin(async move {
        let rest = line.get("connect".len()..).unwrap_or("");
        let args: Vec<&str> = rest.split_whitespace().collect();

        let (host, nick, channel, master) = match args.as_slice() {
            [host, nick, channel, master] => (*host, *nick, *channel, *master),
            _ => {
                return bot
                    .send_to(id, "< usage: connect host nick channel master")
                    .await;
            }
        };

        match bot.connect_session(host, nick, channel, master).await {
            Ok(_) => {
                bot.send_to(id, &format!("< Bot instance '{nick}@{host}' running"))
                    .await
            }
            Err(e) => {
                warn!("connect to '{}' failed: {}", host, e);
                bot.send_to(id, "< Cannot initiate instance").await
            }
        }
    })
}

// ---- IRC protocol commands --------------------------------------------

/// Greet whoever joins the channel; remind the controller of the key
fn irc_join<'a>(
    bot: &'a mut Bot,
    _tables: &'a Tables,
    id: SessionId,
    msg: &'a IrcMessage,
) -> HandlerResult<'a> {
    Box::pin(async move {
        let Some((nick, master, key)) = identity(bot, id) else {
            return Ok(());
        };
        if msg.source.eq_ignore_ascii_case(&nick) {
            return Ok(());
        }

        let channel = channel_of(msg);
        bot.send_to(id, &proto::privmsg(channel, &format!("Welcome {}", msg.source)))
            .await?;

        if msg.source == master {
            let text = format!("Glad to see you again Master. My key is {key}");
            bot.send_to(id, &proto::privmsg(&master, &text)).await?;
        }
        Ok(())
    })
}

fn irc_part<'a>(
    bot: &'a mut Bot,
    _tables: &'a Tables,
    id: SessionId,
    msg: &'a IrcMessage,
) -> HandlerResult<'a> {
    Box::pin(async move {
        // PART names the channel in the target field, the reason trails
        let channel = if msg.target().is_empty() {
            msg.trailing()
        } else {
            msg.target()
        };
        bot.send_to(id, &proto::privmsg(channel, &format!("Bye {}", msg.source)))
            .await
    })
}

/// Route a PRIVMSG to the chat tables
///
/// Channel text goes through the public table with a casual-chat
/// fallback. A direct message is consulted against the privileged table
/// only when the sender is this session's controller and the text opens
/// with the secret key; anything else is silently ignored.
fn irc_privmsg<'a>(
    bot: &'a mut Bot,
    tables: &'a Tables,
    id: SessionId,
    msg: &'a IrcMessage,
) -> HandlerResult<'a> {
    Box::pin(async move {
        let Some((nick, master, key)) = identity(bot, id) else {
            return Ok(());
        };

        // Ignore the bot's own messages echoed back
        if msg.source.eq_ignore_ascii_case(&nick) {
            return Ok(());
        }

        let text = msg.trailing();

        if msg.target().starts_with('#') {
            let outcome = dispatch(&tables.chat_public, bot, tables, id, text, msg).await?;
            if outcome == Dispatch::Unmatched {
                chat_fallback(bot, id, &nick, msg).await?;
            }
        } else if msg.source == master && matches_prefix(&key, text) {
            let rest = text[key.len()..].trim_start();
            let ack = format!("Ready master. Running cmd '{rest}'");
            bot.send_to(id, &proto::privmsg(&msg.source, &ack)).await?;

            if dispatch(&tables.chat_privileged, bot, tables, id, rest, msg).await?
                == Dispatch::Unmatched
            {
                debug!("unknown privileged command '{}'", rest);
            }
        }
        Ok(())
    })
}

/// Casual-chat fallback for unmatched channel text
async fn chat_fallback(
    bot: &mut Bot,
    id: SessionId,
    nick: &str,
    msg: &IrcMessage,
) -> Result<(), AppError> {
    let mentioned = msg
        .trailing()
        .to_ascii_lowercase()
        .contains(&nick.to_ascii_lowercase());
    if mentioned {
        let text = format!("Hey {} sup", msg.source);
        bot.send_to(id, &proto::privmsg(msg.target(), &text)).await?;
    }
    Ok(())
}

// ---- In-chat commands -------------------------------------------------

fn chat_help<'a>(
    bot: &'a mut Bot,
    _tables: &'a Tables,
    id: SessionId,
    msg: &'a IrcMessage,
) -> HandlerResult<'a> {
    Box::pin(async move {
        let text = format!(
            "Cannot help you {}. I'm Under Development. Sorry about that",
            msg.source
        );
        bot.send_to(id, &proto::privmsg(msg.target(), &text)).await
    })
}

/// Privileged: tear down this IRC session
fn chat_quit<'a>(
    bot: &'a mut Bot,
    _tables: &'a Tables,
    id: SessionId,
    _msg: &'a IrcMessage,
) -> HandlerResult<'a> {
    Box::pin(async move {
        bot.teardown(id);
        Ok(())
    })
}

// ---- Helpers ----------------------------------------------------------

/// Snapshot (nick, controller, key) of the issuing session
fn identity(bot: &Bot, id: SessionId) -> Option<(String, String, String)> {
    let session = bot.session(id)?;
    Some((
        session.display_name.clone(),
        session.controller.clone(),
        bot.config().key.clone(),
    ))
}

/// Channel a JOIN refers to: trailing parameter when present,
/// otherwise the target field
fn channel_of(msg: &IrcMessage) -> &str {
    if msg.trailing().is_empty() {
        msg.target()
    } else {
        msg.trailing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::net::TcpListener;

    use crate::bot::Bot;
    use crate::config::BotConfig;
    use crate::session::Behavior;
    use crate::sink::SinkLog;

    fn bot() -> Bot {
        Bot::new(BotConfig::default())
    }

    fn lines(log: &SinkLog) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    fn irc_session(bot: &mut Bot) -> (SessionId, SinkLog) {
        bot.insert_test_session(Behavior::ProtocolMessage, "mybot", "irc.example.org", "admin")
    }

    #[tokio::test]
    async fn test_help_replies_command_summary() {
        let mut bot = bot();
        let tables = Tables::standard();
        let (id, log) = bot.insert_test_session(Behavior::ControlCommand, "console-00", "N/A", "N/A");

        control_line(&mut bot, &tables, id, "help").await.unwrap();

        let out = lines(&log);
        assert_eq!(out[0], "< Command list:");
        assert!(out.iter().any(|l| l.contains("connect host nick channel master")));
    }

    #[tokio::test]
    async fn test_list_empty_registry_prints_no_sessions() {
        let mut bot = bot();
        let tables = Tables::standard();
        let (id, log) = bot.insert_test_session(Behavior::ControlCommand, "console-00", "N/A", "N/A");

        control_line(&mut bot, &tables, id, "list").await.unwrap();

        assert!(lines(&log).is_empty());
    }

    #[tokio::test]
    async fn test_list_shows_only_irc_sessions() {
        let mut bot = bot();
        let tables = Tables::standard();
        let (control_id, log) =
            bot.insert_test_session(Behavior::ControlCommand, "console-00", "N/A", "N/A");
        irc_session(&mut bot);

        control_line(&mut bot, &tables, control_id, "list").await.unwrap();

        let out = lines(&log);
        assert_eq!(out, vec!["< [mybot@irc.example.org] : Master <admin>"]);
    }

    #[tokio::test]
    async fn test_quit_closes_only_issuing_session() {
        let mut bot = bot();
        let tables = Tables::standard();
        let (control_id, _log) =
            bot.insert_test_session(Behavior::ControlCommand, "console-00", "N/A", "N/A");
        let (irc_id, _irc_log) = irc_session(&mut bot);

        control_line(&mut bot, &tables, control_id, "quit").await.unwrap();

        assert!(bot.session(control_id).is_none());
        assert!(bot.session(irc_id).is_some());
    }

    #[tokio::test]
    async fn test_connect_creates_session_and_replies() {
        // Stand-in IRC server on the loopback
        let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = server.local_addr().unwrap().port();

        let mut bot = Bot::new(BotConfig {
            irc_port: port,
            ..BotConfig::default()
        });
        let tables = Tables::standard();
        let (control_id, log) =
            bot.insert_test_session(Behavior::ControlCommand, "console-00", "N/A", "N/A");
        assert_eq!(bot.session_count(), 1);

        control_line(&mut bot, &tables, control_id, "connect 127.0.0.1 mybot test admin")
            .await
            .unwrap();

        assert_eq!(bot.session_count(), 2);
        let out = lines(&log);
        assert_eq!(out.len(), 1);
        assert!(out[0].contains("mybot"));
        assert!(out[0].contains("running"));

        let created = bot
            .sessions()
            .find(|(_, s)| s.behavior == Behavior::ProtocolMessage)
            .unwrap()
            .1;
        assert_eq!(created.display_name, "mybot");
        assert_eq!(created.remote_host, "127.0.0.1");
        assert_eq!(created.controller, "admin");
    }

    #[tokio::test]
    async fn test_connect_wrong_arity_replies_usage() {
        let mut bot = bot();
        let tables = Tables::standard();
        let (id, log) = bot.insert_test_session(Behavior::ControlCommand, "console-00", "N/A", "N/A");

        control_line(&mut bot, &tables, id, "connect onlyhost").await.unwrap();

        assert_eq!(lines(&log), vec!["< usage: connect host nick channel master"]);
        assert_eq!(bot.session_count(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_replies_cannot_initiate() {
        // Port 1 on the loopback refuses connections
        let mut bot = Bot::new(BotConfig {
            irc_port: 1,
            ..BotConfig::default()
        });
        let tables = Tables::standard();
        let (id, log) = bot.insert_test_session(Behavior::ControlCommand, "console-00", "N/A", "N/A");

        control_line(&mut bot, &tables, id, "connect 127.0.0.1 mybot test admin")
            .await
            .unwrap();

        assert_eq!(lines(&log), vec!["< Cannot initiate instance"]);
        assert_eq!(bot.session_count(), 1);
    }

    #[tokio::test]
    async fn test_privileged_quit_from_controller_tears_down() {
        let mut bot = bot();
        let tables = Tables::standard();
        let (id, log) = irc_session(&mut bot);

        irc_line(&mut bot, &tables, id, ":admin!user@host PRIVMSG mybot :KillerBot @quit")
            .await
            .unwrap();

        assert!(bot.session(id).is_none());
        assert_eq!(lines(&log), vec!["PRIVMSG admin :Ready master. Running cmd '@quit'"]);
    }

    #[tokio::test]
    async fn test_privileged_quit_from_stranger_is_ignored() {
        let mut bot = bot();
        let tables = Tables::standard();
        let (id, log) = irc_session(&mut bot);

        irc_line(&mut bot, &tables, id, ":mallory!user@host PRIVMSG mybot :KillerBot @quit")
            .await
            .unwrap();

        assert!(bot.session(id).is_some());
        assert!(lines(&log).is_empty());
    }

    #[tokio::test]
    async fn test_direct_message_without_key_is_ignored() {
        let mut bot = bot();
        let tables = Tables::standard();
        let (id, log) = irc_session(&mut bot);

        irc_line(&mut bot, &tables, id, ":admin!user@host PRIVMSG mybot :hello there")
            .await
            .unwrap();

        assert!(bot.session(id).is_some());
        assert!(lines(&log).is_empty());
    }

    #[tokio::test]
    async fn test_channel_help_command() {
        let mut bot = bot();
        let tables = Tables::standard();
        let (id, log) = irc_session(&mut bot);

        irc_line(&mut bot, &tables, id, ":alice!user@host PRIVMSG #test :@help")
            .await
            .unwrap();

        let out = lines(&log);
        assert_eq!(out.len(), 1);
        assert!(out[0].starts_with("PRIVMSG #test :Cannot help you alice"));
    }

    #[tokio::test]
    async fn test_channel_mention_gets_casual_reply() {
        let mut bot = bot();
        let tables = Tables::standard();
        let (id, log) = irc_session(&mut bot);

        irc_line(&mut bot, &tables, id, ":alice!user@host PRIVMSG #test :hi MyBot!")
            .await
            .unwrap();

        assert_eq!(lines(&log), vec!["PRIVMSG #test :Hey alice sup"]);
    }

    #[tokio::test]
    async fn test_channel_text_without_mention_is_ignored() {
        let mut bot = bot();
        let tables = Tables::standard();
        let (id, log) = irc_session(&mut bot);

        irc_line(&mut bot, &tables, id, ":alice!user@host PRIVMSG #test :what a day")
            .await
            .unwrap();

        assert!(lines(&log).is_empty());
    }

    #[tokio::test]
    async fn test_join_greets_and_reminds_controller() {
        let mut bot = bot();
        let tables = Tables::standard();
        let (id, log) = irc_session(&mut bot);

        irc_line(&mut bot, &tables, id, ":admin!user@host JOIN :#test")
            .await
            .unwrap();

        let out = lines(&log);
        assert_eq!(out[0], "PRIVMSG #test :Welcome admin");
        assert_eq!(out[1], "PRIVMSG admin :Glad to see you again Master. My key is KillerBot");
    }

    #[tokio::test]
    async fn test_join_by_stranger_gets_greeting_only() {
        let mut bot = bot();
        let tables = Tables::standard();
        let (id, log) = irc_session(&mut bot);

        irc_line(&mut bot, &tables, id, ":bob!user@host JOIN :#test")
            .await
            .unwrap();

        assert_eq!(lines(&log), vec!["PRIVMSG #test :Welcome bob"]);
    }

    #[tokio::test]
    async fn test_own_echo_is_ignored() {
        let mut bot = bot();
        let tables = Tables::standard();
        let (id, log) = irc_session(&mut bot);

        irc_line(&mut bot, &tables, id, ":mybot!user@host JOIN :#test")
            .await
            .unwrap();
        irc_line(&mut bot, &tables, id, ":mybot!user@host PRIVMSG #test :mybot says hi")
            .await
            .unwrap();

        assert!(lines(&log).is_empty());
    }

    #[tokio::test]
    async fn test_part_says_goodbye() {
        let mut bot = bot();
        let tables = Tables::standard();
        let (id, log) = irc_session(&mut bot);

        irc_line(&mut bot, &tables, id, ":bob!user@host PART #test :bye")
            .await
            .unwrap();

        assert_eq!(lines(&log), vec!["PRIVMSG #test :Bye bob"]);
    }

    #[tokio::test]
    async fn test_unparsed_line_is_skipped() {
        let mut bot = bot();
        let tables = Tables::standard();
        let (id, log) = irc_session(&mut bot);

        irc_line(&mut bot, &tables, id, "NOTICE AUTH :*** Looking up your hostname")
            .await
            .unwrap();

        assert!(lines(&log).is_empty());
        assert!(bot.session(id).is_some());
    }
}
