//! The protocol engine: one session against one server.
//!
//! [`Client`] wires the pipeline together: line in, parse, compose,
//! dispatch into the session machine and the buffer/roster state, events
//! out. It performs no I/O; the host executes the returned [`Action`]s and
//! feeds transport callbacks and timer ticks back in.
//!
//! Processing is strictly one line to completion on a single context;
//! observers see events synchronously, in dispatch order.

use std::time::Instant;

use crate::buffer::{Buffer, BufferModel};
use crate::casemap::FoldedName;
use crate::command::Command;
use crate::composer::{Composed, Composer};
use crate::ctcp::Ctcp;
use crate::error::{EngineError, UsageError};
use crate::event::Event;
use crate::isupport::Isupport;
use crate::message::Message;
use crate::mode::parse_channel_modes;
use crate::prefix::Prefix;
use crate::response::Response;
use crate::state::{SessionConfig, SessionMachine, SessionState, Step};

/// An IRC client session: connection machine, server dialect, composer,
/// and the observable buffer set.
#[derive(Debug)]
pub struct Client {
    machine: SessionMachine,
    isupport: Isupport,
    composer: Composer,
    buffers: BufferModel,
}

impl Client {
    /// Create a configured, inactive session.
    pub fn new(config: SessionConfig) -> Client {
        Client {
            machine: SessionMachine::new(config),
            isupport: Isupport::default(),
            composer: Composer::new(),
            buffers: BufferModel::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.machine.state()
    }

    /// Our current nick.
    pub fn nick(&self) -> &str {
        self.machine.nick()
    }

    pub fn config(&self) -> &SessionConfig {
        self.machine.config()
    }

    /// The accumulated server dialect.
    pub fn isupport(&self) -> &Isupport {
        &self.isupport
    }

    /// The open conversations.
    pub fn buffers(&self) -> &BufferModel {
        &self.buffers
    }

    /// Start connecting.
    pub fn open(&mut self, now: Instant) -> Result<Step, EngineError> {
        Ok(self.machine.open(now)?)
    }

    /// The transport reported an established connection.
    pub fn transport_connected(&mut self, now: Instant) -> Step {
        self.machine.transport_connected(now)
    }

    /// The transport closed or failed. In-flight aggregates are dropped
    /// and channel rosters emptied; the machine decides on reconnection.
    pub fn transport_closed(&mut self, now: Instant, reason: Option<String>) -> Step {
        self.composer.reset();
        let mut step = self.machine.transport_closed(now, reason);
        for channel in self.buffers.channels_mut() {
            let key = channel.key().clone();
            for change in channel.clear() {
                step.events.push(Event::Roster {
                    channel: key.clone(),
                    change,
                });
            }
        }
        step
    }

    /// Process one received line to completion.
    pub fn receive_line(&mut self, line: &str, now: Instant) -> Step {
        match Message::parse(line) {
            Ok(msg) => self.receive(msg, now),
            Err(error) => {
                tracing::debug!(%error, "dropping malformed line");
                Step {
                    actions: Vec::new(),
                    events: vec![Event::Malformed {
                        line: line.trim_end_matches(['\r', '\n']).to_owned(),
                        error,
                    }],
                }
            }
        }
    }

    /// Process one already-parsed message to completion.
    pub fn receive(&mut self, msg: Message, now: Instant) -> Step {
        let mut step = self.machine.handle_message(&msg, now);

        // ISUPPORT updates come before dispatch so this very message's
        // channel detection and casemapping are already correct.
        if let Some((Response::RPL_ISUPPORT, args)) = msg.command.response() {
            let args = args.to_vec();
            if self.isupport.apply(&args) {
                self.buffers.rekey(self.isupport.casemapping());
            }
            self.machine.set_nicklen(self.isupport.nicklen());
        }

        match self.composer.feed(msg, self.isupport.prefix()) {
            Composed::Pass(msg) | Composed::Done(msg) => self.dispatch(msg, &mut step),
            Composed::Absorbed => {}
        }
        for diagnostic in self.composer.take_diagnostics() {
            step.events.push(Event::Diagnostic(diagnostic));
        }
        step
    }

    /// Fire due timers.
    pub fn tick(&mut self, now: Instant) -> Step {
        self.machine.tick(now)
    }

    /// When `tick` next has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.machine.next_deadline()
    }

    /// Send a command to the server (queued until registered).
    pub fn send(&mut self, command: Command) -> Result<Step, EngineError> {
        Ok(self.machine.send_message(Message::new(command))?)
    }

    /// Leave the server and stop reconnecting.
    pub fn quit(&mut self, reason: Option<&str>, now: Instant) -> Result<Step, EngineError> {
        Ok(self.machine.quit(reason, now)?)
    }

    /// Close a conversation (a query, or a parted channel).
    pub fn close_buffer(&mut self, key: &FoldedName) -> Result<Step, EngineError> {
        match self.buffers.remove(key) {
            Some(_) => Ok(Step {
                actions: Vec::new(),
                events: vec![Event::BufferRemoved(key.clone())],
            }),
            None => Err(UsageError::NotOpen.into()),
        }
    }

    fn is_self(&self, nick: &str) -> bool {
        self.isupport.casemapping().eq(nick, self.machine.nick())
    }

    fn dispatch(&mut self, msg: Message, step: &mut Step) {
        let mapping = self.isupport.casemapping();
        let sender = msg.sender_nick().map(str::to_owned);
        let mut buffer: Option<FoldedName> = None;

        match &msg.command {
            Command::JOIN(channel_name, account, realname) => {
                let from_self = sender.as_deref().is_some_and(|n| self.is_self(n));
                let key = FoldedName::new(mapping, channel_name);
                if from_self {
                    let (_, created) = self.buffers.add(&self.isupport, channel_name);
                    if created {
                        step.events.push(Event::BufferAdded(key.clone()));
                    }
                }
                buffer = Some(key.clone());

                if let Some(nick) = sender.as_deref() {
                    match self.buffers.find_mut(&key).and_then(Buffer::as_channel_mut) {
                        Some(channel) => {
                            if from_self {
                                channel.set_joined(true);
                            }
                            if let Some(change) = channel.add_user(mapping, nick, msg.timestamp) {
                                step.events.push(Event::Roster {
                                    channel: key.clone(),
                                    change,
                                });
                            }
                            // extended-join carries account and realname.
                            if account.is_some() || realname.is_some() {
                                if let Some(change) =
                                    channel.set_account(mapping, nick, account.as_deref())
                                {
                                    step.events.push(Event::Roster {
                                        channel: key.clone(),
                                        change,
                                    });
                                }
                            }
                        }
                        None => {
                            step.events.push(Event::Diagnostic(format!(
                                "JOIN for unknown channel {channel_name}"
                            )));
                            buffer = None;
                        }
                    }
                }
            }

            Command::PART(channel_name, _reason) => {
                buffer = self.leave(step, channel_name, sender.as_deref(), mapping);
            }

            Command::KICK(channel_name, target, _reason) => {
                buffer = self.leave(step, channel_name, Some(target.as_str()), mapping);
            }

            Command::QUIT(_) => {
                if let Some(nick) = sender.as_deref() {
                    for channel in self.buffers.channels_mut() {
                        let key = channel.key().clone();
                        if let Some(change) = channel.remove_user(mapping, nick) {
                            step.events.push(Event::Roster {
                                channel: key,
                                change,
                            });
                        }
                    }
                }
            }

            Command::NICK(new) => {
                if let Some(old) = sender.clone() {
                    if self.is_self(&old) {
                        self.machine.set_nick(new);
                        step.events.push(Event::NickChanged {
                            old: old.clone(),
                            new: new.clone(),
                        });
                    }
                    for channel in self.buffers.channels_mut() {
                        let key = channel.key().clone();
                        for change in channel.rename_user(mapping, &old, new, msg.timestamp) {
                            step.events.push(Event::Roster {
                                channel: key.clone(),
                                change,
                            });
                        }
                    }
                    let _ = self.buffers.rename_query(mapping, &old, new);
                }
            }

            Command::MODE(target, words) => {
                if self.isupport.is_channel_name(target) {
                    let key = FoldedName::new(mapping, target);
                    let changes = parse_channel_modes(&self.isupport, words);
                    match self.buffers.find_mut(&key).and_then(Buffer::as_channel_mut) {
                        Some(channel) => {
                            for change in channel.apply_modes(&self.isupport, &changes) {
                                step.events.push(Event::Roster {
                                    channel: key.clone(),
                                    change,
                                });
                            }
                            buffer = Some(key);
                        }
                        None => {
                            tracing::debug!(%target, "MODE for unknown channel");
                            step.events.push(Event::Diagnostic(format!(
                                "MODE for unknown channel {target}"
                            )));
                        }
                    }
                }
            }

            Command::TOPIC(channel_name, text) => {
                let key = FoldedName::new(mapping, channel_name);
                if let Some(channel) = self.buffers.find_mut(&key).and_then(Buffer::as_channel_mut)
                {
                    // A live TOPIC names its setter; the composed 332/331
                    // form does not (333 fills that in separately).
                    let set_by = sender.as_deref();
                    channel.set_topic(text.as_deref(), set_by, Some(msg.timestamp));
                    step.events.push(Event::TopicChanged {
                        channel: key.clone(),
                    });
                    buffer = Some(key);
                }
            }

            Command::PRIVMSG(target, text) | Command::NOTICE(target, text) => {
                buffer = self.route_message(step, target, text, sender.as_deref(), &msg);
            }

            Command::AWAY(reason) => {
                if let Some(nick) = sender.as_deref() {
                    let away = reason.is_some();
                    for channel in self.buffers.channels_mut() {
                        let key = channel.key().clone();
                        if let Some(change) = channel.set_away(mapping, nick, away) {
                            step.events.push(Event::Roster {
                                channel: key,
                                change,
                            });
                        }
                    }
                }
            }

            Command::ACCOUNT(account) => {
                if let Some(nick) = sender.as_deref() {
                    for channel in self.buffers.channels_mut() {
                        let key = channel.key().clone();
                        if let Some(change) =
                            channel.set_account(mapping, nick, Some(account.as_str()))
                        {
                            step.events.push(Event::Roster {
                                channel: key,
                                change,
                            });
                        }
                    }
                }
            }

            Command::Names {
                channel: channel_name,
                entries,
            } => {
                let key = FoldedName::new(mapping, channel_name);
                match self.buffers.find_mut(&key).and_then(Buffer::as_channel_mut) {
                    Some(channel) => {
                        for change in channel.apply_names(&self.isupport, entries, msg.timestamp) {
                            step.events.push(Event::Roster {
                                channel: key.clone(),
                                change,
                            });
                        }
                        buffer = Some(key);
                    }
                    None => {
                        step.events.push(Event::Diagnostic(format!(
                            "NAMES for unknown channel {channel_name}"
                        )));
                    }
                }
            }

            Command::WhoReply(info) => {
                for channel in self.buffers.channels_mut() {
                    let key = channel.key().clone();
                    if let Some(change) = channel.apply_who(mapping, info) {
                        step.events.push(Event::Roster {
                            channel: key,
                            change,
                        });
                    }
                }
            }

            Command::Response(Response::RPL_TOPICWHOTIME, args) => {
                // `<me> <channel> <setter> <unix time>`
                if let (Some(channel_name), Some(setter)) = (args.get(1), args.get(2)) {
                    let key = FoldedName::new(mapping, channel_name);
                    if let Some(channel) =
                        self.buffers.find_mut(&key).and_then(Buffer::as_channel_mut)
                    {
                        let at = args
                            .get(3)
                            .and_then(|s| s.parse::<i64>().ok())
                            .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0));
                        if let Some(text) = channel.topic().map(|t| t.text.clone()) {
                            let setter_nick =
                                Prefix::new_from_str(setter).nick().map(str::to_owned);
                            channel.set_topic(
                                Some(&text),
                                setter_nick.as_deref().or(Some(setter.as_str())),
                                at,
                            );
                            step.events.push(Event::TopicChanged {
                                channel: key.clone(),
                            });
                        }
                        buffer = Some(key);
                    }
                }
            }

            _ => {}
        }

        step.events.push(Event::MessageReceived {
            buffer,
            message: Box::new(msg),
        });
    }

    // Shared PART/KICK handling: self leaving clears the roster, anyone
    // else is just removed.
    fn leave(
        &mut self,
        step: &mut Step,
        channel_name: &str,
        leaver: Option<&str>,
        mapping: crate::casemap::Casemapping,
    ) -> Option<FoldedName> {
        let key = FoldedName::new(mapping, channel_name);
        let from_self = leaver.is_some_and(|n| self.is_self(n));
        let channel = match self.buffers.find_mut(&key).and_then(Buffer::as_channel_mut) {
            Some(channel) => channel,
            None => {
                step.events.push(Event::Diagnostic(format!(
                    "PART/KICK for unknown channel {channel_name}"
                )));
                return None;
            }
        };
        if from_self {
            for change in channel.clear() {
                step.events.push(Event::Roster {
                    channel: key.clone(),
                    change,
                });
            }
        } else if let Some(nick) = leaver {
            if let Some(change) = channel.remove_user(mapping, nick) {
                step.events.push(Event::Roster {
                    channel: key.clone(),
                    change,
                });
            } else {
                tracing::debug!(%nick, %channel_name, "removal of unknown user");
            }
        }
        Some(key)
    }

    // PRIVMSG/NOTICE routing: channel messages bump the sender's activity,
    // messages to us open (or reuse) a query.
    fn route_message(
        &mut self,
        step: &mut Step,
        target: &str,
        text: &str,
        sender: Option<&str>,
        msg: &Message,
    ) -> Option<FoldedName> {
        let mapping = self.isupport.casemapping();
        let bare = self.isupport.strip_statusmsg(target);

        if self.isupport.is_channel_name(bare) {
            let key = FoldedName::new(mapping, bare);
            let channel = self.buffers.find_mut(&key).and_then(Buffer::as_channel_mut)?;
            // CTCP queries other than ACTION are not conversation.
            let counts = match Ctcp::parse(text) {
                Some(ctcp) => ctcp.is_action(),
                None => true,
            };
            if counts {
                if let Some(nick) = sender {
                    if let Some(change) = channel.bump_activity(mapping, nick, msg.timestamp) {
                        step.events.push(Event::Roster {
                            channel: key.clone(),
                            change,
                        });
                    }
                }
            }
            return Some(key);
        }

        if self.is_self(bare) {
            // Addressed to us: the conversation is named by the sender.
            let peer = sender?;
            let (key, created) = self.buffers.add(&self.isupport, peer);
            if created {
                step.events.push(Event::BufferAdded(key.clone()));
            }
            return Some(key);
        }

        // Echoes of our own messages land in the target's query.
        Some(FoldedName::new(mapping, bare))
    }
}
