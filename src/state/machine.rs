//! The connection state machine itself.

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use crate::caps::{self, Capability};
use crate::command::{CapSubCommand, Command};
use crate::error::{RegistrationError, UsageError};
use crate::event::Event;
use crate::message::Message;
use crate::response::Response;
use crate::sasl;

use super::{Action, SaslConfig, SessionConfig, SessionState, Step};

// Capabilities the engine always asks for when the server offers them.
const WANTED_CAPS: &[Capability] = &[
    Capability::MultiPrefix,
    Capability::AwayNotify,
    Capability::AccountNotify,
    Capability::ExtendedJoin,
    Capability::ServerTime,
];

const NICK_RETRIES: u32 = 3;

/// The sans-IO session machine. See the [module docs](super) for the
/// contract between machine and host.
#[derive(Debug)]
pub struct SessionMachine {
    config: SessionConfig,
    state: SessionState,
    nick: String,
    nick_attempts: u32,
    nicklen: usize,
    cap_ls: Vec<(String, Option<String>)>,
    caps_acked: HashSet<String>,
    sasl_inflight: bool,
    cap_end_sent: bool,
    reconnect_attempt: u32,
    reconnect_at: Option<Instant>,
    last_traffic: Option<Instant>,
    ping_sent_at: Option<Instant>,
    quit_deadline: Option<Instant>,
    auto_reconnect: bool,
    outbound: VecDeque<Message>,
    rng: u64,
}

impl SessionMachine {
    pub fn new(config: SessionConfig) -> SessionMachine {
        let mut seed = [0u8; 8];
        // The jitter source does not need to be strong; fall back to the
        // clock if the OS entropy source is unavailable.
        let rng = match getrandom::getrandom(&mut seed) {
            Ok(()) => u64::from_le_bytes(seed),
            Err(_) => chrono::Utc::now().timestamp_nanos_opt().unwrap_or(1) as u64,
        }
        .max(1);

        SessionMachine {
            nick: config.nick.clone(),
            config,
            state: SessionState::Inactive,
            nick_attempts: 0,
            nicklen: 9,
            cap_ls: Vec::new(),
            caps_acked: HashSet::new(),
            sasl_inflight: false,
            cap_end_sent: false,
            reconnect_attempt: 0,
            reconnect_at: None,
            last_traffic: None,
            ping_sent_at: None,
            quit_deadline: None,
            auto_reconnect: true,
            outbound: VecDeque::new(),
            rng,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The nick currently in effect (or being requested).
    pub fn nick(&self) -> &str {
        &self.nick
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Capabilities the server has acknowledged.
    pub fn caps(&self) -> &HashSet<String> {
        &self.caps_acked
    }

    /// Keep nick truncation in step with ISUPPORT NICKLEN.
    pub fn set_nicklen(&mut self, nicklen: usize) {
        self.nicklen = nicklen.max(1);
    }

    /// The server confirmed a nick change for us.
    pub fn set_nick(&mut self, nick: &str) {
        self.nick = nick.to_owned();
    }

    /// Start the session. Valid from `Inactive` (and from `Backoff`, where
    /// it reconnects immediately).
    pub fn open(&mut self, _now: Instant) -> Result<Step, UsageError> {
        match self.state {
            SessionState::Inactive | SessionState::Backoff => {}
            _ => return Err(UsageError::AlreadyOpen),
        }
        self.auto_reconnect = true;
        self.reconnect_at = None;
        self.reconnect_attempt = 0;
        Ok(self.begin_connect())
    }

    fn begin_connect(&mut self) -> Step {
        self.state = SessionState::Connecting;
        Step {
            actions: vec![Action::Connect {
                host: self.config.host.clone(),
                port: self.config.port,
                secure: self.config.secure,
            }],
            events: vec![Event::StateChanged(SessionState::Connecting)],
        }
    }

    /// The transport reported an established connection.
    pub fn transport_connected(&mut self, now: Instant) -> Step {
        self.state = SessionState::Negotiating;
        self.last_traffic = Some(now);
        self.ping_sent_at = None;
        self.nick = self.config.nick.clone();
        self.nick_attempts = 0;
        self.cap_ls.clear();
        self.caps_acked.clear();
        self.sasl_inflight = false;
        self.cap_end_sent = false;

        let mut step = Step {
            actions: Vec::new(),
            events: vec![Event::StateChanged(SessionState::Negotiating)],
        };
        step.actions.push(send(Command::CAP(
            None,
            CapSubCommand::LS,
            None,
            Some("302".to_owned()),
        )));
        if let Some(password) = &self.config.password {
            step.actions.push(send(Command::PASS(password.clone())));
        }
        step.actions.push(send(Command::NICK(self.nick.clone())));
        step.actions.push(send(Command::USER(
            self.config.user.clone(),
            "0".to_owned(),
            self.config.real_name.clone(),
        )));
        step
    }

    /// The transport closed or failed.
    pub fn transport_closed(&mut self, now: Instant, reason: Option<String>) -> Step {
        self.last_traffic = None;
        self.ping_sent_at = None;
        self.quit_deadline = None;
        self.outbound.clear();

        let mut step = Step::default();
        step.events.push(Event::Disconnected {
            reason: reason.clone(),
        });

        let exhausted = self
            .config
            .reconnect_limit
            .is_some_and(|limit| self.reconnect_attempt >= limit);
        if self.state == SessionState::Closing || !self.auto_reconnect || exhausted {
            self.state = SessionState::Inactive;
            step.events.push(Event::StateChanged(SessionState::Inactive));
            return step;
        }

        let delay = self.backoff_delay();
        self.reconnect_attempt += 1;
        self.reconnect_at = Some(now + delay);
        self.state = SessionState::Backoff;
        tracing::debug!(attempt = self.reconnect_attempt, ?delay, "reconnect scheduled");
        step.events.push(Event::ReconnectScheduled {
            delay,
            attempt: self.reconnect_attempt,
        });
        step.events.push(Event::StateChanged(SessionState::Backoff));
        step
    }

    // Exponential backoff with ±20% jitter.
    fn backoff_delay(&mut self) -> Duration {
        let base = self
            .config
            .reconnect_delay
            .saturating_mul(1u32 << self.reconnect_attempt.min(20))
            .min(self.config.reconnect_max);
        let factor = 0.8 + 0.4 * (self.next_rand() as f64 / u64::MAX as f64);
        base.mul_f64(factor)
    }

    fn next_rand(&mut self) -> u64 {
        // xorshift64*
        let mut x = self.rng;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.rng = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Feed one received message through the machine. State tracking only;
    /// channel and buffer bookkeeping live in the dispatcher.
    pub fn handle_message(&mut self, msg: &Message, now: Instant) -> Step {
        self.last_traffic = Some(now);
        // Any traffic proves the peer is alive.
        self.ping_sent_at = None;

        let mut step = Step::default();
        match &msg.command {
            Command::PING(token, _) => {
                step.actions.push(send(Command::PONG(token.clone(), None)));
            }
            Command::CAP(_, sub, param, list) => {
                self.handle_cap(*sub, param.as_deref(), list.as_deref(), &mut step);
            }
            Command::AUTHENTICATE(challenge) => {
                self.handle_sasl_challenge(challenge, &mut step);
            }
            Command::ERROR(text) => {
                if self.state == SessionState::Negotiating {
                    self.fail_registration(
                        RegistrationError::ServerError(text.clone()),
                        &mut step,
                    );
                }
            }
            Command::Response(resp, args) => {
                self.handle_response(*resp, args, &mut step);
            }
            _ => {}
        }
        step
    }

    fn handle_cap(
        &mut self,
        sub: CapSubCommand,
        param: Option<&str>,
        list: Option<&str>,
        step: &mut Step,
    ) {
        match sub {
            CapSubCommand::LS if self.state == SessionState::Negotiating => {
                self.cap_ls.extend(caps::parse_cap_list(list.unwrap_or("")));
                if param == Some("*") {
                    // More LS lines coming.
                    return;
                }
                let mut request: Vec<&str> = WANTED_CAPS
                    .iter()
                    .map(Capability::as_ref)
                    .filter(|cap| self.cap_ls.iter().any(|(name, _)| name == cap))
                    .collect();
                let wants_sasl = self.config.sasl.mechanism().is_some()
                    && self.cap_ls.iter().any(|(name, _)| name == "sasl");
                if wants_sasl {
                    request.push("sasl");
                }
                if request.is_empty() {
                    self.finish_negotiation(step);
                } else {
                    step.actions.push(send(Command::CAP(
                        None,
                        CapSubCommand::REQ,
                        None,
                        Some(request.join(" ")),
                    )));
                }
            }
            CapSubCommand::ACK => {
                caps::apply_changes(&mut self.caps_acked, list.unwrap_or(""));
                if self.state != SessionState::Negotiating {
                    return;
                }
                if self.caps_acked.contains("sasl") {
                    if let Some(mechanism) = self.config.sasl.mechanism() {
                        self.sasl_inflight = true;
                        step.actions
                            .push(send(Command::AUTHENTICATE(mechanism.as_str().to_owned())));
                        return;
                    }
                }
                self.finish_negotiation(step);
            }
            CapSubCommand::NAK => {
                let rejected = list.unwrap_or("");
                step.events
                    .push(Event::Diagnostic(format!("capabilities rejected: {rejected}")));
                if self.state != SessionState::Negotiating {
                    return;
                }
                if self.config.sasl_required && rejected.split_whitespace().any(|c| c == "sasl") {
                    self.fail_registration(
                        RegistrationError::SaslFailed("sasl capability rejected".to_owned()),
                        step,
                    );
                    return;
                }
                self.finish_negotiation(step);
            }
            CapSubCommand::NEW => {
                let offered = caps::parse_cap_list(list.unwrap_or(""));
                let request: Vec<&str> = WANTED_CAPS
                    .iter()
                    .map(Capability::as_ref)
                    .filter(|cap| offered.iter().any(|(name, _)| name == cap))
                    .collect();
                if !request.is_empty() {
                    step.actions.push(send(Command::CAP(
                        None,
                        CapSubCommand::REQ,
                        None,
                        Some(request.join(" ")),
                    )));
                }
            }
            CapSubCommand::DEL => {
                for (name, _) in caps::parse_cap_list(list.unwrap_or("")) {
                    self.caps_acked.remove(&name);
                }
            }
            _ => {}
        }
    }

    fn handle_sasl_challenge(&mut self, challenge: &str, step: &mut Step) {
        if !self.sasl_inflight || challenge != "+" {
            return;
        }
        let payload = match &self.config.sasl {
            SaslConfig::Plain { account, password } => sasl::encode_plain(account, password),
            SaslConfig::External { authzid } => sasl::encode_external(authzid.as_deref()),
            SaslConfig::None => return,
        };
        for chunk in sasl::chunk_response(&payload) {
            step.actions
                .push(send(Command::AUTHENTICATE(chunk.to_owned())));
        }
    }

    fn handle_response(&mut self, resp: Response, args: &[String], step: &mut Step) {
        match resp {
            Response::RPL_WELCOME => {
                if let Some(confirmed) = args.first() {
                    self.nick = confirmed.clone();
                }
                self.state = SessionState::Registered;
                self.reconnect_attempt = 0;
                step.events.push(Event::Connected);
                step.events
                    .push(Event::StateChanged(SessionState::Registered));
                for msg in self.outbound.drain(..) {
                    step.actions.push(Action::Send(Box::new(msg)));
                }
            }
            Response::ERR_NICKNAMEINUSE | Response::ERR_ERRONEUSNICKNAME
                if self.state == SessionState::Negotiating =>
            {
                if self.nick_attempts >= NICK_RETRIES {
                    self.fail_registration(
                        RegistrationError::NickExhausted {
                            attempts: self.nick_attempts,
                        },
                        step,
                    );
                    return;
                }
                self.nick_attempts += 1;
                let mut retry = format!("{}_", self.nick);
                while retry.len() > self.nicklen && retry.len() > 1 {
                    // Drop a character ahead of the suffix to stay in NICKLEN.
                    retry.remove(retry.len() - 2);
                }
                self.nick = retry;
                step.actions.push(send(Command::NICK(self.nick.clone())));
            }
            Response::ERR_PASSWDMISMATCH if self.state == SessionState::Negotiating => {
                self.fail_registration(RegistrationError::BadPassword, step);
            }
            Response::ERR_YOUREBANNEDCREEP if self.state == SessionState::Negotiating => {
                let reason = args.last().cloned().unwrap_or_default();
                self.fail_registration(RegistrationError::Banned(reason), step);
            }
            Response::RPL_SASLSUCCESS => {
                if self.sasl_inflight {
                    self.sasl_inflight = false;
                    self.finish_negotiation(step);
                }
            }
            Response::ERR_SASLFAIL
            | Response::ERR_SASLTOOLONG
            | Response::ERR_SASLABORTED
            | Response::ERR_SASLALREADY => {
                if !self.sasl_inflight {
                    return;
                }
                self.sasl_inflight = false;
                let reason = args.last().cloned().unwrap_or_default();
                if self.config.sasl_required {
                    self.fail_registration(RegistrationError::SaslFailed(reason), step);
                } else {
                    step.events
                        .push(Event::Diagnostic(format!("SASL failed: {reason}")));
                    self.finish_negotiation(step);
                }
            }
            _ => {}
        }
    }

    fn finish_negotiation(&mut self, step: &mut Step) {
        if self.state == SessionState::Negotiating && !self.cap_end_sent {
            self.cap_end_sent = true;
            step.actions
                .push(send(Command::CAP(None, CapSubCommand::END, None, None)));
        }
    }

    fn fail_registration(&mut self, error: RegistrationError, step: &mut Step) {
        self.auto_reconnect = false;
        step.events.push(Event::RegistrationFailed(error));
        step.actions.push(Action::Close);
    }

    /// Fire any deadlines that have passed.
    pub fn tick(&mut self, now: Instant) -> Step {
        let mut step = Step::default();

        if self.state == SessionState::Backoff {
            if let Some(at) = self.reconnect_at {
                if now >= at {
                    self.reconnect_at = None;
                    step.merge(self.begin_connect());
                }
            }
            return step;
        }

        if self.state == SessionState::Closing {
            if let Some(at) = self.quit_deadline {
                if now >= at {
                    self.quit_deadline = None;
                    step.actions.push(Action::Close);
                }
            }
            return step;
        }

        if matches!(
            self.state,
            SessionState::Negotiating | SessionState::Registered
        ) {
            if let Some(sent_at) = self.ping_sent_at {
                if now >= sent_at + self.config.ping_timeout {
                    tracing::warn!("ping timeout; failing the connection");
                    self.ping_sent_at = None;
                    step.events
                        .push(Event::Diagnostic("ping timeout".to_owned()));
                    step.actions.push(Action::Close);
                }
            } else if let Some(last) = self.last_traffic {
                if now >= last + self.config.ping_interval {
                    self.ping_sent_at = Some(now);
                    let token = chrono::Utc::now().timestamp_millis().to_string();
                    step.actions.push(send(Command::PING(token, None)));
                }
            }
        }
        step
    }

    /// The next instant `tick` has work to do, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            SessionState::Backoff => self.reconnect_at,
            SessionState::Closing => self.quit_deadline,
            SessionState::Negotiating | SessionState::Registered => match self.ping_sent_at {
                Some(sent_at) => Some(sent_at + self.config.ping_timeout),
                None => self
                    .last_traffic
                    .map(|last| last + self.config.ping_interval),
            },
            _ => None,
        }
    }

    /// Leave the server and stop reconnecting.
    pub fn quit(&mut self, reason: Option<&str>, now: Instant) -> Result<Step, UsageError> {
        if matches!(self.state, SessionState::Inactive | SessionState::Closing) {
            return Err(UsageError::NotOpen);
        }
        self.auto_reconnect = false;
        self.outbound.clear();
        let mut step = Step::default();
        match self.state {
            // Rejected above.
            SessionState::Inactive | SessionState::Closing => {}
            SessionState::Backoff => {
                self.reconnect_at = None;
                self.state = SessionState::Inactive;
                step.events.push(Event::StateChanged(SessionState::Inactive));
            }
            SessionState::Connecting => {
                self.state = SessionState::Closing;
                step.actions.push(Action::Close);
                step.events.push(Event::StateChanged(SessionState::Closing));
            }
            SessionState::Negotiating | SessionState::Registered => {
                self.state = SessionState::Closing;
                self.quit_deadline = Some(now + self.config.quit_flush);
                step.actions
                    .push(send(Command::QUIT(reason.map(str::to_owned))));
                step.events.push(Event::StateChanged(SessionState::Closing));
            }
        }
        Ok(step)
    }

    /// Queue or transmit an application message.
    ///
    /// Before registration, anything that is not part of the registration
    /// conversation is buffered and flushed on 001.
    pub fn send_message(&mut self, msg: Message) -> Result<Step, UsageError> {
        let mut step = Step::default();
        match self.state {
            SessionState::Inactive | SessionState::Closing => {
                return Err(UsageError::NotOpen);
            }
            SessionState::Registered => {
                step.actions.push(Action::Send(Box::new(msg)));
            }
            SessionState::Negotiating if is_registration_command(&msg.command) => {
                step.actions.push(Action::Send(Box::new(msg)));
            }
            _ => {
                self.outbound.push_back(msg);
            }
        }
        Ok(step)
    }
}

fn send(command: Command) -> Action {
    Action::Send(Box::new(Message::new(command)))
}

// Commands that may bypass the pre-registration queue.
fn is_registration_command(command: &Command) -> bool {
    matches!(
        command,
        Command::CAP(..)
            | Command::NICK(_)
            | Command::USER(..)
            | Command::PASS(_)
            | Command::PONG(..)
            | Command::AUTHENTICATE(_)
            | Command::QUIT(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SessionConfig {
        SessionConfig {
            host: "irc.example.org".into(),
            port: 6667,
            nick: "testbot".into(),
            user: "bot".into(),
            real_name: "Test Bot".into(),
            ..SessionConfig::default()
        }
    }

    fn sent_lines(step: &Step) -> Vec<String> {
        step.actions
            .iter()
            .filter_map(|a| match a {
                Action::Send(msg) => Some(msg.to_string()),
                _ => None,
            })
            .collect()
    }

    fn feed(machine: &mut SessionMachine, line: &str, now: Instant) -> Step {
        let msg = Message::parse(line).unwrap();
        machine.handle_message(&msg, now)
    }

    fn registered_machine(now: Instant) -> SessionMachine {
        let mut machine = SessionMachine::new(config());
        machine.open(now).unwrap();
        machine.transport_connected(now);
        feed(&mut machine, ":srv CAP * LS :multi-prefix", now);
        feed(&mut machine, ":srv CAP testbot ACK :multi-prefix", now);
        feed(&mut machine, ":srv 001 testbot :Welcome", now);
        machine
    }

    #[test]
    fn test_open_sends_registration() {
        let mut machine = SessionMachine::new(config());
        let now = Instant::now();
        let step = machine.open(now).unwrap();
        assert!(matches!(step.actions[0], Action::Connect { .. }));
        assert_eq!(machine.state(), SessionState::Connecting);

        let step = machine.transport_connected(now);
        let lines = sent_lines(&step);
        assert_eq!(
            lines,
            vec![
                "CAP LS :302",
                "NICK testbot",
                "USER bot 0 * :Test Bot",
            ]
        );
        assert_eq!(machine.state(), SessionState::Negotiating);
    }

    #[test]
    fn test_pass_before_nick() {
        let mut cfg = config();
        cfg.password = Some("hunter2".into());
        let mut machine = SessionMachine::new(cfg);
        let now = Instant::now();
        machine.open(now).unwrap();
        let lines = sent_lines(&machine.transport_connected(now));
        assert_eq!(lines[1], "PASS hunter2");
        assert_eq!(lines[2], "NICK testbot");
    }

    #[test]
    fn test_open_twice_is_usage_error() {
        let mut machine = SessionMachine::new(config());
        let now = Instant::now();
        machine.open(now).unwrap();
        assert_eq!(machine.open(now), Err(UsageError::AlreadyOpen));
    }

    #[test]
    fn test_cap_negotiation_and_welcome() {
        let mut machine = SessionMachine::new(config());
        let now = Instant::now();
        machine.open(now).unwrap();
        machine.transport_connected(now);

        let step = feed(
            &mut machine,
            ":srv CAP * LS :multi-prefix away-notify unknown-cap",
            now,
        );
        assert_eq!(sent_lines(&step), vec!["CAP REQ :multi-prefix away-notify"]);

        let step = feed(
            &mut machine,
            ":srv CAP testbot ACK :multi-prefix away-notify",
            now,
        );
        assert_eq!(sent_lines(&step), vec!["CAP END"]);
        assert!(machine.caps().contains("multi-prefix"));

        let step = feed(&mut machine, ":srv 001 testbot :Welcome", now);
        assert_eq!(machine.state(), SessionState::Registered);
        assert!(step
            .events
            .iter()
            .any(|e| matches!(e, Event::Connected)));
    }

    #[test]
    fn test_cap_ls_continuation() {
        let mut machine = SessionMachine::new(config());
        let now = Instant::now();
        machine.open(now).unwrap();
        machine.transport_connected(now);

        let step = feed(&mut machine, ":srv CAP * LS * :multi-prefix", now);
        assert!(sent_lines(&step).is_empty());
        let step = feed(&mut machine, ":srv CAP * LS :away-notify", now);
        assert_eq!(sent_lines(&step), vec!["CAP REQ :multi-prefix away-notify"]);
    }

    #[test]
    fn test_no_common_caps_ends_immediately() {
        let mut machine = SessionMachine::new(config());
        let now = Instant::now();
        machine.open(now).unwrap();
        machine.transport_connected(now);
        let step = feed(&mut machine, ":srv CAP * LS :some-other-cap", now);
        assert_eq!(sent_lines(&step), vec!["CAP END"]);
    }

    #[test]
    fn test_sasl_plain_flow() {
        let mut cfg = config();
        cfg.sasl = SaslConfig::Plain {
            account: "acct".into(),
            password: "pw".into(),
        };
        let mut machine = SessionMachine::new(cfg);
        let now = Instant::now();
        machine.open(now).unwrap();
        machine.transport_connected(now);

        let step = feed(&mut machine, ":srv CAP * LS :sasl multi-prefix", now);
        assert_eq!(sent_lines(&step), vec!["CAP REQ :multi-prefix sasl"]);

        let step = feed(&mut machine, ":srv CAP testbot ACK :multi-prefix sasl", now);
        assert_eq!(sent_lines(&step), vec!["AUTHENTICATE PLAIN"]);

        let step = feed(&mut machine, "AUTHENTICATE +", now);
        let lines = sent_lines(&step);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], format!("AUTHENTICATE {}", sasl::encode_plain("acct", "pw")));

        let step = feed(&mut machine, ":srv 903 testbot :SASL successful", now);
        assert_eq!(sent_lines(&step), vec!["CAP END"]);
    }

    #[test]
    fn test_sasl_failure_not_required_continues() {
        let mut cfg = config();
        cfg.sasl = SaslConfig::Plain {
            account: "acct".into(),
            password: "pw".into(),
        };
        let mut machine = SessionMachine::new(cfg);
        let now = Instant::now();
        machine.open(now).unwrap();
        machine.transport_connected(now);
        feed(&mut machine, ":srv CAP * LS :sasl", now);
        feed(&mut machine, ":srv CAP testbot ACK :sasl", now);
        let step = feed(&mut machine, ":srv 904 testbot :SASL failed", now);
        assert_eq!(sent_lines(&step), vec!["CAP END"]);
    }

    #[test]
    fn test_sasl_failure_required_fails_registration() {
        let mut cfg = config();
        cfg.sasl = SaslConfig::Plain {
            account: "acct".into(),
            password: "pw".into(),
        };
        cfg.sasl_required = true;
        let mut machine = SessionMachine::new(cfg);
        let now = Instant::now();
        machine.open(now).unwrap();
        machine.transport_connected(now);
        feed(&mut machine, ":srv CAP * LS :sasl", now);
        feed(&mut machine, ":srv CAP testbot ACK :sasl", now);
        let step = feed(&mut machine, ":srv 904 testbot :SASL failed", now);
        assert!(step
            .events
            .iter()
            .any(|e| matches!(e, Event::RegistrationFailed(RegistrationError::SaslFailed(_)))));
        assert!(matches!(step.actions.last(), Some(Action::Close)));
    }

    #[test]
    fn test_ping_answered_from_any_state() {
        let mut machine = SessionMachine::new(config());
        let now = Instant::now();
        machine.open(now).unwrap();
        machine.transport_connected(now);
        let step = feed(&mut machine, "PING :abc123", now);
        assert_eq!(sent_lines(&step), vec!["PONG abc123"]);
    }

    #[test]
    fn test_nick_collision_retries_then_fails() {
        let mut machine = SessionMachine::new(config());
        let now = Instant::now();
        machine.open(now).unwrap();
        machine.transport_connected(now);

        let step = feed(&mut machine, ":srv 433 * testbot :in use", now);
        assert_eq!(sent_lines(&step), vec!["NICK testbot_"]);
        let step = feed(&mut machine, ":srv 433 * testbot_ :in use", now);
        assert_eq!(sent_lines(&step), vec!["NICK testbot__"]);
        let step = feed(&mut machine, ":srv 433 * testbot__ :in use", now);
        assert_eq!(sent_lines(&step), vec!["NICK testbot___"]);
        let step = feed(&mut machine, ":srv 433 * testbot___ :in use", now);
        assert!(step.events.iter().any(|e| matches!(
            e,
            Event::RegistrationFailed(RegistrationError::NickExhausted { attempts: 3 })
        )));
    }

    #[test]
    fn test_nick_retry_respects_nicklen() {
        let mut cfg = config();
        cfg.nick = "abcdefghi".into(); // exactly 9
        let mut machine = SessionMachine::new(cfg);
        let now = Instant::now();
        machine.open(now).unwrap();
        machine.transport_connected(now);
        let step = feed(&mut machine, ":srv 433 * abcdefghi :in use", now);
        assert_eq!(sent_lines(&step), vec!["NICK abcdefgh_"]);
    }

    #[test]
    fn test_welcome_flushes_queue() {
        let mut machine = SessionMachine::new(config());
        let now = Instant::now();
        machine.open(now).unwrap();
        machine.transport_connected(now);
        machine
            .send_message(Message::privmsg("#chan", "early"))
            .unwrap();
        let step = feed(&mut machine, ":srv 001 testbot :Welcome", now);
        assert!(sent_lines(&step).contains(&"PRIVMSG #chan :early".to_owned()));
    }

    #[test]
    fn test_send_on_inactive_is_usage_error() {
        let mut machine = SessionMachine::new(config());
        assert!(matches!(
            machine.send_message(Message::privmsg("#c", "hi")),
            Err(UsageError::NotOpen)
        ));
    }

    #[test]
    fn test_backoff_doubles_with_jitter() {
        let mut machine = SessionMachine::new(config());
        let now = Instant::now();
        machine.open(now).unwrap();
        let mut delays = Vec::new();
        for _ in 0..3 {
            machine.transport_connected(now);
            let step = machine.transport_closed(now, Some("gone".into()));
            let delay = step
                .events
                .iter()
                .find_map(|e| match e {
                    Event::ReconnectScheduled { delay, .. } => Some(*delay),
                    _ => None,
                })
                .expect("reconnect scheduled");
            delays.push(delay);
            assert_eq!(machine.state(), SessionState::Backoff);
            // Fire the reconnect.
            let deadline = machine.next_deadline().unwrap();
            let step = machine.tick(deadline);
            assert!(matches!(step.actions[0], Action::Connect { .. }));
        }
        let secs: Vec<f64> = delays.iter().map(Duration::as_secs_f64).collect();
        assert!((0.8..=1.2).contains(&secs[0]), "first delay {}", secs[0]);
        assert!((1.6..=2.4).contains(&secs[1]), "second delay {}", secs[1]);
        assert!((3.2..=4.8).contains(&secs[2]), "third delay {}", secs[2]);
    }

    #[test]
    fn test_backoff_caps_at_max() {
        let mut cfg = config();
        cfg.reconnect_delay = Duration::from_secs(100);
        cfg.reconnect_max = Duration::from_secs(300);
        let mut machine = SessionMachine::new(cfg);
        let now = Instant::now();
        machine.open(now).unwrap();
        for _ in 0..5 {
            machine.transport_connected(now);
            machine.transport_closed(now, None);
            machine.reconnect_at = None;
            machine.state = SessionState::Connecting;
        }
        machine.transport_connected(now);
        let step = machine.transport_closed(now, None);
        let delay = step
            .events
            .iter()
            .find_map(|e| match e {
                Event::ReconnectScheduled { delay, .. } => Some(*delay),
                _ => None,
            })
            .unwrap();
        assert!(delay <= Duration::from_secs(360));
    }

    #[test]
    fn test_reconnect_limit() {
        let mut cfg = config();
        cfg.reconnect_limit = Some(1);
        let mut machine = SessionMachine::new(cfg);
        let now = Instant::now();
        machine.open(now).unwrap();
        machine.transport_connected(now);
        machine.transport_closed(now, None);
        assert_eq!(machine.state(), SessionState::Backoff);
        machine.tick(machine.next_deadline().unwrap());
        machine.transport_connected(now);
        machine.transport_closed(now, None);
        assert_eq!(machine.state(), SessionState::Inactive);
    }

    #[test]
    fn test_idle_ping_and_timeout() {
        let now = Instant::now();
        let mut machine = registered_machine(now);

        // Nothing due before the idle interval.
        let step = machine.tick(now + Duration::from_secs(30));
        assert!(step.actions.is_empty());

        let step = machine.tick(now + Duration::from_secs(61));
        let lines = sent_lines(&step);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("PING "));

        // No traffic in reply: the connection fails.
        let step = machine.tick(now + Duration::from_secs(122));
        assert!(matches!(step.actions.last(), Some(Action::Close)));
    }

    #[test]
    fn test_traffic_resets_ping_timer() {
        let now = Instant::now();
        let mut machine = registered_machine(now);
        machine.tick(now + Duration::from_secs(61));
        feed(
            &mut machine,
            ":srv PONG srv :token",
            now + Duration::from_secs(62),
        );
        // The timeout vanished with the reply.
        let step = machine.tick(now + Duration::from_secs(123));
        assert!(step
            .actions
            .iter()
            .all(|a| !matches!(a, Action::Close)));
    }

    #[test]
    fn test_quit_flow() {
        let now = Instant::now();
        let mut machine = registered_machine(now);
        let step = machine.quit(Some("bye"), now).unwrap();
        assert_eq!(sent_lines(&step), vec!["QUIT :bye"]);
        assert_eq!(machine.state(), SessionState::Closing);

        // Flush bound expires: close anyway.
        let step = machine.tick(now + Duration::from_secs(3));
        assert!(matches!(step.actions[0], Action::Close));

        let step = machine.transport_closed(now + Duration::from_secs(3), None);
        assert_eq!(machine.state(), SessionState::Inactive);
        assert!(step
            .events
            .iter()
            .any(|e| matches!(e, Event::StateChanged(SessionState::Inactive))));
    }

    #[test]
    fn test_registration_failure_stops_reconnect() {
        let mut machine = SessionMachine::new(config());
        let now = Instant::now();
        machine.open(now).unwrap();
        machine.transport_connected(now);
        let step = feed(&mut machine, ":srv 465 testbot :You are banned", now);
        assert!(step
            .events
            .iter()
            .any(|e| matches!(e, Event::RegistrationFailed(RegistrationError::Banned(_)))));
        let step = machine.transport_closed(now, None);
        assert_eq!(machine.state(), SessionState::Inactive);
        assert!(!step
            .events
            .iter()
            .any(|e| matches!(e, Event::ReconnectScheduled { .. })));
    }
}
