//! IRC numeric reply codes.
//!
//! Servers answer commands with three-digit numerics. The engine keeps the
//! mapping total: codes it has no name for are carried as [`Response::Other`]
//! so every numeric reply flows through the same catch-all message variant.
//!
//! # Reference
//! - RFC 2812: Internet Relay Chat: Client Protocol
//! - Modern IRC documentation: <https://modern.ircdocs.horse/>

#![allow(non_camel_case_types)]

use std::str::FromStr;

use crate::error::MessageParseError;

/// A server numeric, named where the engine cares about it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Response {
    /// 001 - Welcome; registration is complete.
    RPL_WELCOME,
    /// 002 - Your host
    RPL_YOURHOST,
    /// 003 - Server creation date
    RPL_CREATED,
    /// 004 - Server info
    RPL_MYINFO,
    /// 005 - Supported features (ISUPPORT)
    RPL_ISUPPORT,
    /// 301 - User is away
    RPL_AWAY,
    /// 305 - No longer marked away
    RPL_UNAWAY,
    /// 306 - Marked away
    RPL_NOWAWAY,
    /// 311 - WHOIS user info
    RPL_WHOISUSER,
    /// 312 - WHOIS server
    RPL_WHOISSERVER,
    /// 314 - WHOWAS user info
    RPL_WHOWASUSER,
    /// 315 - End of WHO
    RPL_ENDOFWHO,
    /// 317 - WHOIS idle time
    RPL_WHOISIDLE,
    /// 318 - End of WHOIS
    RPL_ENDOFWHOIS,
    /// 319 - WHOIS channels
    RPL_WHOISCHANNELS,
    /// 324 - Channel mode is
    RPL_CHANNELMODEIS,
    /// 329 - Channel creation time
    RPL_CREATIONTIME,
    /// 330 - WHOIS logged in as
    RPL_WHOISACCOUNT,
    /// 331 - No topic set
    RPL_NOTOPIC,
    /// 332 - Channel topic
    RPL_TOPIC,
    /// 333 - Topic setter and time
    RPL_TOPICWHOTIME,
    /// 341 - Inviting
    RPL_INVITING,
    /// 345 - Invited
    RPL_INVITED,
    /// 352 - WHO reply
    RPL_WHOREPLY,
    /// 353 - NAMES reply
    RPL_NAMREPLY,
    /// 366 - End of NAMES
    RPL_ENDOFNAMES,
    /// 369 - End of WHOWAS
    RPL_ENDOFWHOWAS,
    /// 372 - MOTD line
    RPL_MOTD,
    /// 375 - MOTD start
    RPL_MOTDSTART,
    /// 376 - End of MOTD
    RPL_ENDOFMOTD,
    /// 378 - WHOIS host/address
    RPL_WHOISHOST,
    /// 671 - WHOIS secure connection
    RPL_WHOISSECURE,
    /// 421 - Unknown command
    ERR_UNKNOWNCOMMAND,
    /// 422 - MOTD file missing
    ERR_NOMOTD,
    /// 432 - Erroneous nickname
    ERR_ERRONEUSNICKNAME,
    /// 433 - Nickname is already in use
    ERR_NICKNAMEINUSE,
    /// 451 - Not registered
    ERR_NOTREGISTERED,
    /// 464 - Password incorrect
    ERR_PASSWDMISMATCH,
    /// 465 - Banned from server
    ERR_YOUREBANNEDCREEP,
    /// 900 - Logged in
    RPL_LOGGEDIN,
    /// 903 - SASL success
    RPL_SASLSUCCESS,
    /// 904 - SASL failed
    ERR_SASLFAIL,
    /// 905 - SASL message too long
    ERR_SASLTOOLONG,
    /// 906 - SASL aborted
    ERR_SASLABORTED,
    /// 907 - Already authenticated
    ERR_SASLALREADY,
    /// 908 - Available SASL mechanisms
    RPL_SASLMECHS,
    /// Any numeric the engine has no name for.
    Other(u16),
}

impl Response {
    /// The three-digit code.
    pub fn code(self) -> u16 {
        match self {
            Response::RPL_WELCOME => 1,
            Response::RPL_YOURHOST => 2,
            Response::RPL_CREATED => 3,
            Response::RPL_MYINFO => 4,
            Response::RPL_ISUPPORT => 5,
            Response::RPL_AWAY => 301,
            Response::RPL_UNAWAY => 305,
            Response::RPL_NOWAWAY => 306,
            Response::RPL_WHOISUSER => 311,
            Response::RPL_WHOISSERVER => 312,
            Response::RPL_WHOWASUSER => 314,
            Response::RPL_ENDOFWHO => 315,
            Response::RPL_WHOISIDLE => 317,
            Response::RPL_ENDOFWHOIS => 318,
            Response::RPL_WHOISCHANNELS => 319,
            Response::RPL_CHANNELMODEIS => 324,
            Response::RPL_CREATIONTIME => 329,
            Response::RPL_WHOISACCOUNT => 330,
            Response::RPL_NOTOPIC => 331,
            Response::RPL_TOPIC => 332,
            Response::RPL_TOPICWHOTIME => 333,
            Response::RPL_INVITING => 341,
            Response::RPL_INVITED => 345,
            Response::RPL_WHOREPLY => 352,
            Response::RPL_NAMREPLY => 353,
            Response::RPL_ENDOFNAMES => 366,
            Response::RPL_ENDOFWHOWAS => 369,
            Response::RPL_MOTD => 372,
            Response::RPL_MOTDSTART => 375,
            Response::RPL_ENDOFMOTD => 376,
            Response::RPL_WHOISHOST => 378,
            Response::RPL_WHOISSECURE => 671,
            Response::ERR_UNKNOWNCOMMAND => 421,
            Response::ERR_NOMOTD => 422,
            Response::ERR_ERRONEUSNICKNAME => 432,
            Response::ERR_NICKNAMEINUSE => 433,
            Response::ERR_NOTREGISTERED => 451,
            Response::ERR_PASSWDMISMATCH => 464,
            Response::ERR_YOUREBANNEDCREEP => 465,
            Response::RPL_LOGGEDIN => 900,
            Response::RPL_SASLSUCCESS => 903,
            Response::ERR_SASLFAIL => 904,
            Response::ERR_SASLTOOLONG => 905,
            Response::ERR_SASLABORTED => 906,
            Response::ERR_SASLALREADY => 907,
            Response::RPL_SASLMECHS => 908,
            Response::Other(code) => code,
        }
    }

    /// Map a code to its named variant; unknown codes become `Other`.
    pub fn from_code(code: u16) -> Response {
        match code {
            1 => Response::RPL_WELCOME,
            2 => Response::RPL_YOURHOST,
            3 => Response::RPL_CREATED,
            4 => Response::RPL_MYINFO,
            5 => Response::RPL_ISUPPORT,
            301 => Response::RPL_AWAY,
            305 => Response::RPL_UNAWAY,
            306 => Response::RPL_NOWAWAY,
            311 => Response::RPL_WHOISUSER,
            312 => Response::RPL_WHOISSERVER,
            314 => Response::RPL_WHOWASUSER,
            315 => Response::RPL_ENDOFWHO,
            317 => Response::RPL_WHOISIDLE,
            318 => Response::RPL_ENDOFWHOIS,
            319 => Response::RPL_WHOISCHANNELS,
            324 => Response::RPL_CHANNELMODEIS,
            329 => Response::RPL_CREATIONTIME,
            330 => Response::RPL_WHOISACCOUNT,
            331 => Response::RPL_NOTOPIC,
            332 => Response::RPL_TOPIC,
            333 => Response::RPL_TOPICWHOTIME,
            341 => Response::RPL_INVITING,
            345 => Response::RPL_INVITED,
            352 => Response::RPL_WHOREPLY,
            353 => Response::RPL_NAMREPLY,
            366 => Response::RPL_ENDOFNAMES,
            369 => Response::RPL_ENDOFWHOWAS,
            372 => Response::RPL_MOTD,
            375 => Response::RPL_MOTDSTART,
            376 => Response::RPL_ENDOFMOTD,
            378 => Response::RPL_WHOISHOST,
            671 => Response::RPL_WHOISSECURE,
            421 => Response::ERR_UNKNOWNCOMMAND,
            422 => Response::ERR_NOMOTD,
            432 => Response::ERR_ERRONEUSNICKNAME,
            433 => Response::ERR_NICKNAMEINUSE,
            451 => Response::ERR_NOTREGISTERED,
            464 => Response::ERR_PASSWDMISMATCH,
            465 => Response::ERR_YOUREBANNEDCREEP,
            900 => Response::RPL_LOGGEDIN,
            903 => Response::RPL_SASLSUCCESS,
            904 => Response::ERR_SASLFAIL,
            905 => Response::ERR_SASLTOOLONG,
            906 => Response::ERR_SASLABORTED,
            907 => Response::ERR_SASLALREADY,
            908 => Response::RPL_SASLMECHS,
            other => Response::Other(other),
        }
    }

    /// True for 400-599 and the SASL error range.
    pub fn is_error(self) -> bool {
        matches!(self.code(), 400..=599 | 904..=907)
    }
}

impl FromStr for Response {
    type Err = MessageParseError;

    /// Accepts exactly three ASCII digits, per the wire grammar.
    fn from_str(s: &str) -> Result<Response, MessageParseError> {
        if s.len() != 3 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MessageParseError::InvalidCommand);
        }
        // Three ASCII digits always fit a u16.
        Ok(Response::from_code(s.parse().unwrap()))
    }
}
