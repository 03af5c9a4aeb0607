//! Interpretation of MODE change words.
//!
//! Whether a mode letter consumes an argument depends on the server
//! dialect: CHANMODES groups channel modes into four lists, and PREFIX
//! modes always take a nick. The walk is total; a missing argument leaves
//! `arg` empty rather than failing, since protocol errors are non-fatal.

use crate::isupport::Isupport;

/// One parsed mode change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModeChange {
    /// True for `+`, false for `-`.
    pub add: bool,
    /// The mode letter.
    pub mode: char,
    /// The consumed argument, when the letter takes one.
    pub arg: Option<String>,
}

/// Walk a channel mode string with its arguments.
///
/// The current sign starts as `+`. A letter consumes an argument iff it is
/// in CHANMODES-A (always), CHANMODES-B (always), CHANMODES-C (only when
/// adding), or PREFIX (always). Unknown letters are treated as flags.
pub fn parse_channel_modes(isupport: &Isupport, words: &[String]) -> Vec<ModeChange> {
    let mut changes = Vec::new();
    let Some((modestring, args)) = words.split_first() else {
        return changes;
    };
    let chanmodes = isupport.chanmodes();
    let prefix = isupport.prefix();

    let mut args = args.iter();
    let mut add = true;
    for c in modestring.chars() {
        match c {
            '+' => add = true,
            '-' => add = false,
            mode => {
                let takes_arg = chanmodes.a.contains(mode)
                    || chanmodes.b.contains(mode)
                    || (add && chanmodes.c.contains(mode))
                    || prefix.is_mode(mode);
                let arg = if takes_arg { args.next().cloned() } else { None };
                changes.push(ModeChange { add, mode, arg });
            }
        }
    }
    changes
}
