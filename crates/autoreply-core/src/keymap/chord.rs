//! Key chords: a primary key plus the modifiers held with it.
//!
//! Chords are written the way shortcut hints are printed in menus:
//! `"Ctrl+A"`, `"Ctrl+Shift+Tab"`, `"Alt+F4"`.  The last `+`-separated token
//! is the primary key; every token before it must name a modifier.
//! `"NumpadEnter"` is accepted as the extended form of Enter.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use super::{windows_vk, ModifierSet, VirtualKey};

/// Error returned when a chord string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChordParseError {
    #[error("empty key chord")]
    Empty,
    #[error("unknown key name: {0:?}")]
    UnknownKey(String),
    #[error("{0:?} cannot be used as a modifier")]
    NotAModifier(String),
}

/// A primary key, its modifiers, and whether it is sent as an extended key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChord {
    pub key: VirtualKey,
    pub modifiers: ModifierSet,
    pub extended: bool,
}

impl KeyChord {
    /// A chord with no modifiers; the extended flag follows [`VirtualKey::is_extended`].
    pub fn bare(key: VirtualKey) -> Self {
        Self {
            key,
            modifiers: ModifierSet::new(),
            extended: key.is_extended(),
        }
    }

    /// `Ctrl` + `key`.
    pub fn ctrl(key: VirtualKey) -> Self {
        Self {
            modifiers: ModifierSet::from([VirtualKey::CONTROL]),
            ..Self::bare(key)
        }
    }
}

fn is_modifier(vk: VirtualKey) -> bool {
    matches!(
        vk,
        VirtualKey::SHIFT
            | VirtualKey::CONTROL
            | VirtualKey::MENU
            | VirtualKey::LSHIFT
            | VirtualKey::RSHIFT
            | VirtualKey::LCONTROL
            | VirtualKey::RCONTROL
            | VirtualKey::LMENU
            | VirtualKey::RMENU
            | VirtualKey::LWIN
            | VirtualKey::RWIN
    )
}

fn lookup(token: &str) -> Result<VirtualKey, ChordParseError> {
    windows_vk::vk_from_name(token)
        .map(VirtualKey)
        .ok_or_else(|| ChordParseError::UnknownKey(token.to_string()))
}

impl FromStr for KeyChord {
    type Err = ChordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split('+').map(str::trim).collect();
        let (last, mods) = match tokens.split_last() {
            Some((last, mods)) if !last.is_empty() => (*last, mods),
            _ => return Err(ChordParseError::Empty),
        };

        let mut modifiers = ModifierSet::new();
        for token in mods {
            if token.is_empty() {
                return Err(ChordParseError::Empty);
            }
            let vk = lookup(token)?;
            if !is_modifier(vk) {
                return Err(ChordParseError::NotAModifier(token.to_string()));
            }
            modifiers.insert(vk);
        }

        let (key, extended) = if last.eq_ignore_ascii_case("NumpadEnter") {
            (VirtualKey::RETURN, true)
        } else {
            let vk = lookup(last)?;
            (vk, vk.is_extended())
        };

        Ok(Self {
            key,
            modifiers,
            extended,
        })
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in self.modifiers.iter() {
            write!(f, "{m}+")?;
        }
        if self.key == VirtualKey::RETURN && self.extended {
            f.write_str("NumpadEnter")
        } else {
            write!(f, "{}", self.key)
        }
    }
}

impl Serialize for KeyChord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for KeyChord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
