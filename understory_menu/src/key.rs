// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Key model and the shortcut lookup capability.
//!
//! Menus only need a handful of named keys plus printable characters. Matching key
//! presses against application commands is the host's business; the menu system asks
//! through [`ShortcutMap`] and never stores bindings itself.

bitflags::bitflags! {
    /// Modifier keys held during a key press.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// Shift.
        const SHIFT   = 0b0000_0001;
        /// Control.
        const CONTROL = 0b0000_0010;
        /// Alt / Option.
        const ALT     = 0b0000_0100;
        /// Meta / Command / Super.
        const META    = 0b0000_1000;
    }
}

/// A key, as far as menus are concerned.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    /// Arrow up.
    ArrowUp,
    /// Arrow down.
    ArrowDown,
    /// Arrow left.
    ArrowLeft,
    /// Arrow right.
    ArrowRight,
    /// Home.
    Home,
    /// End.
    End,
    /// Enter / Return.
    Enter,
    /// Escape.
    Escape,
    /// Tab.
    Tab,
    /// A printable character.
    Character(char),
}

/// A key press with its modifiers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyPress {
    /// The key.
    pub key: Key,
    /// Modifiers held.
    pub modifiers: Modifiers,
}

impl KeyPress {
    /// A key press without modifiers.
    pub const fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::empty(),
        }
    }

    /// Replace the modifiers.
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Whether a command modifier (Control, Alt or Meta) is held.
    pub fn has_command_modifier(&self) -> bool {
        self.modifiers
            .intersects(Modifiers::CONTROL | Modifiers::ALT | Modifiers::META)
    }
}

/// Host-defined command identifier.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommandId(pub u64);

/// Lookup from key presses to commands.
///
/// Implementations must be pure lookups; the menu system may call [`ShortcutMap::get`]
/// any number of times per key press.
pub trait ShortcutMap {
    /// The command bound to `press`, if any.
    fn get(&self, press: &KeyPress) -> Option<CommandId>;
}

/// No shortcuts.
impl ShortcutMap for () {
    fn get(&self, _press: &KeyPress) -> Option<CommandId> {
        None
    }
}

/// A flat binding table.
impl ShortcutMap for [(KeyPress, CommandId)] {
    fn get(&self, press: &KeyPress) -> Option<CommandId> {
        self.iter().find(|(k, _)| k == press).map(|&(_, c)| c)
    }
}

impl<const N: usize> ShortcutMap for [(KeyPress, CommandId); N] {
    fn get(&self, press: &KeyPress) -> Option<CommandId> {
        ShortcutMap::get(self.as_slice(), press)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_table_matches_modifiers_exactly() {
        let save = KeyPress::new(Key::Character('s')).with_modifiers(Modifiers::CONTROL);
        let table = [(save, CommandId(1))];
        assert_eq!(table.get(&save), Some(CommandId(1)));
        assert_eq!(table.get(&KeyPress::new(Key::Character('s'))), None);
        assert_eq!(().get(&save), None);
    }

    #[test]
    fn shift_is_not_a_command_modifier() {
        let upper = KeyPress::new(Key::Character('A')).with_modifiers(Modifiers::SHIFT);
        assert!(!upper.has_command_modifier());
        let alt = KeyPress::new(Key::Character('a')).with_modifiers(Modifiers::ALT);
        assert!(alt.has_command_modifier());
    }
}
