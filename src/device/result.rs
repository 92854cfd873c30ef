//! Aggregate classification result.

use std::fmt;

use super::types::{DeviceSubtype, DeviceType, Terminal, TerminalRole};

/// Type, subtype, and per-terminal roles of the device under test.
///
/// Created empty at the start of a trigger cycle and filled in by each
/// classification stage. Once a curve trace starts the value is only read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassificationResult {
    pub device_type: DeviceType,
    pub subtype: DeviceSubtype,
    pub roles: [TerminalRole; 3],
}

impl ClassificationResult {
    /// An empty result with everything unknown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Role assigned to a terminal.
    pub fn role(&self, terminal: Terminal) -> TerminalRole {
        self.roles[terminal.index()]
    }

    /// Assign a role to a terminal.
    pub fn assign(&mut self, terminal: Terminal, role: TerminalRole) {
        self.roles[terminal.index()] = role;
    }

    /// The terminal carrying `role`, if exactly one does.
    pub fn find(&self, role: TerminalRole) -> Option<Terminal> {
        let mut found = Terminal::ALL.into_iter().filter(|t| self.role(*t) == role);
        let first = found.next()?;
        match found.next() {
            Some(_) => None,
            None => Some(first),
        }
    }

    /// Name of the first unresolved field, or `None` when the result is complete.
    pub fn unresolved(&self) -> Option<String> {
        if self.device_type == DeviceType::Unknown {
            return Some("device type".to_string());
        }
        if self.subtype == DeviceSubtype::Unknown {
            return Some("device subtype".to_string());
        }
        Terminal::ALL
            .into_iter()
            .find(|t| self.role(*t) == TerminalRole::Unknown)
            .map(|t| format!("role of {}", t))
    }

    /// Whether type, subtype, and all three roles are resolved.
    pub fn is_complete(&self) -> bool {
        self.unresolved().is_none()
    }

    /// Pinout as role letters in pin order, e.g. `GSD`.
    pub fn pinout(&self) -> String {
        self.roles.iter().map(|r| r.letter()).collect()
    }
}

impl fmt::Display for ClassificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} [{}]", self.device_type, self.subtype, self.pinout())
    }
}
