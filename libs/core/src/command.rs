use crate::protocol::Space;

/// A logical command, before it is framed for the wire
///
/// Operands and flags are opaque strings; their meaning depends on the opcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub opcode: String,
    pub space: Space,
    pub operands: Vec<String>,
    pub flags: Vec<String>,
}

impl Command {
    /// Create a command in the SNES space with no operands or flags
    pub fn new(opcode: impl Into<String>) -> Self {
        Self {
            opcode: opcode.into(),
            space: Space::default(),
            operands: Vec::new(),
            flags: Vec::new(),
        }
    }

    /// Append one operand
    pub fn operand(mut self, operand: impl Into<String>) -> Self {
        self.operands.push(operand.into());
        self
    }

    /// Append several operands in order
    pub fn operands<I, S>(mut self, operands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.operands.extend(operands.into_iter().map(Into::into));
        self
    }

    /// Append one flag
    pub fn flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    /// Set the address space
    pub fn space(mut self, space: Space) -> Self {
        self.space = space;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Opcode;

    #[test]
    fn builder_keeps_argument_order() {
        let command = Command::new(Opcode::Rename)
            .operand("/a.sfc")
            .operands(vec!["b.sfc".to_string()])
            .flag("F1")
            .flag("F2")
            .space(Space::Cmd);

        assert_eq!(command.opcode, "Rename");
        assert_eq!(command.operands, ["/a.sfc", "b.sfc"]);
        assert_eq!(command.flags, ["F1", "F2"]);
        assert_eq!(command.space, Space::Cmd);
    }

    #[test]
    fn new_command_defaults_to_snes_space() {
        let command = Command::new("Custom");
        assert_eq!(command.space, Space::Snes);
        assert!(command.operands.is_empty());
        assert!(command.flags.is_empty());
    }
}
