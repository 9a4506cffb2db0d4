use std::fmt;

/// One of the ten semantic operations the tape machine understands.
///
/// The textual spelling of each command is chosen by the token table; the
/// command set itself is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Command {
    PointerInc,
    PointerDec,
    CellInc,
    CellDec,
    Output,
    Input,
    LoopOpen,
    LoopClose,
    ClipCopy,
    ClipPaste,
}

impl Command {
    /// Every command, in catalog order.
    pub const ALL: [Command; 10] = [
        Command::PointerInc,
        Command::PointerDec,
        Command::CellInc,
        Command::CellDec,
        Command::Output,
        Command::Input,
        Command::LoopOpen,
        Command::LoopClose,
        Command::ClipCopy,
        Command::ClipPaste,
    ];

    /// Canonical short name, as used in token configuration files.
    pub fn name(self) -> &'static str {
        match self {
            Command::PointerInc => "pinc",
            Command::PointerDec => "pdec",
            Command::CellInc => "inc",
            Command::CellDec => "dec",
            Command::Output => "out",
            Command::Input => "inp",
            Command::LoopOpen => "jmp",
            Command::LoopClose => "ret",
            Command::ClipCopy => "clip",
            Command::ClipPaste => "paste",
        }
    }

    /// Look up a command by configuration key.
    ///
    /// Accepts the short name (`pinc`), the variant name (`PointerInc`) and
    /// its snake-case form (`pointer_inc`), each optionally written as a
    /// symbol key (`:pinc`). Returns `None` for anything else.
    pub fn from_name(name: &str) -> Option<Command> {
        let name = name.trim();
        let name = name.strip_prefix(':').unwrap_or(name);
        Command::ALL.into_iter().find(|c| {
            c.name() == name
                || c.variant_name() == name
                || c.snake_name() == name
        })
    }

    fn variant_name(self) -> &'static str {
        match self {
            Command::PointerInc => "PointerInc",
            Command::PointerDec => "PointerDec",
            Command::CellInc => "CellInc",
            Command::CellDec => "CellDec",
            Command::Output => "Output",
            Command::Input => "Input",
            Command::LoopOpen => "LoopOpen",
            Command::LoopClose => "LoopClose",
            Command::ClipCopy => "ClipCopy",
            Command::ClipPaste => "ClipPaste",
        }
    }

    fn snake_name(self) -> &'static str {
        match self {
            Command::PointerInc => "pointer_inc",
            Command::PointerDec => "pointer_dec",
            Command::CellInc => "cell_inc",
            Command::CellDec => "cell_dec",
            Command::Output => "output",
            Command::Input => "input",
            Command::LoopOpen => "loop_open",
            Command::LoopClose => "loop_close",
            Command::ClipCopy => "clip_copy",
            Command::ClipPaste => "clip_paste",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pretty-print a numbered listing of a command sequence, one per line,
/// indenting loop bodies.
pub fn disassemble(commands: &[Command]) -> String {
    let mut out = String::new();
    let mut depth: usize = 0;
    for (i, &cmd) in commands.iter().enumerate() {
        if cmd == Command::LoopClose {
            depth = depth.saturating_sub(1);
        }
        let indent = "  ".repeat(depth);
        out.push_str(&format!("{i:04}  {indent}{cmd}\n"));
        if cmd == Command::LoopOpen {
            depth += 1;
        }
    }
    out
}
