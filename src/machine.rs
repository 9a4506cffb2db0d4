use std::io::{ErrorKind, Read, Write};

use crate::command::Command;
use crate::config::MachineConfig;
use crate::error::{Error, Result};
use crate::jump::JumpTable;
use crate::tape::Tape;

/// Byte streams a machine talks to while running.
///
/// `input` feeds the Input command, `output` receives flash-mode echo, and
/// `trace` receives the debug trace and jump table dump. None of them is
/// owned by the machine.
pub struct Channels<'a> {
    pub input: &'a mut dyn Read,
    pub output: &'a mut dyn Write,
    pub trace: &'a mut dyn Write,
}

impl<'a> Channels<'a> {
    pub fn new(
        input: &'a mut dyn Read,
        output: &'a mut dyn Write,
        trace: &'a mut dyn Write,
    ) -> Self {
        Self {
            input,
            output,
            trace,
        }
    }
}

/// Single-use tape machine executing a command sequence.
///
/// The step counter and instruction pointer advance together by one per
/// executed command; jumps rewrite the instruction pointer to the partner
/// bracket before that advance. Once the instruction pointer reaches the end
/// of the program the machine is finished and its output is final.
///
/// Any error leaves the machine unusable: later `step`/`execute` calls fail
/// with [`Error::State`].
#[derive(Debug, Clone)]
pub struct Machine {
    commands: Vec<Command>,
    tape: Tape,
    debug: bool,
    flash: bool,
    loose: bool,
    step: u64,
    index: i64,
    point: i64,
    clip: i64,
    output: Vec<u8>,
    jump_table: Option<JumpTable>,
    failed: bool,
}

impl Machine {
    pub fn new(commands: Vec<Command>, config: &MachineConfig) -> Self {
        Self {
            tape: Tape::new(config.capacity(), config.loose),
            commands,
            debug: config.debug,
            flash: config.flash,
            loose: config.loose,
            step: 0,
            index: 0,
            point: 0,
            clip: 0,
            output: Vec::new(),
            jump_table: None,
            failed: false,
        }
    }

    /// Build a machine, run it to completion and return its output.
    pub fn run(
        commands: Vec<Command>,
        config: &MachineConfig,
        channels: &mut Channels<'_>,
    ) -> Result<Vec<u8>> {
        let mut machine = Self::new(commands, config);
        machine.execute(channels)?;
        Ok(machine.output)
    }

    /// Run until finished and return the output.
    ///
    /// On a finished machine this returns the cached output without touching
    /// any state.
    pub fn execute(&mut self, channels: &mut Channels<'_>) -> Result<&[u8]> {
        self.ensure_usable()?;
        if self.is_finished() {
            return Ok(&self.output);
        }
        self.prepare(channels.trace)?;
        while !self.is_finished() {
            self.step(channels)?;
        }
        tracing::debug!(
            steps = self.step,
            output_len = self.output.len(),
            "machine finished"
        );
        Ok(&self.output)
    }

    /// Build the jump table if it has not been built yet.
    ///
    /// In debug mode a non-empty table is dumped to `trace`.
    pub fn prepare(&mut self, trace: &mut dyn Write) -> Result<()> {
        if self.jump_table.is_some() {
            return Ok(());
        }
        let table = JumpTable::build(&self.commands).inspect_err(|_| self.failed = true)?;
        tracing::debug!(pairs = table.len() / 2, "jump table built");
        if self.debug && !table.is_empty() {
            writeln!(trace, "jump table:")?;
            writeln!(trace, "{table}")?;
        }
        self.jump_table = Some(table);
        Ok(())
    }

    /// Execute the command under the instruction pointer, then advance.
    pub fn step(&mut self, channels: &mut Channels<'_>) -> Result<()> {
        self.ensure_usable()?;
        if self.is_finished() {
            return Err(Error::State("machine already finished".to_string()));
        }
        self.prepare(channels.trace)?;
        self.dispatch(channels).inspect_err(|e| {
            tracing::debug!(step = self.step, index = self.index, "machine failed: {e}");
            self.failed = true;
        })
    }

    fn dispatch(&mut self, channels: &mut Channels<'_>) -> Result<()> {
        let cmd = self.current();
        match cmd {
            Some(Command::PointerInc) => self.move_point(1)?,
            Some(Command::PointerDec) => self.move_point(-1)?,
            Some(Command::CellInc) => {
                let v = self.value()?;
                self.replace_value(v + 1)?;
            }
            Some(Command::CellDec) => {
                let v = self.value()?;
                self.replace_value(v - 1)?;
            }
            Some(Command::Output) => {
                let byte = self.value()?.rem_euclid(256) as u8;
                if self.flash {
                    channels.output.write_all(&[byte])?;
                    channels.output.flush()?;
                }
                self.output.push(byte);
            }
            Some(Command::Input) => {
                let mut buf = [0u8; 1];
                channels.input.read_exact(&mut buf).map_err(|e| match e.kind() {
                    ErrorKind::UnexpectedEof => Error::InputExhausted,
                    _ => Error::Io(e),
                })?;
                self.replace_value(buf[0] as i64)?;
            }
            Some(Command::LoopOpen) => {
                if self.value()? == 0 {
                    self.jump()?;
                }
            }
            Some(Command::LoopClose) => {
                if self.value()? != 0 {
                    self.jump()?;
                }
            }
            Some(Command::ClipCopy) => {
                let v = self.value()?;
                self.replace_clip(v)?;
            }
            Some(Command::ClipPaste) => self.replace_value(self.clip)?,
            // Loose-mode jumps can leave the pointer before the program.
            None => {}
        }

        tracing::trace!(step = self.step, index = self.index, point = self.point, "step");
        if self.debug {
            let name = cmd.map_or("nop", Command::name);
            writeln!(
                channels.trace,
                "step:{} com:{} index:{} point:{} buffer:{} clip:{} result:{}",
                self.step,
                name,
                self.index,
                self.point,
                self.tape,
                self.clip,
                String::from_utf8_lossy(&self.output)
            )?;
        }

        self.step += 1;
        self.index += 1;
        Ok(())
    }

    /// Set the instruction pointer directly.
    ///
    /// Strict mode requires `0 <= target < len`; loose mode accepts any
    /// target, and one at or past the end finishes the machine.
    pub fn jump_to(&mut self, target: i64) -> Result<()> {
        let len = self.commands.len() as i64;
        if !self.loose && (target < 0 || target >= len) {
            return Err(Error::Bounds {
                what: "jump target",
                index: target,
                limit: len,
            });
        }
        self.index = target;
        Ok(())
    }

    fn jump(&mut self) -> Result<()> {
        let table = self
            .jump_table
            .as_ref()
            .ok_or_else(|| Error::State("jump table not built".to_string()))?;
        let target = table.get(self.index as usize).ok_or_else(|| {
            Error::MalformedProgram(format!("no partner for bracket at {}", self.index))
        })?;
        self.jump_to(target as i64)
    }

    fn current(&self) -> Option<Command> {
        usize::try_from(self.index)
            .ok()
            .and_then(|i| self.commands.get(i).copied())
    }

    fn move_point(&mut self, delta: i64) -> Result<()> {
        let next = self.point + delta;
        self.tape.check(next)?;
        self.point = next;
        Ok(())
    }

    fn value(&self) -> Result<i64> {
        self.tape.get(self.point)
    }

    fn replace_value(&mut self, value: i64) -> Result<()> {
        self.tape.set(self.point, value)
    }

    fn replace_clip(&mut self, value: i64) -> Result<()> {
        if !self.loose && value < 0 {
            return Err(Error::NegativeValue {
                what: "clipboard",
                value,
            });
        }
        self.clip = value;
        Ok(())
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.failed {
            return Err(Error::State("machine stopped on an earlier error".to_string()));
        }
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.commands.len() as i64
    }

    /// Final output. Fails until the machine has finished.
    pub fn result(&self) -> Result<&[u8]> {
        if !self.is_finished() {
            return Err(Error::State("not executed yet".to_string()));
        }
        Ok(&self.output)
    }

    /// Final output decoded as UTF-8, replacing invalid sequences.
    pub fn result_string(&self) -> Result<String> {
        self.result()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Output accumulated so far, finished or not.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn steps(&self) -> u64 {
        self.step
    }

    pub fn index(&self) -> i64 {
        self.index
    }

    pub fn point(&self) -> i64 {
        self.point
    }

    pub fn clipboard(&self) -> i64 {
        self.clip
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn jump_table(&self) -> Option<&JumpTable> {
        self.jump_table.as_ref()
    }

    pub fn is_loose(&self) -> bool {
        self.loose
    }
}
