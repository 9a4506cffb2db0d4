use std::path::Path;

use crate::command::Command;
use crate::config::{self, MachineConfig, RawTable};
use crate::error::{Error, Result};
use crate::machine::{Channels, Machine};
use crate::resolver::Resolver;

/// Resolver plus the machine from the most recent run.
///
/// `filter`, `build` and `execute` take source text one stage further each.
/// The `*_from_file` variants read the source from disk first.
#[derive(Debug)]
pub struct Session {
    resolver: Resolver,
    machine: Option<Machine>,
}

impl Session {
    pub fn new(resolver: Resolver) -> Self {
        Self {
            resolver,
            machine: None,
        }
    }

    pub fn from_table(raw: &RawTable) -> Result<Self> {
        Ok(Self::new(Resolver::with_table(raw)?))
    }

    /// Load a YAML token configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_table(&config::load_table(path)?)
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Machine from the last `execute`, finished or failed.
    pub fn machine(&self) -> Result<&Machine> {
        self.machine
            .as_ref()
            .ok_or_else(|| Error::State("not executed yet".to_string()))
    }

    pub fn filter<'s>(&self, source: &'s str) -> Result<Vec<&'s str>> {
        self.resolver.filter(source)
    }

    pub fn filter_from_file(&self, path: &Path) -> Result<Vec<String>> {
        let source = config::read_source(path)?;
        let tokens = self.filter(&source)?;
        Ok(tokens.into_iter().map(str::to_string).collect())
    }

    pub fn build(&self, source: &str) -> Result<Vec<Command>> {
        self.resolver.build(source)
    }

    pub fn build_from_file(&self, path: &Path) -> Result<Vec<Command>> {
        self.build(&config::read_source(path)?)
    }

    /// Build `source` and run it on a fresh machine.
    pub fn execute(
        &mut self,
        source: &str,
        config: &MachineConfig,
        channels: &mut Channels<'_>,
    ) -> Result<Vec<u8>> {
        let commands = self.build(source)?;
        tracing::debug!(commands = commands.len(), "executing program");
        let machine = self.machine.insert(Machine::new(commands, config));
        machine.execute(channels).map(<[u8]>::to_vec)
    }

    pub fn execute_from_file(
        &mut self,
        path: &Path,
        config: &MachineConfig,
        channels: &mut Channels<'_>,
    ) -> Result<Vec<u8>> {
        let source = config::read_source(path)?;
        self.execute(&source, config, channels)
    }

    /// `execute` with the debug trace forced on.
    pub fn debug_execute(
        &mut self,
        source: &str,
        config: &MachineConfig,
        channels: &mut Channels<'_>,
    ) -> Result<Vec<u8>> {
        let config = config.clone().debug();
        self.execute(source, &config, channels)
    }

    pub fn debug_execute_from_file(
        &mut self,
        path: &Path,
        config: &MachineConfig,
        channels: &mut Channels<'_>,
    ) -> Result<Vec<u8>> {
        let source = config::read_source(path)?;
        self.debug_execute(&source, config, channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_table, raw_table};
    use std::path::PathBuf;
    use Command::*;

    const ARROWS: &str = "\
pinc: →
pdec: ←
inc: '+1'
dec: '-1'
out: '!'
inp: '?'
jmp: '('
ret: ')'
clip: copy
paste: paste
";

    const END_SOURCE: &str = "\
# prints \"end\"
→ +1+1+1+1+1+1+1+1+1+1
( ← +1+1+1+1+1+1+1+1+1+1 → -1 )
← copy +1 !
  // second letter
→ +1+1+1
( ← +1+1+1 → -1 )
← ! paste !
";

    fn arrows() -> Session {
        Session::from_table(&parse_table(ARROWS).unwrap()).unwrap()
    }

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("glyphtape-{}-{name}", std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    fn run(session: &mut Session, source: &str, config: &MachineConfig) -> (Result<Vec<u8>>, Vec<u8>, Vec<u8>) {
        let mut input: &[u8] = b"";
        let mut output = Vec::new();
        let mut trace = Vec::new();
        let result = session.execute(source, config, &mut Channels::new(&mut input, &mut output, &mut trace));
        (result, output, trace)
    }

    #[test]
    fn test_from_table() {
        let raw = raw_table(vec![("inc", vec!["a", "z"]), ("dec", vec!["b"])]);
        let session = Session::from_table(&raw).unwrap();
        let table = session.resolver().table().unwrap();
        assert_eq!(table.tokens(CellInc).unwrap(), ["a", "z"]);
        assert_eq!(table.tokens(CellDec).unwrap(), ["b"]);
    }

    #[test]
    fn test_from_invalid_table() {
        assert!(Session::from_table(&raw_table(vec![("hoge", "a")])).is_err());
        assert!(Session::from_table(&RawTable::new()).is_err());
    }

    #[test]
    fn test_from_file() {
        let path = temp_file("arrows.yml", ARROWS);
        let session = Session::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(session.resolver().table().unwrap().len(), 10);
        assert_eq!(session.build("?").unwrap(), vec![Input]);
    }

    #[test]
    fn test_from_symbol_key_table() {
        let raw = parse_table(":out: e\n:clip: i\n:jmp: g\n:pinc: a\n").unwrap();
        let session = Session::from_table(&raw).unwrap();
        assert_eq!(
            session.build("steins gate").unwrap(),
            vec![Output, ClipCopy, LoopOpen, PointerInc, Output]
        );
    }

    #[test]
    fn test_from_missing_file() {
        assert!(Session::from_file(Path::new("hogepiyo")).is_err());
    }

    #[test]
    fn test_from_invalid_file() {
        let path = temp_file("invalid.yml", "hoge: a\npiyo: b\n");
        let result = Session::from_file(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_filter_and_build() {
        let raw = raw_table(vec![("out", "e"), ("clip", "i"), ("jmp", "g"), ("pinc", "a")]);
        let session = Session::from_table(&raw).unwrap();
        assert_eq!(session.filter("steins gate").unwrap(), vec!["e", "i", "g", "a", "e"]);
        assert_eq!(
            session.build("steins gate").unwrap(),
            vec![Output, ClipCopy, LoopOpen, PointerInc, Output]
        );
    }

    #[test]
    fn test_machine_before_execute() {
        assert!(matches!(arrows().machine(), Err(Error::State(_))));
    }

    #[test]
    fn test_execute() {
        let mut session = arrows();
        let (result, output, trace) = run(&mut session, END_SOURCE, &MachineConfig::default());
        assert_eq!(result.unwrap(), b"end");
        assert!(output.is_empty());
        assert!(trace.is_empty());
        let machine = session.machine().unwrap();
        assert!(machine.is_finished());
        assert_eq!(machine.result_string().unwrap(), "end");
    }

    #[test]
    fn test_execute_flash() {
        let mut session = arrows();
        let (result, output, _) = run(&mut session, END_SOURCE, &MachineConfig::default().flash());
        assert_eq!(result.unwrap(), b"end");
        assert_eq!(output, b"end");
    }

    #[test]
    fn test_execute_keeps_failed_machine() {
        let mut session = arrows();
        let (result, _, _) = run(&mut session, "+1 ! -1 -1", &MachineConfig::default());
        assert!(matches!(result, Err(Error::NegativeValue { .. })));
        let machine = session.machine().unwrap();
        assert_eq!(machine.output(), [1u8]);
        assert!(!machine.is_finished());
    }

    #[test]
    fn test_execute_loose_recovers_negative() {
        let mut session = arrows();
        let (result, _, _) = run(&mut session, "+1 ! -1 -1", &MachineConfig::default().loose());
        assert_eq!(result.unwrap(), vec![1u8]);
        assert_eq!(session.machine().unwrap().tape().get(0).unwrap(), -1);
    }

    #[test]
    fn test_execute_reads_input() {
        let mut session = arrows();
        let mut input: &[u8] = b"hi";
        let mut output = Vec::new();
        let mut trace = Vec::new();
        let result = session
            .execute(
                "? +1 ! → ? !",
                &MachineConfig::default(),
                &mut Channels::new(&mut input, &mut output, &mut trace),
            )
            .unwrap();
        assert_eq!(result, b"ii");
        assert!(input.is_empty());
    }

    #[test]
    fn test_execute_replaces_machine() {
        let mut session = arrows();
        run(&mut session, END_SOURCE, &MachineConfig::default()).0.unwrap();
        run(&mut session, "+1+1", &MachineConfig::default()).0.unwrap();
        assert_eq!(session.machine().unwrap().steps(), 2);
    }

    #[test]
    fn test_debug_execute() {
        let mut session = arrows();
        let mut input: &[u8] = b"";
        let mut output = Vec::new();
        let mut trace = Vec::new();
        let result = session
            .debug_execute(
                END_SOURCE,
                &MachineConfig::default(),
                &mut Channels::new(&mut input, &mut output, &mut trace),
            )
            .unwrap();
        assert_eq!(result, b"end");
        assert!(output.is_empty());

        let trace = String::from_utf8(trace).unwrap();
        let mut lines = trace.lines();
        assert!(lines.next().unwrap().starts_with("jump"));
        assert!(lines.next().unwrap().starts_with('{'));
        let steps: Vec<&str> = lines.collect();
        assert_eq!(steps.len() as u64, session.machine().unwrap().steps());
        assert!(steps.last().unwrap().ends_with("result:end"));
    }

    #[test]
    fn test_file_variants() {
        let source = temp_file("end.txt", END_SOURCE);
        let mut session = arrows();
        let tokens = session.filter_from_file(&source).unwrap();
        assert_eq!(tokens.first().map(String::as_str), Some("→"));
        let commands = session.build_from_file(&source).unwrap();
        assert_eq!(commands.len(), tokens.len());

        let mut input: &[u8] = b"";
        let mut output = Vec::new();
        let mut trace = Vec::new();
        let mut channels = Channels::new(&mut input, &mut output, &mut trace);
        let plain = session
            .execute_from_file(&source, &MachineConfig::default(), &mut channels)
            .unwrap();
        let debug = session
            .debug_execute_from_file(&source, &MachineConfig::default().flash(), &mut channels)
            .unwrap();
        std::fs::remove_file(&source).unwrap();

        assert_eq!(plain, b"end");
        assert_eq!(debug, b"end");
        assert_eq!(output, b"end");
        assert!(!trace.is_empty());
    }

    #[test]
    fn test_file_variants_missing_source() {
        let mut session = arrows();
        let missing = Path::new("/nonexistent/glyphtape/source.txt");
        assert!(session.filter_from_file(missing).is_err());
        assert!(session.build_from_file(missing).is_err());
        let mut input: &[u8] = b"";
        let mut output = Vec::new();
        let mut trace = Vec::new();
        let mut channels = Channels::new(&mut input, &mut output, &mut trace);
        assert!(session.execute_from_file(missing, &MachineConfig::default(), &mut channels).is_err());
    }
}
