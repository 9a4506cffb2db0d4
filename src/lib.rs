pub mod command;
pub mod config;
pub mod error;
pub mod jump;
pub mod machine;
pub mod resolver;
pub mod session;
pub mod tape;

pub use command::Command;
pub use config::{MachineConfig, RawTable, TokenSpec};
pub use error::{Error, Result};
pub use machine::{Channels, Machine};
pub use resolver::{Resolver, TokenTable};
pub use session::Session;
