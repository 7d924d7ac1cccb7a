//! The real-time side of the system.
//!
//! A session has two threads. The render thread runs [`RenderCycle`] once per
//! block period against absolute deadlines; the console thread serves
//! quit/calibrate commands. They share nothing but [`ControlFlags`].
//!
//! ```ignore
//! use auralize::{config::SystemConfig, runtime::{System, TerminalInput}};
//!
//! fn main() -> color_eyre::Result<()> {
//!     let system = System::new(SystemConfig::default())?;
//!     system.install_signal_handler()?;
//!     let status = system.run(TerminalInput::new())?;
//!     std::process::exit(status.code())
//! }
//! ```

mod command;
mod control;
mod cycle;
mod system;
mod timer;

pub use command::{run_command_loop, Command, CommandInput, ScriptedInput, TerminalInput};
pub use control::{ControlFlags, ExitStatus};
pub use cycle::{CycleStats, LoopState, PeriodReport, RenderCycle};
pub use system::{spawn_render_thread, System, SystemCycle};
pub use timer::PeriodicTimer;
