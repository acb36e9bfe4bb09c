//! Operator console.
//!
//! The console reads single-character commands, one per line, and applies
//! them through the [`Controller`]. Commands that need a value (a frequency
//! or an IP address) take it from the rest of the line, or prompt for it on
//! the next line. Invalid input is reported and leaves the configuration
//! unchanged.

use crate::{
    control::{Controller, COARSE_STEP, FINE_STEP},
    mmio::RegisterAccess,
    tune,
    tuner::Oscillator,
};
use anyhow::{Context, Result};
use std::io::BufRead;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// Help text listing the console commands.
pub const MENU: &str = "\
Enter 't' to tune radio to a new frequency.
Enter 'f' to set the fake ADC to a new frequency.
Enter 'U/u' to increase fake ADC frequency by 1000/100 Hz.
Enter 'D/d' to decrease fake ADC frequency by 1000/100 Hz.
Enter 'r' to reset the DDS.
Enter 's' to start/stop streaming data.
Enter 'i' to set a new IP address.
Enter 'b' to benchmark register reads.
Enter 'p' to play a tune.
Enter [space] to repeat this menu.
";

/// Console command.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Command {
    /// Set the frequency of an oscillator.
    SetFrequency(Oscillator),
    /// Change the fake ADC frequency by a number of Hz.
    StepAdcFrequency(f64),
    /// Pulse the DDS reset.
    Reset,
    /// Start or stop streaming.
    ToggleStreaming,
    /// Set the IP address of the stream destination.
    SetDestination,
    /// Benchmark register reads.
    Benchmark,
    /// Play the demo tune.
    PlayTune,
    /// Print the menu.
    Menu,
    /// Empty line.
    Nothing,
    /// Unknown key.
    Unrecognized(char),
}

impl Command {
    /// Returns the command that corresponds to a key.
    pub fn from_key(key: char) -> Command {
        match key {
            't' => Command::SetFrequency(Oscillator::Tuner),
            'f' => Command::SetFrequency(Oscillator::Adc),
            'U' => Command::StepAdcFrequency(COARSE_STEP),
            'u' => Command::StepAdcFrequency(FINE_STEP),
            'D' => Command::StepAdcFrequency(-COARSE_STEP),
            'd' => Command::StepAdcFrequency(-FINE_STEP),
            'r' => Command::Reset,
            's' => Command::ToggleStreaming,
            'i' => Command::SetDestination,
            'b' => Command::Benchmark,
            'p' => Command::PlayTune,
            ' ' => Command::Menu,
            _ => Command::Unrecognized(key),
        }
    }

    /// Returns the prompt for the value of the command.
    ///
    /// Returns `None` if the command does not take a value.
    pub fn prompt(self) -> Option<&'static str> {
        match self {
            Command::SetFrequency(Oscillator::Tuner) => Some("Enter new tune frequency in Hz: "),
            Command::SetFrequency(Oscillator::Adc) => Some("Enter new fake ADC frequency in Hz: "),
            Command::SetDestination => Some("Enter new destination IP address: "),
            _ => None,
        }
    }
}

/// Splits an input line into a command and its inline value.
pub fn parse_line(line: &str) -> Result<(Command, Option<&str>)> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut chars = line.chars();
    let Some(key) = chars.next() else {
        return Ok((Command::Nothing, None));
    };
    let command = Command::from_key(key);
    let value = chars.as_str().trim();
    if value.is_empty() || matches!(command, Command::Unrecognized(_)) {
        Ok((command, None))
    } else if command.prompt().is_some() {
        Ok((command, Some(value)))
    } else {
        anyhow::bail!("command {key:?} does not take a value")
    }
}

/// Parses a frequency entered by the operator.
///
/// Only non-empty strings of decimal digits are accepted. The frequency is
/// given in Hz.
pub fn parse_frequency(text: &str) -> Result<f64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        anyhow::bail!("invalid input {text:?}: please enter numbers only; frequency unchanged");
    }
    let frequency = text
        .parse::<u64>()
        .with_context(|| format!("invalid frequency {text:?}; frequency unchanged"))?;
    Ok(frequency as f64)
}

/// Parses an IPv4 address entered by the operator.
pub fn parse_destination(text: &str) -> Result<Ipv4Addr> {
    text.parse()
        .with_context(|| format!("invalid IP address {text:?}; destination unchanged"))
}

/// Number of input lines buffered between the reader thread and the console.
const LINE_BUFFER: usize = 16;

/// Reads lines from `input` in a detached thread.
///
/// The lines are delivered through the returned channel, which is closed
/// when the input reaches end of file or fails. The thread is never joined,
/// so a read that blocks forever, such as a read of the terminal, does not
/// keep the process or the tokio runtime from shutting down.
pub fn spawn_line_reader<B>(input: B) -> Result<mpsc::Receiver<String>>
where
    B: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    std::thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || {
            for line in input.lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        tracing::error!("failed to read console input: {err}");
                        return;
                    }
                }
            }
        })
        .context("failed to spawn console input thread")?;
    Ok(rx)
}

/// Reads the lines of stdin in a detached thread. See [`spawn_line_reader`].
pub fn spawn_stdin_reader() -> Result<mpsc::Receiver<String>> {
    spawn_line_reader(std::io::BufReader::new(std::io::stdin()))
}

/// Operator console.
#[derive(Debug)]
pub struct Console<R, W> {
    controller: Controller<R>,
    lines: mpsc::Receiver<String>,
    output: W,
    beat: Duration,
}

impl<R, W> Console<R, W>
where
    R: RegisterAccess,
    W: AsyncWrite + Unpin,
{
    /// Creates a console that reads commands from `lines` and writes its
    /// replies to `output`.
    pub fn new(
        controller: Controller<R>,
        lines: mpsc::Receiver<String>,
        output: W,
    ) -> Console<R, W> {
        Console {
            controller,
            lines,
            output,
            beat: tune::BEAT,
        }
    }

    /// Sets the duration of a beat of the demo tune.
    pub fn with_beat(mut self, beat: Duration) -> Self {
        self.beat = beat;
        self
    }

    /// Runs the console.
    ///
    /// Returns when the input is closed, or if writing to the output fails.
    #[tracing::instrument(name = "console", skip_all)]
    pub async fn run(mut self) -> Result<()> {
        self.print(MENU).await?;
        while let Some(line) = self.lines.recv().await {
            if let Err(err) = self.handle_line(&line).await {
                tracing::debug!("invalid console input: {err:#}");
                self.print(&format!("{err:#}\n")).await?;
            }
        }
        tracing::info!("console input closed");
        Ok(())
    }

    async fn handle_line(&mut self, line: &str) -> Result<()> {
        let (command, value) = parse_line(line)?;
        let value = match (command.prompt(), value) {
            (Some(prompt), None) => Some(self.read_value(prompt).await?),
            (_, value) => value.map(str::to_string),
        };
        let value = value.as_deref().unwrap_or_default();
        let reply = match command {
            Command::SetFrequency(oscillator) => {
                let frequency = parse_frequency(value)?;
                let update = self.controller.set_frequency(oscillator, frequency);
                format!("{update}\n")
            }
            Command::StepAdcFrequency(step) => {
                format!("{}\n", self.controller.step_adc_frequency(step))
            }
            Command::Reset => {
                self.controller.reset();
                "DDS reset\n".to_string()
            }
            Command::ToggleStreaming => {
                let streaming = self.controller.toggle_streaming();
                format!(
                    "Toggling UDP streaming {}\n",
                    if streaming { "ON" } else { "OFF" }
                )
            }
            Command::SetDestination => {
                let address = parse_destination(value)?;
                let destination = self.controller.set_destination(address);
                format!("Streaming to {destination}\n")
            }
            Command::Benchmark => format!("Benchmark: {}\n", self.controller.benchmark()),
            Command::PlayTune => {
                self.print("Playing tune...\n").await?;
                tune::play(&mut self.controller, self.beat).await;
                "Done\n".to_string()
            }
            Command::Menu => MENU.to_string(),
            Command::Nothing => String::new(),
            Command::Unrecognized(key) => {
                tracing::debug!(?key, "unrecognized console key");
                format!("Key input {key:?} not recognized. Reprinting menu:\n{MENU}")
            }
        };
        self.print(&reply).await
    }

    async fn read_value(&mut self, prompt: &str) -> Result<String> {
        self.print(prompt).await?;
        match self.lines.recv().await {
            Some(line) => Ok(line.trim().to_string()),
            None => anyhow::bail!("input closed while waiting for a value"),
        }
    }

    async fn print(&mut self, text: &str) -> Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.flush().await?;
        Ok(())
    }
}
