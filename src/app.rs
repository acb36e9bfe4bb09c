//! radio-streamer application.
//!
//! This module contains a top-level structure [`App`] that represents the whole
//! radio-streamer application.

use crate::{
    args::Args,
    config::StreamConfig,
    console::{self, Console},
    control::Controller,
    fifo::SampleFifo,
    mmio::{RegisterAccess, Window},
    sink::{FrameSink, UdpSink},
    streamer::Streamer,
    tuner::RadioTuner,
};
use anyhow::{Context, Result};
use radio_pac::{radio_tuner, simple_fifo};
use tokio::io::AsyncWrite;
use tokio::sync::{mpsc, oneshot};

type RadioWindow = Window<{ radio_tuner::NUM_REGISTERS }>;
type FifoWindow = Window<{ simple_fifo::NUM_REGISTERS }>;

/// radio-streamer application.
///
/// This struct owns the objects that form the application: the controller,
/// which owns the radio tuner registers, and the streamer, which owns the
/// sample FIFO registers and the UDP socket. Both share the
/// [`StreamConfig`].
#[derive(Debug)]
pub struct App {
    controller: Controller<RadioWindow>,
    streamer: Streamer<FifoWindow, UdpSink>,
}

impl App {
    /// Creates a new application.
    ///
    /// This maps the register windows and opens the UDP socket. Any failure
    /// is fatal.
    #[tracing::instrument(name = "App::new", level = "debug")]
    pub async fn new(args: &Args) -> Result<App> {
        let radio_location = args.radio_window();
        let radio: RadioWindow = Window::open(&radio_location)
            .await
            .with_context(|| format!("failed to map radio tuner at {radio_location}"))?;
        let fifo_location = args.fifo_window();
        let fifo: FifoWindow = Window::open(&fifo_location)
            .await
            .with_context(|| format!("failed to map sample FIFO at {fifo_location}"))?;
        tracing::info!(
            "mapped radio tuner at physical address {:#010x} and sample FIFO at {:#010x}",
            radio.phys_addr(),
            fifo.phys_addr()
        );

        let sink = UdpSink::bind()?;
        let config = StreamConfig::new(args.destination);
        let controller = Controller::new(RadioTuner::new(radio), config.clone());
        let streamer = Streamer::new(SampleFifo::new(fifo), sink, config)
            .with_intervals(args.poll_interval(), args.idle_interval());

        Ok(App {
            controller,
            streamer,
        })
    }

    /// Runs the application.
    ///
    /// The streamer is started in its own thread, and the console runs on
    /// stdin and stdout. See [`run`].
    #[tracing::instrument(name = "App::run", level = "debug", skip_all)]
    pub async fn run(self) -> Result<()> {
        run(
            self.controller,
            self.streamer,
            console::spawn_stdin_reader()?,
            tokio::io::stdout(),
        )
        .await
    }
}

/// Runs the streamer and the console.
///
/// The streamer runs in its own thread. The console reads `lines` and writes
/// to `output`. Closing the input stops the console but not the streamer.
/// This only returns if the streamer fails or writing to the console output
/// fails. Neither the streamer thread nor the thread feeding `lines` is
/// waited for, so the process can exit right after the error is returned.
pub async fn run<R, F, S, W>(
    controller: Controller<R>,
    streamer: Streamer<F, S>,
    lines: mpsc::Receiver<String>,
    output: W,
) -> Result<()>
where
    R: RegisterAccess,
    F: RegisterAccess + Send + 'static,
    S: FrameSink + Send + 'static,
    W: AsyncWrite + Unpin,
{
    let mut streamer = spawn_streamer(streamer)?;
    let console = Console::new(controller, lines, output);
    let console_result = tokio::select! {
        ret = &mut streamer => return streamer_result(ret),
        ret = console.run() => ret,
    };
    console_result?;
    streamer_result(streamer.await)
}

fn spawn_streamer<R, S>(streamer: Streamer<R, S>) -> Result<oneshot::Receiver<Result<()>>>
where
    R: RegisterAccess + Send + 'static,
    S: FrameSink + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    std::thread::Builder::new()
        .name("streamer".to_string())
        .spawn(move || {
            let ret = streamer.run();
            if let Err(err) = &ret {
                tracing::error!("streamer failed: {err:#}");
            }
            // the receiver is gone only if the application is exiting
            let _ = tx.send(ret);
        })
        .context("failed to spawn streamer thread")?;
    Ok(rx)
}

fn streamer_result(ret: Result<Result<()>, oneshot::error::RecvError>) -> Result<()> {
    ret.map_err(|_| anyhow::anyhow!("streamer thread terminated unexpectedly"))?
}
