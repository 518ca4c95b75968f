//! Speaker output. The rodio stream is not `Send`, so it lives on its own
//! thread and the device hands buffers over a channel.

use std::thread;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use excuse_core::audio::{AudioError, OutputDevice};
use rodio::{buffer::SamplesBuffer, OutputStream, Sink, Source};
use shared::domain::SoundCue;
use tracing::{debug, trace, warn};

#[derive(Debug, PartialEq)]
enum Command {
    Play(Vec<f32>),
    StartLoop(Vec<f32>),
    StopLoop(Vec<f32>),
}

pub struct Speakers {
    commands: Sender<Command>,
}

pub fn open_speakers(sample_rate: u32) -> Result<Box<dyn OutputDevice>, AudioError> {
    let (commands, inbox) = unbounded();
    let (ready_tx, ready_rx) = bounded(1);

    thread::Builder::new()
        .name("get_me_out-audio".into())
        .spawn(move || run_output(sample_rate, inbox, ready_tx))
        .map_err(|err| AudioError::Unavailable(err.to_string()))?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(Box::new(Speakers { commands })),
        Ok(Err(err)) => Err(err),
        Err(_) => Err(AudioError::Unavailable("audio thread exited".into())),
    }
}

fn run_output(
    sample_rate: u32,
    inbox: Receiver<Command>,
    ready: Sender<Result<(), AudioError>>,
) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(err) => {
            let _ = ready.send(Err(AudioError::Unavailable(err.to_string())));
            return;
        }
    };
    let _ = ready.send(Ok(()));
    debug!(sample_rate, "audio output opened");

    let mut drone: Option<Sink> = None;
    for command in inbox {
        let result = match command {
            Command::Play(samples) => handle.play_raw(SamplesBuffer::new(1, sample_rate, samples)),
            Command::StartLoop(samples) => Sink::try_new(&handle).map(|sink| {
                sink.append(SamplesBuffer::new(1, sample_rate, samples).repeat_infinite());
                drone = Some(sink);
            }),
            Command::StopLoop(tail) => {
                if let Some(sink) = drone.take() {
                    sink.stop();
                }
                handle.play_raw(SamplesBuffer::new(1, sample_rate, tail))
            }
        };
        if let Err(err) = result {
            warn!("audio output error: {err}");
        }
    }
    debug!("audio output closed");
}

impl Speakers {
    fn send(&self, command: Command) -> Result<(), AudioError> {
        self.commands
            .send(command)
            .map_err(|_| AudioError::Playback("audio thread stopped".into()))
    }
}

impl OutputDevice for Speakers {
    fn play(&mut self, cue: SoundCue, samples: Vec<f32>) -> Result<(), AudioError> {
        trace!(cue = cue.name(), samples = samples.len(), "queueing cue");
        self.send(Command::Play(samples))
    }

    fn start_loop(&mut self, samples: Vec<f32>) -> Result<(), AudioError> {
        self.send(Command::StartLoop(samples))
    }

    fn stop_loop(&mut self, fade_tail: Vec<f32>) -> Result<(), AudioError> {
        self.send(Command::StopLoop(fade_tail))
    }
}
