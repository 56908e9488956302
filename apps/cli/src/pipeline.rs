use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;
use tubesum_core::{
    Browser, ChatGptTarget, Config, Injector, TranscriptExtractor,
    events::{BusConfig, EventBus, EventBusBuilder},
    workers::{Worker, WorkerInputs, WorkerWiring},
};

use crate::workers::{
    cli_completion_sink::{CliCompletionSinkWorker, RunResult, RunStage},
    extract_transcript::ExtractTranscriptWorker,
    inject_prompt::InjectPromptWorker,
    open_chat_tab::OpenChatTabWorker,
    reload_video_tab::ReloadVideoTabWorker,
};

pub struct PipelineHandle {
    pub bus: Arc<EventBus>,
    pub shutdown_tx: broadcast::Sender<()>,
    pub done_rx: oneshot::Receiver<RunResult>,
    pub stages_rx: mpsc::UnboundedReceiver<RunStage>,
}

fn take(wiring: &mut WorkerWiring, subscriber_id: &'static str) -> anyhow::Result<WorkerInputs> {
    wiring
        .take(subscriber_id)
        .with_context(|| format!("no inputs wired for {subscriber_id}"))
}

pub async fn start_pipeline(
    bus_config: BusConfig,
    browser: Arc<dyn Browser>,
    config: &Config,
) -> anyhow::Result<PipelineHandle> {
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    let (done_tx, done_rx) = oneshot::channel::<RunResult>();
    let (stages_tx, stages_rx) = mpsc::unbounded_channel();

    let builder = EventBusBuilder::new(bus_config)
        .subscribe(ReloadVideoTabWorker::subscription())
        .subscribe(ExtractTranscriptWorker::subscription())
        .subscribe(OpenChatTabWorker::subscription())
        .subscribe(InjectPromptWorker::<ChatGptTarget>::subscription())
        .subscribe(CliCompletionSinkWorker::subscription());

    let (bus, mut wiring, tasks) = builder.build()?;
    let bus = Arc::new(bus);
    debug!(session = %bus.session_id(), "event bus ready");

    // Drain tasks must be running before anything is published.
    for t in tasks.tokio {
        tokio::spawn(t);
    }

    let load_timeout = config.load_timeout();
    let reload_worker = ReloadVideoTabWorker::new(
        Arc::clone(&browser),
        config.video_page_pattern.clone(),
        load_timeout,
    );
    let extract_worker = ExtractTranscriptWorker::new(
        Arc::clone(&browser),
        TranscriptExtractor::from_config(config),
    );
    let open_chat_worker =
        OpenChatTabWorker::new(Arc::clone(&browser), config.chat_url.clone(), load_timeout);
    let inject_worker = InjectPromptWorker::new(
        Arc::clone(&browser),
        Injector::new(
            ChatGptTarget::new(config.submit_timings()),
            config.injector_settings(),
        ),
    );
    let sink_worker = CliCompletionSinkWorker::new(Some(done_tx), stages_tx);

    tokio::spawn(reload_worker.run(
        take(&mut wiring, ReloadVideoTabWorker::SUBSCRIBER_ID)?,
        Arc::clone(&bus),
        shutdown_rx.resubscribe(),
    ));
    tokio::spawn(extract_worker.run(
        take(&mut wiring, ExtractTranscriptWorker::SUBSCRIBER_ID)?,
        Arc::clone(&bus),
        shutdown_rx.resubscribe(),
    ));
    tokio::spawn(open_chat_worker.run(
        take(&mut wiring, OpenChatTabWorker::SUBSCRIBER_ID)?,
        Arc::clone(&bus),
        shutdown_rx.resubscribe(),
    ));
    tokio::spawn(inject_worker.run(
        take(&mut wiring, InjectPromptWorker::<ChatGptTarget>::SUBSCRIBER_ID)?,
        Arc::clone(&bus),
        shutdown_rx.resubscribe(),
    ));
    tokio::spawn(sink_worker.run(
        take(&mut wiring, CliCompletionSinkWorker::SUBSCRIBER_ID)?,
        Arc::clone(&bus),
        shutdown_rx.resubscribe(),
    ));
    debug!("workers started");

    Ok(PipelineHandle {
        bus,
        shutdown_tx,
        done_rx,
        stages_rx,
    })
}
