//! The websocket accept loop and per-connection read/write halves.
//!
//! The wire framing itself (header + bincode body) is this workspace's
//! concern; the outer transport and any compression negotiated on top of
//! it are an external-collaborator boundary, so this module only carries
//! binary frames — it does not attempt permessage-deflate itself.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;

use specview_session::SessionManager;
use specview_wire::{decode, encode, EventType, FrameHeader, MessageBody};

use crate::dispatch::Dispatcher;

/// How often the maintenance loop ticks animation playback and scans for
/// idle sessions, independent of message traffic.
const MAINTENANCE_TICK: Duration = Duration::from_millis(100);

pub async fn run(
    bind_address: &str,
    read_only: bool,
    idle_wait: Duration,
    manager: Arc<SessionManager>,
    dispatcher: Arc<Dispatcher>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind_address).await?;
    tracing::info!(address = bind_address, "listening");

    tokio::spawn(maintenance_loop(manager.clone(), idle_wait));

    loop {
        let (stream, peer) = listener.accept().await?;
        let manager = manager.clone();
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer, read_only, manager, dispatcher).await {
                tracing::warn!(%peer, error = %e, "connection ended with an error");
            }
        });
    }
}

/// Periodically pings idle sessions, disconnects sessions that never
/// answered a prior ping, and lets the process exit once the configured
/// grace period has elapsed with no live session.
async fn maintenance_loop(manager: Arc<SessionManager>, idle_wait: Duration) {
    let mut already_pinged: Vec<u32> = Vec::new();
    let mut ticker = tokio::time::interval(MAINTENANCE_TICK);
    loop {
        ticker.tick().await;
        let now = Instant::now();

        let idle = manager.scan_idle(now, idle_wait, &already_pinged);
        for id in &idle.ping_due {
            if let Some(session) = manager.get(*id) {
                session.outbound.push(MessageBody::Ping);
                already_pinged.push(*id);
            }
        }
        for id in &idle.disconnect_due {
            tracing::info!(session = id, "disconnecting idle session with no pong reply");
            manager.retire(*id);
            already_pinged.retain(|p| p != id);
        }

        if manager.should_exit(now) {
            tracing::info!("no live sessions within the exit grace period, shutting down");
            std::process::exit(0);
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    read_only: bool,
    manager: Arc<SessionManager>,
    dispatcher: Arc<Dispatcher>,
) -> anyhow::Result<()> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut write, mut read) = ws.split();

    let session = manager.register(read_only);
    tracing::info!(%peer, session = session.session_id, "connection accepted");

    let mut flush_ticker = tokio::time::interval(MAINTENANCE_TICK);

    let result = loop {
        tokio::select! {
            message = read.next() => {
                match message {
                    Some(Ok(Message::Binary(bytes))) => {
                        if let Err(e) = handle_frame(&dispatcher, &session, &bytes) {
                            tracing::warn!(%peer, error = %e, "dropping malformed frame");
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(e.into()),
                }
            }
            _ = flush_ticker.tick() => {}
        }

        for body in session.outbound.drain() {
            let bytes = encode(&body)?;
            let header = FrameHeader::new(event_type_of(&body), 0);
            let mut frame = header.to_bytes().to_vec();
            frame.extend_from_slice(&bytes);
            write.send(Message::Binary(frame.into())).await?;
        }
    };

    manager.retire(session.session_id);
    tracing::info!(%peer, session = session.session_id, "connection closed");
    result
}

fn handle_frame(dispatcher: &Dispatcher, session: &Arc<specview_session::Session>, bytes: &[u8]) -> anyhow::Result<()> {
    let header = FrameHeader::from_bytes(bytes)?;
    header.check_version()?;
    let body = decode(&bytes[FrameHeader::SIZE..])?;
    dispatcher.dispatch(session, header.request_id, body);
    Ok(())
}

/// Recovers the event id a body was produced for, so outbound frames
/// carry a header consistent with their payload.
fn event_type_of(body: &MessageBody) -> EventType {
    use MessageBody::*;
    use EventType as E;
    match body {
        RegisterViewer(_) => E::RegisterViewer,
        RegisterViewerAck(_) => E::RegisterViewerAck,
        OpenFile(_) => E::OpenFile,
        OpenFileAck(_) => E::OpenFileAck,
        SetImageChannels(_) => E::SetImageChannels,
        AddRequiredTiles(_) => E::AddRequiredTiles,
        RasterTileSync(_) => E::RasterTileSync,
        RasterTileData(_) => E::RasterTileData,
        RegionHistogramData(_) => E::RegionHistogramData,
        ContourImageData(_) => E::ContourImageData,
        SetCursor(_) => E::SetCursor,
        SpatialProfileData(_) => E::SpatialProfileData,
        SpectralProfileData(_) => E::SpectralProfileData,
        SetRegion(_) => E::SetRegion,
        SetRegionAck(_) => E::SetRegionAck,
        SetHistogramRequirements(_) => E::SetHistogramRequirements,
        SetSpectralRequirements(_) => E::SetSpectralRequirements,
        SetStatsRequirements(_) => E::SetStatsRequirements,
        SetSpatialRequirements(_) => E::SetSpatialRequirements,
        RegionStatsData(_) => E::RegionStatsData,
        SetContourParameters(_) => E::SetContourParameters,
        StartAnimation(_) => E::StartAnimation,
        StartAnimationAck(_) => E::StartAnimationAck,
        AnimationFlowControl(_) => E::AnimationFlowControl,
        StopAnimation(_) => E::StopAnimation,
        MomentRequest(_) => E::MomentRequest,
        MomentProgress(_) => E::MomentProgress,
        MomentResponse(_) => E::MomentResponse,
        PvRequest(_) => E::PvRequest,
        PvProgress(_) => E::PvProgress,
        PvResponse(_) => E::PvResponse,
        PvPreviewData(_) => E::PvPreviewData,
        FittingRequest(_) => E::FittingRequest,
        FittingProgress(_) => E::FittingProgress,
        FittingResponse(_) => E::FittingResponse,
        ScriptingRequest(_) => E::ScriptingRequest,
        ScriptingResponse(_) => E::ScriptingResponse,
        ErrorData(_) => E::ErrorData,
        Ping => E::Ping,
        Pong => E::Pong,
    }
}
