//! Demultiplexes decoded wire requests onto a [`Session`], matching each
//! event and calling into the pipeline: this is the one place that turns
//! bytes off the socket into calls against
//! `specview-frame`/`specview-region`/`specview-fit`.
//!
//! Only client-originated requests are matched; the `*Ack`/`*Data`/
//! `*Progress`/`*Response` variants are things this process *sends*, so
//! receiving one inbound is logged and dropped rather than handled.

use std::sync::Arc;

use specview_core::TileCoord;
use specview_fit::{FitConfig, GaussianComponent};
use specview_frame::Frame;
use specview_region::{RegionState, RegionType};
use specview_session::{AnimationState, Session, TaskRuntime};
use specview_wire::{
    ErrorData, ErrorSeverity, FittingProgress, FittingResponse, MessageBody, MomentProgress, MomentResponse,
    OpenFileAck, PvPreviewData, PvProgress, PvResponse, RasterTileData, RasterTileSync, RegionHistogramData,
    RegionStatsData, RegisterViewerAck, ScriptingResponse, SetRegionAck, StartAnimationAck,
};

use crate::loader_factory::LoaderFactory;

pub struct Dispatcher {
    pub runtime: Arc<TaskRuntime>,
    pub loader_factory: Arc<dyn LoaderFactory>,
}

fn region_type_from_wire(name: &str) -> RegionType {
    match name {
        "point" => RegionType::Point,
        "rectangle" | "rotbox" => RegionType::Rectangle,
        "ellipse" => RegionType::Ellipse,
        "polygon" => RegionType::Polygon,
        "line" => RegionType::Line,
        "polyline" => RegionType::Polyline,
        "annulus" => RegionType::Annulus,
        _ => RegionType::Polygon,
    }
}

/// Components a request doesn't supply initial guesses for are spread
/// across the region so the solver isn't started with degenerate
/// (identical) Jacobian rows; only the first is then re-seeded from
/// image moments by `specview_fit::fit_region`.
fn default_components(n: usize, width: i64, height: i64) -> Vec<GaussianComponent> {
    let w = width.max(1) as f64;
    let h = height.max(1) as f64;
    (0..n.max(1))
        .map(|i| {
            let frac = (i as f64 + 1.0) / (n.max(1) as f64 + 1.0);
            GaussianComponent {
                cx: w * frac,
                cy: h * frac,
                amp: 1.0,
                fwhm_x: (w / 4.0).max(1.0),
                fwhm_y: (h / 4.0).max(1.0),
                pa: 0.0,
            }
        })
        .collect()
}

impl Dispatcher {
    pub fn new(runtime: Arc<TaskRuntime>, loader_factory: Arc<dyn LoaderFactory>) -> Self {
        Self { runtime, loader_factory }
    }

    /// Handles one decoded request body, pushing zero or more responses
    /// onto `session.outbound` (synchronously for cheap work, or by
    /// submitting a task for anything that walks pixel data).
    pub fn dispatch(&self, session: &Arc<Session>, request_id: u32, body: MessageBody) {
        session.touch();
        match body {
            MessageBody::RegisterViewer(req) => {
                session.outbound.push(MessageBody::RegisterViewerAck(RegisterViewerAck {
                    success: true,
                    message: format!("session {} registered (requested id {})", session.session_id, req.session_id),
                    session_id: session.session_id,
                }));
            }

            MessageBody::OpenFile(req) => {
                let ack = match self.loader_factory.open(&req.directory, &req.filename) {
                    Ok(loader) => match Frame::open(req.file_id, loader, &req.hdu) {
                        Ok(frame) => {
                            let shape = frame.shape();
                            session.insert_frame(req.file_id, frame);
                            OpenFileAck {
                                file_id: req.file_id,
                                success: true,
                                hdu: req.hdu.clone(),
                                width: shape.width,
                                height: shape.height,
                                depth: shape.depth,
                                num_stokes: shape.stokes,
                            }
                        }
                        Err(e) => {
                            session.outbound.push(MessageBody::ErrorData(ErrorData {
                                message: e.to_string(),
                                tags: vec!["internal".into()],
                                severity: ErrorSeverity::Error,
                            }));
                            OpenFileAck { file_id: req.file_id, success: false, hdu: req.hdu, width: 0, height: 0, depth: 0, num_stokes: 0 }
                        }
                    },
                    Err(e) => {
                        session.outbound.push(MessageBody::ErrorData(ErrorData {
                            message: e.to_string(),
                            tags: vec!["internal".into()],
                            severity: ErrorSeverity::Error,
                        }));
                        OpenFileAck { file_id: req.file_id, success: false, hdu: req.hdu, width: 0, height: 0, depth: 0, num_stokes: 0 }
                    }
                };
                session.outbound.push(MessageBody::OpenFileAck(ack));
            }

            MessageBody::SetImageChannels(req) => {
                if let Ok(frame) = session.frame(req.file_id) {
                    if let Err(e) = frame.set_image_channels(req.channel, req.stokes) {
                        session.emit_error(&e.into());
                    }
                } else {
                    session.emit_error(&specview_session::Error::UnknownFile(req.file_id));
                }
            }

            MessageBody::AddRequiredTiles(req) => self.spawn_tiles(session, req),

            MessageBody::SetCursor(req) => {
                session.cursor.set(req.file_id, specview_session::CursorPoint { x: req.x, y: req.y, request_id });
                if let Ok(frame) = session.frame(req.file_id) {
                    if let Some(coord) = frame.current_coord() {
                        match frame.fill_spatial_profile_data(req.x as i64, req.y as i64, coord.stokes) {
                            Ok((profile_x, profile_y)) => {
                                if session.cursor.is_current(req.file_id, request_id) {
                                    session.outbound.push(MessageBody::SpatialProfileData(specview_wire::SpatialProfileData {
                                        file_id: req.file_id,
                                        x: req.x as i64,
                                        y: req.y as i64,
                                        channel: coord.channel,
                                        stokes: coord.stokes,
                                        profile_x,
                                        profile_y,
                                    }));
                                }
                            }
                            Err(e) => session.emit_error(&e.into()),
                        }
                    }
                }
            }

            MessageBody::SetRegion(req) => {
                let result = session.frame(req.file_id).and_then(|frame| {
                    let state = RegionState::new(region_type_from_wire(&req.region_type), req.control_points, req.rotation_deg, req.file_id);
                    session.regions.lock().expect("regions lock poisoned").set_region(req.region_id, state, &frame);
                    Ok(())
                });
                session.outbound.push(MessageBody::SetRegionAck(SetRegionAck {
                    file_id: req.file_id,
                    region_id: req.region_id,
                    success: result.is_ok(),
                }));
                if let Err(e) = result {
                    session.emit_error(&e);
                }
            }

            MessageBody::SetHistogramRequirements(req) => self.fulfil_histogram(session, &req),
            MessageBody::SetStatsRequirements(req) => self.fulfil_stats(session, &req),
            MessageBody::SetSpectralRequirements(_) | MessageBody::SetSpatialRequirements(_) => {
                tracing::debug!(session = session.session_id, "spectral/spatial requirements acknowledged, streamed on next cursor/channel move");
            }

            MessageBody::SetContourParameters(req) => {
                if let Ok(frame) = session.frame(req.file_id) {
                    let mut levels = Vec::new();
                    let mut vertex_counts = Vec::new();
                    let mut vertices = Vec::new();
                    let mut progress = 0.0;
                    let smoothing = specview_frame::SmoothingMode::None;
                    let outcome = frame.contour_image(&req.levels, smoothing, 4096, |chunk| {
                        levels.push(chunk.level);
                        vertex_counts.push(chunk.indices.len() as u32);
                        progress = chunk.progress;
                        for (a, b) in &chunk.vertices {
                            vertices.extend_from_slice(&(*a as f32).to_le_bytes());
                            vertices.extend_from_slice(&(*b as f32).to_le_bytes());
                        }
                    });
                    match outcome {
                        Ok(()) => session.outbound.push(MessageBody::ContourImageData(specview_wire::ContourImageData {
                            file_id: req.file_id,
                            progress,
                            levels,
                            vertex_counts,
                            vertices,
                        })),
                        Err(e) => session.emit_error(&e.into()),
                    }
                }
            }

            MessageBody::StartAnimation(req) => {
                let animation_id = session.session_id ^ (req.file_id as u32);
                let mut anim = AnimationState::new(req.file_id, req.first_frame, req.start_frame, req.last_frame, req.end_frame, req.delta_frame, req.frame_rate);
                anim.looping = req.end_frame != req.last_frame;
                session.animations.lock().expect("animations lock poisoned").insert(req.file_id, anim);
                session.outbound.push(MessageBody::StartAnimationAck(StartAnimationAck {
                    file_id: req.file_id,
                    success: true,
                    animation_id,
                }));
            }

            MessageBody::AnimationFlowControl(req) => {
                if let Some(anim) = session.animations.lock().expect("animations lock poisoned").get_mut(&req.file_id) {
                    anim.record_flow_control(req.received_frame);
                }
            }

            MessageBody::StopAnimation(req) => {
                if let Some(anim) = session.animations.lock().expect("animations lock poisoned").get_mut(&req.file_id) {
                    anim.stop();
                }
            }

            MessageBody::MomentRequest(req) => self.spawn_moments(session, req),
            MessageBody::PvRequest(req) => self.spawn_pv(session, req),
            MessageBody::FittingRequest(req) => self.spawn_fit(session, req),

            MessageBody::ScriptingRequest(req) => {
                session.outbound.push(MessageBody::ScriptingResponse(ScriptingResponse {
                    request_id: req.request_id,
                    success: false,
                    message: "scripting bridge is an external collaborator, not implemented by this core".into(),
                    response_json: String::new(),
                }));
            }

            MessageBody::Ping => session.outbound.push(MessageBody::Pong),
            MessageBody::Pong => {}

            other => {
                tracing::warn!(session = session.session_id, ?other, "ignoring server-originated message body received inbound");
            }
        }
    }

    fn fulfil_histogram(&self, session: &Arc<Session>, req: &specview_wire::SetRequirements) {
        let Ok(frame) = session.frame(req.file_id) else {
            session.emit_error(&specview_session::Error::UnknownFile(req.file_id));
            return;
        };
        let Some(coord) = frame.current_coord() else { return };
        let regions = session.regions.lock().expect("regions lock poisoned");
        let cancel = session.cancel.clone();
        match regions.fill_region_histogram_data(req.region_id, &frame, 200, &[coord.channel], coord.stokes, &|| cancel.is_histogram_cancelled()) {
            Ok(hist) => session.outbound.push(MessageBody::RegionHistogramData(RegionHistogramData {
                file_id: req.file_id,
                region_id: req.region_id,
                channel: coord.channel,
                stokes: coord.stokes,
                progress: 1.0,
                num_bins: hist.num_bins() as i32,
                bin_width: hist.bin_width,
                first_bin_center: hist.bin_center,
                bins: hist.counts,
            })),
            Err(e) => session.emit_error(&e.into()),
        }
    }

    fn fulfil_stats(&self, session: &Arc<Session>, req: &specview_wire::SetRequirements) {
        let Ok(frame) = session.frame(req.file_id) else {
            session.emit_error(&specview_session::Error::UnknownFile(req.file_id));
            return;
        };
        let Some(coord) = frame.current_coord() else { return };
        let regions = session.regions.lock().expect("regions lock poisoned");
        match regions.fill_region_stats_data(req.region_id, &frame, coord.channel, coord.stokes) {
            Ok(stats) => session.outbound.push(MessageBody::RegionStatsData(RegionStatsData {
                file_id: req.file_id,
                region_id: req.region_id,
                channel: coord.channel,
                stokes: coord.stokes,
                num_pixels: stats.num_pixels,
                sum: stats.sum,
                mean: stats.mean,
                std_dev: stats.std_dev,
                min: stats.min,
                max: stats.max,
                rms: stats.rms,
                sum_sq: stats.sum_sq,
            })),
            Err(e) => session.emit_error(&e.into()),
        }
    }

    fn spawn_moments(&self, session: &Arc<Session>, req: specview_wire::MomentRequest) {
        let session = session.clone();
        session.refcount.increment();
        self.runtime.submit(Box::new(move || {
            let outcome = (|| -> specview_session::Result<Vec<i32>> {
                let frame = session.frame(req.file_id)?;
                let mut progress = |p: f64| {
                    session.outbound.push(MessageBody::MomentProgress(MomentProgress { file_id: req.file_id, progress: p }));
                };
                let images = frame.calculate_moments(&mut progress)?;
                Ok((0..images.len() as i32).map(|i| req.file_id * 1000 + i).collect())
            })();
            match outcome {
                Ok(ids) => session.outbound.push(MessageBody::MomentResponse(MomentResponse { file_id: req.file_id, success: true, generated_file_ids: ids })),
                Err(e) => {
                    session.emit_error(&e);
                    session.outbound.push(MessageBody::MomentResponse(MomentResponse { file_id: req.file_id, success: false, generated_file_ids: Vec::new() }));
                }
            }
            session.refcount.decrement();
        }));
    }

    /// Brackets a tile burst between `RasterTileSync(end=false)` and
    /// `RasterTileSync(end=true)` for the same `(file, animation_id)`,
    /// dropping any tile whose plane went stale mid-burst rather than
    /// reporting it as an error (stale tiles are transient, not fatal).
    fn spawn_tiles(&self, session: &Arc<Session>, req: specview_wire::AddRequiredTiles) {
        let session = session.clone();
        session.refcount.increment();
        self.runtime.submit(Box::new(move || {
            session.outbound.push(MessageBody::RasterTileSync(RasterTileSync {
                file_id: req.file_id,
                animation_id: req.animation_id,
                end: false,
            }));
            if let Ok(frame) = session.frame(req.file_id) {
                if let Some(coord) = frame.current_coord() {
                    for packed in &req.tiles {
                        if session.cancel.is_base_cancelled() {
                            break;
                        }
                        let Some(tile) = TileCoord::decode(*packed) else { continue };
                        match frame.fill_raster_tile(tile, coord.channel, coord.stokes, req.compression_quality) {
                            Ok(raster) => session.outbound.push(MessageBody::RasterTileData(RasterTileData {
                                file_id: req.file_id,
                                animation_id: req.animation_id,
                                layer: tile.layer,
                                x: tile.x,
                                y: tile.y,
                                width: raster.width,
                                height: raster.height,
                                compressed: req.compression_quality.is_some(),
                                image_data: raster.tile_bytes,
                                nan_encodings: raster.nan_rle_bytes,
                            })),
                            Err(_) => continue,
                        }
                    }
                }
            } else {
                session.emit_error(&specview_session::Error::UnknownFile(req.file_id));
            }
            session.outbound.push(MessageBody::RasterTileSync(RasterTileSync {
                file_id: req.file_id,
                animation_id: req.animation_id,
                end: true,
            }));
            session.refcount.decrement();
        }));
    }

    fn spawn_pv(&self, session: &Arc<Session>, req: specview_wire::PvRequest) {
        let session = session.clone();
        session.refcount.increment();
        self.runtime.submit(Box::new(move || {
            session.outbound.push(MessageBody::PvProgress(PvProgress { file_id: req.file_id, progress: 0.0 }));
            let outcome = (|| -> specview_session::Result<specview_region::PvImage> {
                let frame = session.frame(req.file_id)?;
                let mut regions = session.regions.lock().expect("regions lock poisoned");
                Ok(regions.calculate_pv_image(req.region_id, &frame, req.stokes, req.preview)?)
            })();
            match outcome {
                Ok(pv) => {
                    session.outbound.push(MessageBody::PvResponse(PvResponse { file_id: req.file_id, success: true, width: pv.width, height: pv.height }));
                    session.outbound.push(MessageBody::PvPreviewData(PvPreviewData {
                        file_id: req.file_id,
                        region_id: req.region_id,
                        width: pv.width,
                        height: pv.height,
                        data: pv.data,
                    }));
                }
                Err(e) => {
                    session.emit_error(&e);
                    session.outbound.push(MessageBody::PvResponse(PvResponse { file_id: req.file_id, success: false, width: 0, height: 0 }));
                }
            }
            session.refcount.decrement();
        }));
    }

    fn spawn_fit(&self, session: &Arc<Session>, req: specview_wire::FittingRequest) {
        let session = session.clone();
        session.refcount.increment();
        self.runtime.submit(Box::new(move || {
            let outcome = (|| -> specview_session::Result<specview_fit::FitResult> {
                let frame = session.frame(req.file_id)?;
                let shape = frame.shape();
                let config = FitConfig {
                    components: default_components(req.num_components.max(1) as usize, shape.width, shape.height),
                    background: 0.0,
                    fixed: req.fixed.clone(),
                    beam_area: 1.0,
                    seed_from_moments: true,
                    max_iterations: 200,
                };
                let cancel = session.cancel.clone();
                let mut progress = |p: f64| {
                    session.outbound.push(MessageBody::FittingProgress(FittingProgress { file_id: req.file_id, progress: p }));
                };
                let regions = session.regions.lock().expect("regions lock poisoned");
                let result = regions.fit_image(req.region_id, &frame, req.channel, req.stokes, &config, &mut progress, &|| cancel.is_base_cancelled())?;
                Ok(result)
            })();
            match outcome {
                Ok(fit) => session.outbound.push(MessageBody::FittingResponse(FittingResponse {
                    file_id: req.file_id,
                    success: fit.converged,
                    message: if fit.converged { "converged".into() } else { "did not converge within the iteration budget".into() },
                    reduced_chi_sq: fit.reduced_chi_sq,
                })),
                Err(e) => {
                    session.emit_error(&e);
                    session.outbound.push(MessageBody::FittingResponse(FittingResponse { file_id: req.file_id, success: false, message: e.to_string(), reduced_chi_sq: 0.0 }));
                }
            }
            session.refcount.decrement();
        }));
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use specview_core::loader::{RegionMask, Slicer};
    use specview_core::{BasicStats, ImageShape};
    use specview_session::Session;
    use specview_wire::{AddRequiredTiles, OpenFile, RegisterViewer, SetImageChannels, SetRegion, SetRequirements};

    use super::*;
    use crate::loader_factory::LoaderFactory;

    struct FakeLoader {
        width: i64,
        height: i64,
        pixels: Vec<f32>,
    }

    impl specview_core::loader::FileLoader for FakeLoader {
        fn open_file(&mut self, _hdu: &str) -> specview_core::Result<()> {
            Ok(())
        }
        fn find_coordinate_axes(&self) -> specview_core::Result<(ImageShape, Option<usize>, Option<usize>)> {
            Ok((ImageShape { width: self.width, height: self.height, depth: 1, stokes: 1 }, None, None))
        }
        fn get_image(&self) -> specview_core::Result<Vec<f32>> {
            Ok(self.pixels.clone())
        }
        fn get_slice(&self, _slicer: &Slicer) -> specview_core::Result<Vec<f32>> {
            Ok(self.pixels.clone())
        }
        fn get_sub_image(&self, region: &RegionMask, out: &mut [f32]) -> specview_core::Result<()> {
            let rect = region.bounds;
            for (i, v) in out.iter_mut().enumerate() {
                let ly = i as i64 / rect.width;
                let lx = i as i64 % rect.width;
                let y = rect.y + ly;
                let x = rect.x + lx;
                *v = self.pixels[(y * self.width + x) as usize];
            }
            Ok(())
        }
        fn get_cursor_spectral_data(&self, _x: i64, _y: i64, _stokes: i64) -> specview_core::Result<Vec<f32>> {
            Ok(vec![1.0])
        }
        fn get_region_spectral_data(&self, _region: &RegionMask, _stokes: i64) -> specview_core::Result<Vec<f32>> {
            Ok(self.pixels.clone())
        }
        fn has_mip(&self, _n: i64) -> bool {
            false
        }
        fn get_image_stats(&self, _stokes: i64, _z: i64) -> Option<BasicStats> {
            None
        }
    }

    struct FakeLoaderFactory;

    impl LoaderFactory for FakeLoaderFactory {
        fn open(&self, _directory: &str, _filename: &str) -> anyhow::Result<Box<dyn specview_core::loader::FileLoader>> {
            Ok(Box::new(FakeLoader { width: 4, height: 4, pixels: (0..16).map(|i| i as f32).collect() }))
        }
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Arc::new(TaskRuntime::new(1)), Arc::new(FakeLoaderFactory))
    }

    /// Background tasks run on a worker thread; poll `outbound` rather
    /// than assuming it is already populated when `dispatch` returns.
    fn wait_for(session: &Session, at_least: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while session.outbound.len() < at_least && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn register_viewer_acks_with_the_session_id() {
        let dispatcher = dispatcher();
        let session = Arc::new(Session::new(7, false));
        dispatcher.dispatch(&session, 1, MessageBody::RegisterViewer(RegisterViewer { session_id: 7, api_key: String::new() }));
        let drained = session.outbound.drain();
        assert!(matches!(&drained[0], MessageBody::RegisterViewerAck(ack) if ack.session_id == 7 && ack.success));
    }

    #[test]
    fn open_file_inserts_a_frame_and_reports_its_shape() {
        let dispatcher = dispatcher();
        let session = Arc::new(Session::new(1, false));
        dispatcher.dispatch(
            &session,
            1,
            MessageBody::OpenFile(OpenFile { file_id: 0, directory: "/data".into(), filename: "cube.fits".into(), hdu: "0".into() }),
        );
        let drained = session.outbound.drain();
        let MessageBody::OpenFileAck(ack) = &drained[0] else { panic!("expected an OpenFileAck") };
        assert!(ack.success);
        assert_eq!((ack.width, ack.height), (4, 4));
        assert!(session.frame(0).is_ok());
    }

    #[test]
    fn open_file_reports_failure_without_a_configured_loader() {
        let dispatcher = Dispatcher::new(Arc::new(TaskRuntime::new(1)), Arc::new(crate::loader_factory::UnconfiguredLoaderFactory));
        let session = Arc::new(Session::new(1, false));
        dispatcher.dispatch(
            &session,
            1,
            MessageBody::OpenFile(OpenFile { file_id: 0, directory: "/data".into(), filename: "cube.fits".into(), hdu: "0".into() }),
        );
        let drained = session.outbound.drain();
        assert!(drained.iter().any(|m| matches!(m, MessageBody::ErrorData(_))));
        assert!(matches!(drained.last(), Some(MessageBody::OpenFileAck(ack)) if !ack.success));
        assert!(session.frame(0).is_err());
    }

    #[test]
    fn add_required_tiles_brackets_a_burst_with_sync_messages() {
        let dispatcher = dispatcher();
        let session = Arc::new(Session::new(1, false));
        dispatcher.dispatch(&session, 1, MessageBody::OpenFile(OpenFile { file_id: 0, directory: "/d".into(), filename: "c.fits".into(), hdu: "0".into() }));
        session.outbound.drain();

        let tile = TileCoord::new(0, 0, 0).encode();
        dispatcher.dispatch(&session, 2, MessageBody::AddRequiredTiles(AddRequiredTiles { file_id: 0, animation_id: 1, tiles: vec![tile], compression_quality: None }));
        wait_for(&session, 3);

        let drained = session.outbound.drain();
        assert!(matches!(drained.first(), Some(MessageBody::RasterTileSync(s)) if !s.end));
        assert!(matches!(drained.last(), Some(MessageBody::RasterTileSync(s)) if s.end));
        assert!(drained.iter().any(|m| matches!(m, MessageBody::RasterTileData(_))));
    }

    #[test]
    fn set_region_then_histogram_requirements_reports_a_histogram_synchronously() {
        let dispatcher = dispatcher();
        let session = Arc::new(Session::new(1, false));
        dispatcher.dispatch(&session, 1, MessageBody::OpenFile(OpenFile { file_id: 0, directory: "/d".into(), filename: "c.fits".into(), hdu: "0".into() }));
        session.outbound.drain();

        dispatcher.dispatch(
            &session,
            2,
            MessageBody::SetRegion(SetRegion { file_id: 0, region_id: 5, region_type: "rectangle".into(), control_points: vec![(0.0, 0.0), (3.0, 3.0)], rotation_deg: 0.0 }),
        );
        let drained = session.outbound.drain();
        assert!(matches!(&drained[0], MessageBody::SetRegionAck(ack) if ack.success));

        dispatcher.dispatch(&session, 3, MessageBody::SetHistogramRequirements(SetRequirements { file_id: 0, region_id: 5, stats: vec![] }));
        let drained = session.outbound.drain();
        assert!(matches!(&drained[0], MessageBody::RegionHistogramData(_)));
    }

    #[test]
    fn set_image_channels_on_an_unknown_file_reports_an_error_instead_of_panicking() {
        let dispatcher = dispatcher();
        let session = Arc::new(Session::new(1, false));
        dispatcher.dispatch(&session, 1, MessageBody::SetImageChannels(SetImageChannels { file_id: 99, channel: 0, stokes: 0 }));
        let drained = session.outbound.drain();
        assert!(matches!(drained.first(), Some(MessageBody::ErrorData(_))));
    }

    #[test]
    fn ping_is_answered_with_pong() {
        let dispatcher = dispatcher();
        let session = Arc::new(Session::new(1, false));
        dispatcher.dispatch(&session, 1, MessageBody::Ping);
        assert!(matches!(session.outbound.drain().as_slice(), [MessageBody::Pong]));
    }
}
