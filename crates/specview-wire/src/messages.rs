//! Message bodies carried after the 8-byte [`crate::header::FrameHeader`].
//!
//! Each [`EventType`](crate::event::EventType) pairs with exactly one
//! [`MessageBody`] variant; `encode`/`decode` use `bincode` so the wire
//! format is a stable byte-for-byte encoding of this enum.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorData {
    pub message: String,
    pub tags: Vec<String>,
    pub severity: ErrorSeverity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterViewer {
    pub session_id: u32,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterViewerAck {
    pub success: bool,
    pub message: String,
    pub session_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenFile {
    pub file_id: i32,
    pub directory: String,
    pub filename: String,
    pub hdu: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenFileAck {
    pub file_id: i32,
    pub success: bool,
    pub hdu: String,
    pub width: i64,
    pub height: i64,
    pub depth: i64,
    pub num_stokes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetImageChannels {
    pub file_id: i32,
    pub channel: i64,
    pub stokes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterTileSync {
    pub file_id: i32,
    pub animation_id: u32,
    pub end: bool,
}

/// Requests a burst of raster tiles for the current plane. `tiles` carries
/// `TileCoord::encode()`d values; `compression_quality` of `None` sends
/// raw pixels instead of ZFP-compressed ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddRequiredTiles {
    pub file_id: i32,
    pub animation_id: u32,
    pub tiles: Vec<i32>,
    pub compression_quality: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterTileData {
    pub file_id: i32,
    pub animation_id: u32,
    pub layer: i32,
    pub x: i32,
    pub y: i32,
    pub width: i64,
    pub height: i64,
    pub compressed: bool,
    pub image_data: Vec<u8>,
    pub nan_encodings: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionHistogramData {
    pub file_id: i32,
    pub region_id: i32,
    pub channel: i64,
    pub stokes: i64,
    pub progress: f64,
    pub num_bins: i32,
    pub bin_width: f64,
    pub first_bin_center: f64,
    pub bins: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContourImageData {
    pub file_id: i32,
    pub progress: f64,
    pub levels: Vec<f64>,
    pub vertex_counts: Vec<u32>,
    pub vertices: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetCursor {
    pub file_id: i32,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialProfileData {
    pub file_id: i32,
    pub x: i64,
    pub y: i64,
    pub channel: i64,
    pub stokes: i64,
    pub profile_x: Vec<f32>,
    pub profile_y: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralProfileData {
    pub file_id: i32,
    pub region_id: i32,
    pub stokes: i64,
    pub progress: f64,
    pub values: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetRegion {
    pub file_id: i32,
    pub region_id: i32,
    pub region_type: String,
    pub control_points: Vec<(f64, f64)>,
    pub rotation_deg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetRegionAck {
    pub file_id: i32,
    pub region_id: i32,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetRequirements {
    pub file_id: i32,
    pub region_id: i32,
    pub stats: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionStatsData {
    pub file_id: i32,
    pub region_id: i32,
    pub channel: i64,
    pub stokes: i64,
    pub num_pixels: i64,
    pub sum: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub rms: f64,
    pub sum_sq: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetContourParameters {
    pub file_id: i32,
    pub levels: Vec<f64>,
    pub smoothing_factor: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartAnimation {
    pub file_id: i32,
    pub first_frame: i64,
    pub start_frame: i64,
    pub last_frame: i64,
    pub end_frame: i64,
    pub delta_frame: i64,
    pub frame_rate: f64,
    pub tiles: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartAnimationAck {
    pub file_id: i32,
    pub success: bool,
    pub animation_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationFlowControl {
    pub file_id: i32,
    pub animation_id: u32,
    pub received_frame: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopAnimation {
    pub file_id: i32,
    pub animation_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentRequest {
    pub file_id: i32,
    pub region_id: i32,
    pub moments: Vec<i32>,
    pub axis: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MomentProgress {
    pub file_id: i32,
    pub progress: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentResponse {
    pub file_id: i32,
    pub success: bool,
    pub generated_file_ids: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvRequest {
    pub file_id: i32,
    pub region_id: i32,
    pub stokes: i64,
    pub preview: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PvProgress {
    pub file_id: i32,
    pub progress: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvResponse {
    pub file_id: i32,
    pub success: bool,
    pub width: i64,
    pub height: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvPreviewData {
    pub file_id: i32,
    pub region_id: i32,
    pub width: i64,
    pub height: i64,
    pub data: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittingRequest {
    pub file_id: i32,
    pub region_id: i32,
    pub channel: i64,
    pub stokes: i64,
    pub num_components: i32,
    pub fixed: Vec<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FittingProgress {
    pub file_id: i32,
    pub progress: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittingResponse {
    pub file_id: i32,
    pub success: bool,
    pub message: String,
    pub reduced_chi_sq: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptingRequest {
    pub target_session_id: u32,
    pub request_id: u32,
    pub action: String,
    pub parameters_json: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptingResponse {
    pub request_id: u32,
    pub success: bool,
    pub message: String,
    pub response_json: String,
}

/// The full set of message bodies; exactly one variant per wire event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MessageBody {
    RegisterViewer(RegisterViewer),
    RegisterViewerAck(RegisterViewerAck),
    OpenFile(OpenFile),
    OpenFileAck(OpenFileAck),
    SetImageChannels(SetImageChannels),
    AddRequiredTiles(AddRequiredTiles),
    RasterTileSync(RasterTileSync),
    RasterTileData(RasterTileData),
    RegionHistogramData(RegionHistogramData),
    ContourImageData(ContourImageData),
    SetCursor(SetCursor),
    SpatialProfileData(SpatialProfileData),
    SpectralProfileData(SpectralProfileData),
    SetRegion(SetRegion),
    SetRegionAck(SetRegionAck),
    SetHistogramRequirements(SetRequirements),
    SetSpectralRequirements(SetRequirements),
    SetStatsRequirements(SetRequirements),
    SetSpatialRequirements(SetRequirements),
    RegionStatsData(RegionStatsData),
    SetContourParameters(SetContourParameters),
    StartAnimation(StartAnimation),
    StartAnimationAck(StartAnimationAck),
    AnimationFlowControl(AnimationFlowControl),
    StopAnimation(StopAnimation),
    MomentRequest(MomentRequest),
    MomentProgress(MomentProgress),
    MomentResponse(MomentResponse),
    PvRequest(PvRequest),
    PvProgress(PvProgress),
    PvResponse(PvResponse),
    PvPreviewData(PvPreviewData),
    FittingRequest(FittingRequest),
    FittingProgress(FittingProgress),
    FittingResponse(FittingResponse),
    ScriptingRequest(ScriptingRequest),
    ScriptingResponse(ScriptingResponse),
    ErrorData(ErrorData),
    Ping,
    Pong,
}

/// Messages smaller than this many bytes skip permessage-deflate — the
/// framing layer this core hands off to checks this before compressing.
pub const COMPRESSION_SKIP_THRESHOLD: usize = 1024;

pub fn encode(body: &MessageBody) -> Result<Vec<u8>> {
    bincode::serialize(body).map_err(|e| Error::Encode(e.to_string()))
}

pub fn decode(bytes: &[u8]) -> Result<MessageBody> {
    bincode::deserialize(bytes).map_err(|e| Error::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_and_decodes_a_simple_body() {
        let body = MessageBody::SetImageChannels(SetImageChannels {
            file_id: 0,
            channel: 3,
            stokes: 0,
        });
        let bytes = encode(&body).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn unit_variants_round_trip() {
        let bytes = encode(&MessageBody::Ping).unwrap();
        assert_eq!(decode(&bytes).unwrap(), MessageBody::Ping);
    }

    #[test]
    fn error_body_round_trips_with_tags() {
        let body = MessageBody::ErrorData(ErrorData {
            message: "unknown region".into(),
            tags: vec!["region".into(), "validation".into()],
            severity: ErrorSeverity::Warning,
        });
        let bytes = encode(&body).unwrap();
        assert_eq!(decode(&bytes).unwrap(), body);
    }
}
