//! Wire protocol: 8-byte frame header plus `bincode`-encoded message
//! bodies, one variant per event id.

mod error;
mod event;
mod header;
mod messages;

pub use error::{Error, Result};
pub use event::EventType;
pub use header::{FrameHeader, ICD_VERSION};
pub use messages::{
    decode, encode, AddRequiredTiles, AnimationFlowControl, ContourImageData, ErrorData, ErrorSeverity,
    FittingProgress, FittingRequest, FittingResponse, MessageBody, MomentProgress, MomentRequest, MomentResponse,
    OpenFile, OpenFileAck, PvPreviewData, PvProgress, PvRequest, PvResponse, RasterTileData, RasterTileSync,
    RegionHistogramData, RegionStatsData, RegisterViewer, RegisterViewerAck, ScriptingRequest, ScriptingResponse,
    SetContourParameters, SetCursor, SetImageChannels, SetRegion, SetRegionAck, SetRequirements, SpatialProfileData,
    SpectralProfileData, StartAnimation, StartAnimationAck, StopAnimation, COMPRESSION_SKIP_THRESHOLD,
};
