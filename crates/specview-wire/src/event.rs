//! Event type ids carried in the frame header.

/// Enumerated event id. Discriminants are stable across versions; new
/// events are appended, never renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum EventType {
    RegisterViewer = 0,
    RegisterViewerAck = 1,
    OpenFile = 2,
    OpenFileAck = 3,
    SetImageChannels = 4,
    RasterTileSync = 5,
    RasterTileData = 6,
    RegionHistogramData = 7,
    ContourImageData = 8,
    SetCursor = 9,
    SpatialProfileData = 10,
    SpectralProfileData = 11,
    SetRegion = 12,
    SetRegionAck = 13,
    SetHistogramRequirements = 14,
    SetSpectralRequirements = 15,
    SetStatsRequirements = 16,
    SetSpatialRequirements = 17,
    RegionStatsData = 18,
    SetContourParameters = 19,
    StartAnimation = 20,
    StartAnimationAck = 21,
    AnimationFlowControl = 22,
    StopAnimation = 23,
    MomentRequest = 24,
    MomentProgress = 25,
    MomentResponse = 26,
    PvRequest = 27,
    PvProgress = 28,
    PvResponse = 29,
    PvPreviewData = 30,
    FittingRequest = 31,
    FittingProgress = 32,
    FittingResponse = 33,
    ScriptingRequest = 34,
    ScriptingResponse = 35,
    ErrorData = 36,
    Ping = 37,
    Pong = 38,
    AddRequiredTiles = 39,
}

impl EventType {
    pub fn from_u16(v: u16) -> Option<Self> {
        use EventType::*;
        const ALL: &[EventType] = &[
            RegisterViewer,
            RegisterViewerAck,
            OpenFile,
            OpenFileAck,
            SetImageChannels,
            RasterTileSync,
            RasterTileData,
            RegionHistogramData,
            ContourImageData,
            SetCursor,
            SpatialProfileData,
            SpectralProfileData,
            SetRegion,
            SetRegionAck,
            SetHistogramRequirements,
            SetSpectralRequirements,
            SetStatsRequirements,
            SetSpatialRequirements,
            RegionStatsData,
            SetContourParameters,
            StartAnimation,
            StartAnimationAck,
            AnimationFlowControl,
            StopAnimation,
            MomentRequest,
            MomentProgress,
            MomentResponse,
            PvRequest,
            PvProgress,
            PvResponse,
            PvPreviewData,
            FittingRequest,
            FittingProgress,
            FittingResponse,
            ScriptingRequest,
            ScriptingResponse,
            ErrorData,
            Ping,
            Pong,
            AddRequiredTiles,
        ];
        ALL.iter().copied().find(|e| *e as u16 == v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_round_trips_through_u16() {
        for raw in 0u16..=39 {
            let event = EventType::from_u16(raw).expect("discriminant should resolve");
            assert_eq!(event as u16, raw);
        }
    }

    #[test]
    fn unknown_discriminant_is_none() {
        assert!(EventType::from_u16(9999).is_none());
    }
}
